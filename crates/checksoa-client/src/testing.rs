//! In-memory DNS exchange for unit tests.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use checksoa_core::TransportError;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use hickory_proto::rr::rdata::{A, AAAA, NS, SOA};
use hickory_proto::rr::{Name, RData, Record, RecordType};

use crate::transport::Exchange;

/// Response to `query` with the given code and answers
pub(crate) fn reply(query: &Message, code: ResponseCode, answers: Vec<Record>) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_response_code(code)
        .add_queries(query.queries().to_vec())
        .add_answers(answers);
    response
}

pub(crate) fn soa_record(zone: &str, serial: u32) -> Record {
    let soa = SOA::new(
        Name::from_ascii("ns1.example.com.").unwrap(),
        Name::from_ascii("hostmaster.example.com.").unwrap(),
        serial,
        7200,
        3600,
        1_209_600,
        300,
    );
    Record::from_rdata(Name::from_ascii(zone).unwrap(), 300, RData::SOA(soa))
}

/// How a server answers an SOA query
#[derive(Debug, Clone)]
pub(crate) enum SoaBehavior {
    Serial(u32),
    SerialWithNsid(u32, &'static str),
    Timeout,
    Refused,
    Rcode(ResponseCode),
    NoAnswer,
}

/// Answers NS/A/AAAA lookups from a table keyed by name, and SOA queries
/// from a table keyed by the first address asked.
#[derive(Default)]
pub(crate) struct MockExchange {
    records: HashMap<(String, RecordType), Vec<RData>>,
    rcodes: HashMap<(String, RecordType), ResponseCode>,
    soa: HashMap<IpAddr, SoaBehavior>,
    default_soa: Option<SoaBehavior>,
    delay: Duration,
    calls: AtomicUsize,
    soa_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockExchange {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ns(mut self, zone: &str, hosts: &[&str]) -> Self {
        let data = hosts
            .iter()
            .map(|h| RData::NS(NS(Name::from_ascii(h).unwrap())))
            .collect();
        self.records.insert((zone.to_string(), RecordType::NS), data);
        self
    }

    pub(crate) fn a(mut self, name: &str, ips: &[&str]) -> Self {
        let data = ips
            .iter()
            .map(|ip| RData::A(A(ip.parse().unwrap())))
            .collect();
        self.records.insert((name.to_string(), RecordType::A), data);
        self
    }

    pub(crate) fn aaaa(mut self, name: &str, ips: &[&str]) -> Self {
        let data = ips
            .iter()
            .map(|ip| RData::AAAA(AAAA(ip.parse().unwrap())))
            .collect();
        self.records.insert((name.to_string(), RecordType::AAAA), data);
        self
    }

    pub(crate) fn rcode(mut self, name: &str, qtype: RecordType, code: ResponseCode) -> Self {
        self.rcodes.insert((name.to_string(), qtype), code);
        self
    }

    pub(crate) fn soa(mut self, ip: &str, behavior: SoaBehavior) -> Self {
        self.soa.insert(ip.parse().unwrap(), behavior);
        self
    }

    pub(crate) fn default_soa(mut self, behavior: SoaBehavior) -> Self {
        self.default_soa = Some(behavior);
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn soa_calls(&self) -> usize {
        self.soa_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn answer_soa(&self, query: &Message, zone: &str, ip: IpAddr) -> Result<Message, TransportError> {
        self.soa_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .soa
            .get(&ip)
            .or(self.default_soa.as_ref())
            .cloned()
            .unwrap_or(SoaBehavior::Timeout);

        match behavior {
            SoaBehavior::Serial(serial) => {
                Ok(reply(query, ResponseCode::NoError, vec![soa_record(zone, serial)]))
            }
            SoaBehavior::SerialWithNsid(serial, id) => {
                let mut response = reply(query, ResponseCode::NoError, vec![soa_record(zone, serial)]);
                let mut edns = Edns::new();
                edns.options_mut().insert(EdnsOption::Unknown(
                    u16::from(EdnsCode::NSID),
                    id.as_bytes().to_vec(),
                ));
                response.set_edns(edns);
                Ok(response)
            }
            SoaBehavior::Timeout => Err(TransportError::Timeout),
            SoaBehavior::Refused => Err(TransportError::Io("connection refused".into())),
            SoaBehavior::Rcode(code) => Ok(reply(query, code, vec![])),
            SoaBehavior::NoAnswer => Ok(reply(query, ResponseCode::NoError, vec![])),
        }
    }

    fn answer_lookup(&self, query: &Message, name: &str, qtype: RecordType) -> Message {
        let key = (name.to_string(), qtype);
        if let Some(code) = self.rcodes.get(&key) {
            return reply(query, *code, vec![]);
        }
        match self.records.get(&key) {
            Some(data) => {
                let owner = Name::from_ascii(name).unwrap();
                let answers = data
                    .iter()
                    .map(|rdata| Record::from_rdata(owner.clone(), 300, rdata.clone()))
                    .collect();
                reply(query, ResponseCode::NoError, answers)
            }
            None => {
                let other = if qtype == RecordType::A { RecordType::AAAA } else { RecordType::A };
                if self.records.contains_key(&(name.to_string(), other)) {
                    reply(query, ResponseCode::NoError, vec![])
                } else {
                    reply(query, ResponseCode::NXDomain, vec![])
                }
            }
        }
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn exchange(&self, query: &Message, addrs: &[IpAddr]) -> Result<Message, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let question = &query.queries()[0];
        let name = question.name().to_ascii();
        let response = match (question.query_type(), addrs.first()) {
            (_, None) => Err(TransportError::NoAddresses),
            (RecordType::SOA, Some(ip)) => self.answer_soa(query, &name, *ip),
            (qtype, Some(_)) => Ok(self.answer_lookup(query, &name, qtype)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
