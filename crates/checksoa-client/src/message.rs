//! Building DNS queries and reading the parts of responses we care about.

use std::net::IpAddr;

use checksoa_core::{QueryError, TransportError};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use hickory_proto::rr::{Name, RData, RecordType};

use crate::config::QueryOptions;

/// Parse a (fully-qualified) domain name
pub fn parse_name(name: &str) -> Result<Name, TransportError> {
    Name::from_ascii(name).map_err(|e| TransportError::Encode(format!("{name}: {e}")))
}

/// Build a single-question query with an EDNS OPT record.
///
/// The RD/AD/CD bits follow `opts`; the OPT record advertises
/// `opts.bufsize` and carries an empty NSID option when `opts.nsid` is set.
#[must_use]
pub fn build_query(qname: &Name, qtype: RecordType, opts: &QueryOptions) -> Message {
    let mut message = Message::new();
    message
        .set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(opts.recursion_desired)
        .set_authentic_data(opts.authentic_data)
        .set_checking_disabled(opts.checking_disabled)
        .add_query(Query::query(qname.clone(), qtype));
    message.set_edns(build_edns(opts));
    message
}

fn build_edns(opts: &QueryOptions) -> Edns {
    let mut edns = Edns::new();
    edns.set_max_payload(opts.bufsize);
    if opts.nsid {
        edns.options_mut()
            .insert(EdnsOption::Unknown(u16::from(EdnsCode::NSID), Vec::new()));
    }
    edns
}

/// Map a non-success response code to the matching failure.
///
/// NXDOMAIN is reported as the zone not existing; every other code keeps
/// its name.
pub fn check_response_code(response: &Message, zone: &str) -> Result<(), QueryError> {
    match response.response_code() {
        ResponseCode::NoError => Ok(()),
        ResponseCode::NXDomain => Err(QueryError::NxDomain(zone.to_string())),
        code => Err(QueryError::ResponseCode(code.to_string())),
    }
}

/// Serial of the first SOA record in the answer section
#[must_use]
pub fn soa_serial(response: &Message) -> Option<u32> {
    response.answers().iter().find_map(|record| match record.data() {
        RData::SOA(soa) => Some(soa.serial()),
        _ => None,
    })
}

/// Name server names from the answer section
#[must_use]
pub fn ns_names(response: &Message) -> Vec<String> {
    response
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::NS(ns) => Some(ns.0.to_ascii()),
            _ => None,
        })
        .collect()
}

/// Addresses of the requested type from the answer section
#[must_use]
pub fn addresses(response: &Message, qtype: RecordType) -> Vec<IpAddr> {
    response
        .answers()
        .iter()
        .filter(|record| record.record_type() == qtype)
        .filter_map(|record| match record.data() {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect()
}

/// NSID carried in the response's OPT record, if any.
///
/// Printable identifiers are returned as text, anything else hex-encoded.
#[must_use]
pub fn nsid(response: &Message) -> Option<String> {
    let edns = response.extensions().as_ref()?;
    for (code, option) in edns.options().as_ref() {
        if *code == EdnsCode::NSID {
            let Ok(data) = Vec::<u8>::try_from(option) else {
                return None;
            };
            if data.is_empty() {
                return None;
            }
            return Some(format_nsid(&data));
        }
    }
    None
}

fn format_nsid(data: &[u8]) -> String {
    if data.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        String::from_utf8_lossy(data).into_owned()
    } else {
        hex::encode(data)
    }
}
