//! Bounded-parallel SOA serial fan-out.
//!
//! A dispatcher task walks the target list and takes a semaphore permit
//! before spawning each fetch task, so at most `parallel` queries are in
//! flight and the dispatcher itself is what waits for capacity. Every fetch
//! task sends exactly one [`SerialResult`] into a bounded channel and then
//! releases its permit. The channel closes once the dispatcher and every
//! task have dropped their senders, which is how the consumer learns the
//! fan-out is complete.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use checksoa_core::{serial_delta, CheckError, MasterResult, QueryError, QueryTarget, SerialResult};
use hickory_proto::rr::{Name, RecordType};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::QueryOptions;
use crate::message::{build_query, check_response_code, nsid, parse_name, soa_serial};
use crate::transport::Exchange;

/// What one SOA query produced
#[derive(Debug)]
struct SoaReply {
    outcome: Result<u32, QueryError>,
    elapsed: Duration,
    nsid: Option<String>,
}

/// Shared by every fetch task of a run
struct SoaProbe {
    exchange: Arc<dyn Exchange>,
    zone: String,
    qname: Name,
    options: QueryOptions,
}

impl SoaProbe {
    async fn query(&self, ip: IpAddr) -> SoaReply {
        let query = build_query(&self.qname, RecordType::SOA, &self.options);
        let started = Instant::now();
        let response = self.exchange.exchange(&query, &[ip]).await;
        let elapsed = started.elapsed();

        let (outcome, nsid) = match response {
            Ok(response) => {
                let outcome = check_response_code(&response, &self.zone)
                    .and_then(|()| soa_serial(&response).ok_or(QueryError::MissingRecord(ip)));
                (outcome, nsid(&response))
            }
            Err(err) => (Err(QueryError::from(err)), None),
        };

        match &outcome {
            Ok(serial) => debug!(%ip, serial, ?elapsed, "obtained serial"),
            Err(err) => debug!(%ip, error = %err, ?elapsed, "serial query failed"),
        }

        SoaReply {
            outcome,
            elapsed,
            nsid,
        }
    }

    async fn fetch(&self, target: QueryTarget, master_serial: Option<u32>) -> SerialResult {
        let (server_name, address) = target.into_parts();
        let ip = match address {
            Ok(ip) => ip,
            Err(err) => {
                return SerialResult {
                    server_name,
                    address: None,
                    outcome: Err(err),
                    elapsed: Duration::ZERO,
                    nsid: None,
                    delta: None,
                }
            }
        };

        let reply = self.query(ip).await;
        let delta = match (master_serial, &reply.outcome) {
            (Some(master), Ok(serial)) => Some(serial_delta(master, *serial)),
            _ => None,
        };

        SerialResult {
            server_name,
            address: Some(ip),
            outcome: reply.outcome,
            elapsed: reply.elapsed,
            nsid: reply.nsid,
            delta,
        }
    }
}

/// Fetches the zone's SOA serial from many servers concurrently
pub struct SerialFetcher {
    probe: Arc<SoaProbe>,
    parallel: usize,
    master_serial: Option<u32>,
}

impl SerialFetcher {
    /// Create a fetcher for `zone`.
    ///
    /// SOA queries are always sent with recursion disabled; `parallel` is
    /// raised to at least one.
    pub fn new(
        exchange: Arc<dyn Exchange>,
        zone: &str,
        options: QueryOptions,
        parallel: usize,
    ) -> Result<Self, CheckError> {
        let qname = parse_name(zone)
            .map_err(|e| CheckError::Invocation(format!("invalid zone name: {e}")))?;

        Ok(Self {
            probe: Arc::new(SoaProbe {
                exchange,
                zone: zone.to_string(),
                qname,
                options: options.recursion_desired(false),
            }),
            parallel: parallel.max(1),
            master_serial: None,
        })
    }

    /// Compute each result's delta against this master serial
    #[must_use]
    pub const fn with_master_serial(mut self, serial: Option<u32>) -> Self {
        self.master_serial = serial;
        self
    }

    /// Concurrency ceiling in effect
    #[must_use]
    pub const fn parallel(&self) -> usize {
        self.parallel
    }

    /// Query the master; any failure is fatal for the run
    pub async fn fetch_master(&self, name: String, address: IpAddr) -> Result<MasterResult, CheckError> {
        let reply = self.probe.query(address).await;
        match reply.outcome {
            Ok(serial) => Ok(MasterResult {
                name,
                address,
                serial,
                elapsed: reply.elapsed,
                nsid: reply.nsid,
            }),
            Err(source) => Err(CheckError::Master {
                name,
                address,
                source,
            }),
        }
    }

    /// Start the fan-out.
    ///
    /// Returns the receiving end of the result channel and the dispatcher's
    /// handle, which resolves to the number of targets dispatched. Drain the
    /// receiver before awaiting the handle.
    pub fn dispatch(&self, targets: Vec<QueryTarget>) -> (mpsc::Receiver<SerialResult>, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(self.parallel);
        let semaphore = Arc::new(Semaphore::new(self.parallel));
        let probe = Arc::clone(&self.probe);
        let master_serial = self.master_serial;

        let dispatcher = tokio::spawn(async move {
            let mut dispatched = 0usize;
            for target in targets {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    warn!("concurrency limiter closed, stopping dispatch");
                    break;
                };
                let probe = Arc::clone(&probe);
                let tx = tx.clone();

                tokio::spawn(async move {
                    let result = probe.fetch(target, master_serial).await;
                    if tx.send(result).await.is_err() {
                        warn!("result receiver dropped before fan-out completed");
                    }
                    drop(permit);
                });
                dispatched += 1;
            }
            debug!(dispatched, "all fetch tasks dispatched");
            dispatched
        });

        (rx, dispatcher)
    }

    /// Run the fan-out to completion and return the results in arrival order
    pub async fn fetch_all(&self, targets: Vec<QueryTarget>) -> Vec<SerialResult> {
        let (mut rx, dispatcher) = self.dispatch(targets);
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        match dispatcher.await {
            Ok(dispatched) if dispatched != results.len() => {
                warn!(dispatched, received = results.len(), "result count mismatch");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "dispatcher task failed"),
        }
        results
    }
}

impl std::fmt::Debug for SerialFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialFetcher")
            .field("zone", &self.probe.zone)
            .field("parallel", &self.parallel)
            .field("master_serial", &self.master_serial)
            .finish_non_exhaustive()
    }
}
