use std::net::IpAddr;
use std::time::Duration;

use crate::error::QueryError;

/// Outcome of querying one target for the zone's SOA serial.
///
/// Created exactly once per [`QueryTarget`](crate::QueryTarget) and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialResult {
    /// Server name the target was created for
    pub server_name: String,

    /// Address that was queried (absent when resolution failed)
    pub address: Option<IpAddr>,

    /// The serial, or why none was obtained
    pub outcome: Result<u32, QueryError>,

    /// Wall-clock time spent on the query
    pub elapsed: Duration,

    /// Server identifier from the EDNS NSID option
    pub nsid: Option<String>,

    /// `master - serial` when a master serial is known and this query succeeded
    pub delta: Option<i64>,
}

impl SerialResult {
    /// The serial, if the query succeeded
    #[must_use]
    pub fn serial(&self) -> Option<u32> {
        self.outcome.as_ref().ok().copied()
    }

    /// The failure, if the query failed
    #[must_use]
    pub fn error(&self) -> Option<&QueryError> {
        self.outcome.as_ref().err()
    }

    /// Returns true if a serial was obtained
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Elapsed time in fractional milliseconds
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        duration_ms(self.elapsed)
    }
}

/// The reference server's serial.
///
/// Only successful master queries produce one; a failed master query ends
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterResult {
    /// Master name as configured, or its address
    pub name: String,

    /// Address that was queried
    pub address: IpAddr,

    /// Serial returned by the master
    pub serial: u32,

    /// Wall-clock time spent on the query
    pub elapsed: Duration,

    /// Server identifier from the EDNS NSID option
    pub nsid: Option<String>,
}

impl MasterResult {
    /// Elapsed time in fractional milliseconds
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        duration_ms(self.elapsed)
    }

    /// Signed difference between the master serial and `serial`
    #[must_use]
    pub fn delta(&self, serial: u32) -> i64 {
        serial_delta(self.serial, serial)
    }
}

/// `master - serial` as a signed number.
///
/// Plain integer subtraction, not RFC 1982 serial arithmetic: serials on
/// opposite sides of the 32-bit wrap give a large delta of the wrong sign.
#[must_use]
pub fn serial_delta(master: u32, serial: u32) -> i64 {
    i64::from(master) - i64::from(serial)
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
