//! Serial drift evaluation.

use crate::types::{DriftPolicy, MasterResult, SerialResult, Status};

/// Spread between the highest and lowest serial, or `None` if empty.
///
/// Serials are compared as plain unsigned integers, not in RFC 1982 serial
/// space.
#[must_use]
pub fn serial_spread(serials: &[u32]) -> Option<u32> {
    let min = serials.iter().min()?;
    let max = serials.iter().max()?;
    Some(max - min)
}

/// Status for a set of serials assuming no server failed.
///
/// An empty set is a [`Status::ServerError`]: nothing was obtained.
#[must_use]
pub fn drift_status(serials: &[u32], policy: &DriftPolicy) -> Status {
    match serial_spread(serials) {
        None => Status::ServerError,
        Some(spread) if spread > policy.allowed_delta => Status::Drift,
        Some(_) => Status::Ok,
    }
}

/// Final status of a completed fan-out.
///
/// The master serial (if any) is counted first. Any failed server makes the
/// run a [`Status::ServerError`] regardless of drift.
#[must_use]
pub fn evaluate(
    master: Option<&MasterResult>,
    results: &[SerialResult],
    policy: &DriftPolicy,
) -> Status {
    let serials: Vec<u32> = master
        .map(|m| m.serial)
        .into_iter()
        .chain(results.iter().filter_map(SerialResult::serial))
        .collect();

    if serials.is_empty() || results.iter().any(|r| !r.is_ok()) {
        return Status::ServerError;
    }

    drift_status(&serials, policy)
}
