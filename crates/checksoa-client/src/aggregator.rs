//! Collecting fan-out results by server name.

use std::collections::HashMap;

use checksoa_core::ordering::{sort_by_address, sort_names};
use checksoa_core::{MasterResult, SerialResult};
use tokio::sync::mpsc;
use tracing::warn;

/// Receives results as soon as they are known.
///
/// Used for immediate output; the aggregator still keeps every result.
pub trait ResultSink {
    /// The master's serial was obtained, before any fan-out result
    fn on_master(&mut self, _master: &MasterResult) {}

    /// One fan-out result arrived
    fn on_result(&mut self, result: &SerialResult);
}

/// A sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn on_result(&mut self, _result: &SerialResult) {}
}

/// Groups results by server name as they arrive.
///
/// Only the task draining the result channel touches the map.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    groups: HashMap<String, Vec<SerialResult>>,
    arrival: Vec<String>,
    received: usize,
}

impl ResultAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one result
    pub fn insert(&mut self, result: SerialResult) {
        self.received += 1;
        match self.groups.get_mut(&result.server_name) {
            Some(group) => group.push(result),
            None => {
                self.arrival.push(result.server_name.clone());
                self.groups.insert(result.server_name.clone(), vec![result]);
            }
        }
    }

    /// Drain `rx` until every producer is done, relaying each result to
    /// `relay` in arrival order when one is given
    pub async fn drain(
        &mut self,
        rx: &mut mpsc::Receiver<SerialResult>,
        mut relay: Option<&mut dyn ResultSink>,
    ) {
        while let Some(result) = rx.recv().await {
            if let Some(sink) = relay.as_deref_mut() {
                sink.on_result(&result);
            }
            self.insert(result);
        }
    }

    /// Warn when the number received differs from the number dispatched.
    ///
    /// Returns whether the counts matched.
    pub fn verify_count(&self, dispatched: usize) -> bool {
        if dispatched == self.received {
            return true;
        }
        warn!(dispatched, received = self.received, "result count mismatch");
        false
    }

    /// Number of results received
    #[must_use]
    pub const fn len(&self) -> usize {
        self.received
    }

    /// Returns true if nothing was received
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.received == 0
    }

    /// Results for one server, in arrival order
    #[must_use]
    pub fn group(&self, server_name: &str) -> Option<&[SerialResult]> {
        self.groups.get(server_name).map(Vec::as_slice)
    }

    /// Flatten into a list.
    ///
    /// With `sort`, servers are in canonical name order and each server's
    /// results IPv6 first then by address. Without it, servers appear in
    /// the order their first result arrived.
    #[must_use]
    pub fn into_results(mut self, sort: bool) -> Vec<SerialResult> {
        let mut names = std::mem::take(&mut self.arrival);
        if sort {
            sort_names(&mut names);
        }

        let mut results = Vec::with_capacity(self.received);
        for name in names {
            if let Some(mut group) = self.groups.remove(&name) {
                if sort {
                    sort_by_address(&mut group);
                }
                results.append(&mut group);
            }
        }
        results
    }
}
