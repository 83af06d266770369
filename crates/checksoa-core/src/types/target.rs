use std::net::IpAddr;

use crate::error::QueryError;

/// One (server name, address) pair to query for the zone's SOA serial.
///
/// A server name whose addresses could not be resolved still yields a
/// target, carrying the resolution failure, so that it is reported instead
/// of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    server_name: String,
    address: Result<IpAddr, QueryError>,
}

impl QueryTarget {
    /// Create a target for a resolved address
    #[must_use]
    pub fn new(server_name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            server_name: server_name.into(),
            address: Ok(address),
        }
    }

    /// Create a target for a server name that has no usable address
    #[must_use]
    pub fn unresolved(server_name: impl Into<String>, error: QueryError) -> Self {
        Self {
            server_name: server_name.into(),
            address: Err(error),
        }
    }

    /// Name of the server
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Address to query, if one was resolved
    #[must_use]
    pub fn address(&self) -> Option<IpAddr> {
        self.address.as_ref().ok().copied()
    }

    /// Consume the target into its parts
    #[must_use]
    pub fn into_parts(self) -> (String, Result<IpAddr, QueryError>) {
        (self.server_name, self.address)
    }
}

/// A server name together with the outcome of resolving its addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddresses {
    /// Fully-qualified server name, or a literal address
    pub name: String,
    /// Deduplicated addresses, or the reason there are none
    pub addresses: Result<Vec<IpAddr>, QueryError>,
}

impl ServerAddresses {
    /// Expand into one query target per address, or a single unresolved
    /// target when resolution failed
    #[must_use]
    pub fn into_targets(self) -> Vec<QueryTarget> {
        match self.addresses {
            Ok(addresses) => addresses
                .into_iter()
                .map(|ip| QueryTarget::new(self.name.clone(), ip))
                .collect(),
            Err(err) => vec![QueryTarget::unresolved(self.name, err)],
        }
    }
}
