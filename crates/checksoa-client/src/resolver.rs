//! Turning a zone's name servers into concrete addresses to query.

use std::net::IpAddr;
use std::sync::Arc;

use checksoa_core::{fqdn, QueryError, ServerAddresses};
use futures_util::future::join_all;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use tracing::debug;

use crate::config::{AddressFamily, QueryOptions};
use crate::message::{addresses, build_query, ns_names, parse_name};
use crate::transport::Exchange;

/// Looks up NS and address records through the configured recursive resolvers
#[derive(Clone)]
pub struct ServerResolver {
    exchange: Arc<dyn Exchange>,
    resolvers: Vec<IpAddr>,
    options: QueryOptions,
}

impl ServerResolver {
    /// Create a resolver sending recursive queries to `resolvers`
    #[must_use]
    pub fn new(exchange: Arc<dyn Exchange>, resolvers: Vec<IpAddr>, options: QueryOptions) -> Self {
        Self {
            exchange,
            resolvers,
            options: options.recursion_desired(true),
        }
    }

    /// Ordered list of servers with their addresses.
    ///
    /// `additional` servers are merged with the zone's advertised NS set
    /// (unless `skip_advertised`), deduplicated and sorted by name before
    /// their addresses are looked up. Literal addresses are used as given.
    /// Failing to obtain the NS set fails the whole call; failing to resolve
    /// one server is recorded in its entry.
    pub async fn resolve(
        &self,
        zone: &str,
        additional: &[String],
        skip_advertised: bool,
        family: AddressFamily,
    ) -> Result<Vec<ServerAddresses>, QueryError> {
        let mut names: Vec<String> = additional
            .iter()
            .map(|server| {
                if server.parse::<IpAddr>().is_ok() {
                    server.clone()
                } else {
                    fqdn(server)
                }
            })
            .collect();

        if !skip_advertised {
            names.extend(self.ns_names(zone).await?);
        }

        names.sort();
        names.dedup();

        let lookups = join_all(names.iter().map(|name| self.addresses(name, family))).await;

        Ok(names
            .into_iter()
            .zip(lookups)
            .map(|(name, addresses)| ServerAddresses { name, addresses })
            .collect())
    }

    /// Names in the zone's NS set
    pub async fn ns_names(&self, zone: &str) -> Result<Vec<String>, QueryError> {
        let fail = |reason: String| QueryError::NameResolution {
            zone: zone.to_string(),
            reason,
        };

        let qname = parse_name(zone).map_err(|e| fail(e.to_string()))?;
        let query = build_query(&qname, RecordType::NS, &self.options);
        let response = self
            .exchange
            .exchange(&query, &self.resolvers)
            .await
            .map_err(|e| fail(e.to_string()))?;

        match response.response_code() {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => return Err(fail("doesn't exist".into())),
            code => return Err(fail(format!("response code: {code}"))),
        }

        let names = ns_names(&response);
        if names.is_empty() {
            return Err(fail("no nameserver records found".into()));
        }
        debug!(zone, count = names.len(), "found advertised nameservers");
        Ok(names)
    }

    /// Deduplicated addresses of a server, AAAA before A.
    ///
    /// A literal address is returned unchanged without any lookup.
    pub async fn addresses(&self, name: &str, family: AddressFamily) -> Result<Vec<IpAddr>, QueryError> {
        if let Ok(ip) = name.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let mut found = Vec::new();
        let mut first_error = None;

        let wanted = [
            (family.wants_v6(), RecordType::AAAA),
            (family.wants_v4(), RecordType::A),
        ];
        for (_, qtype) in wanted.into_iter().filter(|(wanted, _)| *wanted) {
            match self.lookup(name, qtype).await {
                Ok(ips) => found.extend(ips),
                Err(err) => {
                    debug!(name, %qtype, error = %err, "address lookup failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        found.retain(|ip| seen.insert(*ip));

        if found.is_empty() {
            return Err(first_error.unwrap_or_else(|| QueryError::AddressResolution {
                name: name.to_string(),
                reason: "no addresses found".into(),
            }));
        }
        Ok(found)
    }

    /// First address of the master: IPv6 preferred, then IPv4
    pub async fn master_address(&self, name: &str, family: AddressFamily) -> Option<IpAddr> {
        let wanted = [
            (family.wants_v6(), RecordType::AAAA),
            (family.wants_v4(), RecordType::A),
        ];
        for (_, qtype) in wanted.into_iter().filter(|(wanted, _)| *wanted) {
            if let Some(ip) = self.lookup(name, qtype).await.ok().and_then(|ips| ips.first().copied()) {
                return Some(ip);
            }
        }
        None
    }

    /// A or AAAA records for `name`
    pub async fn lookup(&self, name: &str, qtype: RecordType) -> Result<Vec<IpAddr>, QueryError> {
        let fail = |reason: String| QueryError::AddressResolution {
            name: name.to_string(),
            reason,
        };

        let qname = parse_name(name).map_err(|e| fail(e.to_string()))?;
        let query = build_query(&qname, qtype, &self.options);
        let response = self
            .exchange
            .exchange(&query, &self.resolvers)
            .await
            .map_err(|e| fail(e.to_string()))?;

        match response.response_code() {
            ResponseCode::NoError => Ok(addresses(&response, qtype)),
            code => Err(fail(format!("response code: {code}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExchange;
    use hickory_proto::op::ResponseCode;

    const RESOLVER: &str = "198.51.100.53";

    fn resolver(mock: MockExchange) -> ServerResolver {
        ServerResolver::new(
            Arc::new(mock),
            vec![RESOLVER.parse().unwrap()],
            QueryOptions::default(),
        )
    }

    fn mock() -> MockExchange {
        MockExchange::new()
            .ns("example.com.", &["ns2.example.com.", "ns1.example.com."])
            .a("ns1.example.com.", &["192.0.2.1"])
            .aaaa("ns1.example.com.", &["2001:db8::1", "2001:db8::1"])
            .a("ns2.example.com.", &["192.0.2.2"])
    }

    #[tokio::test]
    async fn resolves_sorted_servers() {
        let servers = resolver(mock())
            .resolve("example.com.", &[], false, AddressFamily::Any)
            .await
            .unwrap();

        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "ns1.example.com.");
        assert_eq!(
            servers[0].addresses.as_ref().unwrap(),
            &["2001:db8::1".parse::<IpAddr>().unwrap(), "192.0.2.1".parse().unwrap()]
        );
        assert_eq!(servers[1].name, "ns2.example.com.");
    }

    #[tokio::test]
    async fn family_restriction_skips_lookups() {
        let v4 = resolver(mock())
            .addresses("ns1.example.com.", AddressFamily::V4Only)
            .await
            .unwrap();
        assert_eq!(v4, ["192.0.2.1".parse::<IpAddr>().unwrap()]);

        let v6 = resolver(mock())
            .addresses("ns1.example.com.", AddressFamily::V6Only)
            .await
            .unwrap();
        assert_eq!(v6, ["2001:db8::1".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn additional_servers_merge_and_pass_literals() {
        let servers = resolver(mock())
            .resolve(
                "example.com.",
                &["192.0.2.99".into(), "ns1.example.com".into()],
                false,
                AddressFamily::Any,
            )
            .await
            .unwrap();

        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["192.0.2.99", "ns1.example.com.", "ns2.example.com."]);
        assert_eq!(
            servers[0].addresses.as_ref().unwrap(),
            &["192.0.2.99".parse::<IpAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn skip_advertised_uses_only_additional() {
        let servers = resolver(MockExchange::new().a("ns.other.net.", &["203.0.113.5"]))
            .resolve("example.com.", &["ns.other.net".into()], true, AddressFamily::Any)
            .await
            .unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "ns.other.net.");
    }

    #[tokio::test]
    async fn unresolvable_server_is_kept_with_error() {
        let servers = resolver(mock().ns("example.com.", &["ns1.example.com.", "ghost.example.com."]))
            .resolve("example.com.", &[], false, AddressFamily::Any)
            .await
            .unwrap();

        let ghost = servers.iter().find(|s| s.name == "ghost.example.com.").unwrap();
        let err = ghost.addresses.as_ref().unwrap_err();
        assert!(matches!(err, QueryError::AddressResolution { .. }));
    }

    #[tokio::test]
    async fn missing_zone_is_fatal() {
        let err = resolver(MockExchange::new().rcode("nope.example.", RecordType::NS, ResponseCode::NXDomain))
            .resolve("nope.example.", &[], false, AddressFamily::Any)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope.example.: doesn't exist");

        let err = resolver(MockExchange::new().rcode("bad.example.", RecordType::NS, ResponseCode::ServFail))
            .ns_names("bad.example.")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("response code"));
    }

    #[tokio::test]
    async fn empty_ns_set_is_fatal() {
        let err = resolver(MockExchange::new().ns("empty.example.", &[]))
            .ns_names("empty.example.")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NameResolution { .. }));
    }

    #[tokio::test]
    async fn master_prefers_ipv6() {
        let r = resolver(mock());
        assert_eq!(
            r.master_address("ns1.example.com.", AddressFamily::Any).await,
            Some("2001:db8::1".parse().unwrap())
        );
        assert_eq!(
            r.master_address("ns1.example.com.", AddressFamily::V4Only).await,
            Some("192.0.2.1".parse().unwrap())
        );
        assert_eq!(r.master_address("ghost.example.com.", AddressFamily::Any).await, None);
    }
}
