//! Reading recursive resolver addresses from resolv.conf.

use std::net::IpAddr;
use std::path::Path;

use checksoa_core::CheckError;
use resolv_conf::{Config, ScopedIp};
use tracing::debug;

/// System resolver configuration file
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Load the `nameserver` addresses from `path`, or the system file
pub fn load_resolvers(path: Option<&Path>) -> Result<Vec<IpAddr>, CheckError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_RESOLV_CONF));
    let contents = std::fs::read(path)
        .map_err(|e| CheckError::Resolver(format!("{}: {e}", path.display())))?;
    let resolvers = parse_resolvers(&contents)?;
    debug!(path = %path.display(), count = resolvers.len(), "loaded resolvers");
    Ok(resolvers)
}

/// Parse resolv.conf contents; at least one nameserver is required
pub fn parse_resolvers(contents: &[u8]) -> Result<Vec<IpAddr>, CheckError> {
    let config = Config::parse(contents).map_err(|e| CheckError::Resolver(e.to_string()))?;

    // Scope ids on link-local IPv6 servers are not kept.
    let resolvers: Vec<IpAddr> = config
        .nameservers
        .iter()
        .map(|ns| match ns {
            ScopedIp::V4(ip) => IpAddr::V4(*ip),
            ScopedIp::V6(ip, _) => IpAddr::V6(*ip),
        })
        .collect();

    if resolvers.is_empty() {
        return Err(CheckError::Resolver("no nameservers configured".into()));
    }
    Ok(resolvers)
}
