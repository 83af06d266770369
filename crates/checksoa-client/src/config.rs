//! Query and run configuration types.

use std::net::IpAddr;
use std::time::Duration;

use checksoa_core::{fqdn, CheckError, DriftPolicy};

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default number of UDP attempts
pub const DEFAULT_RETRIES: u32 = 3;

/// Default EDNS UDP payload size
pub const DEFAULT_BUFSIZE: u16 = 1400;

/// Smallest EDNS UDP payload size worth advertising
pub const MIN_BUFSIZE: u16 = 512;

/// Default number of simultaneous in-flight queries
pub const DEFAULT_PARALLEL: usize = 20;

/// Default DNS port
pub const DEFAULT_PORT: u16 = 53;

/// Per-query protocol options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Set the RD bit
    pub recursion_desired: bool,

    /// Set the AD bit
    pub authentic_data: bool,

    /// Set the CD bit
    pub checking_disabled: bool,

    /// Timeout for one attempt against one address
    pub timeout: Duration,

    /// Number of passes over the address list for UDP
    pub retries: u32,

    /// Skip UDP and query over TCP only
    pub tcp: bool,

    /// Advertised EDNS UDP payload size
    pub bufsize: u16,

    /// Request the NSID option
    pub nsid: bool,

    /// Destination port
    pub port: u16,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryOptions {
    /// Create options with the defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            recursion_desired: false,
            authentic_data: false,
            checking_disabled: false,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            tcp: false,
            bufsize: DEFAULT_BUFSIZE,
            nsid: false,
            port: DEFAULT_PORT,
        }
    }

    /// Set the RD bit
    #[must_use]
    pub const fn recursion_desired(mut self, rd: bool) -> Self {
        self.recursion_desired = rd;
        self
    }

    /// Set the AD bit
    #[must_use]
    pub const fn authentic_data(mut self, ad: bool) -> Self {
        self.authentic_data = ad;
        self
    }

    /// Set the CD bit
    #[must_use]
    pub const fn checking_disabled(mut self, cd: bool) -> Self {
        self.checking_disabled = cd;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of UDP attempts
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Query over TCP only
    #[must_use]
    pub const fn tcp(mut self, tcp: bool) -> Self {
        self.tcp = tcp;
        self
    }

    /// Set the EDNS UDP payload size
    #[must_use]
    pub const fn bufsize(mut self, bufsize: u16) -> Self {
        self.bufsize = bufsize;
        self
    }

    /// Request NSID
    #[must_use]
    pub const fn nsid(mut self, nsid: bool) -> Self {
        self.nsid = nsid;
        self
    }

    /// Set the destination port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Which address families to query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4 and IPv6
    #[default]
    Any,
    /// IPv4 only
    V4Only,
    /// IPv6 only
    V6Only,
}

impl AddressFamily {
    /// Build from the two restriction flags; both at once is invalid
    pub fn from_flags(v4_only: bool, v6_only: bool) -> Result<Self, CheckError> {
        match (v4_only, v6_only) {
            (true, true) => Err(CheckError::Invocation(
                "Cannot specify both -4 and -6.".into(),
            )),
            (true, false) => Ok(Self::V4Only),
            (false, true) => Ok(Self::V6Only),
            (false, false) => Ok(Self::Any),
        }
    }

    /// Whether AAAA lookups should be made
    #[must_use]
    pub const fn wants_v6(self) -> bool {
        !matches!(self, Self::V4Only)
    }

    /// Whether A lookups should be made
    #[must_use]
    pub const fn wants_v4(self) -> bool {
        !matches!(self, Self::V6Only)
    }
}

/// The reference server to compare serials against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterSpec {
    /// Literal address
    Address(IpAddr),
    /// Host name to resolve (fully qualified)
    Name(String),
}

impl MasterSpec {
    /// Interpret a user-supplied string as an address or a host name
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value
            .parse::<IpAddr>()
            .map_or_else(|_| Self::Name(fqdn(value)), Self::Address)
    }
}

/// Everything one check run needs
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Zone to check (fully qualified)
    pub zone: String,

    /// Optional master to compare against
    pub master: Option<MasterSpec>,

    /// Extra server names or addresses to query
    pub additional: Vec<String>,

    /// Don't query the zone's advertised NS set
    pub skip_advertised: bool,

    /// Address family restriction
    pub family: AddressFamily,

    /// Maximum in-flight SOA queries
    pub parallel: usize,

    /// Allowed serial drift
    pub drift: DriftPolicy,

    /// Buffer and order the results instead of streaming them
    pub sort: bool,

    /// Query options for SOA queries
    pub query: QueryOptions,

    /// Recursive resolvers used for NS and address lookups
    pub resolvers: Vec<IpAddr>,
}

impl CheckConfig {
    /// Create a configuration for a zone with defaults for everything else
    #[must_use]
    pub fn new(zone: &str, resolvers: Vec<IpAddr>) -> Self {
        Self {
            zone: fqdn(zone),
            master: None,
            additional: Vec::new(),
            skip_advertised: false,
            family: AddressFamily::Any,
            parallel: DEFAULT_PARALLEL,
            drift: DriftPolicy::default(),
            sort: false,
            query: QueryOptions::new(),
            resolvers,
        }
    }

    /// Set additional servers from a comma-separated list
    #[must_use]
    pub fn additional_list(mut self, list: &str) -> Self {
        self.additional = split_server_list(list);
        self
    }

    /// Reject settings that cannot produce a run
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.skip_advertised && self.additional.is_empty() {
            return Err(CheckError::Invocation(
                "no nameservers to query: -n requires -a".into(),
            ));
        }
        if self.parallel == 0 {
            return Err(CheckError::Invocation(
                "parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated server list, dropping empty entries
#[must_use]
pub fn split_server_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
