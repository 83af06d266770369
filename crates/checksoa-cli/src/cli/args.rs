//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::Parser;

/// Check SOA serial consistency across the nameservers of a zone
///
/// Queries every advertised (and any additional) nameserver for the zone's
/// SOA serial and reports servers that failed or disagree.
///
/// Exit status: 0 consistent, 1 serial mismatch or drift exceeded,
/// 2 server issues, 3 master server error, 4 program invocation error.
#[derive(Parser, Debug, Clone)]
#[command(name = "check-soa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Zone to check
    pub zone: String,

    /// Use IPv4 transport only
    #[arg(short = '4')]
    pub ipv4: bool,

    /// Use IPv6 transport only
    #[arg(short = '6')]
    pub ipv6: bool,

    /// Print responses sorted by domain name and IP version
    #[arg(short, long)]
    pub sort: bool,

    /// Use TCP for queries (default: UDP with TCP on truncation)
    #[arg(short = 'c', long)]
    pub tcp: bool,

    /// Use an alternate resolv.conf file
    #[arg(long, value_name = "FILE")]
    pub resolv_conf: Option<PathBuf>,

    /// Master server name or address to compare serial numbers with
    #[arg(short, long, value_name = "NS")]
    pub master: Option<String>,

    /// Additional nameserver names or addresses to query
    #[arg(short, long, value_name = "NS1,NS2,..")]
    pub additional: Option<String>,

    /// Don't query the zone's advertised nameservers
    #[arg(short = 'n', long)]
    pub no_advertised: bool,

    /// Allowed SOA serial number drift
    #[arg(short, long, value_name = "N", default_value_t = 0)]
    pub drift: u32,

    /// Query timeout in seconds [default: 3]
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Number of UDP attempts per server [default: 3]
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,

    /// EDNS UDP payload size [default: 1400]
    #[arg(short, long, value_name = "BYTES", value_parser = clap::value_parser!(u16).range(512..))]
    pub bufsize: Option<u16>,

    /// Request and print the nameserver ID (NSID)
    #[arg(long)]
    pub nsid: bool,

    /// JSON output (always sorted)
    #[arg(short, long)]
    pub json: bool,

    /// Maximum simultaneous queries [default: 20]
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub parallel: Option<u32>,

    /// Destination port for every query [default: 53]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Set the AD (authentic data) bit
    #[arg(long)]
    pub ad: bool,

    /// Set the CD (checking disabled) bit
    #[arg(long)]
    pub cd: bool,

    /// Configuration file [default: platform config dir]
    #[arg(long, value_name = "FILE", env = "CHECK_SOA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log queries and retries to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
