//! Concurrent SOA serial fetching for a zone's authoritative nameservers.
//!
//! The pieces, leaf first:
//!
//! - [`QueryTransport`]: one DNS question over UDP with retries, TCP on truncation
//! - [`ServerResolver`]: NS discovery and A/AAAA lookups through recursive resolvers
//! - [`SerialFetcher`]: bounded-parallel fan-out of SOA queries
//! - [`ResultAggregator`]: fan-in grouped by server name
//! - [`SoaChecker`]: a whole run, ending in a [`Report`]
//!
//! # Example
//!
//! ```rust,no_run
//! use checksoa_client::{load_resolvers, CheckConfig, NullSink, SoaChecker};
//!
//! # async fn example() -> checksoa_client::Result<()> {
//! let config = CheckConfig::new("example.com", load_resolvers(None)?);
//! let report = SoaChecker::from_config(&config)
//!     .run(&config, &mut NullSink)
//!     .await?;
//! println!("{}: {}", report.zone, report.status);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/checksoa-client/1.2.0")]

mod aggregator;
mod check;
mod config;
mod fetcher;
pub mod message;
mod resolv;
mod resolver;
mod transport;

#[cfg(test)]
mod testing;

pub use aggregator::{NullSink, ResultAggregator, ResultSink};
pub use check::{Report, SoaChecker};
pub use config::*;
pub use fetcher::SerialFetcher;
pub use resolv::{load_resolvers, parse_resolvers, DEFAULT_RESOLV_CONF};
pub use resolver::ServerResolver;
pub use transport::{Exchange, QueryTransport};

pub use checksoa_core::{CheckError, Result};
