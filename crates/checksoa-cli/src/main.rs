//! check-soa - SOA serial consistency checker
//!
//! Queries the nameservers of a zone for their SOA serial and reports
//! servers that fail or disagree.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    checksoa_cli::run().await
}
