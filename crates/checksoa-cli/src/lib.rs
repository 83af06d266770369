//! # check-soa
//!
//! Checks that every nameserver of a DNS zone serves the same SOA serial.
//!
//! ## Features
//!
//! - **Bounded-parallel queries**: all advertised and additional servers, every address
//! - **Master comparison**: per-server delta against a reference server
//! - **Drift tolerance**: allow serials to lag by a configurable amount
//! - **Output**: streaming text, sorted text, or a single JSON document
//!
//! The process exit status is the run's [`Status`](checksoa_core::Status) code.

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
