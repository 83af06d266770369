//! Core types and rules for checking SOA serial consistency across a zone's
//! nameservers.
//!
//! This crate holds everything that does not touch the network:
//!
//! - **Types**: query targets, per-server results, the run [`Status`]
//! - **Errors**: the failure taxonomy in [`QueryError`] and fatal [`CheckError`]s
//! - **Ordering**: DNS canonical name order and address-family order for reports
//! - **Consistency**: serial drift evaluation producing the final [`Status`]
//!
//! # Example
//!
//! ```rust
//! use checksoa_core::{consistency, DriftPolicy, Status};
//!
//! let policy = DriftPolicy::new(0);
//! assert_eq!(consistency::drift_status(&[7, 7, 7], &policy), Status::Ok);
//! assert_eq!(consistency::drift_status(&[7, 8], &policy), Status::Drift);
//! ```

#![doc(html_root_url = "https://docs.rs/checksoa-core/1.2.0")]

pub mod consistency;
mod error;
pub mod ordering;
pub mod types;

pub use error::{CheckError, FailureKind, QueryError, TransportError};
pub use types::*;

/// Result type alias for fatal check operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// Make a domain name fully qualified by appending the root label if missing.
///
/// The empty string becomes the root name `"."`.
#[must_use]
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
