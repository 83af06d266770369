use std::net::IpAddr;

use thiserror::Error;

use crate::types::Status;

/// Network-level failures while exchanging a single DNS message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the per-attempt timeout
    #[error("i/o timeout")]
    Timeout,

    /// Socket or connection error other than a timeout
    #[error("{0}")]
    Io(String),

    /// The response could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The query could not be encoded
    #[error("failed to encode query: {0}")]
    Encode(String),

    /// Called with an empty address list
    #[error("no addresses to query")]
    NoAddresses,
}

impl TransportError {
    /// Returns true for errors that are worth another attempt
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout,
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Why a single query (or a lookup feeding it) failed.
///
/// Per-target failures are captured in a [`SerialResult`](crate::SerialResult)
/// and never abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// NS lookup for the zone failed
    #[error("{zone}: {reason}")]
    NameResolution {
        /// Zone whose NS set was requested
        zone: String,
        /// Cause reported by the lookup
        reason: String,
    },

    /// A/AAAA lookup for a server name failed or found nothing
    #[error("couldn't resolve {name}: {reason}")]
    AddressResolution {
        /// Server name that was looked up
        name: String,
        /// Cause reported by the lookup
        reason: String,
    },

    /// No usable response from the server
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered NXDOMAIN for the zone
    #[error("NXDOMAIN: {0}: name doesn't exist")]
    NxDomain(String),

    /// The server answered with another non-success response code
    #[error("response code: {0}")]
    ResponseCode(String),

    /// Success response without an SOA record in the answer section
    #[error("SOA record not found at {0}")]
    MissingRecord(IpAddr),
}

/// Coarse classification of a [`QueryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Zone NS lookup
    NameResolution,
    /// Server A/AAAA lookup
    AddressResolution,
    /// Timeout or connection error
    Transport,
    /// Non-success response code
    Protocol,
    /// SOA record absent from a success response
    MissingRecord,
}

impl QueryError {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NameResolution { .. } => FailureKind::NameResolution,
            Self::AddressResolution { .. } => FailureKind::AddressResolution,
            Self::Transport(_) => FailureKind::Transport,
            Self::NxDomain(_) | Self::ResponseCode(_) => FailureKind::Protocol,
            Self::MissingRecord(_) => FailureKind::MissingRecord,
        }
    }
}

/// Fatal errors that end a run before (or instead of) the fan-out
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The zone's NS set could not be obtained
    #[error("{0}")]
    Zone(QueryError),

    /// The system resolver configuration could not be loaded
    #[error("Error getting resolver: {0}")]
    Resolver(String),

    /// The master name did not resolve to any address
    #[error("couldn't resolve master name: {0}")]
    MasterUnresolved(String),

    /// The master did not return a serial
    #[error("{name} {address}: couldn't obtain serial: {source}")]
    Master {
        /// Master name as given (or its address)
        name: String,
        /// Address that was queried
        address: IpAddr,
        /// Underlying failure
        source: QueryError,
    },

    /// No serial was obtained from any server
    #[error("no SOA serials obtained")]
    NoSerials,

    /// Invalid combination of settings
    #[error("{0}")]
    Invocation(String),
}

impl CheckError {
    /// Status the run terminates with for this error
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            // A zone without a usable NS set exits with status 1.
            Self::Zone(_) => Status::Drift,
            Self::Resolver(_) | Self::NoSerials => Status::ServerError,
            Self::MasterUnresolved(_) | Self::Master { .. } => Status::MasterError,
            Self::Invocation(_) => Status::InvocationError,
        }
    }
}
