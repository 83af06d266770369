use serde::{Serialize, Serializer};
use std::fmt;

/// Terminal outcome of a run, also used as the process exit status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Status {
    /// All serials within the allowed drift
    #[default]
    Ok = 0,
    /// Serial spread exceeds the allowed drift
    Drift = 1,
    /// At least one server query failed
    ServerError = 2,
    /// The master could not be resolved or queried
    MasterError = 3,
    /// Invalid invocation
    InvocationError = 4,
}

impl Status {
    /// Numeric status code
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable description; empty for [`Status::Ok`]
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "",
            Self::Drift => "serial mismatch or exceeds drift",
            Self::ServerError => "server issues",
            Self::MasterError => "master server error",
            Self::InvocationError => "program invocation error",
        }
    }

    /// Returns true for [`Status::Ok`]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "ok")
        } else {
            f.write_str(self.description())
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// How far apart serials may be before the zone counts as inconsistent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftPolicy {
    /// Largest allowed `max(serial) - min(serial)`
    pub allowed_delta: u32,
}

impl DriftPolicy {
    /// Create a policy allowing the given spread
    #[must_use]
    pub const fn new(allowed_delta: u32) -> Self {
        Self { allowed_delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_exit_statuses() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::Drift.code(), 1);
        assert_eq!(Status::ServerError.code(), 2);
        assert_eq!(Status::MasterError.code(), 3);
        assert_eq!(Status::InvocationError.code(), 4);
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Status::ServerError).unwrap(), "2");
    }
}
