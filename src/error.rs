//! Error types
//!
//! Everything here is local and synchronous; callers decide whether to retry.

use thiserror::Error;

/// Rejected `ScoringParams` update. The previous parameters stay in effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("malformed parameter string: {0:?}")]
    Malformed(String),

    #[error("unknown key {0:?}")]
    UnknownKey(String),

    #[error("duplicate key {0:?}")]
    DuplicateKey(String),

    #[error("{key}: expected {expected} values, found {found}")]
    Arity {
        key: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{key}: {value:?} is not an integer")]
    NotANumber { key: &'static str, value: String },

    #[error("{key}: {value} outside [{min}, {max}]")]
    OutOfRange {
        key: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{key}: breakpoints must be non-decreasing")]
    NotMonotonic { key: &'static str },
}

/// Misuse of a scorer by its caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("scorer {scorer} called with no candidates")]
    NoCandidates { scorer: String },

    #[error("no candidate scorer registered")]
    NoScorer,
}

/// Why `CandidateSet::add` refused a sighting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    #[error("invalid BSSID {0:?}")]
    InvalidBssid(String),

    #[error("scan {scan} does not match saved network {saved}")]
    IdentityMismatch { scan: String, saved: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanParseError {
    #[error("line {line}: expected 5 '|'-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum KnownNetworksError {
    #[error("cannot open known networks file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse known networks plist: {0}")]
    Plist(#[from] plist::Error),
}
