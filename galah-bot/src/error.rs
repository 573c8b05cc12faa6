///! Error taxonomy for the identity and imagery pipeline
///!
///! - `Lookup<T>` separates "no match" from "transport fault" for identity lookups
///! - `TransferFailure` describes one failed HTTP exchange
///! - `PipelineError` holds the conditions that end a run
///! - `NormalizeError` marks lookup-table misses (configuration gaps)

use thiserror::Error;

/// Why a single HTTP exchange failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Server answered with an error status
    Status(u16),
    /// Connection, timeout or body-read failure
    Transport(String),
}

impl FailureReason {
    /// Whether a second attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureReason::Status(code) => *code >= 500,
            FailureReason::Transport(_) => true,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "HTTP status {}", code),
            FailureReason::Transport(msg) => write!(f, "transport fault: {}", msg),
        }
    }
}

/// A failed request against an external service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{url}: {reason}")]
pub struct TransferFailure {
    pub url: String,
    pub reason: FailureReason,
}

impl TransferFailure {
    pub fn status(url: impl Into<String>, code: u16) -> Self {
        Self {
            url: url.into(),
            reason: FailureReason::Status(code),
        }
    }

    pub fn transport(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: FailureReason::Transport(msg.into()),
        }
    }
}

/// Tagged outcome of a lookup that may legitimately find nothing
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    TransferFailed(TransferFailure),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::TransferFailed(failure) => Lookup::TransferFailed(failure),
        }
    }
}

/// Conditions that abort the whole run before anything is posted
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("coverage of {survey} could not be determined: {reason}")]
    CoverageUnknown {
        survey: String,
        reason: TransferFailure,
    },

    #[error("image download from {survey} failed: {reason}")]
    TransferFailed {
        survey: String,
        reason: TransferFailure,
    },

    #[error("no survey covers RA {ra:.5}, Dec {dec:+.5} with a usable image ({attempted} downloads attempted)")]
    Exhausted { ra: f64, dec: f64, attempted: usize },

    #[error("identity lookup unavailable: {reason}")]
    IdentityUnavailable { reason: TransferFailure },
}

/// A token missing from the normalization tables.
///
/// Control flow treats it like "not found"; it is reported separately so the
/// table can be extended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("unknown Greek letter abbreviation '{0}'")]
    UnknownGreekLetter(String),

    #[error("unknown constellation abbreviation '{0}'")]
    UnknownConstellation(String),

    #[error("malformed designation '{0}'")]
    MalformedDesignation(String),
}
