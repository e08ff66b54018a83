use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Why a rewrite oracle call produced no usable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Oracle API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Unreadable response: {0}")]
    Parse(String),

    #[error("Oracle returned no text")]
    EmptyOutput,

    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle call cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            OracleError::Parse(e.to_string())
        } else {
            OracleError::Transport(e.to_string())
        }
    }
}

/// Typed outcome of a refinement round that did not commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefineError {
    #[error(transparent)]
    InvalidInput(#[from] AnalyzeError),

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(#[source] OracleError),

    #[error("A round is already in progress")]
    RoundInProgress,

    #[error("No round is in flight")]
    NoRoundInFlight,

    #[error("No version {0} in history")]
    UnknownVersion(u32),
}

impl From<OracleError> for RefineError {
    fn from(e: OracleError) -> Self {
        RefineError::OracleUnavailable(e)
    }
}
