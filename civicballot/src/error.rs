use crate::*;

use thiserror::Error;

/// Caller-fixable input errors. Never worth retrying with the same input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("civicballot: election title is empty")]
    InvalidTitle,

    #[error("civicballot: at least 2 options required, got {0}")]
    InsufficientOptions(usize),

    #[error("civicballot: duplicate option name {0:?}")]
    DuplicateOption(String),

    #[error("civicballot: election duration must be positive")]
    InvalidDuration,

    #[error("civicballot: option index {index} out of range for {count} options")]
    InvalidOption { index: usize, count: usize },

    #[error("civicballot: invalid voter handle {0:?}")]
    InvalidHandle(String),
}

/// A correctly-rejected request given current system state. Retrying without
/// a state change is always wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("civicballot: no election with id {0}")]
    NoSuchElection(ElectionId),

    #[error("civicballot: identity has no registered voter handle")]
    NotEligible,

    #[error("civicballot: election {0} is closed to voting")]
    ElectionClosed(ElectionId),

    #[error("civicballot: identity already voted in election {0}")]
    AlreadyVoted(ElectionId),

    #[error("civicballot: election {0} is already closed")]
    AlreadyClosed(ElectionId),

    #[error("civicballot: requester may not close election {0}")]
    NotAuthorized(ElectionId),

    #[error("civicballot: identity already owns a voter handle")]
    AlreadyRegistered,
}

/// Failures inside the encrypt/tally/decrypt pipeline. The ledger's plaintext
/// tally stays authoritative when one of these surfaces.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("civicballot: ballot encryption failed")]
    EncryptionFailed,

    #[error("civicballot: ballot decryption failed")]
    DecryptionFailed,

    #[error("civicballot: decrypted tally disagrees with ledger tally for election {0}")]
    TallyMismatch(ElectionId),

    #[error("civicballot: CBOR error decoding pipeline payload: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("civicballot: JSON error decoding pipeline payload: {0}")]
    JSONDeserialization(#[from] serde_json::Error),
}

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl Error {
    /// Only pipeline failures are safe to retry; validation and state errors
    /// must be fixed or abandoned by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Pipeline(_))
    }
}
