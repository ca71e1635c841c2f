//! Error taxonomy shared by the ledger store, the admission validator and the query surface.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every variant but [`Error::Corrupted`] and [`Error::Backend`] is a rejection: it aborts
/// the offending transaction (or query) and leaves the store untouched. The two remaining
/// variants mean the store can no longer be trusted and processing must halt.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("signature verification failure: {0}")]
    SignatureVerificationFailure(String),
    #[error("insufficient fee: {0}")]
    InsufficientFee(String),
    #[error("exited input: {0}")]
    ExitedInput(String),
    #[error("output spent: {0}")]
    OutputSpent(String),
    #[error("output does not exist: {0}")]
    OutputDNE(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("store corrupted: {0}")]
    Corrupted(String),
    #[error("storage backend: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Corrupted(_) | Error::Backend(_))
    }

    /// Stable numeric code, reported to clients alongside the message.
    pub fn code(&self) -> u32 {
        match self {
            Error::InsufficientFee(_) => 1,
            Error::ExitedInput(_) => 2,
            Error::SignatureVerificationFailure(_) => 3,
            Error::InvalidTransaction(_) => 4,
            Error::InvalidInput(_) => 6,
            Error::OutputDNE(_) => 101,
            Error::OutputSpent(_) => 102,
            Error::InvalidPath(_) => 103,
            Error::Serialization(_) => 104,
            Error::Corrupted(_) => 900,
            Error::Backend(_) => 901,
        }
    }
}
