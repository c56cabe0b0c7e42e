//! # Error Types — Ledger Rejection Taxonomy
//!
//! Defines the error types used throughout the ledger. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every rejection carries a kind and a human-readable reason.
//! - [`ErrorKind`] is a flat, `Copy` discriminant with a stable string code
//!   so that a facade can map each kind to a distinct caller-visible error
//!   without parsing messages.
//! - None of these are fatal to the engine. A rejected operation leaves the
//!   committed state untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rejected ledger operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Empty required string, non-positive quantity or price.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The principal is already registered and active.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// Role or ownership mismatch.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The participant exists but has been deactivated.
    #[error("inactive participant: {0}")]
    InactiveParticipant(String),

    /// The proposed new owner of a batch is not an active participant.
    #[error("inactive owner: {0}")]
    InactiveOwner(String),

    /// Unknown principal, product or transaction.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unknown or zero batch id.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// The external code already resolves to a batch.
    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    /// The requested stage does not strictly follow the current one.
    #[error("non-monotonic stage: {from} -> {to}")]
    NonMonotonicStage {
        /// Current stage name.
        from: String,
        /// Requested stage name.
        to: String,
    },

    /// Provenance index past the end of the log.
    #[error("index {index} out of range for log of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of records in the log.
        len: usize,
    },

    /// The caller is not the buyer named on the transaction.
    #[error("caller {caller} is not the buyer of transaction {transaction}")]
    NotBuyer {
        /// The caller.
        caller: String,
        /// The transaction identifier.
        transaction: String,
    },

    /// The transaction has already been settled.
    #[error("transaction {0} already completed")]
    AlreadyCompleted(String),

    /// The attached payment does not cover the agreed price.
    #[error("insufficient payment: offered {offered}, price {price}")]
    InsufficientPayment {
        /// Amount attached to the completion call.
        offered: u64,
        /// Agreed price.
        price: u64,
    },

    /// A value transfer could not be performed.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// The engine could not seal a committed write into the journal.
    #[error("integrity error: {0}")]
    Integrity(String),
}

impl LedgerError {
    /// The flat kind of this rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InactiveParticipant(_) => ErrorKind::InactiveParticipant,
            Self::InactiveOwner(_) => ErrorKind::InactiveOwner,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidBatch(_) => ErrorKind::InvalidBatch,
            Self::DuplicateCode(_) => ErrorKind::DuplicateCode,
            Self::NonMonotonicStage { .. } => ErrorKind::NonMonotonicStage,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::NotBuyer { .. } => ErrorKind::NotBuyer,
            Self::AlreadyCompleted(_) => ErrorKind::AlreadyCompleted,
            Self::InsufficientPayment { .. } => ErrorKind::InsufficientPayment,
            Self::TransferFailed(_) => ErrorKind::TransferFailed,
            Self::Integrity(_) => ErrorKind::Integrity,
        }
    }
}

/// Discriminant of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    AlreadyRegistered,
    Unauthorized,
    InactiveParticipant,
    InactiveOwner,
    NotFound,
    InvalidBatch,
    DuplicateCode,
    NonMonotonicStage,
    IndexOutOfRange,
    NotBuyer,
    AlreadyCompleted,
    InsufficientPayment,
    TransferFailed,
    Integrity,
}

impl ErrorKind {
    /// Stable wire code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InactiveParticipant => "INACTIVE_PARTICIPANT",
            Self::InactiveOwner => "INACTIVE_OWNER",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidBatch => "INVALID_BATCH",
            Self::DuplicateCode => "DUPLICATE_CODE",
            Self::NonMonotonicStage => "NON_MONOTONIC_STAGE",
            Self::IndexOutOfRange => "INDEX_OUT_OF_RANGE",
            Self::NotBuyer => "NOT_BUYER",
            Self::AlreadyCompleted => "ALREADY_COMPLETED",
            Self::InsufficientPayment => "INSUFFICIENT_PAYMENT",
            Self::TransferFailed => "TRANSFER_FAILED",
            Self::Integrity => "INTEGRITY",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Measurements are scaled integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
