//! Error types for storage and frame execution
//!
//! `ExecutionError` is internal to the host: it decides whether a frame
//! commits or reverts. Invokers never see it directly, only the `Outcome`
//! payload produced by [`ExecutionError::failure_payload`].

use thiserror::Error;

/// Storage layer result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corrupt value under key {key}: {reason}")]
    CorruptValue { key: String, reason: String },

    #[error("Checkpoint {checkpoint} is beyond journal length {len}")]
    InvalidCheckpoint { checkpoint: usize, len: usize },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// Why a frame stopped without succeeding
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Contract-signalled failure with an opaque payload
    #[error("Execution reverted ({} bytes)", .0.len())]
    Revert(Vec<u8>),

    #[error("Out of gas: required {required}, available {available}")]
    OutOfGas { required: u64, available: u64 },

    #[error("Call depth limit exceeded: {depth} >= {max}")]
    CallDepthExceeded { depth: u32, max: u32 },

    #[error("No code deployed at {0}")]
    NoCode(crate::types::Address),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("Balance overflow crediting {0}")]
    BalanceOverflow(crate::types::Address),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ExecutionError {
    /// Payload replayed to the invoker when this error ends a frame
    ///
    /// Only `Revert` carries data. Exceptional halts produce an empty payload.
    pub fn failure_payload(self) -> Vec<u8> {
        match self {
            ExecutionError::Revert(payload) => payload,
            _ => Vec::new(),
        }
    }

    pub fn is_out_of_gas(&self) -> bool {
        matches!(self, ExecutionError::OutOfGas { .. })
    }
}
