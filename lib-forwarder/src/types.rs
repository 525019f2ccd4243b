//! Core value types: addresses, inbound calls and outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte account / contract identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// The zero address. Never carries code.
    pub const ZERO: Address = Address([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a human-readable label
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(hash.as_bytes());
        Self(bytes)
    }

    /// Parse an address from exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A top-level inbound invocation
///
/// The payload is opaque: no selector, no argument encoding, no size bounds.
/// A `Call` is immutable once handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Invoker identity
    pub from: Address,
    /// Contract receiving the call
    pub to: Address,
    /// Raw call data of arbitrary length (may be empty)
    pub payload: Vec<u8>,
    /// Value transferred from `from` to `to` before execution
    pub value: u128,
    /// Execution budget for the whole invocation; `None` takes the host's
    /// configured default
    pub gas_limit: Option<u64>,
}

impl Call {
    pub fn new(from: Address, to: Address, payload: Vec<u8>) -> Self {
        Self {
            from,
            to,
            payload,
            value: 0,
            gas_limit: None,
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Result of one execution frame
///
/// Exactly two kinds, both carrying an uninterpreted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success(Vec<u8>),
    Failure(Vec<u8>),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Borrow the payload regardless of status
    pub fn payload(&self) -> &[u8] {
        match self {
            Outcome::Success(payload) | Outcome::Failure(payload) => payload,
        }
    }

    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Outcome::Success(payload) | Outcome::Failure(payload) => payload,
        }
    }

    pub fn into_result(self) -> Result<Vec<u8>, Vec<u8>> {
        match self {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Failure(payload) => Err(payload),
        }
    }
}

/// How a frame was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    /// Ordinary call: code and storage scope both belong to the callee
    Call,
    /// Delegated execution: foreign code, caller's storage scope
    DelegateCall,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Call => write!(f, "Call"),
            FrameKind::DelegateCall => write!(f, "DelegateCall"),
        }
    }
}
