//! Frame traces and invocation receipts

use crate::types::{Address, FrameKind, Outcome};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Record of one finished frame
///
/// Frames are appended in completion order, so children precede their
/// parent; `depth` recovers the nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTrace {
    pub kind: FrameKind,
    pub depth: u32,
    pub caller: Address,
    /// Storage scope the frame ran against
    pub address: Address,
    /// Code that ran
    pub code_address: Address,
    pub value: u128,
    /// blake3 of the frame input
    pub input_hash: [u8; 32],
    pub input_len: usize,
    pub output_len: usize,
    pub success: bool,
    pub gas_used: u64,
}

impl FrameTrace {
    pub fn hash_input(input: &[u8]) -> [u8; 32] {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(blake3::hash(input).as_bytes());
        hash
    }
}

/// Result of a top-level invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub outcome: Outcome,
    pub gas_used: u64,
    pub frames: Vec<FrameTrace>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Frames of the given kind, in completion order
    pub fn frames_of(&self, kind: FrameKind) -> impl Iterator<Item = &FrameTrace> {
        self.frames.iter().filter(move |frame| frame.kind == kind)
    }

    /// The root frame is always the last to complete
    pub fn root_frame(&self) -> Option<&FrameTrace> {
        self.frames.last()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
