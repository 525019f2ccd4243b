//! Per-frame execution context
//!
//! Immutable identity of a frame (who called, whose storage, whose code)
//! plus its mutable gas meter. Delegated frames keep the caller's identity,
//! value and storage scope and swap only the code address.

use crate::errors::ExecutionError;
use crate::types::{Address, Call, FrameKind};
use serde::{Deserialize, Serialize};

/// Execution environment state for one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Invoker identity as seen by the running code
    pub caller: Address,
    /// Storage scope the code reads and writes ("self")
    pub address: Address,
    /// Address whose code is running
    pub code_address: Address,
    /// Value attached to the call (moved only for ordinary calls)
    pub value: u128,
    pub kind: FrameKind,
    /// Gas allowance for this frame
    pub gas_limit: u64,
    /// Gas used so far
    pub gas_used: u64,
    /// Current call depth (0 = top-level invocation)
    pub call_depth: u32,
    pub max_call_depth: u32,
}

impl ExecutionContext {
    /// Context for the root frame of a top-level invocation
    ///
    /// `default_gas_limit` applies when the call carries no budget.
    pub fn new_root(call: &Call, default_gas_limit: u64, max_call_depth: u32) -> Self {
        Self {
            caller: call.from,
            address: call.to,
            code_address: call.to,
            value: call.value,
            kind: FrameKind::Call,
            gas_limit: call.gas_limit.unwrap_or(default_gas_limit),
            gas_used: 0,
            call_depth: 0,
            max_call_depth,
        }
    }

    /// Context for an ordinary call made by this frame
    ///
    /// The callee sees this frame's storage address as its caller.
    pub fn child_call(&self, to: Address, value: u128, gas_limit: u64) -> Result<Self, ExecutionError> {
        let depth = self.next_depth()?;
        Ok(Self {
            caller: self.address,
            address: to,
            code_address: to,
            value,
            kind: FrameKind::Call,
            gas_limit,
            gas_used: 0,
            call_depth: depth,
            max_call_depth: self.max_call_depth,
        })
    }

    /// Context for delegated execution of `code` inside this frame's scope
    pub fn child_delegate(&self, code: Address, gas_limit: u64) -> Result<Self, ExecutionError> {
        let depth = self.next_depth()?;
        Ok(Self {
            caller: self.caller,
            address: self.address,
            code_address: code,
            value: self.value,
            kind: FrameKind::DelegateCall,
            gas_limit,
            gas_used: 0,
            call_depth: depth,
            max_call_depth: self.max_call_depth,
        })
    }

    fn next_depth(&self) -> Result<u32, ExecutionError> {
        if self.call_depth >= self.max_call_depth {
            return Err(ExecutionError::CallDepthExceeded {
                depth: self.call_depth,
                max: self.max_call_depth,
            });
        }
        Ok(self.call_depth + 1)
    }

    /// Check if there's enough gas remaining
    pub fn check_gas(&self, required: u64) -> Result<(), ExecutionError> {
        if required > self.remaining_gas() {
            return Err(ExecutionError::OutOfGas {
                required,
                available: self.remaining_gas(),
            });
        }
        Ok(())
    }

    /// Consume gas
    pub fn consume_gas(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.check_gas(amount)?;
        self.gas_used += amount;
        Ok(())
    }

    pub fn remaining_gas(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_used)
    }

    /// Burn the whole allowance (out-of-gas halts forfeit everything)
    pub fn exhaust_gas(&mut self) {
        self.gas_used = self.gas_limit;
    }

    pub fn is_delegated(&self) -> bool {
        self.kind == FrameKind::DelegateCall
    }
}
