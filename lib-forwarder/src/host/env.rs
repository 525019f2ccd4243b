//! The capability handed to running contract code
//!
//! `CallEnv` is the only way code reaches state. Storage access is always
//! scoped to the frame's `address`, which for delegated frames is the
//! caller's scope, never the code's own.

use super::FrameHost;
use crate::context::ExecutionContext;
use crate::errors::ExecutionError;
use crate::types::{Address, Outcome};
use tracing::debug;

/// Status and data returned by a sub-call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutput {
    pub outcome: Outcome,
    pub gas_used: u64,
}

impl CallOutput {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Execution environment of one running frame
pub struct CallEnv<'h> {
    host: &'h mut dyn FrameHost,
    ctx: &'h mut ExecutionContext,
    input: Vec<u8>,
}

impl<'h> CallEnv<'h> {
    pub(crate) fn new(host: &'h mut dyn FrameHost, ctx: &'h mut ExecutionContext, input: Vec<u8>) -> Self {
        Self { host, ctx, input }
    }

    // =========================================================================
    // Frame identity
    // =========================================================================

    /// Call data exactly as received
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Invoker identity (preserved across delegated execution)
    pub fn caller(&self) -> Address {
        self.ctx.caller
    }

    pub fn value(&self) -> u128 {
        self.ctx.value
    }

    /// Storage scope of this frame
    pub fn address(&self) -> Address {
        self.ctx.address
    }

    pub fn code_address(&self) -> Address {
        self.ctx.code_address
    }

    pub fn depth(&self) -> u32 {
        self.ctx.call_depth
    }

    // =========================================================================
    // Gas
    // =========================================================================

    pub fn gas_remaining(&self) -> u64 {
        self.ctx.remaining_gas()
    }

    pub fn consume_gas(&mut self, amount: u64) -> Result<(), ExecutionError> {
        self.ctx.consume_gas(amount)
    }

    /// Charge for copying `len` bytes of call or return data
    pub fn charge_copy(&mut self, len: usize) -> Result<(), ExecutionError> {
        let cost = self.host.gas_schedule().copy_cost(len);
        self.ctx.consume_gas(cost)
    }

    // =========================================================================
    // Storage (scoped to `address`)
    // =========================================================================

    pub fn storage_read(&mut self, slot: &[u8]) -> Result<Option<Vec<u8>>, ExecutionError> {
        let cost = self.host.gas_schedule().storage_read;
        self.ctx.consume_gas(cost)?;
        Ok(self.host.read_slot(&self.ctx.address, slot)?)
    }

    pub fn storage_write(&mut self, slot: &[u8], value: &[u8]) -> Result<(), ExecutionError> {
        let cost = self.host.gas_schedule().storage_write;
        self.ctx.consume_gas(cost)?;
        Ok(self.host.write_slot(&self.ctx.address, slot, value)?)
    }

    pub fn storage_delete(&mut self, slot: &[u8]) -> Result<(), ExecutionError> {
        let cost = self.host.gas_schedule().storage_write;
        self.ctx.consume_gas(cost)?;
        Ok(self.host.delete_slot(&self.ctx.address, slot)?)
    }

    pub fn balance_of(&mut self, address: &Address) -> Result<u128, ExecutionError> {
        let cost = self.host.gas_schedule().storage_read;
        self.ctx.consume_gas(cost)?;
        Ok(self.host.balance_of(address)?)
    }

    // =========================================================================
    // Sub-calls
    // =========================================================================

    /// Ordinary call: `to`'s code against `to`'s storage
    ///
    /// A failing callee does not fail this frame; inspect the outcome.
    /// Only host faults come back as `Err`.
    pub fn call(&mut self, to: Address, input: Vec<u8>, value: u128) -> Result<CallOutput, ExecutionError> {
        let gas_limit = self.ctx.remaining_gas();
        let child = match self.ctx.child_call(to, value, gas_limit) {
            Ok(child) => child,
            Err(e) => return Ok(Self::refused(e)),
        };
        self.run_child(child, input)
    }

    /// Delegated execution: `code`'s logic against this frame's storage,
    /// with this frame's caller and value
    pub fn delegate_call(&mut self, code: Address, input: Vec<u8>) -> Result<CallOutput, ExecutionError> {
        let gas_limit = self.ctx.remaining_gas();
        let child = match self.ctx.child_delegate(code, gas_limit) {
            Ok(child) => child,
            Err(e) => return Ok(Self::refused(e)),
        };
        self.run_child(child, input)
    }

    fn run_child(&mut self, child: ExecutionContext, input: Vec<u8>) -> Result<CallOutput, ExecutionError> {
        debug!(
            "{} depth={} code={} scope={} input_len={} gas={}",
            child.kind,
            child.call_depth,
            child.code_address,
            child.address,
            input.len(),
            child.gas_limit
        );
        let output = self.host.execute_frame(child, input)?;
        self.ctx.gas_used = self
            .ctx
            .gas_used
            .saturating_add(output.gas_used)
            .min(self.ctx.gas_limit);
        Ok(output)
    }

    /// A sub-call that never started (depth limit)
    fn refused(err: ExecutionError) -> CallOutput {
        debug!("sub-call refused: {}", err);
        CallOutput {
            outcome: Outcome::Failure(err.failure_payload()),
            gas_used: 0,
        }
    }

    /// Build a revert carrying `payload`, for `return Err(env.revert(..))`
    pub fn revert(&self, payload: impl Into<Vec<u8>>) -> ExecutionError {
        ExecutionError::Revert(payload.into())
    }
}
