//! Deterministic execution host
//!
//! Runs contract code frame by frame over a journaled state. Each frame
//! takes a checkpoint on entry and either commits into its parent or
//! reverts every write it (and its children) made.
//!
//! # Frame Execution Order
//!
//! ```text
//! checkpoint
//! charge call_base
//! transfer value      (ordinary calls only)
//! look up code        (missing: plain transfer for calls, failure for delegates)
//! ContractCode::execute(env)
//! Ok  -> commit   -> Success(return data)
//! Err -> revert   -> Failure(revert payload, or empty for exceptional halts)
//! ```
//!
//! Host faults (storage backend errors) abort every enclosing frame and
//! surface from [`Host::invoke`] as `Err`.

pub mod env;
pub mod trace;

pub use env::{CallEnv, CallOutput};
pub use trace::{FrameTrace, Receipt};

use crate::config::{GasSchedule, HostConfig};
use crate::context::ExecutionContext;
use crate::errors::{ExecutionError, StorageResult};
use crate::storage::{state_root, storage_key, ContractStorage, Journal, MemoryStorage, RollbackGuard};
use crate::types::{Address, Call, FrameKind, Outcome};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Executable contract logic
///
/// Code never owns state: everything it reads or writes goes through the
/// `CallEnv`, scoped to whichever address the host chose for the frame.
pub trait ContractCode {
    /// Run against `env`; `Ok` returns data, `Err` reverts the frame
    fn execute(&self, env: &mut CallEnv<'_>) -> Result<Vec<u8>, ExecutionError>;
}

impl<F> ContractCode for F
where
    F: Fn(&mut CallEnv<'_>) -> Result<Vec<u8>, ExecutionError>,
{
    fn execute(&self, env: &mut CallEnv<'_>) -> Result<Vec<u8>, ExecutionError> {
        self(env)
    }
}

/// Host operations reachable from a running frame
pub(crate) trait FrameHost {
    fn execute_frame(&mut self, ctx: ExecutionContext, input: Vec<u8>) -> StorageResult<CallOutput>;
    fn read_slot(&self, scope: &Address, slot: &[u8]) -> StorageResult<Option<Vec<u8>>>;
    fn write_slot(&self, scope: &Address, slot: &[u8], value: &[u8]) -> StorageResult<()>;
    fn delete_slot(&self, scope: &Address, slot: &[u8]) -> StorageResult<()>;
    fn balance_of(&self, address: &Address) -> StorageResult<u128>;
    fn gas_schedule(&self) -> &GasSchedule;
}

/// Execution host
pub struct Host<S: ContractStorage = MemoryStorage> {
    journal: Arc<Journal<S>>,
    code: HashMap<Address, Arc<dyn ContractCode>>,
    config: HostConfig,
    frames: Vec<FrameTrace>,
}

impl Host<MemoryStorage> {
    /// Host over fresh in-memory storage with default configuration
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }
}

impl<S: ContractStorage> Host<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, HostConfig::default())
    }

    pub fn with_config(storage: S, config: HostConfig) -> Self {
        Self {
            journal: Arc::new(Journal::new(storage)),
            code: HashMap::new(),
            config,
            frames: Vec::new(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    // =========================================================================
    // Genesis / inspection
    // =========================================================================

    /// Register `code` at `address`
    pub fn deploy(&mut self, address: Address, code: Arc<dyn ContractCode>) -> Result<()> {
        if address.is_zero() {
            return Err(anyhow!("Cannot deploy code at the zero address"));
        }
        if self.code.contains_key(&address) {
            warn!("deploy rejected: code already present at {}", address);
            return Err(anyhow!("Code already deployed at {}", address));
        }
        debug!("deployed code at {}", address);
        self.code.insert(address, code);
        Ok(())
    }

    pub fn has_code(&self, address: &Address) -> bool {
        self.code.contains_key(address)
    }

    /// Credit `amount` to `address` outside any invocation
    pub fn fund(&mut self, address: Address, amount: u128) -> Result<()> {
        let balance = self.journal.balance_of(&address)?;
        let credited = balance
            .checked_add(amount)
            .ok_or_else(|| anyhow!("Balance overflow for {}", address))?;
        self.journal.set_balance(&address, credited)?;
        self.journal.finalize()?;
        Ok(())
    }

    pub fn balance_of(&self, address: &Address) -> StorageResult<u128> {
        self.journal.balance_of(address)
    }

    /// Write a storage slot directly (genesis setup)
    pub fn set_storage(&mut self, address: Address, slot: &[u8], value: &[u8]) -> StorageResult<()> {
        self.journal.set(&storage_key(&address, slot), value)?;
        self.journal.finalize()
    }

    pub fn storage_at(&self, address: &Address, slot: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.journal.get(&storage_key(address, slot))
    }

    /// Digest of `address`'s storage and balance
    pub fn state_root(&self, address: &Address) -> StorageResult<[u8; 32]> {
        state_root(self.journal.storage(), address)
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Run a top-level call to completion
    ///
    /// Contract failures come back inside the receipt; `Err` means the
    /// storage backend failed and the invocation was abandoned.
    pub fn invoke(&mut self, call: Call) -> StorageResult<Receipt> {
        self.frames.clear();
        let ctx = ExecutionContext::new_root(&call, self.config.default_gas_limit, self.config.max_call_depth);
        debug!(
            "invoke from={} to={} payload_len={} value={} gas={}",
            call.from,
            call.to,
            call.payload.len(),
            call.value,
            ctx.gas_limit
        );

        let result = self.execute_frame(ctx, call.payload);
        let frames = std::mem::take(&mut self.frames);
        self.journal.finalize()?;

        let output = result?;
        debug!(
            "invoke finished success={} output_len={} gas_used={}",
            output.outcome.is_success(),
            output.outcome.payload().len(),
            output.gas_used
        );
        Ok(Receipt {
            outcome: output.outcome,
            gas_used: output.gas_used,
            frames,
        })
    }

    fn run_frame(&mut self, ctx: &mut ExecutionContext, input: Vec<u8>) -> Result<Vec<u8>, ExecutionError> {
        ctx.consume_gas(self.config.gas.call_base)?;

        if ctx.kind == FrameKind::Call && ctx.value > 0 {
            self.transfer(&ctx.caller, &ctx.address, ctx.value)?;
        }

        let code = match self.code.get(&ctx.code_address) {
            Some(code) => Arc::clone(code),
            // Ordinary call into an account without code is a plain transfer
            None if ctx.kind == FrameKind::Call => return Ok(Vec::new()),
            None => return Err(ExecutionError::NoCode(ctx.code_address)),
        };

        let mut env = CallEnv::new(self, ctx, input);
        code.execute(&mut env)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), ExecutionError> {
        let have = self.journal.balance_of(from)?;
        if have < amount {
            return Err(ExecutionError::InsufficientBalance { have, need: amount });
        }
        self.journal.set_balance(from, have - amount)?;
        let credited = self
            .journal
            .balance_of(to)?
            .checked_add(amount)
            .ok_or(ExecutionError::BalanceOverflow(*to))?;
        self.journal.set_balance(to, credited)?;
        Ok(())
    }
}

impl<S: ContractStorage> FrameHost for Host<S> {
    fn execute_frame(&mut self, mut ctx: ExecutionContext, input: Vec<u8>) -> StorageResult<CallOutput> {
        let input_hash = FrameTrace::hash_input(&input);
        let input_len = input.len();
        let guard = RollbackGuard::new(Arc::clone(&self.journal), self.journal.checkpoint()?);

        let outcome = match self.run_frame(&mut ctx, input) {
            Ok(data) => {
                guard.commit()?;
                Outcome::Success(data)
            }
            Err(ExecutionError::Storage(fault)) => {
                warn!("host fault in frame at depth {}: {}", ctx.call_depth, fault);
                if let Err(e) = guard.revert() {
                    warn!("revert after host fault failed: {}", e);
                }
                return Err(fault);
            }
            Err(err) => {
                if err.is_out_of_gas() {
                    ctx.exhaust_gas();
                }
                debug!("frame at depth {} reverted: {}", ctx.call_depth, err);
                guard.revert()?;
                Outcome::Failure(err.failure_payload())
            }
        };

        self.frames.push(FrameTrace {
            kind: ctx.kind,
            depth: ctx.call_depth,
            caller: ctx.caller,
            address: ctx.address,
            code_address: ctx.code_address,
            value: ctx.value,
            input_hash,
            input_len,
            output_len: outcome.payload().len(),
            success: outcome.is_success(),
            gas_used: ctx.gas_used,
        });

        Ok(CallOutput {
            outcome,
            gas_used: ctx.gas_used,
        })
    }

    fn read_slot(&self, scope: &Address, slot: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.journal.get(&storage_key(scope, slot))
    }

    fn write_slot(&self, scope: &Address, slot: &[u8], value: &[u8]) -> StorageResult<()> {
        self.journal.set(&storage_key(scope, slot), value)
    }

    fn delete_slot(&self, scope: &Address, slot: &[u8]) -> StorageResult<()> {
        self.journal.delete(&storage_key(scope, slot))
    }

    fn balance_of(&self, address: &Address) -> StorageResult<u128> {
        self.journal.balance_of(address)
    }

    fn gas_schedule(&self) -> &GasSchedule {
        &self.config.gas
    }
}
