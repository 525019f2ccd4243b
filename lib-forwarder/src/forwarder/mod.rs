//! The forwarding shell
//!
//! A `Forwarder` is contract code with no interface of its own. Every
//! inbound call, whatever its payload (empty included), goes through the
//! same path:
//!
//! ```text
//! PreForwardHook::on_before_forward   may fail -> nothing else runs
//! TargetResolver::resolve_target
//! forward(target)                     never returns Ok
//! ```
//!
//! `forward` runs the target's code as a delegated frame: the target sees
//! the original invoker, value and remaining gas, and writes land in the
//! forwarder's storage. The target's outcome is replayed verbatim; the host
//! commits the whole invocation on success and reverts it on failure,
//! including anything the hook wrote.

pub mod hook;
pub mod resolver;

pub use hook::{DenyCallerHook, HookChain, NoopHook, PreForwardHook, DENIED_CALLER_REASON};
pub use resolver::{BeaconResolver, FixedTarget, StorageSlotResolver, TargetResolver, IMPLEMENTATION_SLOT_LABEL};

use crate::errors::ExecutionError;
use crate::host::{CallEnv, ContractCode};
use crate::types::{Address, Outcome};
use std::convert::Infallible;
use tracing::debug;

/// How a forwarding frame ends
#[derive(Debug)]
pub enum Termination {
    /// Replay the delegated outcome to the invoker, bytes untouched
    Replay(Outcome),
    /// The forwarder could not start the delegation (budget exhausted
    /// while capturing the payload) or the host faulted
    Abort(ExecutionError),
}

impl Termination {
    /// Hand the termination back to the host as the frame's result
    pub fn into_frame_result(self) -> Result<Vec<u8>, ExecutionError> {
        match self {
            Termination::Replay(Outcome::Success(payload)) => Ok(payload),
            Termination::Replay(Outcome::Failure(payload)) => Err(ExecutionError::Revert(payload)),
            Termination::Abort(err) => Err(err),
        }
    }
}

/// Delegating call forwarder
pub struct Forwarder<R: TargetResolver, H: PreForwardHook = NoopHook> {
    resolver: R,
    hook: H,
}

impl<R: TargetResolver> Forwarder<R, NoopHook> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            hook: NoopHook,
        }
    }
}

impl<R: TargetResolver, H: PreForwardHook> Forwarder<R, H> {
    pub fn with_hook(resolver: R, hook: H) -> Self {
        Self { resolver, hook }
    }

    /// Delegate the current call to `target` and terminate
    ///
    /// The `Ok` type is uninhabited: this function can only end the frame.
    pub fn forward(&self, env: &mut CallEnv<'_>, target: Address) -> Result<Infallible, Termination> {
        // Capture the payload, sized exactly to its length
        let payload_len = env.input().len();
        env.charge_copy(payload_len).map_err(Termination::Abort)?;
        let payload = env.input().to_vec();

        debug!(
            "forwarding {} bytes from {} to {} (value={}, gas={})",
            payload_len,
            env.caller(),
            target,
            env.value(),
            env.gas_remaining()
        );

        let output = env.delegate_call(target, payload).map_err(Termination::Abort)?;

        // The result is taken whole and unmetered: the target may have
        // spent every unit of gas it was handed
        debug!(
            "target {} finished success={} result_len={} gas_used={}",
            target,
            output.outcome.is_success(),
            output.outcome.payload().len(),
            output.gas_used
        );

        Err(Termination::Replay(output.outcome))
    }
}

impl<R: TargetResolver, H: PreForwardHook> ContractCode for Forwarder<R, H> {
    fn execute(&self, env: &mut CallEnv<'_>) -> Result<Vec<u8>, ExecutionError> {
        self.hook.on_before_forward(env)?;
        let target = self.resolver.resolve_target(env)?;
        let Err(termination) = self.forward(env, target);
        termination.into_frame_result()
    }
}
