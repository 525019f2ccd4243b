//! Delegating Call Forwarder
//!
//! A forwarding shell that accepts any inbound call, resolves a target at
//! call time and runs the target's code against the forwarder's own storage
//! scope (delegated execution). The target's outcome, success or failure, is
//! replayed to the invoker byte-for-byte.
//!
//! The crate also ships the deterministic execution host the forwarder runs
//! inside. Contract code is a [`ContractCode`] trait object registered at an
//! [`Address`]; delegated execution is the host running that object with an
//! [`ExecutionContext`] whose storage scope belongs to the caller.
//!
//! # Execution Order
//!
//! ```text
//! Host::invoke(call)
//!   checkpoint
//!   Forwarder::execute
//!     PreForwardHook::on_before_forward
//!     TargetResolver::resolve_target
//!     Forwarder::forward            (never returns Ok)
//!       CallEnv::delegate_call(target, payload)
//!   commit   on Success
//!   revert   on Failure             (hook writes included)
//! ```

pub mod config;
pub mod context;
pub mod errors;
pub mod forwarder;
pub mod host;
pub mod storage;
pub mod types;

pub use config::{GasSchedule, HostConfig, DEFAULT_GAS_LIMIT, DEFAULT_MAX_CALL_DEPTH};
pub use context::ExecutionContext;
pub use errors::{ExecutionError, StorageError, StorageResult};
pub use forwarder::{
    BeaconResolver, DenyCallerHook, FixedTarget, Forwarder, HookChain, NoopHook, PreForwardHook,
    StorageSlotResolver, TargetResolver, Termination, DENIED_CALLER_REASON, IMPLEMENTATION_SLOT_LABEL,
};
pub use host::{CallEnv, CallOutput, ContractCode, FrameTrace, Host, Receipt};
pub use storage::{Checkpoint, ContractStorage, Journal, MemoryStorage, RollbackGuard};
pub use types::{Address, Call, FrameKind, Outcome};
