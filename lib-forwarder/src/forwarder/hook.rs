//! Pre-forward hooks
//!
//! A hook runs to completion before the target is resolved. Failing is the
//! only way it can stop an invocation, and a failure means neither the
//! resolver nor the target ever runs. Writes a hook makes are part of the
//! invocation and are reverted with it.
//!
//! Composition is structural: [`HookChain`] runs its links in registration
//! order, so an added hook can never skip the ones registered before it.

use crate::errors::ExecutionError;
use crate::host::CallEnv;
use crate::types::Address;
use tracing::debug;

/// Revert payload used by [`DenyCallerHook`]
pub const DENIED_CALLER_REASON: &[u8] = b"forwarder: caller may not fall back to target";

/// Logic run once per invocation before forwarding
pub trait PreForwardHook {
    fn on_before_forward(&self, env: &mut CallEnv<'_>) -> Result<(), ExecutionError>;
}

/// Default hook: does nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopHook;

impl PreForwardHook for NoopHook {
    fn on_before_forward(&self, _env: &mut CallEnv<'_>) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Ordered hook composition
#[derive(Default)]
pub struct HookChain {
    links: Vec<Box<dyn PreForwardHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; it runs after every hook already in the chain
    pub fn then(mut self, hook: impl PreForwardHook + 'static) -> Self {
        self.links.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl PreForwardHook for HookChain {
    fn on_before_forward(&self, env: &mut CallEnv<'_>) -> Result<(), ExecutionError> {
        for (index, link) in self.links.iter().enumerate() {
            if let Err(e) = link.on_before_forward(env) {
                debug!("hook {} of {} failed: {}", index, self.links.len(), e);
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Refuses to forward calls from one address
///
/// Lets an administrative account talk to the forwarder without ever
/// reaching the target by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenyCallerHook(Address);

impl DenyCallerHook {
    pub fn new(denied: Address) -> Self {
        Self(denied)
    }
}

impl PreForwardHook for DenyCallerHook {
    fn on_before_forward(&self, env: &mut CallEnv<'_>) -> Result<(), ExecutionError> {
        if env.caller() == self.0 {
            return Err(ExecutionError::Revert(DENIED_CALLER_REASON.to_vec()));
        }
        Ok(())
    }
}
