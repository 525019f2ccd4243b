//! Target resolution policies
//!
//! The forwarder asks its resolver once per invocation, after the hook and
//! immediately before forwarding. It never caches or validates the answer;
//! an address without code simply makes the delegated call fail.

use crate::errors::{ExecutionError, StorageResult};
use crate::host::{CallEnv, Host};
use crate::storage::ContractStorage;
use crate::types::Address;
use tracing::debug;

/// Label hashed into the storage slot holding the current target
pub const IMPLEMENTATION_SLOT_LABEL: &str = "lib-forwarder.implementation";

/// Supplies the address to delegate to
pub trait TargetResolver {
    fn resolve_target(&self, env: &mut CallEnv<'_>) -> Result<Address, ExecutionError>;
}

/// Always the same target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTarget(Address);

impl FixedTarget {
    pub fn new(target: Address) -> Self {
        Self(target)
    }

    pub fn target(&self) -> Address {
        self.0
    }
}

impl TargetResolver for FixedTarget {
    fn resolve_target(&self, _env: &mut CallEnv<'_>) -> Result<Address, ExecutionError> {
        Ok(self.0)
    }
}

/// Target read from a well-known slot in the forwarder's own storage
///
/// The slot is derived from [`IMPLEMENTATION_SLOT_LABEL`], far away from
/// anything a delegated target would pick for its own layout. An empty or
/// malformed slot resolves to the zero address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageSlotResolver;

impl StorageSlotResolver {
    pub fn slot() -> [u8; 32] {
        let mut slot = [0u8; 32];
        slot.copy_from_slice(blake3::hash(IMPLEMENTATION_SLOT_LABEL.as_bytes()).as_bytes());
        slot
    }

    /// Point `proxy` at `target` (host-level setup, outside any invocation)
    pub fn install<S: ContractStorage>(host: &mut Host<S>, proxy: Address, target: Address) -> StorageResult<()> {
        debug!("implementation slot of {} set to {}", proxy, target);
        host.set_storage(proxy, &Self::slot(), target.as_bytes())
    }

    /// Current target stored for `proxy`, if any
    pub fn current<S: ContractStorage>(host: &Host<S>, proxy: &Address) -> StorageResult<Option<Address>> {
        Ok(host
            .storage_at(proxy, &Self::slot())?
            .and_then(|raw| Address::from_slice(&raw)))
    }
}

impl TargetResolver for StorageSlotResolver {
    fn resolve_target(&self, env: &mut CallEnv<'_>) -> Result<Address, ExecutionError> {
        let raw = env.storage_read(&Self::slot())?;
        Ok(raw
            .and_then(|bytes| Address::from_slice(&bytes))
            .unwrap_or(Address::ZERO))
    }
}

/// Target supplied by a beacon contract shared between many forwarders
///
/// The beacon is called with an empty payload and must return exactly 32
/// bytes. A failing beacon fails the invocation with the beacon's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconResolver(Address);

impl BeaconResolver {
    pub fn new(beacon: Address) -> Self {
        Self(beacon)
    }

    pub fn beacon(&self) -> Address {
        self.0
    }
}

impl TargetResolver for BeaconResolver {
    fn resolve_target(&self, env: &mut CallEnv<'_>) -> Result<Address, ExecutionError> {
        let output = env.call(self.0, Vec::new(), 0)?;
        match output.outcome.into_result() {
            Ok(data) => Ok(Address::from_slice(&data).unwrap_or(Address::ZERO)),
            Err(payload) => Err(ExecutionError::Revert(payload)),
        }
    }
}
