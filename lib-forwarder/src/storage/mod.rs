//! Persistent contract state
//!
//! - **ContractStorage**: flat key/value backend (committed state)
//! - **MemoryStorage**: deterministic in-memory backend
//! - **Journal**: write-through undo log with nested checkpoints
//! - **RollbackGuard**: reverts to a checkpoint unless disarmed
//!
//! # Key Layout
//!
//! - `storage:{address}:{slot}` - per-contract storage, one scope per address
//! - `balance:{address}` - bincode-encoded `u128`

pub mod journal;

pub use journal::{Checkpoint, Journal, RollbackGuard};

use crate::errors::{StorageError, StorageResult};
use crate::types::Address;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const STORAGE_PREFIX: &[u8] = b"storage:";
const BALANCE_PREFIX: &[u8] = b"balance:";

/// Contract storage interface
///
/// All methods take `&self`; implementations use interior mutability.
pub trait ContractStorage {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// In-memory storage
///
/// Ordered map so that prefix scans and state roots are deterministic.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    data: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}

impl ContractStorage for MemoryStorage {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.lock()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let data = self.lock()?;
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Prefix shared by every slot of one address
pub fn scope_prefix(scope: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(STORAGE_PREFIX.len() + 33);
    key.extend_from_slice(STORAGE_PREFIX);
    key.extend_from_slice(scope.as_bytes());
    key.push(b':');
    key
}

/// Backend key for `slot` inside `scope`'s storage
pub fn storage_key(scope: &Address, slot: &[u8]) -> Vec<u8> {
    let mut key = scope_prefix(scope);
    key.extend_from_slice(slot);
    key
}

pub fn balance_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(BALANCE_PREFIX.len() + 32);
    key.extend_from_slice(BALANCE_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key
}

pub fn decode_balance(key: &[u8], raw: Option<Vec<u8>>) -> StorageResult<u128> {
    match raw {
        None => Ok(0),
        Some(bytes) => bincode::deserialize(&bytes).map_err(|e| StorageError::CorruptValue {
            key: hex::encode(key),
            reason: e.to_string(),
        }),
    }
}

/// Digest of one address's storage entries and balance
///
/// Two equal roots mean the scope is byte-for-byte identical.
pub fn state_root<S: ContractStorage + ?Sized>(storage: &S, scope: &Address) -> StorageResult<[u8; 32]> {
    let prefix = scope_prefix(scope);
    let mut hasher = blake3::Hasher::new();
    hasher.update(scope.as_bytes());

    for (key, value) in storage.scan_prefix(&prefix)? {
        let slot = &key[prefix.len()..];
        hasher.update(&(slot.len() as u64).to_le_bytes());
        hasher.update(slot);
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(&value);
    }

    let balance_key = balance_key(scope);
    let balance = decode_balance(&balance_key, storage.get(&balance_key)?)?;
    hasher.update(&balance.to_le_bytes());

    let mut root = [0u8; 32];
    root.copy_from_slice(hasher.finalize().as_bytes());
    Ok(root)
}
