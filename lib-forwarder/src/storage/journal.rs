//! Write-through journal with nested checkpoints
//!
//! Every write goes straight to the backend and records the value it
//! replaced. Reverting to a checkpoint replays those records in reverse.
//! Committing a checkpoint keeps the records so that an enclosing frame can
//! still undo them; the log is dropped only by `finalize` at the end of a
//! top-level invocation.

use super::{balance_key, decode_balance, ContractStorage};
use crate::errors::{StorageError, StorageResult};
use crate::types::Address;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{trace, warn};

/// Position in the undo log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

impl Checkpoint {
    pub fn position(&self) -> usize {
        self.0
    }
}

/// Previous value of a key before a journaled write
#[derive(Debug, Clone)]
struct JournalEntry {
    key: Vec<u8>,
    previous: Option<Vec<u8>>,
}

/// Journaled view over a storage backend
pub struct Journal<S: ContractStorage> {
    storage: S,
    log: Mutex<Vec<JournalEntry>>,
}

impl<S: ContractStorage> Journal<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Underlying backend (committed + in-flight writes)
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn log(&self) -> StorageResult<MutexGuard<'_, Vec<JournalEntry>>> {
        self.log
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }


    pub fn checkpoint(&self) -> StorageResult<Checkpoint> {
        let position = self.log()?.len();
        trace!("journal checkpoint at {}", position);
        Ok(Checkpoint(position))
    }

    pub fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.storage.get(key)
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let previous = self.storage.get(key)?;
        self.log()?.push(JournalEntry {
            key: key.to_vec(),
            previous,
        });
        self.storage.set(key, value)
    }

    pub fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let previous = self.storage.get(key)?;
        if previous.is_none() {
            return Ok(());
        }
        self.log()?.push(JournalEntry {
            key: key.to_vec(),
            previous,
        });
        self.storage.delete(key)
    }

    /// Undo every write made after `checkpoint`
    pub fn revert_to(&self, checkpoint: Checkpoint) -> StorageResult<()> {
        let mut log = self.log()?;
        if checkpoint.0 > log.len() {
            return Err(StorageError::InvalidCheckpoint {
                checkpoint: checkpoint.0,
                len: log.len(),
            });
        }

        trace!("journal revert {} -> {}", log.len(), checkpoint.0);
        while log.len() > checkpoint.0 {
            let Some(entry) = log.pop() else { break };
            match entry.previous {
                Some(value) => self.storage.set(&entry.key, &value)?,
                None => self.storage.delete(&entry.key)?,
            }
        }
        Ok(())
    }

    /// Accept the writes made after `checkpoint` into the enclosing frame
    pub fn commit(&self, checkpoint: Checkpoint) -> StorageResult<()> {
        let len = self.log()?.len();
        if checkpoint.0 > len {
            return Err(StorageError::InvalidCheckpoint {
                checkpoint: checkpoint.0,
                len,
            });
        }
        trace!("journal commit {} (log len {})", checkpoint.0, len);
        Ok(())
    }

    /// Drop the undo log; everything written so far becomes permanent
    pub fn finalize(&self) -> StorageResult<()> {
        self.log()?.clear();
        Ok(())
    }

    pub fn balance_of(&self, address: &Address) -> StorageResult<u128> {
        let key = balance_key(address);
        decode_balance(&key, self.storage.get(&key)?)
    }

    pub fn set_balance(&self, address: &Address, amount: u128) -> StorageResult<()> {
        let key = balance_key(address);
        let encoded = bincode::serialize(&amount)?;
        self.set(&key, &encoded)
    }
}

/// Scope guard that reverts to a checkpoint if not disarmed
///
/// Covers panics inside contract code: unwinding drops the guard and the
/// frame's writes are undone.
pub struct RollbackGuard<S: ContractStorage> {
    journal: Arc<Journal<S>>,
    checkpoint: Checkpoint,
    armed: bool,
}

impl<S: ContractStorage> RollbackGuard<S> {
    pub fn new(journal: Arc<Journal<S>>, checkpoint: Checkpoint) -> Self {
        Self {
            journal,
            checkpoint,
            armed: true,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// Keep the writes: commit into the enclosing frame
    pub fn commit(mut self) -> StorageResult<()> {
        self.armed = false;
        self.journal.commit(self.checkpoint)
    }

    /// Discard the writes now, reporting backend errors
    pub fn revert(mut self) -> StorageResult<()> {
        self.armed = false;
        self.journal.revert_to(self.checkpoint)
    }
}

impl<S: ContractStorage> Drop for RollbackGuard<S> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.journal.revert_to(self.checkpoint) {
                warn!("rollback to checkpoint {} failed: {}", self.checkpoint.0, e);
            }
        }
    }
}
