//! In-memory store engine.

use crate::contract::{Cursor, Entry, Store, Transaction};
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory store engine.
///
/// This engine keeps all data in a sorted map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// Transactions read from a snapshot taken at `begin` and buffer their
/// writes; `commit` publishes the buffer atomically. There is no conflict
/// detection: concurrent writers resolve last-writer-wins.
///
/// # Example
///
/// ```rust
/// use carton_store::{MemoryStore, Store};
///
/// let store = MemoryStore::new();
/// let mut txn = store.begin(true).unwrap();
/// txn.set(b"k", b"v").unwrap();
/// txn.commit().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn begin(&self, write: bool) -> StoreResult<Box<dyn Transaction + '_>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.data),
            snapshot: self.data.read().clone(),
            writes: BTreeMap::new(),
            write,
            state: TxnState::Active,
        }))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    RolledBack,
}

struct MemoryTransaction {
    shared: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    snapshot: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Buffered writes: `Some` for a pending set, `None` for a pending delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    write: bool,
    state: TxnState,
}

impl MemoryTransaction {
    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TxnState::Active => Ok(()),
            _ => Err(StoreError::TransactionDone),
        }
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        self.ensure_active()?;
        if !self.write {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    /// Snapshot merged with buffered writes, in key order.
    fn merged(&self) -> Vec<Entry> {
        let mut view = self.snapshot.clone();
        for (key, pending) in &self.writes {
            match pending {
                Some(value) => {
                    view.insert(key.clone(), value.clone());
                }
                None => {
                    view.remove(key);
                }
            }
        }
        view.into_iter()
            .map(|(key, value)| Entry { key, value })
            .collect()
    }
}

impl Transaction for MemoryTransaction {
    fn get(&self, key: &[u8]) -> StoreResult<Vec<u8>> {
        self.ensure_active()?;
        if let Some(pending) = self.writes.get(key) {
            return match pending {
                Some(value) => Ok(value.clone()),
                None => Err(StoreError::KeyNotFound),
            };
        }
        self.snapshot
            .get(key)
            .cloned()
            .ok_or(StoreError::KeyNotFound)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.ensure_writable()?;
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.ensure_writable()?;
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn cursor(&self, forward: bool) -> StoreResult<Box<dyn Cursor + '_>> {
        self.ensure_active()?;
        let mut entries = self.merged();
        if !forward {
            entries.reverse();
        }
        Ok(Box::new(MemoryCursor {
            entries,
            pos: 0,
            forward,
        }))
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.ensure_active()?;
        if self.write {
            let mut data = self.shared.write();
            for (key, pending) in std::mem::take(&mut self.writes) {
                match pending {
                    Some(value) => {
                        data.insert(key, value);
                    }
                    None => {
                        data.remove(&key);
                    }
                }
            }
        }
        self.state = TxnState::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if self.state == TxnState::Active {
            self.writes.clear();
            self.state = TxnState::RolledBack;
        }
        Ok(())
    }
}

struct MemoryCursor {
    entries: Vec<Entry>,
    pos: usize,
    forward: bool,
}

impl Cursor for MemoryCursor {
    fn seek(&mut self, key: &[u8]) {
        self.pos = if self.forward {
            self.entries.partition_point(|e| e.key.as_slice() < key)
        } else {
            self.entries.partition_point(|e| e.key.as_slice() > key)
        };
    }

    fn next(&mut self) {
        if self.pos < self.entries.len() {
            self.pos += 1;
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.entries.len()
    }

    fn entry(&self) -> StoreResult<Entry> {
        self.entries
            .get(self.pos)
            .cloned()
            .ok_or(StoreError::CursorExhausted)
    }

    fn close(&mut self) {
        self.pos = self.entries.len();
    }
}
