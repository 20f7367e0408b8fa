//! Collection manager.
//!
//! Maps collection lifecycle operations onto the store contract. Every
//! mutation flows through [`Db::transact`], which pairs each started
//! transaction with exactly one terminal commit or rollback, on every
//! exit path.

use crate::error::{CoreError, CoreResult};
use carton_codec::{decode_value, encode_value, from_value, to_value};
use carton_store::{Store, StoreError, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Key prefix under which collection metadata lives.
pub const COLLECTION_KEY_PREFIX: &str = "coll:";

/// Key prefix under which a collection's documents live.
pub const DOCUMENT_KEY_PREFIX: &str = "doc:";

/// Per-collection metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    /// Number of documents tracked for the collection. Informational.
    pub size: u64,
}

/// The document database: named collections over a store engine.
///
/// Dropping a collection removes only its metadata record. Member
/// documents stay under the collection's key prefix until a surrounding
/// layer sweeps them; recreating the collection adopts them again.
pub struct Db {
    store: Box<dyn Store>,
}

impl Db {
    /// Creates a database over a store engine.
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Closes the underlying store. Callable multiple times.
    ///
    /// # Errors
    ///
    /// Returns the engine's close error.
    pub fn close(&self) -> CoreResult<()> {
        Ok(self.store.close()?)
    }

    /// Creates a collection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CollectionExists`] if the collection already
    /// has a metadata record.
    pub fn create_collection(&self, name: &str) -> CoreResult<()> {
        self.transact(true, |tx| {
            if collection_exists(tx, name)? {
                return Err(CoreError::collection_exists(name));
            }
            let meta = to_value(&CollectionMeta { size: 0 })?;
            tx.set(&collection_key(name), &encode_value(&meta))?;
            Ok(())
        })?;
        debug!(collection = name, "created collection");
        Ok(())
    }

    /// Drops a collection's metadata record. Idempotent: dropping an
    /// absent collection succeeds.
    ///
    /// # Errors
    ///
    /// Returns transaction errors from the store.
    pub fn drop_collection(&self, name: &str) -> CoreResult<()> {
        self.transact(true, |tx| {
            tx.delete(&collection_key(name))?;
            Ok(())
        })?;
        debug!(collection = name, "dropped collection");
        Ok(())
    }

    /// Checks whether a collection exists.
    ///
    /// # Errors
    ///
    /// Returns transaction errors from the store.
    pub fn has_collection(&self, name: &str) -> CoreResult<bool> {
        self.transact(false, |tx| collection_exists(tx, name))
    }

    /// Reads a collection's metadata record, or `None` if the collection
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns transaction or decode errors.
    pub fn collection_metadata(&self, name: &str) -> CoreResult<Option<CollectionMeta>> {
        self.transact(false, |tx| match tx.get(&collection_key(name)) {
            Ok(bytes) => Ok(Some(from_value(decode_value(&bytes)?)?)),
            Err(StoreError::KeyNotFound) => Ok(None),
            Err(err) => Err(err.into()),
        })
    }

    /// Runs `action` inside a transaction of the requested mode.
    ///
    /// The transaction commits only when `action` returns `Ok`; a drop
    /// guard rolls it back on every other exit path, early returns and
    /// panics included. Rollback after a successful commit is a no-op of
    /// the store contract, so the guard is unconditional.
    ///
    /// # Errors
    ///
    /// Propagates the action's error or the commit error.
    pub fn transact<T, F>(&self, write: bool, action: F) -> CoreResult<T>
    where
        F: FnOnce(&mut dyn Transaction) -> CoreResult<T>,
    {
        let mut guard = RollbackGuard {
            txn: self.store.begin(write)?,
        };
        let value = action(guard.txn.as_mut())?;
        guard.txn.commit()?;
        Ok(value)
    }
}

/// Rolls the wrapped transaction back when the scope exits.
struct RollbackGuard<'a> {
    txn: Box<dyn Transaction + 'a>,
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        let _ = self.txn.rollback();
    }
}

fn collection_exists(tx: &dyn Transaction, name: &str) -> CoreResult<bool> {
    match tx.get(&collection_key(name)) {
        Ok(_) => Ok(true),
        Err(StoreError::KeyNotFound) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// The store key of a collection's metadata record.
#[must_use]
pub fn collection_key(name: &str) -> Vec<u8> {
    format!("{COLLECTION_KEY_PREFIX}{name}").into_bytes()
}

/// The store key of a document within a collection.
///
/// Keys share the collection's `doc:<name>:` prefix, so a forward cursor
/// seeked to [`document_key_prefix`] enumerates exactly that collection's
/// documents.
#[must_use]
pub fn document_key(collection: &str, id: &str) -> Vec<u8> {
    format!("{DOCUMENT_KEY_PREFIX}{collection}:{id}").into_bytes()
}

/// The common prefix of every document key in a collection.
#[must_use]
pub fn document_key_prefix(collection: &str) -> Vec<u8> {
    format!("{DOCUMENT_KEY_PREFIX}{collection}:").into_bytes()
}
