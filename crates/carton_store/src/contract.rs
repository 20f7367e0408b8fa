//! Store contract trait definitions.
//!
//! Any transactional key-value engine can back cartondb by satisfying
//! these three traits. The contract is deliberately minimal: byte-keyed
//! get/set/delete, ordered iteration, and explicit commit/rollback.
//!
//! # Invariants
//!
//! - A transaction is `Active` until its first `commit` or `rollback`,
//!   and terminal afterwards
//! - Every started transaction must eventually see exactly one terminal
//!   call; callers guarantee this with scoped cleanup
//! - `rollback` is idempotent and MUST be a harmless no-op after a
//!   successful `commit`, so unconditional cleanup paths stay safe
//! - A failed `commit` is equivalent to the transaction never happening
//! - Transactions are not reused across threads; concurrency comes from
//!   opening independent transactions
//!
//! # Implementors
//!
//! - [`crate::MemoryStore`] - In-memory reference engine

use crate::error::StoreResult;

/// A `(key, value)` pair yielded by a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The entry's key.
    pub key: Vec<u8>,
    /// The entry's value.
    pub value: Vec<u8>,
}

/// A transactional key-value store.
pub trait Store: Send + Sync {
    /// Starts a transaction.
    ///
    /// Pass `write = false` for read-only work; engines may avoid
    /// write-path overhead for such transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the engine cannot
    /// open a transaction.
    fn begin(&self, write: bool) -> StoreResult<Box<dyn Transaction + '_>>;

    /// Closes the store. Callable multiple times.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to release its resources.
    fn close(&self) -> StoreResult<()>;
}

/// A single transaction over a [`Store`].
pub trait Transaction {
    /// Returns the value associated with a key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::KeyNotFound`] if the key is absent.
    fn get(&self, key: &[u8]) -> StoreResult<Vec<u8>>;

    /// Associates a value with a key.
    ///
    /// # Errors
    ///
    /// Fails in read-only or finished transactions.
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Removes a key. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Fails in read-only or finished transactions.
    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;

    /// Returns a cursor over the transaction's view of the store.
    ///
    /// With `forward = true` iteration runs from the smallest key to the
    /// largest; otherwise in the opposite direction.
    ///
    /// # Errors
    ///
    /// Fails in finished transactions.
    fn cursor(&self, forward: bool) -> StoreResult<Box<dyn Cursor + '_>>;

    /// Commits the transaction, publishing its writes.
    ///
    /// # Errors
    ///
    /// Fails in finished transactions or when the engine rejects the
    /// commit; a failed commit leaves the store unchanged.
    fn commit(&mut self) -> StoreResult<()>;

    /// Rolls the transaction back, discarding its writes.
    ///
    /// Safe to call at any point, including after `commit`, where it is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only if the engine fails to release the
    /// transaction's resources.
    fn rollback(&mut self) -> StoreResult<()>;
}

/// An iterator over ordered `(key, value)` entries.
pub trait Cursor {
    /// Positions the cursor at the first entry at or past `key` in the
    /// iteration direction: the smallest key `>=` when iterating
    /// forward, the largest key `<=` when iterating in reverse.
    fn seek(&mut self, key: &[u8]);

    /// Advances the cursor by one entry.
    fn next(&mut self);

    /// Returns true once iteration has moved past the last entry.
    fn is_done(&self) -> bool;

    /// Returns the entry at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::CursorExhausted`] once iteration is
    /// done.
    fn entry(&self) -> StoreResult<Entry>;

    /// Releases the cursor. Further calls report an exhausted cursor.
    fn close(&mut self);
}
