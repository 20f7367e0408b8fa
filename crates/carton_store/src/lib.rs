//! # Carton Store
//!
//! Transactional key-value store contract for cartondb.
//!
//! This crate defines the boundary between the document layer and any
//! backing engine:
//! - [`Store`], [`Transaction`] and [`Cursor`] - the minimal contract an
//!   engine must satisfy
//! - [`MemoryStore`] - an in-memory reference engine for tests and
//!   ephemeral databases
//!
//! Engines own isolation, conflict handling and durability; the contract
//! only fixes operation semantics and the transaction lifecycle.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod contract;
mod error;
mod memory;

pub use contract::{Cursor, Entry, Store, Transaction};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
