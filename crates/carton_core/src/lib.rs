//! # Carton Core
//!
//! Document model and transactional collection layer for cartondb.
//!
//! This crate provides:
//! - [`Document`] - a canonical field map with dotted-path access,
//!   identity/expiry validation and a binary codec
//! - [`Db`] - collection lifecycle and the transaction choke point over
//!   any [`carton_store::Store`] engine
//!
//! ## Usage
//!
//! ```
//! use carton_core::{Db, Document};
//! use carton_store::MemoryStore;
//!
//! let db = Db::new(MemoryStore::new());
//! db.create_collection("users").unwrap();
//!
//! let mut doc = Document::with_id();
//! doc.set("name", &"Alice").unwrap();
//! doc.validate().unwrap();
//!
//! let id = doc.object_id().unwrap();
//! let key = carton_core::document_key("users", &id);
//! let bytes = doc.encode().unwrap();
//! db.transact(true, |tx| {
//!     tx.set(&key, &bytes)?;
//!     Ok(())
//! })
//! .unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod db;
mod document;
mod error;
mod path;

pub use db::{
    collection_key, document_key, document_key_prefix, CollectionMeta, Db, COLLECTION_KEY_PREFIX,
    DOCUMENT_KEY_PREFIX,
};
pub use document::{Document, EXPIRES_AT_FIELD, OBJECT_ID_FIELD};
pub use error::{CoreError, CoreResult};

// the value model is part of this crate's surface
pub use carton_codec::{Timestamp, Value};
