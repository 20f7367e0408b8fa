//! Document abstraction.

use crate::error::{CoreError, CoreResult};
use crate::path::{self, FieldMap};
use carton_codec::{decode_value, encode_map, from_value, to_value, Value};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved field carrying the document's object id.
pub const OBJECT_ID_FIELD: &str = "_id";

/// Reserved field carrying the document's expiry instant.
pub const EXPIRES_AT_FIELD: &str = "_expiresAt";

/// A document in a collection.
///
/// A document exclusively owns one canonical field map and exposes
/// dotted-path access over it: `get("a.b")` reads through nested maps,
/// `set` upserts and creates missing intermediates, strict `update`
/// refuses to create structure. The reserved [`OBJECT_ID_FIELD`] and
/// [`EXPIRES_AT_FIELD`] keys are ordinary fields with extra validation
/// semantics.
///
/// # Example
///
/// ```rust
/// use carton_core::Document;
///
/// let mut doc = Document::with_id();
/// doc.set("profile.name", &"Alice").unwrap();
/// assert!(doc.has("profile.name"));
/// assert!(doc.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: FieldMap,
}

impl Document {
    /// Creates a new empty document.
    ///
    /// The caller is responsible for populating `_id` before the
    /// document can pass [`Document::validate`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty document with a freshly generated v4 UUID id.
    #[must_use]
    pub fn with_id() -> Self {
        let mut doc = Self::new();
        doc.set_value(OBJECT_ID_FIELD, Value::Text(Uuid::new_v4().to_string()));
        doc
    }

    /// Creates a document from normalizable input.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unmarshallable`] if the input does not
    /// normalize to a map, or the normalization error itself.
    pub fn from_serialize<T>(input: &T) -> CoreResult<Self>
    where
        T: Serialize + ?Sized,
    {
        let mut doc = Self::new();
        doc.marshal(input)?;
        Ok(doc)
    }

    /// Creates a document that owns the given field map.
    #[must_use]
    pub fn from_fields(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// Returns the document id.
    ///
    /// # Errors
    ///
    /// - [`CoreError::IdNotFound`] if `_id` is absent
    /// - [`CoreError::InvalidId`] if `_id` is not text
    pub fn object_id(&self) -> CoreResult<String> {
        match self.get(OBJECT_ID_FIELD) {
            None => Err(CoreError::IdNotFound),
            Some(Value::Text(id)) => Ok(id.clone()),
            Some(other) => Err(CoreError::invalid_id(format!(
                "expected text, got {other:?}"
            ))),
        }
    }

    /// Returns the value at a dotted path, or `None` if any segment is
    /// absent or an intermediate is not a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        path::lookup(&self.fields, key)
    }

    /// Checks whether a dotted path resolves to a value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Normalizes a value and upserts it at a dotted path, creating
    /// intermediate maps as needed.
    ///
    /// # Errors
    ///
    /// Returns an error only if normalization fails.
    pub fn set<T>(&mut self, key: &str, value: &T) -> CoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        let normalized = to_value(value)?;
        self.set_value(key, normalized);
        Ok(())
    }

    /// Upserts an already-canonical value at a dotted path.
    pub fn set_value(&mut self, key: &str, value: Value) {
        path::upsert(&mut self.fields, key, value);
    }

    /// Applies a batch of path/value pairs.
    ///
    /// With `upsert` the pairs follow [`Document::set_value`] semantics.
    /// Without it, a pair whose full path does not already exist fails
    /// with [`CoreError::KeyNotFound`]; the batch stops at the first
    /// failure and earlier pairs stay applied.
    ///
    /// # Errors
    ///
    /// Returns the first strict-update failure.
    pub fn update<I>(&mut self, updates: I, upsert: bool) -> CoreResult<()>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in updates {
            if upsert {
                self.set_value(&key, value);
            } else if !path::update(&mut self.fields, &key, value) {
                return Err(CoreError::key_not_found(key));
            }
        }
        Ok(())
    }

    /// Returns an independent copy of the document's field map.
    #[must_use]
    pub fn map(&self) -> FieldMap {
        self.fields.clone()
    }

    /// Returns the document's dotted key paths, lexicographically sorted.
    ///
    /// With `include_subfields`, nested maps expand into dotted paths.
    #[must_use]
    pub fn fields(&self, include_subfields: bool) -> Vec<String> {
        path::keys(&self.fields, include_subfields)
    }

    /// Validates the reserved fields.
    ///
    /// # Errors
    ///
    /// - the [`Document::object_id`] errors when `_id` is absent or not text
    /// - [`CoreError::InvalidId`] when `_id` does not parse as a UUID
    /// - [`CoreError::InvalidExpiry`] when `_expiresAt` is present but is
    ///   not a timestamp
    pub fn validate(&self) -> CoreResult<()> {
        let id = self.object_id()?;
        Uuid::parse_str(&id).map_err(|err| CoreError::invalid_id(err.to_string()))?;

        match self.get(EXPIRES_AT_FIELD) {
            None | Some(Value::Timestamp(_)) => Ok(()),
            Some(other) => Err(CoreError::invalid_expiry(format!(
                "expected timestamp, got {other:?}"
            ))),
        }
    }

    /// Returns the instant at which this document expires, if one is set.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.get(EXPIRES_AT_FIELD).and_then(Value::as_timestamp)
    }

    /// Sets the expiry instant of this document.
    pub fn set_expires_at(&mut self, when: DateTime<Utc>) {
        self.set_value(EXPIRES_AT_FIELD, Value::Timestamp(when));
    }

    /// Serializes the field map to its binary form.
    ///
    /// # Errors
    ///
    /// Infallible today; kept fallible for parity with [`Document::decode`].
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(encode_map(&self.fields))
    }

    /// Replaces the document's fields with the decoded map.
    ///
    /// # Errors
    ///
    /// Fails on malformed bytes or a non-map payload. The document is
    /// left empty on failure, never half-mutated.
    pub fn decode(&mut self, bytes: &[u8]) -> CoreResult<()> {
        self.fields.clear();
        let decoded = decode_value(bytes)?;
        match decoded.into_map() {
            Some(fields) => {
                self.fields = fields;
                Ok(())
            }
            None => Err(CoreError::Unmarshallable),
        }
    }

    /// Replaces the document's fields with normalized input.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unmarshallable`] if the input does not
    /// normalize to a map; the fields are untouched on failure.
    pub fn marshal<T>(&mut self, from: &T) -> CoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        match to_value(from)?.into_map() {
            Some(fields) => {
                self.fields = fields;
                Ok(())
            }
            None => Err(CoreError::Unmarshallable),
        }
    }

    /// Projects the document's fields onto a typed record.
    ///
    /// # Errors
    ///
    /// Returns the denormalization error when shapes do not line up.
    pub fn unmarshal<T>(&self) -> CoreResult<T>
    where
        T: DeserializeOwned,
    {
        Ok(from_value(Value::Map(self.fields.clone()))?)
    }

    /// Renders the document as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the rendering error.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        FieldMap::deserialize(deserializer).map(|fields| Document { fields })
    }
}
