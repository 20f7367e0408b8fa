//! # Carton Codec
//!
//! Value model, normalization and binary codec for cartondb.
//!
//! This crate provides:
//! - [`Value`], the closed set of variants a document field can hold
//! - [`to_value`]/[`from_value`], serde-driven normalization of arbitrary
//!   typed records into the value model and back
//! - [`encode_value`]/[`decode_value`], a compact self-describing binary
//!   form that round-trips every variant exactly
//!
//! ## Usage
//!
//! ```
//! use carton_codec::{decode_value, encode_value, from_value, to_value, Value};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     #[serde(rename = "name")]
//!     full_name: String,
//!     age: u32,
//! }
//!
//! let user = User { full_name: "Alice".into(), age: 30 };
//!
//! // Normalize into the value model
//! let value = to_value(&user).unwrap();
//! assert_eq!(value.get("name"), Some(&Value::Text("Alice".into())));
//!
//! // Through the binary form and back onto the record
//! let bytes = encode_value(&value);
//! let decoded = decode_value(&bytes).unwrap();
//! assert_eq!(from_value::<User>(decoded).unwrap(), user);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod de;
mod decoder;
mod encoder;
mod error;
mod ser;
mod value;

pub use de::{from_value, ValueDeserializer};
pub use decoder::{decode_value, Decoder};
pub use encoder::{encode_map, encode_value, Encoder};
pub use error::{CodecError, CodecResult};
pub use ser::{to_value, ValueSerializer};
pub use value::{Timestamp, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn normalize_encode_decode_denormalize() {
        let mut entries = BTreeMap::new();
        entries.insert("greeting".to_string(), Value::Text("hello".to_string()));
        entries.insert("count".to_string(), Value::UInt(2));
        let value = Value::Map(entries);

        let bytes = encode_value(&value);
        let decoded = decode_value(&bytes).unwrap();
        assert_eq!(decoded, value);

        let map: BTreeMap<String, Value> = from_value(decoded).unwrap();
        assert_eq!(map.get("count"), Some(&Value::UInt(2)));
    }
}
