//! Denormalization: projecting a [`Value`] back onto typed records.
//!
//! [`from_value`] drives any [`serde::Deserialize`] type from a deserializer
//! whose input is the value model. Renames arrive through the same serde
//! field attributes the normalizer consumes; nested records recurse through
//! nested maps; numeric widening and narrowing follow serde's visitor
//! conversions.

use crate::error::{CodecError, CodecResult};
use crate::value::{Timestamp, Value, TIMESTAMP_TOKEN};
use chrono::{DateTime, Utc};
use serde::de::{
    self, Deserialize, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, Visitor,
};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::vec;

/// Project a [`Value`] onto a typed record.
///
/// # Errors
///
/// Returns an error when the value's shape does not match the target type
/// and no serde coercion bridges the difference (e.g. narrowing an
/// out-of-range integer).
pub fn from_value<T>(value: Value) -> CodecResult<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// Deserializer whose input is a [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    /// Wrap a value for deserialization.
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Int(n) => Unexpected::Signed(*n),
        Value::UInt(n) => Unexpected::Unsigned(*n),
        Value::Float(f) => Unexpected::Float(*f),
        Value::Text(s) => Unexpected::Str(s),
        Value::Bytes(b) => Unexpected::Bytes(b),
        Value::Timestamp(_) => Unexpected::Other("timestamp"),
        Value::Array(_) => Unexpected::Seq,
        Value::Map(_) => Unexpected::Map,
    }
}

fn rfc3339(when: DateTime<Utc>) -> String {
    Timestamp::from(when).to_rfc3339()
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = CodecError;

    fn deserialize_any<V>(self, visitor: V) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(n) => visitor.visit_i64(n),
            Value::UInt(n) => visitor.visit_u64(n),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Text(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            // surfaces as a single-entry token map so an untyped target
            // (Value, Document) reconstructs the timestamp exactly
            Value::Timestamp(t) => visitor.visit_map(TimestampTokenAccess {
                text: Some(rfc3339(t)),
                key_served: false,
            }),
            Value::Array(items) => visitor.visit_seq(SeqDeserializer {
                iter: items.into_iter(),
            }),
            Value::Map(entries) => visitor.visit_map(MapDeserializer {
                iter: entries.into_iter(),
                value: None,
            }),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        if name == TIMESTAMP_TOKEN {
            return match self.value {
                Value::Timestamp(t) => visitor.visit_string(rfc3339(t)),
                Value::Text(s) => visitor.visit_string(s),
                other => Err(de::Error::invalid_type(unexpected(&other), &"a timestamp")),
            };
        }
        visitor.visit_newtype_struct(self)
    }

    // timestamps degrade to RFC 3339 text for string-shaped targets,
    // which is how plain chrono instants deserialize
    fn deserialize_str<V>(self, visitor: V) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Timestamp(t) => visitor.visit_string(rfc3339(t)),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Text(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: None,
            }),
            Value::Map(entries) => {
                let mut iter = entries.into_iter();
                let (variant, value) = match iter.next() {
                    Some(entry) => entry,
                    None => {
                        return Err(de::Error::invalid_value(
                            Unexpected::Map,
                            &"a map with a single variant key",
                        ))
                    }
                };
                if iter.next().is_some() {
                    return Err(de::Error::invalid_value(
                        Unexpected::Map,
                        &"a map with a single variant key",
                    ));
                }
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value: Some(value),
                })
            }
            other => Err(de::Error::invalid_type(
                unexpected(&other),
                &"a variant name or single-entry map",
            )),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

struct SeqDeserializer {
    iter: vec::IntoIter<Value>,
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = CodecError;

    fn next_element_seed<T>(&mut self, seed: T) -> CodecResult<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: btree_map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = CodecError;

    fn next_key_seed<K>(&mut self, seed: K) -> CodecResult<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::Text(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> CodecResult<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

/// Single-entry map access carrying a timestamp through untyped targets.
struct TimestampTokenAccess {
    text: Option<String>,
    key_served: bool,
}

impl<'de> MapAccess<'de> for TimestampTokenAccess {
    type Error = CodecError;

    fn next_key_seed<K>(&mut self, seed: K) -> CodecResult<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.key_served || self.text.is_none() {
            return Ok(None);
        }
        self.key_served = true;
        seed.deserialize(ValueDeserializer::new(Value::Text(
            TIMESTAMP_TOKEN.to_string(),
        )))
        .map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> CodecResult<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.text.take() {
            Some(text) => seed.deserialize(ValueDeserializer::new(Value::Text(text))),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(1)
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = CodecError;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> CodecResult<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::Text(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = CodecError;

    fn unit_variant(self) -> CodecResult<()> {
        match self.value {
            None => Ok(()),
            Some(value) => Err(de::Error::invalid_type(
                unexpected(&value),
                &"unit variant",
            )),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> CodecResult<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(de::Error::invalid_type(
                Unexpected::UnitVariant,
                &"newtype variant",
            )),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(items)) => visitor.visit_seq(SeqDeserializer {
                iter: items.into_iter(),
            }),
            Some(value) => Err(de::Error::invalid_type(
                unexpected(&value),
                &"tuple variant",
            )),
            None => Err(de::Error::invalid_type(
                Unexpected::UnitVariant,
                &"tuple variant",
            )),
        }
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Map(entries)) => visitor.visit_map(MapDeserializer {
                iter: entries.into_iter(),
                value: None,
            }),
            Some(value) => Err(de::Error::invalid_type(
                unexpected(&value),
                &"struct variant",
            )),
            None => Err(de::Error::invalid_type(
                Unexpected::UnitVariant,
                &"struct variant",
            )),
        }
    }
}

impl<'de> IntoDeserializer<'de, CodecError> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> Self::Deserializer {
        ValueDeserializer::new(self)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("any document value")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::UInt(v))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Text(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Text(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bytes(v))
            }

            fn visit_unit<E>(self) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_seq<A>(self, mut access: A) -> Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(item) = access.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = BTreeMap::new();
                let first_key: String = match access.next_key()? {
                    Some(key) => key,
                    None => return Ok(Value::Map(entries)),
                };
                if first_key == TIMESTAMP_TOKEN {
                    let text: String = access.next_value()?;
                    let when = DateTime::parse_from_rfc3339(&text)
                        .map_err(de::Error::custom)?
                        .with_timezone(&Utc);
                    return Ok(Value::Timestamp(when));
                }
                let first_value: Value = access.next_value()?;
                entries.insert(first_key, first_value);
                while let Some((key, value)) = access.next_entry()? {
                    entries.insert(key, value);
                }
                Ok(Value::Map(entries))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an RFC 3339 timestamp")
            }

            fn visit_str<E>(self, v: &str) -> Result<Timestamp, E>
            where
                E: de::Error,
            {
                DateTime::parse_from_rfc3339(v)
                    .map(|t| Timestamp::from_datetime(t.with_timezone(&Utc)))
                    .map_err(de::Error::custom)
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Timestamp, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(self)
            }

            // token map produced when a timestamp travels through
            // buffering layers such as serde's flatten support
            fn visit_map<A>(self, mut access: A) -> Result<Timestamp, A::Error>
            where
                A: MapAccess<'de>,
            {
                let key: Option<String> = access.next_key()?;
                match key {
                    Some(ref k) if k == TIMESTAMP_TOKEN => {
                        let text: String = access.next_value()?;
                        self.visit_str(&text)
                    }
                    _ => Err(de::Error::custom("expected a timestamp token map")),
                }
            }
        }

        deserializer.deserialize_newtype_struct(TIMESTAMP_TOKEN, TimestampVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::to_value;
    use serde::{Deserialize, Serialize};

    fn text_map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Account {
        #[serde(rename = "name")]
        full_name: String,
        age: u32,
        balance: f64,
    }

    #[test]
    fn renamed_fields_project_back() {
        let value = text_map(&[
            ("name", Value::Text("Alice".to_string())),
            ("age", Value::UInt(30)),
            ("balance", Value::Float(12.5)),
        ]);

        let account: Account = from_value(value).unwrap();
        assert_eq!(
            account,
            Account {
                full_name: "Alice".to_string(),
                age: 30,
                balance: 12.5,
            }
        );
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        owner: Account,
        tags: Vec<String>,
    }

    #[test]
    fn nested_records_recurse() {
        let value = text_map(&[
            (
                "owner",
                text_map(&[
                    ("name", Value::Text("Bob".to_string())),
                    ("age", Value::UInt(41)),
                    ("balance", Value::Float(0.0)),
                ]),
            ),
            (
                "tags",
                Value::Array(vec![
                    Value::Text("a".to_string()),
                    Value::Text("b".to_string()),
                ]),
            ),
        ]);

        let profile: Profile = from_value(value).unwrap();
        assert_eq!(profile.owner.full_name, "Bob");
        assert_eq!(profile.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn numeric_coercion_respects_ranges() {
        assert_eq!(from_value::<u8>(Value::Int(5)).unwrap(), 5);
        assert_eq!(from_value::<i32>(Value::UInt(7)).unwrap(), 7);
        assert_eq!(from_value::<f64>(Value::Int(3)).unwrap(), 3.0);
        assert!(from_value::<u8>(Value::Int(300)).is_err());
        assert!(from_value::<u32>(Value::Int(-1)).is_err());
    }

    #[test]
    fn wrong_shapes_fail() {
        assert!(from_value::<i64>(Value::Text("five".to_string())).is_err());
        assert!(from_value::<String>(Value::Array(vec![])).is_err());
    }

    #[test]
    fn options_and_missing_fields() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Sparse {
            required: i64,
            optional: Option<String>,
        }

        let populated: Sparse = from_value(text_map(&[
            ("required", Value::Int(1)),
            ("optional", Value::Text("x".to_string())),
        ]))
        .unwrap();
        assert_eq!(populated.optional, Some("x".to_string()));

        let absent: Sparse = from_value(text_map(&[("required", Value::Int(1))])).unwrap();
        assert_eq!(absent.optional, None);

        let null: Sparse = from_value(text_map(&[
            ("required", Value::Int(1)),
            ("optional", Value::Null),
        ]))
        .unwrap();
        assert_eq!(null.optional, None);
    }

    #[test]
    fn timestamps_project_exactly() {
        let now = Timestamp::now();
        let exact: Timestamp = from_value(Value::Timestamp(now.datetime())).unwrap();
        assert_eq!(exact, now);

        let chrono_target: DateTime<Utc> = from_value(Value::Timestamp(now.datetime())).unwrap();
        assert_eq!(chrono_target, now.datetime());
    }

    #[test]
    fn untyped_targets_keep_timestamps() {
        let now = Timestamp::now();
        let value = text_map(&[("when", Value::Timestamp(now.datetime()))]);
        let roundtripped: Value = from_value(value.clone()).unwrap();
        assert_eq!(roundtripped, value);
    }

    #[test]
    fn value_identity() {
        let value = text_map(&[
            ("n", Value::Int(-3)),
            ("u", Value::UInt(3)),
            ("blob", Value::Bytes(vec![1, 2])),
            ("list", Value::Array(vec![Value::Null, Value::Bool(true)])),
        ]);
        assert_eq!(from_value::<Value>(value.clone()).unwrap(), value);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Status {
        Idle,
        Busy { queue: u32 },
    }

    #[test]
    fn enums_roundtrip() {
        for status in [Status::Idle, Status::Busy { queue: 4 }] {
            let value = to_value(&status).unwrap();
            let back: Status = from_value(value).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn serialize_then_deserialize_is_identity() {
        let account = Account {
            full_name: "Carol".to_string(),
            age: 28,
            balance: 99.25,
        };
        let value = to_value(&account).unwrap();
        let back: Account = from_value(value).unwrap();
        assert_eq!(back, account);
    }
}
