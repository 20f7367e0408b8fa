//! Normalization: arbitrary serializable input into [`Value`].
//!
//! [`to_value`] drives any [`serde::Serialize`] type through a serializer
//! whose output is the value model itself. Field renames, omit-empty and
//! embedded-record flattening arrive through the standard serde field
//! attributes (`rename`, `skip_serializing_if`, `flatten`).

use crate::error::{CodecError, CodecResult};
use crate::value::{Timestamp, Value, TIMESTAMP_TOKEN};
use chrono::{DateTime, Utc};
use serde::ser::{self, Impossible, Serialize};
use std::collections::BTreeMap;

/// Normalize any serializable input into a [`Value`].
///
/// Shape mapping:
/// - unit, `None` and unit structs become [`Value::Null`]; `Some` unwraps
/// - signed integers widen to [`Value::Int`], unsigned to [`Value::UInt`],
///   floats to [`Value::Float`]
/// - types that self-serialize as raw bytes become [`Value::Bytes`] and are
///   never decomposed element-by-element
/// - sequences and tuples become [`Value::Array`], elements recursively
/// - maps become [`Value::Map`]; non-text keys are rejected
/// - structs become [`Value::Map`] keyed by (possibly renamed) field name
/// - [`Timestamp`] fields become [`Value::Timestamp`]
/// - a [`Value`] input passes through unchanged
///
/// # Errors
///
/// Returns [`CodecError::KeyMustBeText`] for non-text map keys and
/// [`CodecError::UnsupportedType`] for values with no mapping into the
/// model (e.g. 128-bit integers beyond the 64-bit range).
pub fn to_value<T>(input: &T) -> CodecResult<Value>
where
    T: Serialize + ?Sized,
{
    input.serialize(ValueSerializer)
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Timestamp(t) => Timestamp::from(*t).serialize(serializer),
            Value::Array(items) => {
                use ser::SerializeSeq as _;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                use ser::SerializeMap as _;
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &self.to_rfc3339())
    }
}

/// Serializer whose output type is [`Value`].
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = CodecError;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> CodecResult<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> CodecResult<Value> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> CodecResult<Value> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> CodecResult<Value> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> CodecResult<Value> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> CodecResult<Value> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| CodecError::unsupported_type("i128"))
    }

    fn serialize_u8(self, v: u8) -> CodecResult<Value> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> CodecResult<Value> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> CodecResult<Value> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> CodecResult<Value> {
        Ok(Value::UInt(v))
    }

    fn serialize_u128(self, v: u128) -> CodecResult<Value> {
        u64::try_from(v)
            .map(Value::UInt)
            .map_err(|_| CodecError::unsupported_type("u128"))
    }

    fn serialize_f32(self, v: f32) -> CodecResult<Value> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> CodecResult<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> CodecResult<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> CodecResult<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> CodecResult<Value> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> CodecResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> CodecResult<Value>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> CodecResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CodecResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> CodecResult<Value> {
        Ok(Value::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> CodecResult<Value>
    where
        T: Serialize + ?Sized,
    {
        if name == TIMESTAMP_TOKEN {
            return match value.serialize(ValueSerializer)? {
                Value::Text(text) => parse_timestamp(&text).map(Value::Timestamp),
                _ => Err(CodecError::invalid_timestamp("token payload must be text")),
            };
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> CodecResult<Value>
    where
        T: Serialize + ?Sized,
    {
        let mut entries = BTreeMap::new();
        entries.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::Map(entries))
    }

    fn serialize_seq(self, len: Option<usize>) -> CodecResult<Self::SerializeSeq> {
        Ok(SerializeArray {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> CodecResult<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> CodecResult<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> CodecResult<Self::SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> CodecResult<Self::SerializeMap> {
        Ok(SerializeMap {
            entries: BTreeMap::new(),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStruct> {
        self.serialize_map(None)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant,
            entries: BTreeMap::new(),
        })
    }
}

fn parse_timestamp(text: &str) -> CodecResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| CodecError::invalid_timestamp(err.to_string()))
}

/// Builder for [`Value::Array`].
pub struct SerializeArray {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SerializeArray {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SerializeArray {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> CodecResult<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeArray {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> CodecResult<Value> {
        ser::SerializeSeq::end(self)
    }
}

/// Builder for an externally tagged tuple variant.
pub struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Value> {
        let mut entries = BTreeMap::new();
        entries.insert(self.variant.to_string(), Value::Array(self.items));
        Ok(Value::Map(entries))
    }
}

/// Builder for [`Value::Map`], shared by maps and structs.
///
/// Flattened embedded records re-enter through `serialize_entry`, so their
/// keys land directly in the parent map.
pub struct SerializeMap {
    entries: BTreeMap<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_key<T>(&mut self, key: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ser::Error::custom("serialize_value called before serialize_key"))?;
        self.entries.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Map(self.entries))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, name: &'static str, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.entries
            .insert(name.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Value> {
        Ok(Value::Map(self.entries))
    }
}

/// Builder for an externally tagged struct variant.
pub struct SerializeStructVariant {
    variant: &'static str,
    entries: BTreeMap<String, Value>,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, name: &'static str, value: &T) -> CodecResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.entries
            .insert(name.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Value> {
        let mut outer = BTreeMap::new();
        outer.insert(self.variant.to_string(), Value::Map(self.entries));
        Ok(Value::Map(outer))
    }
}

/// Map keys must serialize as text.
struct MapKeySerializer;

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = CodecError;

    type SerializeSeq = Impossible<String, CodecError>;
    type SerializeTuple = Impossible<String, CodecError>;
    type SerializeTupleStruct = Impossible<String, CodecError>;
    type SerializeTupleVariant = Impossible<String, CodecError>;
    type SerializeMap = Impossible<String, CodecError>;
    type SerializeStruct = Impossible<String, CodecError>;
    type SerializeStructVariant = Impossible<String, CodecError>;

    fn serialize_str(self, v: &str) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> CodecResult<String> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> CodecResult<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> CodecResult<String>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_i8(self, _v: i8) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_i16(self, _v: i16) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_i32(self, _v: i32) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_i64(self, _v: i64) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_u8(self, _v: u8) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_u16(self, _v: u16) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_u32(self, _v: u32) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_u64(self, _v: u64) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_f32(self, _v: f32) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_f64(self, _v: f64) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_bytes(self, _v: &[u8]) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_none(self) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_some<T>(self, _value: &T) -> CodecResult<String>
    where
        T: Serialize + ?Sized,
    {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_unit(self) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CodecResult<String> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> CodecResult<String>
    where
        T: Serialize + ?Sized,
    {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_seq(self, _len: Option<usize>) -> CodecResult<Self::SerializeSeq> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_tuple(self, _len: usize) -> CodecResult<Self::SerializeTuple> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeTupleStruct> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeTupleVariant> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_map(self, _len: Option<usize>) -> CodecResult<Self::SerializeMap> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStruct> {
        Err(CodecError::KeyMustBeText)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStructVariant> {
        Err(CodecError::KeyMustBeText)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    fn text_map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn primitives_widen_by_signedness() {
        assert_eq!(to_value(&-7i8).unwrap(), Value::Int(-7));
        assert_eq!(to_value(&-7i16).unwrap(), Value::Int(-7));
        assert_eq!(to_value(&-7i64).unwrap(), Value::Int(-7));
        assert_eq!(to_value(&7u8).unwrap(), Value::UInt(7));
        assert_eq!(to_value(&7u16).unwrap(), Value::UInt(7));
        assert_eq!(to_value(&u64::MAX).unwrap(), Value::UInt(u64::MAX));
        assert_eq!(to_value(&1.5f32).unwrap(), Value::Float(1.5));
        assert_eq!(to_value(&true).unwrap(), Value::Bool(true));
        assert_eq!(to_value("hi").unwrap(), Value::Text("hi".to_string()));
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(to_value(&Option::<i64>::None).unwrap(), Value::Null);
        assert_eq!(to_value(&Some(3i64)).unwrap(), Value::Int(3));
        assert_eq!(to_value(&()).unwrap(), Value::Null);
    }

    #[test]
    fn byte_strings_stay_terminal() {
        let blob = bytes::Bytes::from_static(&[1, 2, 3]);
        assert_eq!(to_value(&blob).unwrap(), Value::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn sequences_normalize_elementwise() {
        assert_eq!(
            to_value(&vec![1i32, 2, 3]).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            to_value(&("a", 1u32)).unwrap(),
            Value::Array(vec![Value::Text("a".to_string()), Value::UInt(1)])
        );
    }

    #[test]
    fn string_keyed_maps_normalize() {
        let mut input = HashMap::new();
        input.insert("n".to_string(), 1i64);
        assert_eq!(to_value(&input).unwrap(), text_map(&[("n", Value::Int(1))]));
    }

    #[test]
    fn non_text_map_keys_rejected() {
        let mut input = HashMap::new();
        input.insert(1i64, "x");
        assert_eq!(to_value(&input), Err(CodecError::KeyMustBeText));
    }

    #[test]
    fn oversized_int128_rejected() {
        assert!(matches!(
            to_value(&(i128::from(i64::MAX) + 1)),
            Err(CodecError::UnsupportedType { .. })
        ));
        assert_eq!(to_value(&5i128).unwrap(), Value::Int(5));
    }

    #[derive(Serialize)]
    struct Annotated {
        #[serde(rename = "name")]
        full_name: String,
        #[serde(skip_serializing_if = "String::is_empty")]
        nickname: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        active: bool,
    }

    #[test]
    fn rename_and_omit_empty() {
        let value = to_value(&Annotated {
            full_name: "Alice".to_string(),
            nickname: String::new(),
            address: None,
            active: false,
        })
        .unwrap();

        assert_eq!(
            value,
            text_map(&[
                ("name", Value::Text("Alice".to_string())),
                // an explicit false is never considered empty
                ("active", Value::Bool(false)),
            ])
        );
    }

    #[test]
    fn populated_optional_fields_kept_under_annotated_name() {
        let value = to_value(&Annotated {
            full_name: "Alice".to_string(),
            nickname: "Al".to_string(),
            address: Some("42 Elm".to_string()),
            active: true,
        })
        .unwrap();

        assert_eq!(value.get("nickname"), Some(&Value::Text("Al".to_string())));
        assert_eq!(value.get("address"), Some(&Value::Text("42 Elm".to_string())));
    }

    #[derive(Serialize)]
    struct Coordinates {
        x: i64,
        y: i64,
    }

    #[derive(Serialize)]
    struct Place {
        label: String,
        #[serde(flatten)]
        position: Coordinates,
    }

    #[test]
    fn embedded_records_flatten() {
        let value = to_value(&Place {
            label: "origin".to_string(),
            position: Coordinates { x: 1, y: 2 },
        })
        .unwrap();

        assert_eq!(
            value,
            text_map(&[
                ("label", Value::Text("origin".to_string())),
                ("x", Value::Int(1)),
                ("y", Value::Int(2)),
            ])
        );
    }

    #[test]
    fn timestamps_stay_timestamps() {
        let now = Timestamp::now();
        assert_eq!(
            to_value(&now).unwrap(),
            Value::Timestamp(now.datetime())
        );
    }

    #[test]
    fn canonical_values_pass_through() {
        let original = text_map(&[
            ("n", Value::UInt(9)),
            ("blob", Value::Bytes(vec![0xde, 0xad])),
            ("when", Value::Timestamp(Timestamp::now().datetime())),
            ("nested", text_map(&[("ok", Value::Bool(true))])),
        ]);
        assert_eq!(to_value(&original).unwrap(), original);
    }

    #[test]
    fn foreign_formats_render_timestamps_as_text() {
        let when = Timestamp::now();
        let json = serde_json::to_string(&Value::Timestamp(when.datetime())).unwrap();
        assert_eq!(json, format!("\"{when}\""));
    }

    #[derive(Serialize)]
    enum Shape {
        Point,
        Circle { radius: f64 },
        Pair(i64, i64),
    }

    #[test]
    fn enum_variants_follow_external_tagging() {
        assert_eq!(
            to_value(&Shape::Point).unwrap(),
            Value::Text("Point".to_string())
        );
        assert_eq!(
            to_value(&Shape::Circle { radius: 2.0 }).unwrap(),
            text_map(&[("Circle", text_map(&[("radius", Value::Float(2.0))]))])
        );
        assert_eq!(
            to_value(&Shape::Pair(1, 2)).unwrap(),
            text_map(&[("Pair", Value::Array(vec![Value::Int(1), Value::Int(2)]))])
        );
    }
}
