//! Dynamic value tree carried through the codec.
//!
//! A [`Value`] is either something JSON can express natively or a boxed
//! [`Composite`] of any registered Rust type.

use std::any::{Any, TypeId};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

use crate::error::{HookError, HookResult};
use crate::format::LoadOptions;
use crate::scope;

/// String-keyed mapping of dynamic values, in insertion order.
pub type Map = IndexMap<String, Value>;

/// Plain JSON object, as produced and consumed by `serde_json`.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A user-defined type that can travel through the codec.
///
/// Both hooks are optional capabilities: the defaults report "not provided"
/// and the strategy chains move on to the next strategy.
pub trait Composite: Any + Clone + PartialEq + fmt::Debug + Send + Sync {
    /// Describe `self` as a field mapping.
    ///
    /// Entries may hold further composites; they are encoded recursively.
    fn json_encode(&self) -> Option<HookResult<Map>> {
        None
    }

    /// Rebuild a value from its decoded field mapping (locator keys removed).
    fn json_decode(fields: &Map) -> Option<HookResult<Self>> {
        let _ = fields;
        None
    }
}

/// Object-safe face of [`Composite`], implemented for every composite type.
pub trait DynComposite: Any + fmt::Debug + Send + Sync {
    fn composite_type_id(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_box(&self) -> Box<dyn DynComposite>;
    fn dyn_eq(&self, other: &dyn DynComposite) -> bool;
    fn encode_hook(&self) -> Option<HookResult<Map>>;
}

impl<T: Composite> DynComposite for T {
    fn composite_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_box(&self) -> Box<dyn DynComposite> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynComposite) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn encode_hook(&self) -> Option<HookResult<Map>> {
        self.json_encode()
    }
}

impl Clone for Box<dyn DynComposite> {
    fn clone(&self) -> Self {
        self.as_ref().clone_box()
    }
}

impl PartialEq for dyn DynComposite {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

/// Any datum that can be serialized: a JSON primitive, a sequence, a
/// string-keyed mapping or a composite.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    Composite(Box<dyn DynComposite>),
}

impl Value {
    pub fn composite<T: Composite>(value: T) -> Self {
        Value::Composite(Box::new(value))
    }

    /// Float value; non-finite numbers have no JSON form and become `null`.
    pub fn float(value: f64) -> Self {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Composite(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the composite as `T` if it is one.
    pub fn as_composite<T: Composite>(&self) -> Option<&T> {
        match self {
            Value::Composite(c) => c.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Take the composite out as `T`, handing the value back on mismatch.
    pub fn into_composite<T: Composite>(self) -> Result<T, Value> {
        match self {
            Value::Composite(c) if c.composite_type_id() == TypeId::of::<T>() => c
                .into_any()
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| Value::Null),
            other => Err(other),
        }
    }

    /// Name of the value's kind, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
            Value::Composite(_) => "a composite",
        }
    }
}

/// Look up a required field of a decoded mapping.
pub fn field<'a>(fields: &'a Map, key: &str) -> HookResult<&'a Value> {
    fields
        .get(key)
        .ok_or_else(|| HookError::MissingField(key.to_string()))
}

/// Look up a required string field of a decoded mapping.
pub fn str_field<'a>(fields: &'a Map, key: &str) -> HookResult<&'a str> {
    field(fields, key)?
        .as_str()
        .ok_or_else(|| HookError::InvalidField {
            field: key.to_string(),
            expected: "a string",
        })
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::float(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::float(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ── serde ─────────────────────────────────────────────────────────────────

/// Plain values serialize as their JSON form. A composite serializes as its
/// tagged mapping while an [`Encoder`](crate::Encoder) is dumping fields, and
/// is rejected otherwise.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{Error, SerializeMap, SerializeSeq};

        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Composite(c) => {
                let Some(encoder) = scope::active_encoder() else {
                    return Err(S::Error::custom(format_args!(
                        "composite `{}` must go through an encoder",
                        c.type_name()
                    )));
                };
                match encoder.encode_composite(&**c) {
                    Ok(map) => map.serialize(serializer),
                    Err(err) => {
                        let message = err.to_string();
                        scope::record_failure(err);
                        Err(S::Error::custom(message))
                    }
                }
            }
        }
    }
}

/// Tagged objects are rebuilt into composites while a
/// [`Decoder`](crate::Decoder) is constructing a value; otherwise every
/// object stays a mapping.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let json = serde_json::Value::deserialize(deserializer)?;
        match scope::active_decoder() {
            Some(decoder) => decoder
                .decode(json, &LoadOptions::new())
                .map_err(D::Error::custom),
            None => Ok(Value::from(json)),
        }
    }
}
