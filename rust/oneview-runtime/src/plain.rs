//! Conversion of render payloads into plain JSON data.
//!
//! Everything stored on a view instance is plain data: maps, arrays and
//! scalars. Values reach that form in one of three ways:
//!
//! - types implementing [`ToPlainData`] convert themselves explicitly
//! - `serde::Serialize` types go through [`PlainData::serialize`], which
//!   enumerates their public (serialized) fields
//! - anything else that is `Display` becomes a string via [`PlainData::display`]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Explicit conversion into plain data.
pub trait ToPlainData {
    fn to_plain_data(&self) -> Value;
}

/// A deep-converted payload ready to be stored and exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlainData(Value);

impl PlainData {
    pub fn null() -> Self {
        Self(Value::Null)
    }

    pub fn convert<T: ToPlainData + ?Sized>(value: &T) -> Self {
        Self(value.to_plain_data())
    }

    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Self)
    }

    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        Self(Value::String(value.to_string()))
    }

    /// Serializes `value`, falling back to its `Display` form when
    /// serialization fails (e.g. a map with non-string keys).
    pub fn serialize_or_display<T: Serialize + fmt::Display + ?Sized>(value: &T) -> Self {
        match Self::serialize(value) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(error = %err, "falling back to display conversion");
                Self::display(value)
            }
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Display for PlainData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Value> for PlainData {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<PlainData> for Value {
    fn from(data: PlainData) -> Self {
        data.0
    }
}

impl From<&str> for PlainData {
    fn from(value: &str) -> Self {
        Self(Value::from(value))
    }
}

impl From<String> for PlainData {
    fn from(value: String) -> Self {
        Self(Value::from(value))
    }
}

impl From<bool> for PlainData {
    fn from(value: bool) -> Self {
        Self(Value::from(value))
    }
}

impl From<i64> for PlainData {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<f64> for PlainData {
    fn from(value: f64) -> Self {
        Self(Value::from(value))
    }
}

impl From<Map<String, Value>> for PlainData {
    fn from(value: Map<String, Value>) -> Self {
        Self(Value::Object(value))
    }
}

impl ToPlainData for Value {
    fn to_plain_data(&self) -> Value {
        self.clone()
    }
}

impl ToPlainData for PlainData {
    fn to_plain_data(&self) -> Value {
        self.0.clone()
    }
}

impl ToPlainData for str {
    fn to_plain_data(&self) -> Value {
        Value::from(self)
    }
}

impl ToPlainData for String {
    fn to_plain_data(&self) -> Value {
        Value::from(self.as_str())
    }
}

macro_rules! scalar_to_plain_data {
    ($($ty:ty),*) => {
        $(
            impl ToPlainData for $ty {
                fn to_plain_data(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

scalar_to_plain_data!(bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl<T: ToPlainData> ToPlainData for Option<T> {
    fn to_plain_data(&self) -> Value {
        match self {
            Some(value) => value.to_plain_data(),
            None => Value::Null,
        }
    }
}

impl<T: ToPlainData> ToPlainData for [T] {
    fn to_plain_data(&self) -> Value {
        Value::Array(self.iter().map(ToPlainData::to_plain_data).collect())
    }
}

impl<T: ToPlainData> ToPlainData for Vec<T> {
    fn to_plain_data(&self) -> Value {
        self.as_slice().to_plain_data()
    }
}

impl<T: ToPlainData> ToPlainData for BTreeMap<String, T> {
    fn to_plain_data(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, value)| (key.clone(), value.to_plain_data()))
                .collect(),
        )
    }
}

impl<T: ToPlainData> ToPlainData for HashMap<String, T> {
    fn to_plain_data(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, value)| (key.clone(), value.to_plain_data()))
                .collect(),
        )
    }
}

impl<T: ToPlainData + ?Sized> ToPlainData for &T {
    fn to_plain_data(&self) -> Value {
        (**self).to_plain_data()
    }
}
