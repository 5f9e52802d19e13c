//! The scripting layer's dynamic value model
//!
//! The scripting engine itself lives outside this workspace. `ScriptValue`
//! is the shape in which its values arrive at, and leave, the bridge.

use crate::native::ValueTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque reference to a function owned by the scripting runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionRef(u64);

impl FunctionRef {
    /// Wrap a runtime-assigned function handle
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// A dynamic value as seen by the scripting layer
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// Absent value (`undefined`)
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number (always double precision)
    Number(f64),
    /// String
    String(String),
    /// Array of values
    Array(Vec<ScriptValue>),
    /// Plain object keyed by string
    Object(BTreeMap<String, ScriptValue>),
    /// Function living in the scripting runtime
    Function(FunctionRef),
}

impl ScriptValue {
    /// The tag this value presents to the marshaller.
    ///
    /// `undefined` and `null` both present as [`ValueTag::Null`].
    pub fn tag(&self) -> ValueTag {
        match self {
            Self::Undefined | Self::Null => ValueTag::Null,
            Self::Bool(_) => ValueTag::Bool,
            Self::Number(_) => ValueTag::Number,
            Self::String(_) => ValueTag::String,
            Self::Array(_) => ValueTag::Array,
            Self::Object(_) => ValueTag::Map,
            Self::Function(_) => ValueTag::Function,
        }
    }

    /// Get type name as the scripting layer would report it
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Check for `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Try to get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as function
    pub fn as_function(&self) -> Option<FunctionRef> {
        match self {
            Self::Function(f) => Some(*f),
            _ => None,
        }
    }

    /// Get a field from an object value
    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Build from a JSON document
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON.
    ///
    /// Returns `None` when the value contains a function or a non-finite
    /// number, neither of which JSON can carry. `undefined` renders as null.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(serde_json::Number::from_f64(*n)?),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(
                items.iter().map(Self::to_json).collect::<Option<Vec<_>>>()?,
            ),
            Self::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(out)
            }
            Self::Function(_) => return None,
        })
    }
}

impl Default for ScriptValue {
    fn default() -> Self {
        Self::Undefined
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<FunctionRef> for ScriptValue {
    fn from(v: FunctionRef) -> Self {
        Self::Function(v)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(v: Vec<ScriptValue>) -> Self {
        Self::Array(v)
    }
}

impl<K: Into<String>, V: Into<ScriptValue>> FromIterator<(K, V)> for ScriptValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
