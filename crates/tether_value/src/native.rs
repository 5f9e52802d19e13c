//! Typed values as seen by native module implementations

use crate::token::{CallbackToken, TokenPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest integer an f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Type tag of a marshalled value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTag {
    Null,
    Bool,
    Number,
    String,
    Array,
    Map,
    Function,
    /// Accepts every tag
    Any,
}

impl ValueTag {
    /// Whether a value tagged `found` satisfies this expectation
    #[inline]
    pub fn accepts(self, found: ValueTag) -> bool {
        self == ValueTag::Any || self == found
    }

    /// Lowercase name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Function => "function",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected shape of one method parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamSpec {
    /// Required tag
    pub tag: ValueTag,
    /// Whether null/undefined (or omission, for trailing parameters) is allowed
    pub optional: bool,
    /// Token policy when `tag` is [`ValueTag::Function`]
    pub policy: TokenPolicy,
}

impl ParamSpec {
    /// A required parameter
    pub const fn required(tag: ValueTag) -> Self {
        Self {
            tag,
            optional: false,
            policy: TokenPolicy::SingleUse,
        }
    }

    /// An optional parameter
    pub const fn optional(tag: ValueTag) -> Self {
        Self {
            tag,
            optional: true,
            policy: TokenPolicy::SingleUse,
        }
    }

    /// A single-use callback parameter
    pub const fn callback() -> Self {
        Self::required(ValueTag::Function)
    }

    /// A callback parameter that may fire any number of times
    pub const fn listener() -> Self {
        Self {
            tag: ValueTag::Function,
            optional: false,
            policy: TokenPolicy::MultiUse,
        }
    }
}

impl From<ValueTag> for ParamSpec {
    fn from(tag: ValueTag) -> Self {
        Self::required(tag)
    }
}

/// A typed value on the native side
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    /// Canonical double-precision number
    Number(f64),
    String(String),
    Array(Vec<NativeValue>),
    Map(BTreeMap<String, NativeValue>),
    /// Invocation token standing in for a scripting function
    Function(CallbackToken),
}

impl NativeValue {
    /// Get the tag of this value
    pub fn tag(&self) -> ValueTag {
        match self {
            Self::Null => ValueTag::Null,
            Self::Bool(_) => ValueTag::Bool,
            Self::Number(_) => ValueTag::Number,
            Self::String(_) => ValueTag::String,
            Self::Array(_) => ValueTag::Array,
            Self::Map(_) => ValueTag::Map,
            Self::Function(_) => ValueTag::Function,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as f32 (lossy narrowing)
    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|n| n as f32)
    }

    /// Try to get as an integer.
    ///
    /// Fails for fractional, non-finite or unsafe-range numbers rather than
    /// silently truncating.
    pub fn as_i64(&self) -> Option<i64> {
        let n = self.as_f64()?;
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Some(n as i64)
        } else {
            None
        }
    }

    /// Try to get as i32
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|n| i32::try_from(n).ok())
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as array
    pub fn as_array(&self) -> Option<&[NativeValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as map
    pub fn as_map(&self) -> Option<&BTreeMap<String, NativeValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Try to get as callback token
    pub fn as_callback(&self) -> Option<&CallbackToken> {
        match self {
            Self::Function(token) => Some(token),
            _ => None,
        }
    }

    /// Take the callback token out of this value
    pub fn into_callback(self) -> Option<CallbackToken> {
        match self {
            Self::Function(token) => Some(token),
            _ => None,
        }
    }

    /// Get a field from a map value
    pub fn get(&self, key: &str) -> Option<&NativeValue> {
        self.as_map()?.get(key)
    }
}

impl Default for NativeValue {
    fn default() -> Self {
        Self::Null
    }
}

impl From<()> for NativeValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        Self::Number(v as f64)
    }
}

impl From<u32> for NativeValue {
    fn from(v: u32) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f32> for NativeValue {
    fn from(v: f32) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<CallbackToken> for NativeValue {
    fn from(v: CallbackToken) -> Self {
        Self::Function(v)
    }
}

impl<T: Into<NativeValue>> From<Vec<T>> for NativeValue {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<NativeValue>> FromIterator<(K, V)> for NativeValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
