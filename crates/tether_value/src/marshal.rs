//! Conversion between scripting and native values

use crate::error::{MarshalError, Result};
use crate::native::{NativeValue, ParamSpec, ValueTag};
use crate::script::ScriptValue;
use crate::token::{CallbackDispatch, CallbackToken, Correlation, DetachedDispatch, TokenPolicy};
use serde::Deserialize;
use std::sync::Arc;

/// Configuration for value marshalling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarshalConfig {
    /// Maximum container nesting accepted from the scripting side
    pub max_depth: usize,
    /// Policy for functions found inside arrays and maps
    pub nested_function_policy: TokenPolicy,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            nested_function_policy: TokenPolicy::SingleUse,
        }
    }
}

/// Converts values across the scripting boundary.
///
/// A marshaller is cheap to clone. [`Marshaller::scoped`] produces a copy
/// whose tokens are tagged with a specific invocation.
#[derive(Clone)]
pub struct Marshaller {
    config: MarshalConfig,
    dispatch: Arc<dyn CallbackDispatch>,
    correlation: Correlation,
}

impl Marshaller {
    /// Create a marshaller whose tokens go nowhere
    pub fn new(config: MarshalConfig) -> Self {
        Self::with_dispatch(config, Arc::new(DetachedDispatch))
    }

    /// Create a marshaller whose tokens dispatch through `dispatch`
    pub fn with_dispatch(config: MarshalConfig, dispatch: Arc<dyn CallbackDispatch>) -> Self {
        Self {
            config,
            dispatch,
            correlation: Correlation::NONE,
        }
    }

    /// A copy that tags created tokens with `correlation`
    pub fn scoped(&self, correlation: Correlation) -> Self {
        Self {
            correlation,
            ..self.clone()
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Convert a scripting value into a native value of the expected tag
    pub fn to_native(&self, value: &ScriptValue, expected: ValueTag) -> Result<NativeValue> {
        self.to_native_param(value, &ParamSpec::required(expected))
    }

    /// Convert a scripting value against a full parameter spec.
    ///
    /// Optional parameters accept null/undefined and yield [`NativeValue::Null`].
    pub fn to_native_param(&self, value: &ScriptValue, spec: &ParamSpec) -> Result<NativeValue> {
        if spec.optional && value.is_nullish() {
            return Ok(NativeValue::Null);
        }

        let found = value.tag();
        if !spec.tag.accepts(found) {
            return Err(MarshalError::TypeMismatch {
                expected: spec.tag,
                found,
                path: String::new(),
            });
        }

        let mut path = String::new();
        self.convert(value, 0, spec.policy, &mut path)
    }

    fn convert(
        &self,
        value: &ScriptValue,
        depth: usize,
        policy: TokenPolicy,
        path: &mut String,
    ) -> Result<NativeValue> {
        if depth > self.config.max_depth {
            return Err(MarshalError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        let nested = self.config.nested_function_policy;
        Ok(match value {
            ScriptValue::Undefined | ScriptValue::Null => NativeValue::Null,
            ScriptValue::Bool(b) => NativeValue::Bool(*b),
            ScriptValue::Number(n) => NativeValue::Number(*n),
            ScriptValue::String(s) => NativeValue::String(s.clone()),
            ScriptValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let mark = path.len();
                    path.push_str(&format!("[{}]", i));
                    out.push(self.convert(item, depth + 1, nested, path)?);
                    path.truncate(mark);
                }
                NativeValue::Array(out)
            }
            ScriptValue::Object(map) => {
                let mut out = std::collections::BTreeMap::new();
                for (key, item) in map {
                    let mark = path.len();
                    path.push('.');
                    path.push_str(key);
                    out.insert(key.clone(), self.convert(item, depth + 1, nested, path)?);
                    path.truncate(mark);
                }
                NativeValue::Map(out)
            }
            ScriptValue::Function(function) => NativeValue::Function(CallbackToken::new(
                *function,
                policy,
                self.correlation,
                Arc::clone(&self.dispatch),
            )),
        })
    }

    /// Convert a native value back into a scripting value.
    ///
    /// Total: every native value has a scripting counterpart. Tokens map back
    /// to the function they were created from.
    pub fn to_dynamic(&self, value: &NativeValue) -> ScriptValue {
        to_dynamic(value)
    }
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new(MarshalConfig::default())
    }
}

/// Convert a native value into a scripting value
pub fn to_dynamic(value: &NativeValue) -> ScriptValue {
    match value {
        NativeValue::Null => ScriptValue::Null,
        NativeValue::Bool(b) => ScriptValue::Bool(*b),
        NativeValue::Number(n) => ScriptValue::Number(*n),
        NativeValue::String(s) => ScriptValue::String(s.clone()),
        NativeValue::Array(items) => ScriptValue::Array(items.iter().map(to_dynamic).collect()),
        NativeValue::Map(map) => ScriptValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_dynamic(v)))
                .collect(),
        ),
        NativeValue::Function(token) => ScriptValue::Function(token.function()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::FunctionRef;

    fn nested_arrays(depth: usize) -> ScriptValue {
        let mut value = ScriptValue::from(1);
        for _ in 0..depth {
            value = ScriptValue::Array(vec![value]);
        }
        value
    }

    #[test]
    fn test_round_trip_plain_values() {
        let m = Marshaller::default();
        let samples = [
            (ScriptValue::Null, ValueTag::Null),
            (ScriptValue::from(true), ValueTag::Bool),
            (ScriptValue::from(2.5), ValueTag::Number),
            (ScriptValue::from("hi"), ValueTag::String),
            (
                ScriptValue::Array(vec![ScriptValue::from(1), ScriptValue::from("x")]),
                ValueTag::Array,
            ),
            (
                [("a", ScriptValue::from(1)), ("b", ScriptValue::Null)]
                    .into_iter()
                    .collect(),
                ValueTag::Map,
            ),
        ];

        for (value, tag) in samples {
            let native = m.to_native(&value, tag).unwrap();
            assert_eq!(m.to_dynamic(&native), value, "round trip for {}", tag);
        }
    }

    #[test]
    fn test_function_round_trips_by_identity() {
        let m = Marshaller::default();
        let f = FunctionRef::new(17);

        let native = m.to_native(&ScriptValue::Function(f), ValueTag::Function).unwrap();
        let token = native.as_callback().unwrap().clone();

        assert_eq!(m.to_dynamic(&native), ScriptValue::Function(f));
        assert_eq!(NativeValue::Function(token.clone()), native);

        // A second conversion of the same function yields a distinct token.
        let again = m.to_native(&ScriptValue::Function(f), ValueTag::Function).unwrap();
        assert_ne!(again.as_callback().unwrap(), &token);
    }

    #[test]
    fn test_type_mismatch() {
        let m = Marshaller::default();
        let err = m.to_native(&ScriptValue::from("1"), ValueTag::Number).unwrap_err();
        assert_eq!(
            err,
            MarshalError::TypeMismatch {
                expected: ValueTag::Number,
                found: ValueTag::String,
                path: String::new(),
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let m = Marshaller::new(MarshalConfig {
            max_depth: 8,
            ..Default::default()
        });

        assert!(m.to_native(&nested_arrays(8), ValueTag::Array).is_ok());
        assert_eq!(
            m.to_native(&nested_arrays(9), ValueTag::Array).unwrap_err(),
            MarshalError::DepthExceeded { limit: 8 }
        );
    }

    #[test]
    fn test_pathologically_deep_input_fails_cleanly() {
        let m = Marshaller::default();
        let err = m.to_native(&nested_arrays(1_000), ValueTag::Any).unwrap_err();
        assert!(matches!(err, MarshalError::DepthExceeded { limit: 64 }));
    }

    #[test]
    fn test_optional_accepts_nullish() {
        let m = Marshaller::default();
        let spec = ParamSpec::optional(ValueTag::String);

        assert_eq!(m.to_native_param(&ScriptValue::Undefined, &spec), Ok(NativeValue::Null));
        assert!(m.to_native_param(&ScriptValue::from(1), &spec).is_err());
        assert!(m
            .to_native(&ScriptValue::Undefined, ValueTag::String)
            .is_err());
    }

    #[test]
    fn test_nested_function_policy_and_correlation() {
        let m = Marshaller::new(MarshalConfig {
            nested_function_policy: TokenPolicy::MultiUse,
            ..Default::default()
        })
        .scoped(Correlation::new(5));

        let value: ScriptValue = [("onTick", ScriptValue::Function(FunctionRef::new(1)))]
            .into_iter()
            .collect();
        let native = m.to_native(&value, ValueTag::Map).unwrap();
        let token = native.get("onTick").and_then(NativeValue::as_callback).unwrap();

        assert_eq!(token.policy(), TokenPolicy::MultiUse);
        assert_eq!(token.correlation(), Correlation::new(5));
    }
}
