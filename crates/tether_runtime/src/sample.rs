//! Sample module exercising every value tag and return convention

use std::collections::BTreeMap;
use tether_module::{MethodCall, MethodDescriptor, ModuleImpl, NativeError, NativeModule, Result};
use tether_value::{NativeValue, ValueTag};

/// Module name the sample registers under
pub const SAMPLE_MODULE: &str = "SampleTurboModule";

/// Echoes its arguments back and demonstrates callbacks and promises
#[derive(Debug, Default)]
pub struct SampleModule;

impl ModuleImpl for SampleModule {
    fn call(&self, mut call: MethodCall<'_>) -> std::result::Result<NativeValue, NativeError> {
        match call.method() {
            "voidFunc" => Ok(NativeValue::Null),
            "getBool" | "getNumber" | "getString" | "getArray" | "getObject" => {
                Ok(call.take_arg(0))
            }
            "getValue" => {
                let value: NativeValue = [
                    ("x", call.take_arg(0)),
                    ("y", call.take_arg(1)),
                    ("z", call.take_arg(2)),
                ]
                .into_iter()
                .collect();
                Ok(value)
            }
            "getValueWithCallback" => {
                let callback = call
                    .take_callback(0)
                    .ok_or_else(|| NativeError::message("callback expected"))?;
                callback
                    .invoke(vec![NativeValue::from("value from callback!")])
                    .map_err(|e| NativeError::message(e.to_string()))?;
                Ok(NativeValue::Null)
            }
            "getValueWithPromise" => {
                let fail = call.arg(0).and_then(NativeValue::as_bool).unwrap_or(false);
                let promise = call.take_promise().ok_or_else(|| {
                    NativeError::new(NativeError::NO_PROMISE, "promise expected")
                })?;
                if fail {
                    promise.reject(NativeError::new(
                        "E_SAMPLE",
                        "intentional promise rejection",
                    ));
                } else {
                    promise.resolve("result!");
                }
                Ok(NativeValue::Null)
            }
            other => Err(NativeError::message(format!(
                "SampleTurboModule has no method {}",
                other
            ))),
        }
    }

    fn constants(&self) -> BTreeMap<String, NativeValue> {
        [
            ("const1".to_string(), NativeValue::from(true)),
            ("const2".to_string(), NativeValue::from(375.0)),
            ("const3".to_string(), NativeValue::from("something")),
        ]
        .into_iter()
        .collect()
    }
}

/// Method table of [`SampleModule`]
pub fn sample_descriptors() -> Vec<MethodDescriptor> {
    vec![
        MethodDescriptor::sync("voidFunc"),
        MethodDescriptor::sync("getBool").param(ValueTag::Bool),
        MethodDescriptor::sync("getNumber").param(ValueTag::Number),
        MethodDescriptor::sync("getString").param(ValueTag::String),
        MethodDescriptor::sync("getArray").param(ValueTag::Array),
        MethodDescriptor::sync("getObject").param(ValueTag::Map),
        MethodDescriptor::sync("getValue").params([
            ValueTag::Number,
            ValueTag::String,
            ValueTag::Map,
        ]),
        MethodDescriptor::callback("getValueWithCallback").param(ValueTag::Function),
        MethodDescriptor::promise("getValueWithPromise").param(ValueTag::Bool),
    ]
}

/// Build the sample module, ready to register
pub fn sample_module() -> Result<NativeModule> {
    NativeModule::builder(SAMPLE_MODULE)
        .methods(sample_descriptors())
        .implementation(SampleModule)
        .build()
}
