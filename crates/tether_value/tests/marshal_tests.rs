//! Integration tests for tether_value
//!
//! Exercises the marshaller the way the bridge does: scoped marshallers,
//! a real dispatcher, and values built from JSON.

use std::sync::{Arc, Mutex};
use tether_value::*;

#[derive(Default)]
struct Collect {
    delivered: Mutex<Vec<TokenInvocation>>,
    reported: Mutex<Vec<InvocationError>>,
}

impl CallbackDispatch for Collect {
    fn dispatch(&self, invocation: TokenInvocation) {
        self.delivered.lock().unwrap().push(invocation);
    }

    fn report(&self, error: InvocationError) {
        self.reported.lock().unwrap().push(error);
    }
}

#[test]
fn test_round_trip_law_for_json_documents() {
    let m = Marshaller::default();
    let docs = [
        serde_json::json!(null),
        serde_json::json!(0.1),
        serde_json::json!(-12),
        serde_json::json!("ünïcödé"),
        serde_json::json!([1, [2, [3, [4]]], {"k": false}]),
        serde_json::json!({"user": {"name": "ada", "langs": ["en", "fr"], "age": 36}}),
    ];

    for doc in docs {
        let value = ScriptValue::from_json(doc);
        let native = m.to_native(&value, value.tag()).expect("valid pair");
        assert_eq!(m.to_dynamic(&native), value);
        // Any is always a valid expectation as well
        let native = m.to_native(&value, ValueTag::Any).expect("any accepts");
        assert_eq!(to_dynamic(&native), value);
    }
}

#[test]
fn test_mismatch_message() {
    let m = Marshaller::default();
    let err = m
        .to_native(&ScriptValue::from_json(serde_json::json!([1, 2])), ValueTag::Map)
        .unwrap_err();
    assert_eq!(err.to_string(), "expected map, found array");
}

#[test]
fn test_tokens_dispatch_with_invocation_correlation() {
    let sink = Arc::new(Collect::default());
    let m = Marshaller::with_dispatch(MarshalConfig::default(), sink.clone()).scoped(Correlation::new(42));

    let native = m
        .to_native_param(&ScriptValue::Function(FunctionRef::new(7)), &ParamSpec::callback())
        .unwrap();
    let token = native.into_callback().unwrap();

    token.invoke(vec![NativeValue::from("done")]).unwrap();
    let second = token.invoke(Vec::new());

    assert!(matches!(second, Err(InvocationError::TokenConsumed { .. })));
    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].correlation, Correlation::new(42));
    assert_eq!(delivered[0].function, FunctionRef::new(7));
    assert_eq!(sink.reported.lock().unwrap().len(), 1);
}

#[test]
fn test_listener_tokens_fire_repeatedly() {
    let sink = Arc::new(Collect::default());
    let m = Marshaller::with_dispatch(MarshalConfig::default(), sink.clone());

    let native = m
        .to_native_param(&ScriptValue::Function(FunctionRef::new(1)), &ParamSpec::listener())
        .unwrap();
    let token = native.as_callback().unwrap();
    for _ in 0..5 {
        token.invoke(Vec::new()).unwrap();
    }

    assert_eq!(sink.delivered.lock().unwrap().len(), 5);
    assert!(sink.reported.lock().unwrap().is_empty());
}
