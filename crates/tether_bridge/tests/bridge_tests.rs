//! Integration tests for the invocation bridge

use crossbeam_channel::{bounded, Receiver};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_bridge::{
    Bridge, BridgeConfig, BridgeError, Invocation, RecordingErrorSink, ScriptMessage,
};
use tether_module::{
    MethodCall, MethodDescriptor, ModuleImpl, ModuleRegistry, NativeError, NativeModule,
    RegistryError,
};
use tether_value::{
    Correlation, FunctionRef, InvocationError, NativeValue, ParamSpec, ScriptValue, ValueTag,
};

const WAIT: Duration = Duration::from_secs(5);

struct Geo {
    ran: Arc<AtomicBool>,
    gate: Option<Receiver<()>>,
    invalidated: Arc<AtomicUsize>,
}

impl ModuleImpl for Geo {
    fn call(&self, mut call: MethodCall<'_>) -> Result<NativeValue, NativeError> {
        self.ran.store(true, Ordering::SeqCst);
        match call.method() {
            "getLocation" => {
                let accuracy = call.arg(0).and_then(NativeValue::as_f64).unwrap_or(0.0);
                let promise = call
                    .take_promise()
                    .ok_or_else(|| NativeError::new(NativeError::NO_PROMISE, "missing"))?;
                if let Some(gate) = &self.gate {
                    let _ = gate.recv_timeout(WAIT);
                }
                if accuracy < 0.0 {
                    promise.reject(NativeError::new("E_ACCURACY", "negative accuracy"));
                } else {
                    let location: NativeValue = [("lat", 52.5), ("lon", 13.4), ("accuracy", accuracy)]
                        .into_iter()
                        .collect();
                    promise.resolve(location);
                }
                Ok(NativeValue::Null)
            }
            "watch" => {
                let callback = call
                    .take_callback(0)
                    .ok_or_else(|| NativeError::message("callback expected"))?;
                let _ = callback.invoke(vec![NativeValue::from("first")]);
                let _ = callback.invoke(vec![NativeValue::from("second")]);
                Ok(NativeValue::Null)
            }
            "distance" => {
                let a = call.arg(0).and_then(NativeValue::as_f64).unwrap_or(0.0);
                let b = call.arg(1).and_then(NativeValue::as_f64).unwrap_or(0.0);
                Ok((b - a).abs().into())
            }
            "fail" => Err(NativeError::new("E_GEO", "no fix")),
            "crash" => panic!("sensor exploded"),
            "forget" => Ok(NativeValue::Null),
            "settleTwice" => {
                if let Some(promise) = call.take_promise() {
                    promise.resolve(1.0);
                    promise.resolve(2.0);
                }
                Ok(NativeValue::Null)
            }
            other => Err(NativeError::message(format!("unknown {}", other))),
        }
    }

    fn constants(&self) -> BTreeMap<String, NativeValue> {
        [("provider".to_string(), NativeValue::from("gps"))]
            .into_iter()
            .collect()
    }

    fn invalidate(&self) {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    bridge: Bridge,
    sink: Arc<RecordingErrorSink>,
    ran: Arc<AtomicBool>,
    invalidated: Arc<AtomicUsize>,
}

fn fixture_with(config: BridgeConfig, gate: Option<Receiver<()>>) -> Fixture {
    let ran = Arc::new(AtomicBool::new(false));
    let invalidated = Arc::new(AtomicUsize::new(0));
    let module = NativeModule::builder("Geo")
        .method(
            MethodDescriptor::promise("getLocation")
                .param(ValueTag::Number)
                .param(ParamSpec::optional(ValueTag::Map)),
        )
        .method(MethodDescriptor::callback("watch").param(ValueTag::Function))
        .method(
            MethodDescriptor::sync("distance")
                .param(ValueTag::Number)
                .param(ValueTag::Number),
        )
        .method(MethodDescriptor::sync("fail"))
        .method(MethodDescriptor::sync("crash"))
        .method(MethodDescriptor::promise("forget"))
        .method(MethodDescriptor::promise("settleTwice"))
        .implementation(Geo {
            ran: ran.clone(),
            gate,
            invalidated: invalidated.clone(),
        })
        .build()
        .unwrap();

    let mut builder = ModuleRegistry::builder();
    builder.register(module).unwrap();
    let sink = Arc::new(RecordingErrorSink::new());
    let bridge = Bridge::with_error_sink(Arc::new(builder.build()), config, sink.clone()).unwrap();

    Fixture {
        bridge,
        sink,
        ran,
        invalidated,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        BridgeConfig {
            worker_threads: 2,
            ..BridgeConfig::default()
        },
        None,
    )
}

#[test]
fn test_missing_argument_rejected_before_native_code() {
    let fx = fixture();
    let err = fx.bridge.invoke("Geo", "getLocation", vec![]).unwrap_err();

    assert_eq!(
        err,
        BridgeError::Argument {
            index: 0,
            expected: ValueTag::Number,
            found: None
        }
    );
    assert!(err.is_pre_native());
    fx.bridge.teardown();
    assert!(!fx.ran.load(Ordering::SeqCst));
    assert!(fx.bridge.drain().is_empty());
}

#[test]
fn test_wrong_type_and_arity() {
    let fx = fixture();

    let err = fx
        .bridge
        .invoke("Geo", "distance", vec![1.0.into(), "far".into()])
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Argument {
            index: 1,
            expected: ValueTag::Number,
            found: Some(ValueTag::String)
        }
    );

    let err = fx
        .bridge
        .invoke("Geo", "fail", vec![ScriptValue::Null])
        .unwrap_err();
    assert_eq!(err, BridgeError::Arity { expected: 0, found: 1 });
    assert!(!fx.ran.load(Ordering::SeqCst));
    assert_eq!(fx.bridge.stats().rejected, 2);
}

#[test]
fn test_unknown_module_and_method() {
    let fx = fixture();
    assert!(matches!(
        fx.bridge.invoke("Camera", "snap", vec![]),
        Err(BridgeError::Registry(RegistryError::NotFound { method: None, .. }))
    ));
    assert!(matches!(
        fx.bridge.invoke("Geo", "snap", vec![]),
        Err(BridgeError::Registry(RegistryError::NotFound { method: Some(_), .. }))
    ));
}

#[test]
fn test_sync_value_error_and_panic() {
    let fx = fixture();

    let value = fx
        .bridge
        .invoke("Geo", "distance", vec![3.0.into(), 10.0.into()])
        .unwrap()
        .into_value();
    assert_eq!(value, Some(ScriptValue::Number(7.0)));

    let err = fx.bridge.invoke("Geo", "fail", vec![]).unwrap_err();
    assert_eq!(err, BridgeError::Native(NativeError::new("E_GEO", "no fix")));

    match fx.bridge.invoke("Geo", "crash", vec![]) {
        Err(BridgeError::Native(err)) => {
            assert_eq!(err.code, NativeError::PANIC);
            assert!(err.message.contains("sensor exploded"));
        }
        other => panic!("expected native error, got {:?}", other),
    }

    // The bridge stays usable after a native panic.
    assert!(fx
        .bridge
        .invoke("Geo", "distance", vec![1.0.into(), 1.0.into()])
        .is_ok());
}

#[test]
fn test_promise_resolves_through_queue() {
    let fx = fixture();
    let invocation = fx
        .bridge
        .invoke("Geo", "getLocation", vec![5.0.into()])
        .unwrap();
    let call = invocation.pending().unwrap().id();

    match fx.bridge.recv_timeout(WAIT) {
        Some(ScriptMessage::Settle { call: settled, outcome }) => {
            assert_eq!(settled, call);
            let location = outcome.unwrap();
            assert_eq!(location.get("accuracy"), Some(&ScriptValue::Number(5.0)));
        }
        other => panic!("expected settle, got {:?}", other),
    }
    assert!(fx.sink.is_empty());
}

#[test]
fn test_promise_rejection() {
    let fx = fixture();
    fx.bridge
        .invoke("Geo", "getLocation", vec![(-1.0).into(), ScriptValue::Undefined])
        .unwrap();

    match fx.bridge.recv_timeout(WAIT) {
        Some(ScriptMessage::Settle { outcome: Err(err), .. }) => {
            assert_eq!(err.code, "E_ACCURACY");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_single_use_token_second_invocation_reported() {
    let fx = fixture();
    fx.bridge
        .invoke(
            "Geo",
            "watch",
            vec![ScriptValue::Function(FunctionRef::new(77))],
        )
        .unwrap();
    fx.bridge.teardown();

    let messages = fx.bridge.drain();
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        ScriptMessage::Callback { function, args, .. } => {
            assert_eq!(*function, FunctionRef::new(77));
            assert_eq!(args, &vec![ScriptValue::from("first")]);
        }
        other => panic!("expected callback, got {:?}", other),
    }
    assert!(matches!(
        fx.sink.errors().as_slice(),
        [BridgeError::Invocation(InvocationError::TokenConsumed { .. })]
    ));
}

#[test]
fn test_settle_twice_and_abandoned_promise_reported() {
    let fx = fixture();
    fx.bridge.invoke("Geo", "settleTwice", vec![]).unwrap();
    fx.bridge.invoke("Geo", "forget", vec![]).unwrap();
    fx.bridge.teardown();

    let settles = fx
        .bridge
        .drain()
        .into_iter()
        .filter(|m| matches!(m, ScriptMessage::Settle { .. }))
        .count();
    assert_eq!(settles, 1);

    let errors = fx.sink.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| matches!(
        e,
        BridgeError::Invocation(InvocationError::PromiseAlreadySettled { .. })
    )));
    assert!(errors.iter().any(|e| matches!(
        e,
        BridgeError::Invocation(InvocationError::PromiseAbandoned { .. })
    )));
}

#[test]
fn test_cancelled_call_completion_discarded() {
    let (release, gate) = bounded(1);
    let fx = fixture_with(
        BridgeConfig {
            worker_threads: 1,
            ..BridgeConfig::default()
        },
        Some(gate),
    );

    let invocation = fx
        .bridge
        .invoke("Geo", "getLocation", vec![1.0.into()])
        .unwrap();
    let pending = invocation.pending().unwrap();
    assert!(pending.cancel());
    assert!(pending.is_cancelled());
    release.send(()).unwrap();
    fx.bridge.teardown();

    assert!(fx.bridge.drain().is_empty());
    assert!(fx.sink.is_empty());
    assert_eq!(fx.bridge.stats().discarded, 1);
}

#[test]
fn test_cancel_only_applies_to_calls_in_flight() {
    let fx = fixture_with(BridgeConfig::inline(), None);
    for n in 1..=10_000 {
        assert!(!fx.bridge.cancel(Correlation::new(n)));
    }
    assert_eq!(fx.bridge.in_flight(), 0);

    let invocation = fx
        .bridge
        .invoke("Geo", "getLocation", vec![1.0.into()])
        .unwrap();
    let pending = invocation.pending().unwrap().clone();
    assert_eq!(fx.bridge.in_flight(), 1);

    assert_eq!(fx.bridge.drain().len(), 1);
    assert_eq!(fx.bridge.in_flight(), 0);
    assert!(!pending.cancel());
    assert!(!pending.is_cancelled());
}

#[test]
fn test_cancel_after_completion_queued_survives_teardown() {
    let fx = fixture_with(BridgeConfig::inline(), None);
    let invocation = fx
        .bridge
        .invoke("Geo", "getLocation", vec![1.0.into()])
        .unwrap();
    assert!(invocation.pending().unwrap().cancel());

    fx.bridge.teardown();
    assert!(fx.bridge.drain().is_empty());
    assert_eq!(fx.bridge.stats().discarded, 1);
    assert_eq!(fx.bridge.in_flight(), 0);
}

#[test]
fn test_callback_call_finishes_with_its_tokens() {
    let fx = fixture_with(BridgeConfig::inline(), None);
    fx.bridge
        .invoke("Geo", "watch", vec![ScriptValue::Function(FunctionRef::new(5))])
        .unwrap();
    assert_eq!(fx.bridge.in_flight(), 1);

    fx.bridge.drain();
    assert_eq!(fx.bridge.in_flight(), 0);
}

#[test]
fn test_inline_mode_completes_before_returning() {
    let fx = fixture_with(BridgeConfig::inline(), None);
    let invocation = fx
        .bridge
        .invoke("Geo", "getLocation", vec![2.0.into()])
        .unwrap();
    assert!(matches!(invocation, Invocation::Pending(_)));

    let messages = fx.bridge.drain();
    assert!(matches!(
        messages.as_slice(),
        [ScriptMessage::Settle { outcome: Ok(_), .. }]
    ));
}

#[test]
fn test_module_constants() {
    let fx = fixture();
    let constants = fx.bridge.module_constants("Geo").unwrap();
    assert_eq!(constants.get("provider"), Some(&ScriptValue::from("gps")));
    assert!(fx.bridge.module_constants("Camera").is_err());
}

#[test]
fn test_teardown_rejects_calls_and_invalidates_modules() {
    let fx = fixture();
    fx.bridge.teardown();
    fx.bridge.teardown();

    assert!(fx.bridge.is_torn_down());
    assert_eq!(
        fx.bridge.invoke("Geo", "distance", vec![1.0.into(), 2.0.into()]).unwrap_err(),
        BridgeError::TornDown
    );
    assert_eq!(fx.invalidated.load(Ordering::SeqCst), 1);
}
