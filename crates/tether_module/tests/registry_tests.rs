//! Integration tests for the module registry

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tether_module::{
    MethodCall, MethodDescriptor, MethodIndex, ModuleImpl, ModuleRegistry, NativeError, NativeModule,
    Promise, RegistryError, ReturnKind, Settlement,
};
use tether_value::{Correlation, InvocationError, NativeValue, ParamSpec, ValueTag};

#[derive(Default)]
struct Sink {
    settled: Mutex<Vec<(Correlation, Result<NativeValue, NativeError>)>>,
    reports: Mutex<Vec<InvocationError>>,
}

impl Settlement for Sink {
    fn settle(&self, correlation: Correlation, outcome: Result<NativeValue, NativeError>) {
        self.settled.lock().push((correlation, outcome));
    }

    fn report(&self, error: InvocationError) {
        self.reports.lock().push(error);
    }
}

struct Device {
    invalidated: Arc<AtomicUsize>,
}

impl ModuleImpl for Device {
    fn call(&self, mut call: MethodCall<'_>) -> Result<NativeValue, NativeError> {
        match call.method() {
            "model" => Ok("tether-1".into()),
            "battery" => {
                let promise = call
                    .take_promise()
                    .ok_or_else(|| NativeError::new(NativeError::NO_PROMISE, "no promise"))?;
                std::thread::spawn(move || {
                    promise.resolve(0.5);
                });
                Ok(NativeValue::Null)
            }
            other => Err(NativeError::message(format!("unhandled method {}", other))),
        }
    }

    fn constants(&self) -> BTreeMap<String, NativeValue> {
        [("platform".to_string(), NativeValue::from("test"))]
            .into_iter()
            .collect()
    }

    fn invalidate(&self) {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
    }
}

fn device_module(invalidated: Arc<AtomicUsize>) -> NativeModule {
    NativeModule::builder("Device")
        .method(MethodDescriptor::sync("model"))
        .method(MethodDescriptor::promise("battery"))
        .method(MethodDescriptor::sync("format").param(ParamSpec::optional(ValueTag::String)))
        .implementation(Device { invalidated })
        .build()
        .unwrap()
}

#[test]
fn test_sync_call_through_handle() {
    let mut builder = ModuleRegistry::builder();
    builder
        .register(device_module(Arc::new(AtomicUsize::new(0))))
        .unwrap();
    let registry = builder.build();

    let handle = registry.resolve("Device", "model").unwrap();
    assert_eq!(handle.module_name(), "Device");
    assert_eq!(handle.index(), MethodIndex(0));
    assert_eq!(handle.descriptor().returns(), ReturnKind::Sync);
    assert_eq!(
        handle.call(Correlation::new(1), vec![], None),
        Ok(NativeValue::from("tether-1"))
    );
}

#[test]
fn test_promise_settled_from_another_thread() {
    let mut builder = ModuleRegistry::builder();
    builder
        .register(device_module(Arc::new(AtomicUsize::new(0))))
        .unwrap();
    let registry = builder.build();
    let sink = Arc::new(Sink::default());

    let handle = registry.resolve("Device", "battery").unwrap();
    let promise = Promise::new(Correlation::new(9), sink.clone());
    handle
        .call(Correlation::new(9), vec![], Some(promise))
        .unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while sink.settled.lock().is_empty() && std::time::Instant::now() < deadline {
        std::thread::yield_now();
    }

    let settled = sink.settled.lock();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0], (Correlation::new(9), Ok(NativeValue::Number(0.5))));
    assert!(sink.reports.lock().is_empty());
}

#[test]
fn test_constants_and_descriptors() {
    let mut builder = ModuleRegistry::builder();
    builder
        .register(device_module(Arc::new(AtomicUsize::new(0))))
        .unwrap();
    let registry = builder.build();

    let constants = registry.constants("Device").unwrap();
    assert_eq!(constants.get("platform"), Some(&NativeValue::from("test")));
    assert_eq!(registry.methods("Device").unwrap().len(), 3);
    assert!(registry.constants("Missing").is_err());
}

#[test]
fn test_reload_invalidates_previous_instance() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let mut builder = ModuleRegistry::builder();
    builder.register(device_module(first.clone())).unwrap();
    let registry = builder.build();

    let handle = registry.resolve("Device", "model").unwrap();
    registry.reload(device_module(second.clone())).unwrap();
    assert_eq!(first.load(Ordering::SeqCst), 1);

    // Handles resolved before the reload reach the new instance.
    assert!(handle.call(Correlation::NONE, vec![], None).is_ok());

    registry.invalidate_all();
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert!(handle.call(Correlation::NONE, vec![], None).is_err());
}

#[test]
fn test_reload_rejects_unknown_or_changed_modules() {
    let mut builder = ModuleRegistry::builder();
    builder
        .register(device_module(Arc::new(AtomicUsize::new(0))))
        .unwrap();
    let registry = builder.build();

    let changed = NativeModule::builder("Device")
        .method(MethodDescriptor::sync("model"))
        .implementation(Device {
            invalidated: Arc::new(AtomicUsize::new(0)),
        })
        .build()
        .unwrap();
    assert_eq!(
        registry.reload(changed),
        Err(RegistryError::DescriptorMismatch("Device".into()))
    );

    let unknown = NativeModule::builder("Other")
        .implementation(Device {
            invalidated: Arc::new(AtomicUsize::new(0)),
        })
        .build()
        .unwrap();
    assert!(matches!(
        registry.reload(unknown),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn test_unregistered_lookups_are_not_found() {
    let registry = ModuleRegistry::builder().build();
    assert!(registry.is_empty());
    for (module, method) in [("Geo", "getLocation"), ("", ""), ("Device", "model")] {
        assert!(matches!(
            registry.resolve(module, method),
            Err(RegistryError::NotFound { .. })
        ));
    }
}
