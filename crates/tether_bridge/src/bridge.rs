//! The invocation bridge

use crate::config::BridgeConfig;
use crate::dispatch::{BridgeShared, BridgeStats};
use crate::error::{BridgeError, Result};
use crate::pool::{Job, WorkerPool};
use crate::queue::{ScriptMessage, ScriptQueue, ScriptSender};
use crate::sink::{ErrorSink, LogErrorSink};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{catch_panic_mut, IdGenerator};
use tether_module::{
    MethodDescriptor, MethodHandle, ModuleRegistry, NativeError, Promise, ReturnKind,
};
use tether_value::{to_dynamic, Correlation, Marshaller, NativeValue, ScriptValue};

/// Outcome of a successful [`Bridge::invoke`]
#[derive(Debug)]
pub enum Invocation {
    /// A sync method's result
    Value(ScriptValue),
    /// A callback or promise method is running; completion arrives on the
    /// scripting queue
    Pending(PendingCall),
}

impl Invocation {
    /// The sync result, if any
    pub fn into_value(self) -> Option<ScriptValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// The pending call, if any
    pub fn pending(&self) -> Option<&PendingCall> {
        match self {
            Self::Pending(call) => Some(call),
            Self::Value(_) => None,
        }
    }
}

/// Handle to an asynchronous call in flight
#[derive(Clone)]
pub struct PendingCall {
    id: Correlation,
    kind: ReturnKind,
    shared: Arc<BridgeShared>,
}

impl PendingCall {
    /// Correlation id carried by this call's completions
    pub fn id(&self) -> Correlation {
        self.id
    }

    /// Completion convention
    pub fn kind(&self) -> ReturnKind {
        self.kind
    }

    /// Request cancellation.
    ///
    /// Advisory only: native work keeps running, but any completion that
    /// arrives afterwards is discarded without an error. Returns `false` once
    /// the call has finished.
    pub fn cancel(&self) -> bool {
        self.shared.cancel(self.id)
    }

    /// Whether cancellation was requested and the call has not finished
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled(self.id)
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Connects the scripting thread to the module registry
pub struct Bridge {
    config: BridgeConfig,
    registry: Arc<ModuleRegistry>,
    marshaller: Marshaller,
    queue: ScriptQueue,
    shared: Arc<BridgeShared>,
    pool: Mutex<Option<WorkerPool>>,
    call_ids: IdGenerator,
    torn_down: AtomicBool,
}

impl Bridge {
    /// Create a bridge that logs unroutable errors
    pub fn new(registry: Arc<ModuleRegistry>, config: BridgeConfig) -> Result<Self> {
        Self::with_error_sink(registry, config, Arc::new(LogErrorSink))
    }

    /// Create a bridge with a specific error sink
    pub fn with_error_sink(
        registry: Arc<ModuleRegistry>,
        config: BridgeConfig,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self> {
        let queue = ScriptQueue::new();
        let shared = Arc::new(BridgeShared::new(queue.sender(), sink));
        let marshaller = Marshaller::with_dispatch(config.marshal.clone(), shared.clone());

        let pool = if config.async_on_workers && config.worker_threads > 0 {
            Some(WorkerPool::new(config.worker_threads, &config.worker_name)?)
        } else {
            None
        };

        log::info!(
            "Bridge initialized with {} modules ({} workers)",
            registry.len(),
            pool.as_ref().map_or(0, WorkerPool::size)
        );

        Ok(Self {
            config,
            registry,
            marshaller,
            queue,
            shared,
            pool: Mutex::new(pool),
            call_ids: IdGenerator::new(),
            torn_down: AtomicBool::new(false),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Get the module registry
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Call a module method from the scripting thread
    pub fn invoke(&self, module: &str, method: &str, args: Vec<ScriptValue>) -> Result<Invocation> {
        if self.is_torn_down() {
            return Err(BridgeError::TornDown);
        }

        let handle = self.registry.resolve(module, method).map_err(|e| {
            self.shared.stats.write().rejected += 1;
            BridgeError::from(e)
        })?;
        let call = Correlation::new(self.call_ids.next().to_bits());

        let native_args = match self.marshal_args(handle.descriptor(), call, &args) {
            Ok(native_args) => native_args,
            Err(err) => {
                log::debug!("Rejected {}.{}: {}", module, method, err);
                self.shared.stats.write().rejected += 1;
                return Err(err);
            }
        };
        self.shared.stats.write().invocations += 1;
        log::debug!("Invoking {}.{} as call {}", module, method, call);

        match handle.descriptor().returns() {
            ReturnKind::Sync => self.call_sync(&handle, call, native_args),
            kind => self.call_async(handle, kind, call, native_args),
        }
    }

    /// Validate and marshal arguments against a descriptor.
    ///
    /// No native code runs here.
    fn marshal_args(
        &self,
        descriptor: &MethodDescriptor,
        call: Correlation,
        args: &[ScriptValue],
    ) -> Result<Vec<NativeValue>> {
        if args.len() > descriptor.arity() {
            return Err(BridgeError::Arity {
                expected: descriptor.arity(),
                found: args.len(),
            });
        }

        let marshaller = self.marshaller.scoped(call);
        let required = descriptor.required_arity();
        let mut native = Vec::with_capacity(args.len());

        for (index, spec) in descriptor.param_specs().iter().enumerate() {
            match args.get(index) {
                Some(value) => {
                    let value = marshaller
                        .to_native_param(value, spec)
                        .map_err(|e| BridgeError::from_marshal(index, e))?;
                    native.push(value);
                }
                None if index < required => {
                    return Err(BridgeError::Argument {
                        index,
                        expected: spec.tag,
                        found: None,
                    });
                }
                None => break,
            }
        }
        Ok(native)
    }

    fn call_sync(
        &self,
        handle: &MethodHandle,
        call: Correlation,
        args: Vec<NativeValue>,
    ) -> Result<Invocation> {
        let outcome = catch_panic_mut(|| handle.call(call, args, None));
        self.shared.stats.write().sync_calls += 1;

        match outcome {
            Ok(Ok(value)) => Ok(Invocation::Value(to_dynamic(&value))),
            Ok(Err(err)) => Err(BridgeError::Native(err)),
            Err(panic) => {
                log::error!("Native panic in {:?}: {}", handle, panic);
                Err(BridgeError::Native(NativeError::panicked(panic)))
            }
        }
    }

    fn call_async(
        &self,
        handle: MethodHandle,
        kind: ReturnKind,
        call: Correlation,
        args: Vec<NativeValue>,
    ) -> Result<Invocation> {
        let shared = self.shared.clone();
        shared.hold(call);
        let promise = match kind {
            ReturnKind::Promise => {
                shared.hold(call);
                Some(Promise::new(call, shared.clone()))
            }
            _ => None,
        };

        let job: Job = Box::new(move || run_async(&shared, &handle, call, args, promise));

        let inline = match self.pool.lock().as_ref() {
            Some(pool) => {
                if !pool.execute(job) {
                    self.shared.release(call);
                    return Err(BridgeError::TornDown);
                }
                None
            }
            None => Some(job),
        };
        if let Some(job) = inline {
            job();
        }

        self.shared.stats.write().async_calls += 1;
        Ok(Invocation::Pending(PendingCall {
            id: call,
            kind,
            shared: self.shared.clone(),
        }))
    }

    /// Cancel an asynchronous call by id.
    ///
    /// Returns `false` for ids that were never issued or whose call has
    /// finished.
    pub fn cancel(&self, call: Correlation) -> bool {
        self.shared.cancel(call)
    }

    /// Number of calls that can still deliver a completion
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight()
    }

    /// Constants exported by a module, as a scripting object
    pub fn module_constants(&self, module: &str) -> Result<ScriptValue> {
        let registry = &self.registry;
        let constants = catch_panic_mut(|| registry.constants(module))
            .map_err(|panic| BridgeError::Native(NativeError::panicked(panic)))??;
        Ok(constants_to_script(constants))
    }

    /// Producer handle for the scripting queue
    pub fn script_sender(&self) -> ScriptSender {
        self.queue.sender()
    }

    /// Take every queued message for the scripting thread.
    ///
    /// Completions of calls cancelled after they were queued are dropped.
    pub fn drain(&self) -> Vec<ScriptMessage> {
        self.queue
            .drain()
            .into_iter()
            .filter(|message| self.deliverable(message))
            .collect()
    }

    /// Wait up to `timeout` for the next deliverable message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ScriptMessage> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let message = self.queue.recv_timeout(remaining)?;
            if self.deliverable(&message) {
                return Some(message);
            }
        }
    }

    fn deliverable(&self, message: &ScriptMessage) -> bool {
        let Some(call) = message.call() else {
            return true;
        };
        if self.shared.dequeue(call) {
            self.shared.note_discarded(call);
            return false;
        }
        true
    }

    /// Snapshot of usage statistics
    pub fn stats(&self) -> BridgeStats {
        self.shared.stats.read().clone()
    }

    /// Whether [`Bridge::teardown`] has run
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Stop accepting calls, finish queued native work and release modules.
    ///
    /// Messages already on the scripting queue stay drainable.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let pool = self.pool.lock().take();
        if let Some(mut pool) = pool {
            pool.shutdown();
        }
        self.registry.invalidate_all();
        self.shared.reset();
        log::info!("Bridge torn down");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Body of a callback or promise call, on a worker or the calling thread
fn run_async(
    shared: &BridgeShared,
    handle: &MethodHandle,
    call: Correlation,
    args: Vec<NativeValue>,
    promise: Option<Promise>,
) {
    let native_promise = promise.clone();
    let outcome = catch_panic_mut(|| handle.call(call, args, native_promise));

    let error = match outcome {
        Ok(Ok(_)) => None,
        Ok(Err(err)) => Some(err),
        Err(panic) => {
            log::error!("Native panic in {:?}: {}", handle, panic);
            Some(NativeError::panicked(panic))
        }
    };

    if let Some(error) = error {
        match promise {
            Some(promise) if !promise.is_settled() => {
                promise.reject(error);
            }
            _ if shared.is_cancelled(call) => shared.note_discarded(call),
            _ => shared.report_error(BridgeError::Native(error)),
        }
    }
    shared.release(call);
}

fn constants_to_script(constants: BTreeMap<String, NativeValue>) -> ScriptValue {
    ScriptValue::Object(
        constants
            .iter()
            .map(|(key, value)| (key.clone(), to_dynamic(value)))
            .collect(),
    )
}
