//! Native modules and the implementation trait

use crate::descriptor::{MethodDescriptor, MethodIndex};
use crate::error::{NativeError, RegistryError, Result};
use crate::promise::Promise;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tether_value::{CallbackToken, Correlation, NativeValue};

/// Native side of a module.
///
/// `call` receives already validated and marshalled arguments. Callback and
/// promise methods complete through the tokens or promise found in the
/// [`MethodCall`]; their return value is ignored unless it is an error.
pub trait ModuleImpl: Send + Sync + 'static {
    /// Execute one method
    fn call(&self, call: MethodCall<'_>) -> std::result::Result<NativeValue, NativeError>;

    /// Constants exported to the scripting layer
    fn constants(&self) -> BTreeMap<String, NativeValue> {
        BTreeMap::new()
    }

    /// Called when the instance is replaced or the bridge tears down
    fn invalidate(&self) {}
}

impl<F> ModuleImpl for F
where
    F: Fn(MethodCall<'_>) -> std::result::Result<NativeValue, NativeError> + Send + Sync + 'static,
{
    fn call(&self, call: MethodCall<'_>) -> std::result::Result<NativeValue, NativeError> {
        self(call)
    }
}

/// One method invocation as seen by a [`ModuleImpl`]
pub struct MethodCall<'a> {
    descriptor: &'a MethodDescriptor,
    index: MethodIndex,
    correlation: Correlation,
    args: Vec<NativeValue>,
    promise: Option<Promise>,
}

impl<'a> MethodCall<'a> {
    /// Create a call record
    pub fn new(
        descriptor: &'a MethodDescriptor,
        index: MethodIndex,
        correlation: Correlation,
        args: Vec<NativeValue>,
        promise: Option<Promise>,
    ) -> Self {
        Self {
            descriptor,
            index,
            correlation,
            args,
            promise,
        }
    }

    /// Name of the called method
    pub fn method(&self) -> &str {
        self.descriptor.name()
    }

    /// Descriptor of the called method
    pub fn descriptor(&self) -> &MethodDescriptor {
        self.descriptor
    }

    /// Index of the called method
    pub fn index(&self) -> MethodIndex {
        self.index
    }

    /// Invocation id
    pub fn correlation(&self) -> Correlation {
        self.correlation
    }

    /// All arguments. Omitted trailing optionals are absent.
    pub fn args(&self) -> &[NativeValue] {
        &self.args
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> Option<&NativeValue> {
        self.args.get(index)
    }

    /// Move an argument out, leaving null behind
    pub fn take_arg(&mut self, index: usize) -> NativeValue {
        self.args
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Move a callback token out of the argument list
    pub fn take_callback(&mut self, index: usize) -> Option<CallbackToken> {
        self.take_arg(index).into_callback()
    }

    /// The promise of a promise-style call.
    ///
    /// The handle may be moved to another thread and settled later.
    pub fn promise(&self) -> Option<Promise> {
        self.promise.clone()
    }

    /// Take the promise, leaving none in the call
    pub fn take_promise(&mut self) -> Option<Promise> {
        self.promise.take()
    }
}

/// Creates a module instance on first use
pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn ModuleImpl> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum ModuleSource {
    Instance(Arc<dyn ModuleImpl>),
    Provider(ModuleFactory),
}

/// A named module: ordered method table plus its implementation
pub struct NativeModule {
    name: String,
    methods: Vec<MethodDescriptor>,
    index: HashMap<String, MethodIndex>,
    pub(crate) source: ModuleSource,
}

impl NativeModule {
    /// Start building a module
    pub fn builder(name: impl Into<String>) -> NativeModuleBuilder {
        NativeModuleBuilder::new(name)
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method descriptors in declaration order
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Look up a method index by name
    pub fn method_index(&self, name: &str) -> Option<MethodIndex> {
        self.index.get(name).copied()
    }

    /// Descriptor at `index`
    pub fn method(&self, index: MethodIndex) -> Option<&MethodDescriptor> {
        self.methods.get(index.0)
    }

    /// Whether the module is created lazily
    pub fn is_lazy(&self) -> bool {
        matches!(self.source, ModuleSource::Provider(_))
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("lazy", &self.is_lazy())
            .finish()
    }
}

/// Builder for [`NativeModule`]
pub struct NativeModuleBuilder {
    name: String,
    methods: Vec<MethodDescriptor>,
    source: Option<ModuleSource>,
}

impl NativeModuleBuilder {
    /// Create a builder for a module named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            source: None,
        }
    }

    /// Declare a method
    pub fn method(mut self, descriptor: MethodDescriptor) -> Self {
        self.methods.push(descriptor);
        self
    }

    /// Declare several methods
    pub fn methods(mut self, descriptors: impl IntoIterator<Item = MethodDescriptor>) -> Self {
        self.methods.extend(descriptors);
        self
    }

    /// Use an existing implementation object
    pub fn implementation(self, implementation: impl ModuleImpl) -> Self {
        self.shared_implementation(Arc::new(implementation))
    }

    /// Use a shared implementation object
    pub fn shared_implementation(mut self, implementation: Arc<dyn ModuleImpl>) -> Self {
        self.source = Some(ModuleSource::Instance(implementation));
        self
    }

    /// Create the implementation lazily on first call
    pub fn provider<F, M>(mut self, factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: ModuleImpl,
    {
        let factory: ModuleFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn ModuleImpl>);
        self.source = Some(ModuleSource::Provider(factory));
        self
    }

    /// Validate and build the module
    pub fn build(self) -> Result<NativeModule> {
        let source = self
            .source
            .ok_or_else(|| RegistryError::MissingImplementation(self.name.clone()))?;

        let mut index = HashMap::with_capacity(self.methods.len());
        for (i, method) in self.methods.iter().enumerate() {
            if index.insert(method.name().to_string(), MethodIndex(i)).is_some() {
                return Err(RegistryError::DuplicateMethod {
                    module: self.name,
                    method: method.name().to_string(),
                });
            }
        }

        Ok(NativeModule {
            name: self.name,
            methods: self.methods,
            index,
            source,
        })
    }
}
