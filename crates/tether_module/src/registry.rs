//! Module registry
//!
//! Built once at startup through [`ModuleRegistryBuilder`], then frozen: the
//! set of modules and their method tables never change afterwards. Only the
//! implementation object behind an existing module can be swapped
//! ([`ModuleRegistry::reload`]).

use crate::descriptor::{MethodDescriptor, MethodIndex};
use crate::error::{NativeError, RegistryError, Result};
use crate::module::{MethodCall, ModuleFactory, ModuleImpl, ModuleSource, NativeModule};
use crate::promise::Promise;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tether_value::{Correlation, NativeValue};

/// Registry slot for one module
struct ModuleEntry {
    module: NativeModule,
    /// Instantiated implementation, empty until first use for lazy modules
    instance: RwLock<Option<Arc<dyn ModuleImpl>>>,
    provider: Option<ModuleFactory>,
}

impl ModuleEntry {
    fn new(module: NativeModule) -> Self {
        let (instance, provider) = match module.source.clone() {
            ModuleSource::Instance(instance) => (Some(instance), None),
            ModuleSource::Provider(factory) => (None, Some(factory)),
        };
        Self {
            module,
            instance: RwLock::new(instance),
            provider,
        }
    }

    /// Get the implementation, creating it through the provider if needed
    fn implementation(&self) -> Option<Arc<dyn ModuleImpl>> {
        if let Some(instance) = self.instance.read().as_ref() {
            return Some(instance.clone());
        }

        let provider = self.provider.as_ref()?;
        let mut slot = self.instance.write();
        if let Some(instance) = slot.as_ref() {
            return Some(instance.clone());
        }
        log::debug!("Instantiating module '{}'", self.module.name());
        let instance = provider();
        *slot = Some(instance.clone());
        Some(instance)
    }

    /// Swap in a new implementation, invalidating the old one
    fn replace(&self, source: ModuleSource) {
        let next = match source {
            ModuleSource::Instance(instance) => Some(instance),
            ModuleSource::Provider(factory) => Some(factory()),
        };
        let previous = std::mem::replace(&mut *self.instance.write(), next);
        if let Some(previous) = previous {
            previous.invalidate();
        }
    }

    fn invalidate(&self) {
        let instance = self.instance.write().take();
        if let Some(instance) = instance {
            instance.invalidate();
        }
    }
}

fn same_descriptors(a: &NativeModule, b: &NativeModule) -> bool {
    a.methods() == b.methods()
}

/// Collects modules before the registry is frozen
#[derive(Default)]
pub struct ModuleRegistryBuilder {
    modules: HashMap<String, NativeModule>,
    order: Vec<String>,
}

impl ModuleRegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Fails if the name is taken.
    pub fn register(&mut self, module: NativeModule) -> Result<&mut Self> {
        if self.modules.contains_key(module.name()) {
            return Err(RegistryError::DuplicateModule(module.name().to_string()));
        }
        log::debug!(
            "Registered module '{}' with {} methods",
            module.name(),
            module.methods().len()
        );
        self.order.push(module.name().to_string());
        self.modules.insert(module.name().to_string(), module);
        Ok(self)
    }

    /// Register a module, replacing an existing one with identical
    /// descriptors. Replacing with a different method table fails.
    pub fn register_or_replace(&mut self, module: NativeModule) -> Result<&mut Self> {
        if !self.modules.contains_key(module.name()) {
            return self.register(module);
        }
        if let Some(existing) = self.modules.get_mut(module.name()) {
            if !same_descriptors(existing, &module) {
                return Err(RegistryError::DescriptorMismatch(existing.name().to_string()));
            }
            existing.source = module.source;
            log::debug!("Replaced implementation of module '{}'", existing.name());
        }
        Ok(self)
    }

    /// Register a module whose implementation is created on first use
    pub fn register_provider<F, M>(
        &mut self,
        name: impl Into<String>,
        methods: impl IntoIterator<Item = MethodDescriptor>,
        factory: F,
    ) -> Result<&mut Self>
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: ModuleImpl,
    {
        let module = NativeModule::builder(name)
            .methods(methods)
            .provider(factory)
            .build()?;
        self.register(module)
    }

    /// Whether a module with this name was registered
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Freeze the registry
    pub fn build(self) -> ModuleRegistry {
        let mut modules = self.modules;
        let mut entries = HashMap::with_capacity(modules.len());
        for name in &self.order {
            if let Some(module) = modules.remove(name) {
                entries.insert(name.clone(), Arc::new(ModuleEntry::new(module)));
            }
        }
        log::info!("Module registry frozen with {} modules", entries.len());
        ModuleRegistry {
            entries,
            order: self.order,
        }
    }
}

/// Frozen name → module table
pub struct ModuleRegistry {
    entries: HashMap<String, Arc<ModuleEntry>>,
    order: Vec<String>,
}

impl ModuleRegistry {
    /// Start building a registry
    pub fn builder() -> ModuleRegistryBuilder {
        ModuleRegistryBuilder::new()
    }

    /// Resolve a method by module and method name
    pub fn resolve(&self, module: &str, method: &str) -> Result<MethodHandle> {
        let entry = self.entry(module)?;
        let index = entry
            .module
            .method_index(method)
            .ok_or_else(|| RegistryError::NotFound {
                module: module.to_string(),
                method: Some(method.to_string()),
            })?;
        Ok(MethodHandle {
            entry: entry.clone(),
            index,
        })
    }

    /// Whether a module is registered
    pub fn contains(&self, module: &str) -> bool {
        self.entries.contains_key(module)
    }

    /// Registered module names in registration order
    pub fn module_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no modules
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Method descriptors of a module
    pub fn methods(&self, module: &str) -> Result<&[MethodDescriptor]> {
        Ok(self.entry(module)?.module.methods())
    }

    /// Constants exported by a module. Instantiates lazy modules.
    pub fn constants(&self, module: &str) -> Result<BTreeMap<String, NativeValue>> {
        let entry = self.entry(module)?;
        Ok(entry
            .implementation()
            .map(|instance| instance.constants())
            .unwrap_or_default())
    }

    /// Swap the implementation of a registered module.
    ///
    /// The new module must declare exactly the same methods.
    pub fn reload(&self, module: NativeModule) -> Result<()> {
        let entry = self.entry(module.name())?;
        if !same_descriptors(&entry.module, &module) {
            return Err(RegistryError::DescriptorMismatch(module.name().to_string()));
        }
        log::info!("Reloading module '{}'", module.name());
        entry.replace(module.source);
        Ok(())
    }

    /// Drop every instantiated implementation after invalidating it.
    ///
    /// Lazy modules would be instantiated again on next use.
    pub fn invalidate_all(&self) {
        for name in &self.order {
            if let Some(entry) = self.entries.get(name) {
                entry.invalidate();
            }
        }
    }

    fn entry(&self, module: &str) -> Result<&Arc<ModuleEntry>> {
        self.entries.get(module).ok_or_else(|| RegistryError::NotFound {
            module: module.to_string(),
            method: None,
        })
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.order)
            .finish()
    }
}

/// A resolved method, ready to be called
#[derive(Clone)]
pub struct MethodHandle {
    entry: Arc<ModuleEntry>,
    index: MethodIndex,
}

impl MethodHandle {
    /// Owning module name
    pub fn module_name(&self) -> &str {
        self.entry.module.name()
    }

    /// Method index in the module table
    pub fn index(&self) -> MethodIndex {
        self.index
    }

    /// Method descriptor
    pub fn descriptor(&self) -> &MethodDescriptor {
        // Handles are only created for indices present in the table.
        &self.entry.module.methods()[self.index.0]
    }

    /// Run the native implementation
    pub fn call(
        &self,
        correlation: Correlation,
        args: Vec<NativeValue>,
        promise: Option<Promise>,
    ) -> std::result::Result<NativeValue, NativeError> {
        let instance = self.entry.implementation().ok_or_else(|| {
            NativeError::message(format!(
                "module '{}' has been invalidated",
                self.module_name()
            ))
        })?;
        let call = MethodCall::new(self.descriptor(), self.index, correlation, args, promise);
        instance.call(call)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle({}.{})", self.module_name(), self.descriptor().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tether_value::ValueTag;

    fn constant(value: f64) -> impl ModuleImpl {
        move |_call: MethodCall<'_>| Ok::<_, NativeError>(NativeValue::Number(value))
    }

    fn math(value: f64) -> NativeModule {
        NativeModule::builder("Math")
            .method(MethodDescriptor::sync("value"))
            .implementation(constant(value))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let mut builder = ModuleRegistry::builder();
        builder.register(math(1.0)).unwrap();
        let err = builder.register(math(2.0)).err().unwrap();
        assert_eq!(err, RegistryError::DuplicateModule("Math".into()));
    }

    #[test]
    fn test_resolve_not_found() {
        let mut builder = ModuleRegistry::builder();
        builder.register(math(1.0)).unwrap();
        let registry = builder.build();

        assert!(matches!(
            registry.resolve("Nope", "value"),
            Err(RegistryError::NotFound { method: None, .. })
        ));
        assert!(matches!(
            registry.resolve("Math", "nope"),
            Err(RegistryError::NotFound { method: Some(_), .. })
        ));
    }

    #[test]
    fn test_register_or_replace_swaps_implementation() {
        let mut builder = ModuleRegistry::builder();
        builder.register(math(1.0)).unwrap();
        builder.register_or_replace(math(2.0)).unwrap();
        let registry = builder.build();

        let handle = registry.resolve("Math", "value").unwrap();
        assert_eq!(
            handle.call(Correlation::NONE, vec![], None),
            Ok(NativeValue::Number(2.0))
        );
    }

    #[test]
    fn test_register_or_replace_rejects_new_descriptors() {
        let mut builder = ModuleRegistry::builder();
        builder.register(math(1.0)).unwrap();
        let changed = NativeModule::builder("Math")
            .method(MethodDescriptor::sync("value").param(ValueTag::Number))
            .implementation(constant(0.0))
            .build()
            .unwrap();

        let err = builder.register_or_replace(changed).err().unwrap();
        assert_eq!(err, RegistryError::DescriptorMismatch("Math".into()));
    }

    #[test]
    fn test_provider_instantiated_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();

        let mut builder = ModuleRegistry::builder();
        builder
            .register_provider("Lazy", [MethodDescriptor::sync("value")], move || {
                counter.fetch_add(1, Ordering::SeqCst);
                constant(5.0)
            })
            .unwrap();
        let registry = builder.build();
        assert_eq!(created.load(Ordering::SeqCst), 0);

        let handle = registry.resolve("Lazy", "value").unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 0);
        for _ in 0..3 {
            handle.call(Correlation::NONE, vec![], None).unwrap();
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_module_names_in_registration_order() {
        let mut builder = ModuleRegistry::builder();
        for name in ["B", "A", "C"] {
            builder
                .register(
                    NativeModule::builder(name)
                        .implementation(constant(0.0))
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
        let registry = builder.build();
        assert_eq!(registry.module_names(), vec!["B", "A", "C"]);
        assert_eq!(registry.len(), 3);
    }
}
