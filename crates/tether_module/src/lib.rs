//! # Tether Module - Native module registry
//!
//! Native capabilities are exposed to the scripting layer as modules: a
//! name, an ordered list of typed method descriptors, and an implementation
//! object.
//!
//! ## Lifecycle
//!
//! ```text
//! ModuleRegistryBuilder::register(..)  (startup, may fail with DuplicateModule)
//!            │
//!            ▼  build()
//! ModuleRegistry (read-only name → method table)
//!            │  resolve(module, method)
//!            ▼
//! MethodHandle ──► ModuleImpl::call
//! ```
//!
//! Resolution is two hash lookups. Nothing is reflected per call.

pub mod descriptor;
pub mod error;
pub mod module;
pub mod promise;
pub mod registry;

pub use descriptor::{MethodDescriptor, MethodIndex, ReturnKind};
pub use error::{NativeError, RegistryError, Result};
pub use module::{MethodCall, ModuleFactory, ModuleImpl, NativeModule, NativeModuleBuilder};
pub use promise::{Promise, Settlement};
pub use registry::{MethodHandle, ModuleRegistry, ModuleRegistryBuilder};
