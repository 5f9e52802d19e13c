//! # Tether Runtime
//!
//! The owning context for a Tether process. It holds the frozen module
//! registry (through the bridge), the scripting task queue, and one
//! [`ShadowTree`](tether_shadow::ShadowTree) per surface.
//!
//! ```text
//! RuntimeConfig (TOML) ──► Runtime::new(config, registry)
//!                              ├── Bridge ──► ScriptQueue ◄── ScriptEventPipe
//!                              └── surfaces: Tag → ShadowTree
//! ```
//!
//! `teardown` stops every surface, then the bridge's workers, then
//! invalidates the modules.

pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod sample;

pub use config::{RuntimeConfig, SurfaceConfig, CONFIG_PATHS};
pub use error::{Result, RuntimeError};
pub use events::ScriptEventPipe;
pub use runtime::Runtime;
pub use sample::{sample_descriptors, sample_module, SampleModule, SAMPLE_MODULE};
