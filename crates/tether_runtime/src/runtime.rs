//! Runtime - owns the registry, the bridge and every surface

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::events::ScriptEventPipe;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_bridge::{Bridge, ErrorSink, Invocation, LogErrorSink, ScriptMessage};
use tether_module::ModuleRegistry;
use tether_shadow::{
    ComponentKind, EventEmitter, LayoutContext, ShadowNode, ShadowNodeBuilder, ShadowTree, Tag,
};
use tether_value::ScriptValue;

/// The Tether runtime
///
/// Created once the module registry is frozen. Dropping the runtime tears
/// it down.
pub struct Runtime {
    config: RuntimeConfig,
    bridge: Bridge,
    events: Arc<ScriptEventPipe>,
    surfaces: RwLock<HashMap<Tag, Arc<ShadowTree>>>,
    torn_down: AtomicBool,
}

impl Runtime {
    /// Create a runtime that logs bridge errors
    pub fn new(config: RuntimeConfig, registry: ModuleRegistry) -> Result<Self> {
        Self::with_error_sink(config, registry, Arc::new(LogErrorSink))
    }

    /// Create a runtime reporting bridge errors to `sink`
    pub fn with_error_sink(
        config: RuntimeConfig,
        registry: ModuleRegistry,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self> {
        log::info!(
            "Starting Tether runtime with {} module(s): {}",
            registry.len(),
            registry.module_names().join(", ")
        );

        let bridge = Bridge::with_error_sink(Arc::new(registry), config.bridge.clone(), sink)?;
        let events = Arc::new(ScriptEventPipe::new(bridge.script_sender()));

        Ok(Self {
            config,
            bridge,
            events,
            surfaces: RwLock::new(HashMap::new()),
            torn_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        self.bridge.registry()
    }

    /// Invoke a module method from the scripting side
    pub fn invoke(&self, module: &str, method: &str, args: Vec<ScriptValue>) -> Result<Invocation> {
        Ok(self.bridge.invoke(module, method, args)?)
    }

    /// Constants exported by `module`
    pub fn module_constants(&self, module: &str) -> Result<ScriptValue> {
        Ok(self.bridge.module_constants(module)?)
    }

    /// Take every message waiting for the scripting thread
    pub fn drain(&self) -> Vec<ScriptMessage> {
        self.bridge.drain()
    }

    /// Wait up to `timeout` for the next scripting message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ScriptMessage> {
        self.bridge.recv_timeout(timeout)
    }

    /// An emitter for node `tag` that posts to the scripting queue
    pub fn event_emitter(&self, tag: Tag) -> Arc<EventEmitter> {
        Arc::new(EventEmitter::new(tag, self.events.clone()))
    }

    /// Start building a node whose events reach the scripting queue
    pub fn node_builder(&self, tag: Tag, kind: ComponentKind) -> ShadowNodeBuilder {
        ShadowNode::builder(tag, kind).emitter(self.event_emitter(tag))
    }

    /// Start a surface with the configured layout constraints
    pub fn start_surface(&self) -> Result<Arc<ShadowTree>> {
        self.start_surface_with(self.config.surface.layout_context())
    }

    /// Start a surface laid out under `context`
    pub fn start_surface_with(&self, context: LayoutContext) -> Result<Arc<ShadowTree>> {
        let mut surfaces = self.surfaces.write();
        if self.is_torn_down() {
            return Err(RuntimeError::TornDown);
        }

        let tag = Tag::allocate();
        let tree = Arc::new(ShadowTree::new(
            tag,
            context,
            self.config.shadow_tree.clone(),
        ));
        surfaces.insert(tag, tree.clone());
        log::info!("Started surface {}", tag);
        Ok(tree)
    }

    /// Look up a running surface
    pub fn surface(&self, tag: Tag) -> Result<Arc<ShadowTree>> {
        self.surfaces
            .read()
            .get(&tag)
            .cloned()
            .ok_or(RuntimeError::UnknownSurface(tag))
    }

    /// Tags of all running surfaces
    pub fn surfaces(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.surfaces.read().keys().copied().collect();
        tags.sort();
        tags
    }

    /// Tear down and forget a surface
    pub fn stop_surface(&self, tag: Tag) -> Result<()> {
        let tree = self
            .surfaces
            .write()
            .remove(&tag)
            .ok_or(RuntimeError::UnknownSurface(tag))?;
        tree.tear_down();
        log::info!("Stopped surface {}", tag);
        Ok(())
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Stop all surfaces and the bridge. Safe to call more than once.
    pub fn teardown(&self) {
        let surfaces: Vec<Arc<ShadowTree>> = {
            let mut surfaces = self.surfaces.write();
            if self.torn_down.swap(true, Ordering::AcqRel) {
                return;
            }
            surfaces.drain().map(|(_, tree)| tree).collect()
        };

        log::info!("Tearing down runtime ({} surface(s))", surfaces.len());
        for tree in surfaces {
            tree.tear_down();
        }
        self.bridge.teardown();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.teardown();
    }
}
