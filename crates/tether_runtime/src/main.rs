//! Tether demo
//!
//! Registers the sample module, drives every return convention through
//! the bridge, lays out a small surface and prints what the scripting
//! thread would receive.
//!
//! Run with: cargo run --bin tether-demo

use std::time::Duration;

use tether_module::ModuleRegistry;
use tether_runtime::{sample_module, Runtime, RuntimeConfig, SAMPLE_MODULE};
use tether_shadow::{ComponentKind, Props, Tag};
use tether_value::{FunctionRef, ScriptValue};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("tether-demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> tether_runtime::Result<()> {
    let mut config = RuntimeConfig::load();
    config.surface.width.get_or_insert(390.0);
    config.surface.height.get_or_insert(844.0);

    let mut registry = ModuleRegistry::builder();
    registry.register(sample_module()?)?;
    let runtime = Runtime::new(config, registry.build())?;

    let value = runtime.invoke(
        SAMPLE_MODULE,
        "getValue",
        vec![
            5.0.into(),
            "tether".into(),
            [("enabled", true)].into_iter().collect(),
        ],
    )?;
    log::info!("getValue -> {:?}", value.into_value());
    log::info!("constants -> {:?}", runtime.module_constants(SAMPLE_MODULE)?);

    if let Err(e) = runtime.invoke(SAMPLE_MODULE, "getNumber", vec![]) {
        log::info!("getNumber() rejected before native code: {}", e);
    }

    runtime.invoke(
        SAMPLE_MODULE,
        "getValueWithCallback",
        vec![ScriptValue::Function(FunctionRef::new(1))],
    )?;
    runtime.invoke(SAMPLE_MODULE, "getValueWithPromise", vec![false.into()])?;
    runtime.invoke(SAMPLE_MODULE, "getValueWithPromise", vec![true.into()])?;

    let surface = runtime.start_surface()?;
    let scroll_tag = Tag::allocate();
    let rows: Vec<_> = (0..20)
        .map(|_| {
            runtime
                .node_builder(Tag::allocate(), ComponentKind::View)
                .props([("height", 64.0), ("marginBottom", 8.0)].into_iter().collect())
                .build()
        })
        .collect();
    let scroll = runtime
        .node_builder(scroll_tag, ComponentKind::ScrollView)
        .props(
            [("flexGrow", 1.0), ("padding", 16.0)]
                .into_iter()
                .collect::<Props>(),
        )
        .children(rows)
        .build();

    let revision = surface.commit(|root| root.append_child(scroll.clone()))?;
    let snapshot = surface.current_revision();
    log::info!(
        "Surface {} revision {}: {} node(s)",
        surface.surface(),
        revision,
        snapshot.layout().len()
    );
    if let Some(geometry) = snapshot.layout().get(scroll_tag) {
        log::info!(
            "Scroll view frame {} content {}x{}",
            geometry.frame,
            geometry.content_size.width,
            geometry.content_size.height
        );
    }
    if let Some(node) = snapshot.root().find(scroll_tag) {
        let payload: tether_value::NativeValue = [("y", 120.0)].into_iter().collect();
        node.emitter().dispatch("onScroll", payload);
    }

    while let Some(message) = runtime.recv_timeout(Duration::from_millis(250)) {
        log::info!("script <- {:?}", message);
    }

    let stats = runtime.bridge().stats();
    log::info!(
        "Bridge: {} invocation(s), {} rejected, {} callback(s), {} settlement(s)",
        stats.invocations,
        stats.rejected,
        stats.callbacks_posted,
        stats.settlements_posted
    );

    runtime.teardown();
    Ok(())
}
