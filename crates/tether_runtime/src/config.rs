//! Runtime configuration
//!
//! Loaded from TOML. Every section is optional:
//!
//! ```toml
//! [bridge]
//! async_on_workers = true
//! worker_threads = 2
//!
//! [bridge.marshal]
//! max_depth = 32
//!
//! [shadow_tree]
//! max_commit_retries = 8
//!
//! [shadow_tree.backoff]
//! max_delay_us = 500
//!
//! [surface]
//! width = 390.0
//! height = 844.0
//! point_scale_factor = 3.0
//! rtl = false
//! ```

use crate::error::{Result, RuntimeError};
use serde::Deserialize;
use std::path::Path;
use tether_bridge::BridgeConfig;
use tether_shadow::{LayoutContext, LayoutDirection, ShadowTreeConfig, Size};

/// Paths searched by [`RuntimeConfig::load`], in order
pub const CONFIG_PATHS: &[&str] = &["tether.toml", "config/tether.toml"];

/// Default layout constraints for new surfaces
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Available width in points. Omit for unbounded.
    pub width: Option<f32>,
    /// Available height in points. Omit for unbounded.
    pub height: Option<f32>,
    pub point_scale_factor: f32,
    /// Lay out right-to-left
    pub rtl: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            point_scale_factor: 1.0,
            rtl: false,
        }
    }
}

impl SurfaceConfig {
    /// Layout context for a surface created with this config
    pub fn layout_context(&self) -> LayoutContext {
        let available = Size::new(
            self.width.unwrap_or(f32::INFINITY),
            self.height.unwrap_or(f32::INFINITY),
        );
        let direction = if self.rtl {
            LayoutDirection::Rtl
        } else {
            LayoutDirection::Ltr
        };
        LayoutContext::new(available)
            .with_direction(direction)
            .with_scale(self.point_scale_factor)
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bridge: BridgeConfig,
    pub shadow_tree: ShadowTreeConfig,
    pub surface: SurfaceConfig,
}

impl RuntimeConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from all sources
    ///
    /// `TETHER_CONFIG` names a file that takes precedence over
    /// [`CONFIG_PATHS`]. `TETHER_WORKERS` overrides the worker count and
    /// `TETHER_INLINE=1` runs async methods on the calling thread.
    pub fn load() -> Self {
        let explicit = std::env::var("TETHER_CONFIG").ok();
        let candidates = explicit
            .iter()
            .map(String::as_str)
            .chain(CONFIG_PATHS.iter().copied());

        let mut config = Self::default();
        for path in candidates {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(loaded) => {
                    log::info!("Loaded runtime config from {}", path);
                    config = loaded;
                    break;
                }
                Err(e) => log::warn!("Ignoring config {}: {}", path, e),
            }
        }

        if let Ok(workers) = std::env::var("TETHER_WORKERS") {
            match workers.parse() {
                Ok(n) => config.bridge.worker_threads = n,
                Err(_) => log::warn!("Ignoring TETHER_WORKERS={}", workers),
            }
        }
        if std::env::var("TETHER_INLINE")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false)
        {
            config.bridge.async_on_workers = false;
        }

        config
    }
}
