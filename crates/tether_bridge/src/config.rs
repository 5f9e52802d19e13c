//! Bridge configuration

use serde::Deserialize;
use tether_value::MarshalConfig;

/// Configuration for a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Run callback and promise methods on the worker pool.
    /// When false they run on the calling thread like sync methods.
    pub async_on_workers: bool,
    /// Number of worker threads
    pub worker_threads: usize,
    /// Prefix for worker thread names
    pub worker_name: String,
    /// Value marshalling limits
    pub marshal: MarshalConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            async_on_workers: true,
            worker_threads: default_worker_threads(),
            worker_name: "tether-worker".to_string(),
            marshal: MarshalConfig::default(),
        }
    }
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().clamp(1, 4))
        .unwrap_or(2)
}

impl BridgeConfig {
    /// Config that runs everything on the calling thread
    pub fn inline() -> Self {
        Self {
            async_on_workers: false,
            worker_threads: 0,
            ..Self::default()
        }
    }
}
