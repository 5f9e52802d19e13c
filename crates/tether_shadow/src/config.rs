//! Shadow tree configuration

use serde::Deserialize;
use std::time::Duration;

/// Backoff between commit attempts that lost a race
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the second retry (microseconds). The first retry only yields.
    pub initial_delay_us: u64,
    /// Upper bound for any delay (microseconds)
    pub max_delay_us: u64,
    /// Growth factor between retries
    pub multiplier: f32,
    /// Whether to wait at all
    pub enabled: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_us: 1,
            max_delay_us: 1_000,
            multiplier: 2.0,
            enabled: true,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `retry` (1-based). Zero means yield only.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if !self.enabled || retry <= 1 {
            return Duration::ZERO;
        }

        let delay_us = (self.initial_delay_us as f64)
            * (self.multiplier as f64).powi(retry.saturating_sub(2) as i32);
        let delay_us = delay_us.min(self.max_delay_us as f64) as u64;

        Duration::from_micros(delay_us)
    }

    /// Retry immediately every time
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Configuration for a [`ShadowTree`](crate::ShadowTree)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShadowTreeConfig {
    /// Retries after the first attempt before giving up with contention
    pub max_commit_retries: u32,
    pub backoff: BackoffConfig,
}

impl Default for ShadowTreeConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 8,
            backoff: BackoffConfig::default(),
        }
    }
}
