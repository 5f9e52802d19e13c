//! Runtime errors

use tether_bridge::BridgeError;
use tether_module::RegistryError;
use tether_shadow::{CommitError, Tag};
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors raised while configuring or driving a [`Runtime`](crate::Runtime)
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("no surface {0}")]
    UnknownSurface(Tag),

    #[error("runtime torn down")]
    TornDown,
}
