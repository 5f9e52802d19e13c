//! Shadow tree errors

use thiserror::Error;

/// Result type for tree operations
pub type Result<T> = std::result::Result<T, CommitError>;

/// Why a commit did not install a new revision
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// Other commits kept winning the race
    #[error("commit lost the race {attempts} times")]
    Contention { attempts: u32 },

    /// The tree no longer accepts commits
    #[error("shadow tree has been torn down")]
    TornDown,

    /// The mutator returned an unacceptable root
    #[error("invalid root: {0}")]
    InvalidRoot(String),
}
