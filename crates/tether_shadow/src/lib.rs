//! # Tether Shadow - Shadow nodes, layout and revisions
//!
//! The shadow tree is the native-side mirror of the UI description:
//!
//! ```text
//! ShadowTree (surface)
//!     │ current_revision() → Arc<RevisionSnapshot>
//!     ▼
//! RevisionSnapshot { revision, root: ShadowNode, layout: LayoutResult }
//!     │
//!     ▼
//! ShadowNode (immutable) ── family: tag, kind, EventEmitter
//!     ├── Props (values + LayoutStyle)
//!     ├── State (versioned)
//!     └── children: Arc<[ShadowNode]>
//! ```
//!
//! ## Key Concepts
//!
//! - **Immutability**: nodes are never changed after creation; a commit
//!   builds a new root sharing every untouched subtree
//! - **Optimistic commit**: writers race, the loser re-runs its mutator on
//!   the winner's revision
//! - **Kind hooks**: per-kind layout adjustments are dispatched on
//!   [`ComponentKind`], not through a class hierarchy

pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod layout;
pub mod node;
pub mod props;
pub mod scroll;
pub mod state;
pub mod style;
pub mod tree;

pub use config::{BackoffConfig, ShadowTreeConfig};
pub use error::{CommitError, Result};
pub use event::{EventEmitter, EventPipe, NullEventPipe};
pub use geometry::{Point, Rect, Size};
pub use layout::{LayoutContext, LayoutDirection, LayoutResult, NodeGeometry};
pub use node::{ComponentKind, ElementRef, ShadowNode, ShadowNodeBuilder, ShadowNodeFamily, Tag};
pub use props::Props;
pub use state::{ScrollViewState, State, StateData};
pub use style::{Align, Dimension, Display, Edges, FlexDirection, Justify, LayoutStyle};
pub use tree::{RevisionSnapshot, ShadowTree, ShadowTreeDelegate, ShadowTreeStats, TreeStatus};

/// Prelude for common imports
pub mod prelude {
    pub use crate::layout::{LayoutContext, LayoutDirection};
    pub use crate::node::{ComponentKind, ShadowNode, Tag};
    pub use crate::props::Props;
    pub use crate::tree::ShadowTree;
}
