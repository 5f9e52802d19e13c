//! Versioned node state
//!
//! State is owned by a node but, unlike props, is written by the native side
//! (for example the scroll position reported by the platform). It is
//! replaced wholesale; every replacement bumps the revision.

use crate::geometry::{Point, Rect};
use crate::node::ComponentKind;
use tether_value::NativeValue;

/// State of a scroll view
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollViewState {
    /// Scroll position reported by the platform
    pub content_offset: Point,
    /// Bounding rect of the laid out content
    pub content_bounding_rect: Rect,
}

/// Kind-specific state payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StateData {
    #[default]
    Empty,
    ScrollView(ScrollViewState),
    Custom(NativeValue),
}

/// A revision of node state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct State {
    revision: u64,
    data: StateData,
}

impl State {
    /// Initial state for a component kind
    pub fn initial(kind: ComponentKind) -> Self {
        let data = match kind {
            ComponentKind::ScrollView => StateData::ScrollView(ScrollViewState::default()),
            ComponentKind::Root | ComponentKind::View => StateData::Empty,
        };
        Self { revision: 0, data }
    }

    /// Revision counter, starting at 0
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// State payload
    pub fn data(&self) -> &StateData {
        &self.data
    }

    /// Scroll view payload, if this is scroll view state
    pub fn scroll_view(&self) -> Option<&ScrollViewState> {
        match &self.data {
            StateData::ScrollView(state) => Some(state),
            _ => None,
        }
    }

    /// The next revision carrying `data`
    pub fn updated(&self, data: StateData) -> State {
        State {
            revision: self.revision + 1,
            data,
        }
    }
}
