//! Scroll view state maintenance
//!
//! After layout, a scroll view's state must describe the content it
//! actually holds. When the content bounding rect differs from the state,
//! the node is cloned with updated state so the change lands in the same
//! commit as the layout that caused it. The content offset is the
//! platform's and is carried over untouched; clamping only happens in
//! layout.

use crate::geometry::{Point, Rect};
use crate::layout::LayoutResult;
use crate::node::{ComponentKind, ShadowNode};
use crate::state::{ScrollViewState, StateData};

/// Refresh scroll view state below `root`.
///
/// Returns `None` when nothing changed. Otherwise only the nodes on paths
/// to updated scroll views are copied.
pub fn update_state_if_needed(root: &ShadowNode, layout: &LayoutResult) -> Option<ShadowNode> {
    let mut changed_children = None;
    for (index, child) in root.children().iter().enumerate() {
        if let Some(updated) = update_state_if_needed(child, layout) {
            let children = changed_children.get_or_insert_with(|| root.children().to_vec());
            children[index] = updated;
        }
    }

    let node = changed_children.map(|children| root.clone_with_children(children));

    let current = node.as_ref().unwrap_or(root);
    match refreshed_scroll_state(current, layout) {
        Some(state) => Some(current.clone_with_state(current.state().updated(state))),
        None => node,
    }
}

fn refreshed_scroll_state(node: &ShadowNode, layout: &LayoutResult) -> Option<StateData> {
    if node.kind() != ComponentKind::ScrollView {
        return None;
    }
    let geometry = layout.get(node.tag())?;
    let bounds = Rect {
        origin: Point::ZERO,
        size: geometry.content_size,
    };

    match node.state().scroll_view() {
        Some(current) if current.content_bounding_rect == bounds => None,
        current => {
            let next = ScrollViewState {
                content_offset: current.map(|state| state.content_offset).unwrap_or_default(),
                content_bounding_rect: bounds,
            };
            log::trace!(
                "Updating scroll view {} state: content {:?}",
                node.tag(),
                geometry.content_size
            );
            Some(StateData::ScrollView(next))
        }
    }
}
