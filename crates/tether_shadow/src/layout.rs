//! Layout computation
//!
//! Two passes over an immutable node tree:
//!
//! 1. **Measure** (bottom-up): intrinsic border-box size of every node from
//!    its explicit dimensions, padding and children.
//! 2. **Arrange** (top-down): final frames from the parent's size, flex
//!    grow, justify and align, mirrored for RTL and snapped to the pixel grid.
//!
//! Kind-specific adjustments (the scroll view content size and offset) run
//! as a hook after a node's children are arranged. Layout is a pure function
//! of the tree and the [`LayoutContext`].

use crate::geometry::{Point, Rect, Size};
use crate::node::{ComponentKind, ShadowNode, Tag};
use crate::style::{Align, Dimension, Display, Justify, LayoutStyle, ResolvedEdges};
use std::collections::HashMap;

/// Horizontal layout direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Inputs to a layout pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    /// Space offered to the root. Infinite components size to content.
    pub available: Size,
    pub direction: LayoutDirection,
    /// Physical pixels per point
    pub point_scale_factor: f32,
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self {
            available: Size::new(f32::INFINITY, f32::INFINITY),
            direction: LayoutDirection::Ltr,
            point_scale_factor: 1.0,
        }
    }
}

impl LayoutContext {
    pub fn new(available: Size) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_scale(mut self, point_scale_factor: f32) -> Self {
        self.point_scale_factor = point_scale_factor;
        self
    }
}

/// Computed geometry of one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGeometry {
    pub tag: Tag,
    pub kind: ComponentKind,
    /// Frame relative to the parent's content origin
    pub frame: Rect,
    /// Scroll position, clamped to the scrollable range
    pub content_offset: Point,
    /// Size of the laid out content; equals the frame size for non-scrolling nodes
    pub content_size: Size,
    pub direction: LayoutDirection,
}

impl NodeGeometry {
    /// Offset at which children are drawn relative to the frame origin
    pub fn content_origin_offset(&self) -> Point {
        -self.content_offset
    }
}

/// Geometry of a whole tree in depth-first order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutResult {
    geometry: Vec<NodeGeometry>,
    index: HashMap<Tag, usize>,
}

impl LayoutResult {
    fn push(&mut self, geometry: NodeGeometry) {
        self.index.insert(geometry.tag, self.geometry.len());
        self.geometry.push(geometry);
    }

    /// Geometry of a node by tag
    pub fn get(&self, tag: Tag) -> Option<&NodeGeometry> {
        self.index.get(&tag).map(|&i| &self.geometry[i])
    }

    /// Frame of a node by tag
    pub fn frame(&self, tag: Tag) -> Option<Rect> {
        self.get(tag).map(|g| g.frame)
    }

    /// All geometry, depth first
    pub fn geometry(&self) -> &[NodeGeometry] {
        &self.geometry
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Tags whose geometry is new or differs from `previous`
    pub fn changed_since(&self, previous: &LayoutResult) -> Vec<Tag> {
        self.geometry
            .iter()
            .filter(|g| previous.get(g.tag) != Some(*g))
            .map(|g| g.tag)
            .collect()
    }
}

/// Intrinsic size of a subtree, mirroring the node tree
struct Measured {
    size: Size,
    children: Vec<Measured>,
}

/// Lay out `root` under `context`
pub fn compute(root: &ShadowNode, context: &LayoutContext) -> LayoutResult {
    let measured = measure(root, context);
    let style = root.props().style();

    let width = style
        .width
        .resolve(context.available.width)
        .or_else(|| finite(context.available.width))
        .unwrap_or(measured.size.width);
    let height = style
        .height
        .resolve(context.available.height)
        .or_else(|| finite(context.available.height))
        .unwrap_or(measured.size.height);

    let frame = Rect::new(0.0, 0.0, width, height).round_to_pixels(context.point_scale_factor);
    let mut result = LayoutResult::default();
    arrange(root, &measured, frame, context, &mut result);
    result
}

fn finite(value: f32) -> Option<f32> {
    value.is_finite().then_some(value)
}

fn clamp(value: f32, min: Dimension, max: Dimension, parent: f32) -> f32 {
    let mut value = value;
    if let Some(max) = max.resolve(parent) {
        value = value.min(max);
    }
    if let Some(min) = min.resolve(parent) {
        value = value.max(min);
    }
    value.max(0.0)
}

/// Main axis of a node's children, including the scroll axis override
fn main_axis_is_row(node: &ShadowNode) -> bool {
    let style = node.props().style();
    match node.kind() {
        ComponentKind::ScrollView => style.horizontal,
        ComponentKind::Root | ComponentKind::View => style.is_row(),
    }
}

fn measure(node: &ShadowNode, context: &LayoutContext) -> Measured {
    let style = node.props().style();
    if style.display == Display::None {
        return Measured {
            size: Size::ZERO,
            children: node
                .children()
                .iter()
                .map(|child| measure(child, context))
                .collect(),
        };
    }

    let row = main_axis_is_row(node);
    let padding = style.padding.resolve(context.direction);
    let children: Vec<Measured> = node
        .children()
        .iter()
        .map(|child| measure(child, context))
        .collect();

    let mut main = 0.0f32;
    let mut cross = 0.0f32;
    for (child, measured) in node.children().iter().zip(&children) {
        let child_style = child.props().style();
        if child_style.display == Display::None {
            continue;
        }
        let margin = child_style.margin.resolve(context.direction);
        main += measured.size.along(row) + margin.along(row);
        cross = cross.max(measured.size.along(!row) + margin.along(!row));
    }

    // Scroll views do not grow with their content along the scroll axis.
    if node.kind() == ComponentKind::ScrollView {
        main = 0.0;
    }
    let (content_w, content_h) = if row { (main, cross) } else { (cross, main) };
    let width = match style.width {
        Dimension::Points(points) => points,
        _ => content_w + padding.horizontal(),
    };
    let height = match style.height {
        Dimension::Points(points) => points,
        _ => content_h + padding.vertical(),
    };

    // Percent constraints need the parent and are applied during arrange.
    let unbounded = f32::INFINITY;
    Measured {
        size: Size::new(
            clamp(width, style.min_width, style.max_width, unbounded),
            clamp(height, style.min_height, style.max_height, unbounded),
        ),
        children,
    }
}

/// Position and size of one child before mirroring, in logical coordinates
struct Slot {
    main_pos: f32,
    main: f32,
    cross_pos: f32,
    cross: f32,
}

fn arrange(
    node: &ShadowNode,
    measured: &Measured,
    frame: Rect,
    context: &LayoutContext,
    out: &mut LayoutResult,
) {
    let own_index = out.len();
    out.push(NodeGeometry {
        tag: node.tag(),
        kind: node.kind(),
        frame,
        content_offset: Point::ZERO,
        content_size: frame.size,
        direction: context.direction,
    });

    let style = node.props().style();
    if style.display == Display::None {
        for (child, child_measured) in node.children().iter().zip(&measured.children) {
            arrange(child, child_measured, Rect::ZERO, context, out);
        }
        return;
    }

    let row = main_axis_is_row(node);
    let scrolls = node.kind() == ComponentKind::ScrollView;
    let padding = style.padding.resolve(context.direction);
    let content = Size::new(
        (frame.width() - padding.horizontal()).max(0.0),
        (frame.height() - padding.vertical()).max(0.0),
    );

    let slots = distribute(node, measured, style, &padding, content, row, scrolls, context);

    let mut bounds: Option<Rect> = None;
    for ((child, child_measured), slot) in node
        .children()
        .iter()
        .zip(&measured.children)
        .zip(&slots)
    {
        let child_frame = match slot {
            Some(slot) => {
                let (x, y, w, h) = if row {
                    (slot.main_pos, slot.cross_pos, slot.main, slot.cross)
                } else {
                    (slot.cross_pos, slot.main_pos, slot.cross, slot.main)
                };
                let x = match context.direction {
                    LayoutDirection::Ltr => x,
                    LayoutDirection::Rtl => frame.width() - x - w,
                };
                let rect = Rect::new(x, y, w, h).round_to_pixels(context.point_scale_factor);
                bounds = Some(bounds.map_or(rect, |b| b.union(&rect)));
                rect
            }
            None => Rect::ZERO,
        };
        arrange(child, child_measured, child_frame, context, out);
    }

    if scrolls {
        scroll_view_hook(node, frame, bounds, &padding, context, &mut out.geometry[own_index]);
    }
}

/// Compute child slots along the main and cross axes
#[allow(clippy::too_many_arguments)]
fn distribute(
    node: &ShadowNode,
    measured: &Measured,
    style: &LayoutStyle,
    padding: &ResolvedEdges,
    content: Size,
    row: bool,
    scrolls: bool,
    context: &LayoutContext,
) -> Vec<Option<Slot>> {
    let main_size = content.along(row);
    let cross_size = content.along(!row);

    struct Item<'a> {
        style: &'a LayoutStyle,
        margin: ResolvedEdges,
        main: f32,
        cross: f32,
    }

    let mut items: Vec<Option<Item<'_>>> = Vec::with_capacity(node.children().len());
    for (child, child_measured) in node.children().iter().zip(&measured.children) {
        let child_style = child.props().style();
        if child_style.display == Display::None {
            items.push(None);
            continue;
        }
        let margin = child_style.margin.resolve(context.direction);
        let (main_dim, cross_dim) = if row {
            (child_style.width, child_style.height)
        } else {
            (child_style.height, child_style.width)
        };
        let main = main_dim
            .resolve(main_size)
            .unwrap_or_else(|| child_measured.size.along(row));
        let cross = match cross_dim.resolve(cross_size) {
            Some(cross) => cross,
            None if style.align_items == Align::Stretch && cross_size.is_finite() => {
                (cross_size - margin.along(!row)).max(0.0)
            }
            None => child_measured.size.along(!row),
        };
        items.push(Some(Item {
            style: child_style,
            margin,
            main,
            cross,
        }));
    }

    // Scroll views let content overflow along the scroll axis.
    let constrained = !scrolls && main_size.is_finite();
    let used: f32 = items
        .iter()
        .flatten()
        .map(|item| item.main + item.margin.along(row))
        .sum();
    let free = if constrained { main_size - used } else { 0.0 };

    let total_grow: f32 = items.iter().flatten().map(|item| item.style.flex_grow).sum();
    if free > 0.0 && total_grow > 0.0 {
        for item in items.iter_mut().flatten() {
            item.main += free * item.style.flex_grow / total_grow;
        }
    }

    for item in items.iter_mut().flatten() {
        let (min_main, max_main, min_cross, max_cross) = if row {
            (item.style.min_width, item.style.max_width, item.style.min_height, item.style.max_height)
        } else {
            (item.style.min_height, item.style.max_height, item.style.min_width, item.style.max_width)
        };
        item.main = clamp(item.main, min_main, max_main, main_size);
        item.cross = clamp(item.cross, min_cross, max_cross, cross_size);
    }

    let count = items.iter().flatten().count();
    let used: f32 = items
        .iter()
        .flatten()
        .map(|item| item.main + item.margin.along(row))
        .sum();
    let remaining = if constrained { main_size - used } else { 0.0 };
    let (mut cursor, gap) = match style.justify_content {
        Justify::FlexStart => (0.0, 0.0),
        Justify::Center => (remaining / 2.0, 0.0),
        Justify::FlexEnd => (remaining, 0.0),
        Justify::SpaceBetween if count > 1 => (0.0, remaining.max(0.0) / (count - 1) as f32),
        Justify::SpaceBetween => (0.0, 0.0),
        Justify::SpaceAround if count > 0 => {
            let share = remaining.max(0.0) / count as f32;
            (share / 2.0, share)
        }
        Justify::SpaceAround => (0.0, 0.0),
    };

    let main_origin = padding.leading(row);
    let cross_origin = padding.leading(!row);
    items
        .into_iter()
        .map(|item| {
            let item = item?;
            let main_pos = main_origin + cursor + item.margin.leading(row);
            cursor += item.main + item.margin.along(row) + gap;

            let free_cross = if cross_size.is_finite() {
                cross_size - item.cross - item.margin.along(!row)
            } else {
                0.0
            };
            let align_offset = match style.align_items {
                Align::Stretch | Align::FlexStart => 0.0,
                Align::Center => free_cross / 2.0,
                Align::FlexEnd => free_cross,
            };
            Some(Slot {
                main_pos,
                main: item.main,
                cross_pos: cross_origin + item.margin.leading(!row) + align_offset,
                cross: item.cross,
            })
        })
        .collect()
}

/// Scroll view adjustment: content size from the children's bounding rect
/// and the state's offset clamped to the scrollable range
fn scroll_view_hook(
    node: &ShadowNode,
    frame: Rect,
    children_bounds: Option<Rect>,
    padding: &ResolvedEdges,
    context: &LayoutContext,
    geometry: &mut NodeGeometry,
) {
    let content_rect = content_bounding_rect(children_bounds, padding, context.direction);
    let content_size = Size::new(
        content_rect.width().max(frame.width()),
        content_rect.height().max(frame.height()),
    );
    let requested = node
        .state()
        .scroll_view()
        .map(|state| state.content_offset)
        .unwrap_or_default();

    geometry.content_size = content_size;
    geometry.content_offset = Point::new(
        requested
            .x
            .clamp(0.0, (content_size.width - frame.width()).max(0.0)),
        requested
            .y
            .clamp(0.0, (content_size.height - frame.height()).max(0.0)),
    );
}

/// Bounding rect of a scroll view's content in its own coordinates,
/// extended by the right and bottom padding
fn content_bounding_rect(
    children_bounds: Option<Rect>,
    padding: &ResolvedEdges,
    direction: LayoutDirection,
) -> Rect {
    let Some(bounds) = children_bounds else {
        return Rect::ZERO;
    };
    let right_padding = match direction {
        LayoutDirection::Ltr => padding.end,
        LayoutDirection::Rtl => padding.start,
    };
    let x = bounds.x().min(0.0);
    let y = bounds.y().min(0.0);
    Rect::new(
        x,
        y,
        bounds.max_x() + right_padding - x,
        bounds.max_y() + padding.bottom - y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::Props;
    use crate::state::{ScrollViewState, State, StateData};
    use tether_value::NativeValue;

    fn node(tag: u64, kind: ComponentKind, props: &[(&str, NativeValue)]) -> ShadowNode {
        ShadowNode::builder(Tag::new(tag), kind)
            .props(props.iter().cloned().collect())
            .build()
    }

    fn with_children(parent: ShadowNode, children: Vec<ShadowNode>) -> ShadowNode {
        parent.clone_with_children(children)
    }

    fn context(width: f32, height: f32) -> LayoutContext {
        LayoutContext::new(Size::new(width, height))
    }

    fn grow_row() -> ShadowNode {
        with_children(
            node(
                1,
                ComponentKind::Root,
                &[("flexDirection", "row".into()), ("padding", 10.0.into())],
            ),
            vec![
                node(2, ComponentKind::View, &[("width", 50.0.into())]),
                node(3, ComponentKind::View, &[("flexGrow", 1.0.into())]),
                node(4, ComponentKind::View, &[("flexGrow", 2.0.into())]),
            ],
        )
    }

    #[test]
    fn test_row_flex_grow() {
        let layout = grow_row().layout(&context(300.0, 100.0));

        assert_eq!(layout.len(), 4);
        assert_eq!(layout.frame(Tag::new(1)), Some(Rect::new(0.0, 0.0, 300.0, 100.0)));
        assert_eq!(layout.frame(Tag::new(2)), Some(Rect::new(10.0, 10.0, 50.0, 80.0)));
        assert_eq!(layout.frame(Tag::new(3)), Some(Rect::new(60.0, 10.0, 77.0, 80.0)));
        assert_eq!(layout.frame(Tag::new(4)), Some(Rect::new(137.0, 10.0, 153.0, 80.0)));
    }

    #[test]
    fn test_rtl_mirrors_row() {
        let ctx = context(300.0, 100.0).with_direction(LayoutDirection::Rtl);
        let layout = grow_row().layout(&ctx);

        assert_eq!(layout.frame(Tag::new(2)), Some(Rect::new(240.0, 10.0, 50.0, 80.0)));
        assert_eq!(layout.frame(Tag::new(4)).map(|f| f.x()), Some(10.0));
        assert!(layout
            .geometry()
            .iter()
            .all(|g| g.direction == LayoutDirection::Rtl));
    }

    #[test]
    fn test_margin_start_follows_direction() {
        let tree = with_children(
            node(1, ComponentKind::Root, &[("alignItems", "flex-start".into())]),
            vec![node(
                2,
                ComponentKind::View,
                &[
                    ("width", 10.0.into()),
                    ("height", 10.0.into()),
                    ("marginStart", 5.0.into()),
                ],
            )],
        );

        let ltr = tree.layout(&context(100.0, 100.0));
        let rtl = tree.layout(&context(100.0, 100.0).with_direction(LayoutDirection::Rtl));
        assert_eq!(ltr.frame(Tag::new(2)), Some(Rect::new(5.0, 0.0, 10.0, 10.0)));
        assert_eq!(rtl.frame(Tag::new(2)), Some(Rect::new(85.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_center_both_axes() {
        let tree = with_children(
            node(
                1,
                ComponentKind::Root,
                &[
                    ("justifyContent", "center".into()),
                    ("alignItems", "center".into()),
                ],
            ),
            vec![node(
                2,
                ComponentKind::View,
                &[("width", 20.0.into()), ("height", 20.0.into())],
            )],
        );
        let layout = tree.layout(&context(100.0, 100.0));
        assert_eq!(layout.frame(Tag::new(2)), Some(Rect::new(40.0, 40.0, 20.0, 20.0)));
    }

    #[test]
    fn test_space_between_and_hidden_children() {
        let child = |tag| node(tag, ComponentKind::View, &[("width", 10.0.into())]);
        let hidden = node(
            9,
            ComponentKind::View,
            &[("width", 40.0.into()), ("display", "none".into())],
        );
        let tree = with_children(
            node(
                1,
                ComponentKind::Root,
                &[
                    ("flexDirection", "row".into()),
                    ("justifyContent", "space-between".into()),
                ],
            ),
            vec![child(2), hidden, child(3), child(4)],
        );

        let layout = tree.layout(&context(100.0, 10.0));
        let xs: Vec<f32> = [2, 3, 4]
            .iter()
            .filter_map(|&t| layout.frame(Tag::new(t)))
            .map(|f| f.x())
            .collect();
        assert_eq!(xs, vec![0.0, 45.0, 90.0]);
        assert_eq!(layout.frame(Tag::new(9)), Some(Rect::ZERO));
    }

    #[test]
    fn test_percent_with_max() {
        let tree = with_children(
            node(1, ComponentKind::Root, &[("flexDirection", "row".into())]),
            vec![node(
                2,
                ComponentKind::View,
                &[("width", "50%".into()), ("maxWidth", 80.0.into())],
            )],
        );
        let layout = tree.layout(&context(200.0, 50.0));
        assert_eq!(layout.frame(Tag::new(2)), Some(Rect::new(0.0, 0.0, 80.0, 50.0)));
    }

    #[test]
    fn test_pixel_rounding() {
        let tree = with_children(
            node(1, ComponentKind::Root, &[]),
            vec![node(2, ComponentKind::View, &[("height", 10.3.into())])],
        );
        let layout = tree.layout(&context(50.0, 50.0).with_scale(2.0));
        assert_eq!(layout.frame(Tag::new(2)), Some(Rect::new(0.0, 0.0, 50.0, 10.5)));
    }

    #[test]
    fn test_unbounded_root_sizes_to_content() {
        let tree = with_children(
            node(1, ComponentKind::Root, &[("padding", 4.0.into())]),
            vec![
                node(2, ComponentKind::View, &[("width", 30.0.into()), ("height", 10.0.into())]),
                node(3, ComponentKind::View, &[("width", 20.0.into()), ("height", 15.0.into())]),
            ],
        );
        let layout = tree.layout(&LayoutContext::default());
        assert_eq!(layout.frame(Tag::new(1)), Some(Rect::new(0.0, 0.0, 38.0, 33.0)));
    }

    fn scroll_tree(offset_y: f32) -> ShadowNode {
        let state = State::initial(ComponentKind::ScrollView).updated(StateData::ScrollView(
            ScrollViewState {
                content_offset: Point::new(0.0, offset_y),
                ..Default::default()
            },
        ));
        let scroll = ShadowNode::builder(Tag::new(2), ComponentKind::ScrollView)
            .props([("flexGrow", 1.0)].into_iter().collect::<Props>())
            .state(state)
            .children(
                (10..13).map(|t| node(t, ComponentKind::View, &[("height", 60.0.into())])),
            )
            .build();
        with_children(node(1, ComponentKind::Root, &[]), vec![scroll])
    }

    #[test]
    fn test_scroll_view_content_size_and_clamped_offset() {
        let layout = scroll_tree(500.0).layout(&context(100.0, 100.0));
        let scroll = layout.get(Tag::new(2)).unwrap();

        assert_eq!(scroll.frame, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(scroll.content_size, Size::new(100.0, 180.0));
        assert_eq!(scroll.content_offset, Point::new(0.0, 80.0));
        assert_eq!(scroll.content_origin_offset(), Point::new(0.0, -80.0));
        assert_eq!(layout.frame(Tag::new(12)), Some(Rect::new(0.0, 120.0, 100.0, 60.0)));

        let in_range = scroll_tree(30.0).layout(&context(100.0, 100.0));
        assert_eq!(
            in_range.get(Tag::new(2)).map(|g| g.content_offset),
            Some(Point::new(0.0, 30.0))
        );
    }

    #[test]
    fn test_changed_since() {
        let tree = grow_row();
        let before = tree.layout(&context(300.0, 100.0));
        let after = tree.layout(&context(300.0, 120.0));

        assert!(before.changed_since(&before).is_empty());
        let changed = after.changed_since(&before);
        assert_eq!(changed.len(), 4);
        assert!(changed.contains(&Tag::new(3)));
    }
}
