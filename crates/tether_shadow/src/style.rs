//! Layout style parsed from props
//!
//! Unknown keys are ignored. Known keys with unusable values are logged and
//! fall back to their defaults, so a bad prop never fails a commit.

use crate::layout::LayoutDirection;
use std::collections::BTreeMap;
use tether_value::NativeValue;

/// A length that may depend on the parent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    /// Size from content
    #[default]
    Auto,
    /// Absolute points
    Points(f32),
    /// Percentage of the parent's content box
    Percent(f32),
}

impl Dimension {
    /// Resolve against the parent's size. Percentages of an unbounded
    /// parent resolve to `None`.
    pub fn resolve(&self, parent: f32) -> Option<f32> {
        match *self {
            Self::Auto => None,
            Self::Points(points) => Some(points),
            Self::Percent(percent) if parent.is_finite() => Some(parent * percent / 100.0),
            Self::Percent(_) => None,
        }
    }

    fn parse(key: &str, value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Null => Some(Self::Auto),
            NativeValue::Number(n) if n.is_finite() => Some(Self::Points(*n as f32)),
            NativeValue::String(s) if s == "auto" => Some(Self::Auto),
            NativeValue::String(s) => match s.strip_suffix('%').map(str::trim).map(str::parse::<f32>) {
                Some(Ok(percent)) if percent.is_finite() => Some(Self::Percent(percent)),
                _ => invalid(key, value),
            },
            _ => invalid(key, value),
        }
    }
}

/// Main axis of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Column,
    Row,
}

/// Main axis distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    FlexStart,
    Center,
    FlexEnd,
    SpaceBetween,
    SpaceAround,
}

/// Cross axis alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Stretch,
    FlexStart,
    Center,
    FlexEnd,
}

/// Whether a node takes part in layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Flex,
    None,
}

/// Edge values as written, before direction is known
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub all: Option<f32>,
    pub horizontal: Option<f32>,
    pub vertical: Option<f32>,
    pub top: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub start: Option<f32>,
    pub end: Option<f32>,
}

/// Edge values resolved to logical sides
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedEdges {
    pub top: f32,
    pub bottom: f32,
    /// Leading horizontal edge: left in LTR, right in RTL
    pub start: f32,
    /// Trailing horizontal edge
    pub end: f32,
}

impl ResolvedEdges {
    pub fn horizontal(&self) -> f32 {
        self.start + self.end
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// Sum along an axis
    pub(crate) fn along(&self, row: bool) -> f32 {
        if row {
            self.horizontal()
        } else {
            self.vertical()
        }
    }

    /// Leading edge along an axis
    pub(crate) fn leading(&self, row: bool) -> f32 {
        if row {
            self.start
        } else {
            self.top
        }
    }
}

impl Edges {
    /// Resolve to logical edges.
    ///
    /// Precedence: specific edge, then axis shorthand, then `all`. Physical
    /// left/right map onto start/end according to `direction`, with explicit
    /// start/end taking priority.
    pub fn resolve(&self, direction: LayoutDirection) -> ResolvedEdges {
        let (leading_physical, trailing_physical) = match direction {
            LayoutDirection::Ltr => (self.left, self.right),
            LayoutDirection::Rtl => (self.right, self.left),
        };
        let horizontal = self.horizontal.or(self.all);
        let vertical = self.vertical.or(self.all);

        ResolvedEdges {
            top: self.top.or(vertical).unwrap_or(0.0),
            bottom: self.bottom.or(vertical).unwrap_or(0.0),
            start: self
                .start
                .or(leading_physical)
                .or(horizontal)
                .unwrap_or(0.0),
            end: self
                .end
                .or(trailing_physical)
                .or(horizontal)
                .unwrap_or(0.0),
        }
    }

    fn set(&mut self, suffix: &str, value: f32) -> bool {
        let slot = match suffix {
            "" => &mut self.all,
            "Horizontal" => &mut self.horizontal,
            "Vertical" => &mut self.vertical,
            "Top" => &mut self.top,
            "Bottom" => &mut self.bottom,
            "Left" => &mut self.left,
            "Right" => &mut self.right,
            "Start" => &mut self.start,
            "End" => &mut self.end,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Everything layout reads from props
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutStyle {
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,
    pub min_height: Dimension,
    pub max_height: Dimension,
    pub flex_direction: FlexDirection,
    pub flex_grow: f32,
    pub justify_content: Justify,
    pub align_items: Align,
    pub padding: Edges,
    pub margin: Edges,
    pub display: Display,
    /// Scroll axis of a scroll view
    pub horizontal: bool,
}

impl LayoutStyle {
    /// Parse from a props map
    pub fn from_props(values: &BTreeMap<String, NativeValue>) -> Self {
        let mut style = Self::default();
        for (key, value) in values {
            style.apply(key, value);
        }
        style
    }

    fn apply(&mut self, key: &str, value: &NativeValue) {
        match key {
            "width" => self.width = Dimension::parse(key, value).unwrap_or_default(),
            "height" => self.height = Dimension::parse(key, value).unwrap_or_default(),
            "minWidth" => self.min_width = Dimension::parse(key, value).unwrap_or_default(),
            "maxWidth" => self.max_width = Dimension::parse(key, value).unwrap_or_default(),
            "minHeight" => self.min_height = Dimension::parse(key, value).unwrap_or_default(),
            "maxHeight" => self.max_height = Dimension::parse(key, value).unwrap_or_default(),
            "flexGrow" => {
                self.flex_grow = match value.as_f64() {
                    Some(grow) if grow >= 0.0 && grow.is_finite() => grow as f32,
                    _ => invalid(key, value).unwrap_or(0.0),
                }
            }
            "flexDirection" => {
                self.flex_direction = match value.as_str() {
                    Some("row") => FlexDirection::Row,
                    Some("column") => FlexDirection::Column,
                    _ => invalid(key, value).unwrap_or_default(),
                }
            }
            "justifyContent" => {
                self.justify_content = match value.as_str() {
                    Some("flex-start") => Justify::FlexStart,
                    Some("center") => Justify::Center,
                    Some("flex-end") => Justify::FlexEnd,
                    Some("space-between") => Justify::SpaceBetween,
                    Some("space-around") => Justify::SpaceAround,
                    _ => invalid(key, value).unwrap_or_default(),
                }
            }
            "alignItems" => {
                self.align_items = match value.as_str() {
                    Some("stretch") => Align::Stretch,
                    Some("flex-start") => Align::FlexStart,
                    Some("center") => Align::Center,
                    Some("flex-end") => Align::FlexEnd,
                    _ => invalid(key, value).unwrap_or_default(),
                }
            }
            "display" => {
                self.display = match value.as_str() {
                    Some("flex") => Display::Flex,
                    Some("none") => Display::None,
                    _ => invalid(key, value).unwrap_or_default(),
                }
            }
            "horizontal" => self.horizontal = value.as_bool().unwrap_or(false),
            _ => {
                if let Some(suffix) = key.strip_prefix("padding") {
                    apply_edge(&mut self.padding, key, suffix, value);
                } else if let Some(suffix) = key.strip_prefix("margin") {
                    apply_edge(&mut self.margin, key, suffix, value);
                }
            }
        }
    }

    /// Main axis of this node's children
    pub(crate) fn is_row(&self) -> bool {
        self.flex_direction == FlexDirection::Row
    }
}

fn apply_edge(edges: &mut Edges, key: &str, suffix: &str, value: &NativeValue) {
    match value.as_f64() {
        Some(points) if points.is_finite() => {
            if !edges.set(suffix, points as f32) {
                log::trace!("Ignoring unknown edge prop '{}'", key);
            }
        }
        _ => {
            invalid::<f32>(key, value);
        }
    }
}

fn invalid<T>(key: &str, value: &NativeValue) -> Option<T> {
    log::warn!("Ignoring invalid value {:?} for style prop '{}'", value, key);
    None
}
