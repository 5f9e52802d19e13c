//! Shadow nodes
//!
//! A [`ShadowNode`] is an immutable, reference-counted description of one
//! UI element. "Changing" a node means cloning it with one field replaced;
//! every field not replaced, the children array included, is shared with
//! the original.

use crate::event::EventEmitter;
use crate::layout::{self, LayoutContext, LayoutResult};
use crate::props::Props;
use crate::state::State;
use std::fmt;
use std::sync::Arc;
use tether_core::IdGenerator;

static TAGS: IdGenerator = IdGenerator::new();

/// Identity of a node across revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(u64);

impl Tag {
    /// Wrap a tag assigned by the UI description layer
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a process-unique tag
    pub fn allocate() -> Self {
        Self(TAGS.next().to_bits())
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// Non-owning reference to the UI description element a node came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub u64);

/// Component kinds with kind-specific layout behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Root of a shadow tree
    Root,
    /// Plain container
    View,
    /// Scrollable container
    ScrollView,
}

impl ComponentKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Root => "RootView",
            Self::View => "View",
            Self::ScrollView => "ScrollView",
        }
    }
}

/// Everything shared by all revisions of one node
#[derive(Debug)]
pub struct ShadowNodeFamily {
    tag: Tag,
    kind: ComponentKind,
    emitter: Arc<EventEmitter>,
    element: Option<ElementRef>,
}

impl ShadowNodeFamily {
    pub fn new(tag: Tag, kind: ComponentKind, emitter: Arc<EventEmitter>) -> Self {
        Self {
            tag,
            kind,
            emitter,
            element: None,
        }
    }

    /// Attach the originating element reference
    pub fn with_element(mut self, element: ElementRef) -> Self {
        self.element = Some(element);
        self
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    pub fn element(&self) -> Option<ElementRef> {
        self.element
    }
}

struct NodeData {
    family: Arc<ShadowNodeFamily>,
    props: Arc<Props>,
    state: Arc<State>,
    children: Arc<[ShadowNode]>,
}

/// An immutable node. Cloning is a reference count bump.
#[derive(Clone)]
pub struct ShadowNode {
    data: Arc<NodeData>,
}

impl ShadowNode {
    /// Create a node
    pub fn new(
        family: Arc<ShadowNodeFamily>,
        props: Arc<Props>,
        state: Arc<State>,
        children: Vec<ShadowNode>,
    ) -> Self {
        Self {
            data: Arc::new(NodeData {
                family,
                props,
                state,
                children: children.into(),
            }),
        }
    }

    /// Start building a node with a detached emitter and initial state
    pub fn builder(tag: Tag, kind: ComponentKind) -> ShadowNodeBuilder {
        ShadowNodeBuilder::new(tag, kind)
    }

    pub fn tag(&self) -> Tag {
        self.data.family.tag
    }

    pub fn kind(&self) -> ComponentKind {
        self.data.family.kind
    }

    pub fn family(&self) -> &Arc<ShadowNodeFamily> {
        &self.data.family
    }

    pub fn props(&self) -> &Arc<Props> {
        &self.data.props
    }

    pub fn state(&self) -> &Arc<State> {
        &self.data.state
    }

    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.data.family.emitter
    }

    pub fn children(&self) -> &[ShadowNode] {
        &self.data.children
    }

    /// The shared children array itself
    pub fn children_arc(&self) -> &Arc<[ShadowNode]> {
        &self.data.children
    }

    /// Whether both handles point at the same node instance
    pub fn ptr_eq(&self, other: &ShadowNode) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Whether both nodes are revisions of the same family
    pub fn same_family(&self, other: &ShadowNode) -> bool {
        Arc::ptr_eq(&self.data.family, &other.data.family)
    }

    fn with(&self, props: Arc<Props>, state: Arc<State>, children: Arc<[ShadowNode]>) -> Self {
        Self {
            data: Arc::new(NodeData {
                family: self.data.family.clone(),
                props,
                state,
                children,
            }),
        }
    }

    /// Copy with new props; state and children are shared
    pub fn clone_with_props(&self, props: Props) -> Self {
        self.with(
            Arc::new(props),
            self.data.state.clone(),
            self.data.children.clone(),
        )
    }

    /// Copy with new state; props and children are shared
    pub fn clone_with_state(&self, state: State) -> Self {
        self.with(
            self.data.props.clone(),
            Arc::new(state),
            self.data.children.clone(),
        )
    }

    /// Copy with a new children list
    pub fn clone_with_children(&self, children: Vec<ShadowNode>) -> Self {
        self.with(
            self.data.props.clone(),
            self.data.state.clone(),
            children.into(),
        )
    }

    /// Copy with the child at `index` replaced
    pub fn replace_child(&self, index: usize, child: ShadowNode) -> Option<Self> {
        if index >= self.children().len() {
            return None;
        }
        let mut children = self.children().to_vec();
        children[index] = child;
        Some(self.clone_with_children(children))
    }

    /// Copy with `child` appended
    pub fn append_child(&self, child: ShadowNode) -> Self {
        let mut children = Vec::with_capacity(self.children().len() + 1);
        children.extend_from_slice(self.children());
        children.push(child);
        self.clone_with_children(children)
    }

    /// Copy with the child at `index` removed
    pub fn remove_child(&self, index: usize) -> Option<Self> {
        if index >= self.children().len() {
            return None;
        }
        let mut children = self.children().to_vec();
        children.remove(index);
        Some(self.clone_with_children(children))
    }

    /// Find a descendant (or self) by tag, depth first
    pub fn find(&self, tag: Tag) -> Option<&ShadowNode> {
        if self.tag() == tag {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(tag))
    }

    /// Replace the descendant with `tag` by `f(descendant)`.
    ///
    /// Only the nodes on the path from `self` to the target are copied.
    /// Returns `None` if no node has that tag.
    pub fn clone_tree<F>(&self, tag: Tag, f: F) -> Option<Self>
    where
        F: FnOnce(&ShadowNode) -> ShadowNode,
    {
        let mut f = Some(f);
        self.clone_tree_inner(tag, &mut f)
    }

    fn clone_tree_inner<F>(&self, tag: Tag, f: &mut Option<F>) -> Option<Self>
    where
        F: FnOnce(&ShadowNode) -> ShadowNode,
    {
        if self.tag() == tag {
            return f.take().map(|f| f(self));
        }
        for (index, child) in self.children().iter().enumerate() {
            if let Some(replacement) = child.clone_tree_inner(tag, f) {
                return self.replace_child(index, replacement);
            }
        }
        None
    }

    /// Number of nodes in this subtree
    pub fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(ShadowNode::subtree_len).sum::<usize>()
    }

    /// Compute layout for this subtree
    pub fn layout(&self, context: &LayoutContext) -> LayoutResult {
        layout::compute(self, context)
    }
}

impl fmt::Debug for ShadowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNode")
            .field("tag", &self.tag())
            .field("kind", &self.kind())
            .field("state_revision", &self.state().revision())
            .field("children", &self.children())
            .finish()
    }
}

/// Builder for [`ShadowNode`]
pub struct ShadowNodeBuilder {
    tag: Tag,
    kind: ComponentKind,
    props: Props,
    state: Option<State>,
    children: Vec<ShadowNode>,
    emitter: Option<Arc<EventEmitter>>,
    element: Option<ElementRef>,
}

impl ShadowNodeBuilder {
    pub fn new(tag: Tag, kind: ComponentKind) -> Self {
        Self {
            tag,
            kind,
            props: Props::default(),
            state: None,
            children: Vec::new(),
            emitter: None,
            element: None,
        }
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn child(mut self, child: ShadowNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ShadowNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn emitter(mut self, emitter: Arc<EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn element(mut self, element: ElementRef) -> Self {
        self.element = Some(element);
        self
    }

    pub fn build(self) -> ShadowNode {
        let emitter = self
            .emitter
            .unwrap_or_else(|| Arc::new(EventEmitter::detached(self.tag)));
        let family = ShadowNodeFamily::new(self.tag, self.kind, emitter);
        let family = match self.element {
            Some(element) => family.with_element(element),
            None => family,
        };
        ShadowNode::new(
            Arc::new(family),
            Arc::new(self.props),
            Arc::new(self.state.unwrap_or_else(|| State::initial(self.kind))),
            self.children,
        )
    }
}
