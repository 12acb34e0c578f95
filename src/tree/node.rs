//! Node handles and node storage.
//!
//! This module provides the [`NodeId`] type, a strongly-typed handle for nodes living in a
//! [`Tree`](crate::tree::Tree) arena, and the [`Node`] record stored behind it.

use std::fmt;

use crate::tree::NodeKind;

/// A strongly-typed handle for a node within a [`Tree`](crate::tree::Tree).
///
/// `NodeId` wraps a `usize` index into the arena. Handles are assigned sequentially when
/// nodes are added and stay valid for the lifetime of the tree: removing a node from its
/// parent only detaches it, the slot is never reused.
///
/// # Examples
///
/// ```rust
/// use macroscope::tree::{NodeKind, Tree};
///
/// let mut tree = Tree::new();
/// let a = tree.add_terminal(NodeKind::Identifier, "a");
/// let b = tree.add_terminal(NodeKind::Identifier, "b");
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// Normal usage obtains handles from the [`Tree`](crate::tree::Tree) builders.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw index value of this handle.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// What a node holds: a token value or an ordered list of children.
///
/// Encoding the two cases as an enum makes "value and children" and "neither"
/// unrepresentable. A rule that matched nothing is a [`Payload::Rule`] with no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A token with its source text.
    Terminal(String),
    /// A grammar rule with its children in document order.
    Rule(Vec<NodeId>),
}

/// A single arena slot.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    /// Original parser name, kept only for kinds that resolve to [`NodeKind::Unknown`].
    pub(crate) name: Option<Box<str>>,
    pub(crate) payload: Payload,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    /// The kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The token text, if this is a terminal.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match &self.payload {
            Payload::Terminal(value) => Some(value),
            Payload::Rule(_) => None,
        }
    }

    /// The children, empty for terminals.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.payload {
            Payload::Terminal(_) => &[],
            Payload::Rule(children) => children,
        }
    }

    /// The parent handle, `None` for forest roots and detached nodes.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}
