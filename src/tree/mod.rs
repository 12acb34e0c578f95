//! Parent-linked node arena for VBA parse trees.
//!
//! The parser hands over a tree of `{name, value?, children?}` records. Passes need to walk
//! it in both directions (a call site looks at its grandparent to decide whether it may be
//! replaced, a procedure removal looks at its wrapper element) and to mutate it freely. All
//! nodes therefore live in a single [`Tree`] arena and refer to each other through
//! [`NodeId`] handles; the parent link is a plain handle field, never an owning reference.
//!
//! # Invariants
//!
//! - A node is either a terminal carrying a value or a rule carrying (possibly zero)
//!   children, see [`Payload`].
//! - For every rule `p` and every child `c` of `p`, `parent(c) == Some(p)`. Every mutation
//!   helper on [`Tree`] maintains this; passes never edit child lists directly.
//! - A node has at most one parent. Moving a node into a new parent detaches it from the
//!   old one.
//!
//! Detached nodes stay in the arena. Their handles remain valid, they are simply no longer
//! reachable from any forest root.
//!
//! # Example
//!
//! ```rust
//! use macroscope::tree::{NodeKind, Tree};
//!
//! let mut tree = Tree::new();
//! let ident = tree.add_terminal(NodeKind::Identifier, "x");
//! let wrapper = tree.add_rule(NodeKind::AmbiguousIdentifier, vec![ident]);
//!
//! assert_eq!(tree.parent(ident), Some(wrapper));
//! assert_eq!(tree.render_text(wrapper), "x");
//! ```

mod kind;
mod names;
mod node;
mod query;
mod raw;

pub use kind::NodeKind;
pub use names::FreshNames;
pub use node::{Node, NodeId, Payload};
pub use query::Step;
pub use raw::{RawNode, MAX_TREE_DEPTH};

/// Arena owning every node of one analyzed module.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    /// Number of slots in the arena, detached nodes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no node was ever added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, kind: NodeKind, name: Option<Box<str>>, payload: Payload) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            name,
            payload,
            parent: None,
        });
        id
    }

    /// Adds a detached terminal node.
    pub fn add_terminal(&mut self, kind: NodeKind, value: impl Into<String>) -> NodeId {
        self.push(kind, None, Payload::Terminal(value.into()))
    }

    /// Adds a detached rule node and links `children` to it.
    pub fn add_rule(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = self.push(kind, None, Payload::Rule(Vec::new()));
        self.set_children(id, children);
        id
    }

    /// Adds a node by parser name, keeping the spelling of names outside [`NodeKind`].
    pub(crate) fn add_named(&mut self, name: &str, payload: Payload) -> NodeId {
        let kind = NodeKind::from_name(name);
        let original = (kind == NodeKind::Unknown).then(|| Box::from(name));
        let children = match &payload {
            Payload::Rule(children) => children.clone(),
            Payload::Terminal(_) => Vec::new(),
        };
        let id = self.push(kind, original, payload);
        for child in children {
            self.nodes[child.0].parent = Some(id);
        }
        id
    }

    /// Adds the canonical statement separator: `endOfStatement > endOfLine > NEWLINE "\n"`.
    pub fn add_newline(&mut self) -> NodeId {
        let newline = self.add_terminal(NodeKind::Newline, "\n");
        let end_of_line = self.add_rule(NodeKind::EndOfLine, vec![newline]);
        self.add_rule(NodeKind::EndOfStatement, vec![end_of_line])
    }

    /// The node stored behind `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The kind of `id`.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    /// The parser name of `id`, including the original spelling of unknown kinds.
    #[must_use]
    pub fn kind_name(&self, id: NodeId) -> &str {
        let node = &self.nodes[id.0];
        match &node.name {
            Some(name) => name,
            None => node.kind.name(),
        }
    }

    /// The token text of a terminal.
    #[must_use]
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].value()
    }

    /// The children of a rule, empty for terminals.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id.0].children()
    }

    /// The parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// True if `id` is a terminal.
    #[must_use]
    pub fn is_terminal(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].payload, Payload::Terminal(_))
    }

    /// Position of `id` within its parent's children.
    #[must_use]
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// The sibling directly after `id`.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Iterates over the ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// True if `id` is `root` or lies below it.
    #[must_use]
    pub fn is_within(&self, id: NodeId, root: NodeId) -> bool {
        id == root || self.ancestors(id).any(|a| a == root)
    }

    /// Replaces the text of a terminal. Returns false (and changes nothing) for rules.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        match &mut self.nodes[id.0].payload {
            Payload::Terminal(current) => {
                *current = value.into();
                true
            }
            Payload::Rule(_) => false,
        }
    }

    /// Replaces the children of a rule and returns the previous children.
    ///
    /// Previous children that are not part of `children` are detached. New children are
    /// removed from whatever parent they had before. Terminals are left untouched and an
    /// empty list is returned.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) -> Vec<NodeId> {
        if self.is_terminal(id) {
            return Vec::new();
        }

        for child in &children {
            if let Some(previous) = self.nodes[child.0].parent {
                if previous != id {
                    self.unlink(previous, *child);
                }
            }
        }

        let old = match &mut self.nodes[id.0].payload {
            Payload::Rule(current) => std::mem::replace(current, children.clone()),
            Payload::Terminal(_) => Vec::new(),
        };

        for child in &old {
            if !children.contains(child) {
                self.nodes[child.0].parent = None;
            }
        }
        for child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        old
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Payload::Rule(children) = &mut self.nodes[parent.0].payload {
            children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = None;
    }

    /// Removes `id` from its parent. Returns the position it occupied.
    pub fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.unlink(parent, id);
        Some(index)
    }

    /// Replaces `count` children of `parent` starting at `index` by `nodes`.
    ///
    /// The range is clamped to the existing children.
    pub fn splice(&mut self, parent: NodeId, index: usize, count: usize, nodes: Vec<NodeId>) {
        let mut children = self.children(parent).to_vec();
        let start = index.min(children.len());
        let end = start.saturating_add(count).min(children.len());
        children.splice(start..end, nodes);
        self.set_children(parent, children);
    }

    /// Puts `nodes` where `id` currently sits in its parent, detaching `id`.
    ///
    /// Returns false if `id` has no parent.
    pub fn replace_with(&mut self, id: NodeId, nodes: Vec<NodeId>) -> bool {
        let (Some(parent), Some(index)) = (self.parent(id), self.child_index(id)) else {
            return false;
        };
        self.splice(parent, index, 1, nodes);
        true
    }

    /// Copies the subtree rooted at `id`. The copy is detached.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id.0].clone();
        match node.payload {
            Payload::Terminal(value) => self.push(node.kind, node.name, Payload::Terminal(value)),
            Payload::Rule(children) => {
                let copies: Vec<NodeId> = children.iter().map(|c| self.deep_copy(*c)).collect();
                let copy = self.push(node.kind, node.name, Payload::Rule(Vec::new()));
                self.set_children(copy, copies);
                copy
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tree: &mut Tree) -> (NodeId, NodeId, NodeId, NodeId) {
        let a = tree.add_terminal(NodeKind::Identifier, "a");
        let ws = tree.add_terminal(NodeKind::Ws, " ");
        let b = tree.add_terminal(NodeKind::Identifier, "b");
        let root = tree.add_rule(NodeKind::ValueStmt, vec![a, ws, b]);
        (root, a, ws, b)
    }

    fn assert_links(tree: &Tree, root: NodeId) {
        for child in tree.children(root) {
            assert_eq!(tree.parent(*child), Some(root));
            assert_links(tree, *child);
        }
    }

    #[test]
    fn test_add_rule_links_parents() {
        let mut tree = Tree::new();
        let (root, a, _, b) = sample(&mut tree);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(b), Some(root));
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.children(root).len(), 3);
        assert!(tree.is_terminal(a));
        assert!(!tree.is_terminal(root));
    }

    #[test]
    fn test_detach_and_splice() {
        let mut tree = Tree::new();
        let (root, a, ws, b) = sample(&mut tree);

        assert_eq!(tree.detach(ws), Some(1));
        assert_eq!(tree.parent(ws), None);
        assert_eq!(tree.children(root), &[a, b]);

        let c = tree.add_terminal(NodeKind::Identifier, "c");
        tree.splice(root, 1, 0, vec![c]);
        assert_eq!(tree.children(root), &[a, c, b]);
        assert_links(&tree, root);

        tree.splice(root, 0, 10, vec![]);
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.parent(a), None);
    }

    #[test]
    fn test_move_between_parents() {
        let mut tree = Tree::new();
        let (first, a, _, _) = sample(&mut tree);
        let second = tree.add_rule(NodeKind::Literal, vec![]);

        tree.set_children(second, vec![a]);
        assert_eq!(tree.parent(a), Some(second));
        assert!(!tree.children(first).contains(&a));
    }

    #[test]
    fn test_replace_with() {
        let mut tree = Tree::new();
        let (root, a, ws, b) = sample(&mut tree);
        let x = tree.add_terminal(NodeKind::Identifier, "x");
        let y = tree.add_terminal(NodeKind::Identifier, "y");

        assert!(tree.replace_with(ws, vec![x, y]));
        assert_eq!(tree.children(root), &[a, x, y, b]);
        assert_eq!(tree.parent(ws), None);
        assert!(!tree.replace_with(root, vec![]));
    }

    #[test]
    fn test_deep_copy_is_detached() {
        let mut tree = Tree::new();
        let (root, _, _, _) = sample(&mut tree);
        let copy = tree.deep_copy(root);

        assert_ne!(copy, root);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.render_text(copy), "a b");
        assert_links(&tree, copy);
        for (original, copied) in tree.children(root).iter().zip(tree.children(copy)) {
            assert_ne!(original, copied);
        }
    }

    #[test]
    fn test_set_value_only_on_terminals() {
        let mut tree = Tree::new();
        let (root, a, _, _) = sample(&mut tree);
        assert!(tree.set_value(a, "z"));
        assert!(!tree.set_value(root, "z"));
        assert_eq!(tree.render_text(root), "z b");
    }

    #[test]
    fn test_ancestors_and_within() {
        let mut tree = Tree::new();
        let (inner, a, _, _) = sample(&mut tree);
        let outer = tree.add_rule(NodeKind::Block, vec![inner]);

        let chain: Vec<NodeId> = tree.ancestors(a).collect();
        assert_eq!(chain, vec![inner, outer]);
        assert!(tree.is_within(a, outer));
        assert!(!tree.is_within(outer, a));
    }

    #[test]
    fn test_newline_shape() {
        let mut tree = Tree::new();
        let eos = tree.add_newline();
        assert_eq!(tree.kind(eos), NodeKind::EndOfStatement);
        assert_eq!(tree.render_text(eos), "\n");
        let eol = tree.children(eos)[0];
        assert_eq!(tree.kind(eol), NodeKind::EndOfLine);
    }

    #[test]
    fn test_unknown_kind_keeps_name() {
        let mut tree = Tree::new();
        let id = tree.add_named("selectCaseExotic", Payload::Rule(Vec::new()));
        assert_eq!(tree.kind(id), NodeKind::Unknown);
        assert_eq!(tree.kind_name(id), "selectCaseExotic");

        let known = tree.add_named("valueStmt", Payload::Rule(Vec::new()));
        assert_eq!(tree.kind_name(known), "valueStmt");
    }
}
