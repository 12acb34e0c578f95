//! Read-only queries over a [`Tree`].
//!
//! These are the building blocks every pass uses to find its way around a procedure: text
//! reconstruction, pre-order search by kind, a restricted child-path matcher and the
//! extraction of identifier names from the handful of shapes the grammar spells them in.

use rustc_hash::FxHashSet;

use crate::tree::{NodeId, NodeKind, Tree};

/// One step of a [`Tree::match_path`] query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Children of exactly this kind.
    Kind(NodeKind),
    /// Every child.
    Any,
}

impl From<NodeKind> for Step {
    fn from(kind: NodeKind) -> Self {
        Step::Kind(kind)
    }
}

const PLAIN_IDENTIFIER: [Step; 2] = [
    Step::Kind(NodeKind::AmbiguousIdentifier),
    Step::Kind(NodeKind::Identifier),
];
const CERTAIN_IDENTIFIER: [Step; 2] = [
    Step::Kind(NodeKind::CertainIdentifier),
    Step::Kind(NodeKind::Identifier),
];
const KEYWORD_IDENTIFIER: [Step; 3] = [
    Step::Kind(NodeKind::AmbiguousIdentifier),
    Step::Kind(NodeKind::AmbiguousKeyword),
    Step::Any,
];
const ARGUMENTS: [Step; 2] = [Step::Kind(NodeKind::ArgList), Step::Kind(NodeKind::Arg)];
const ASSIGNMENT_TARGET: [Step; 2] = [Step::Kind(NodeKind::ImplicitCallStmtInStmt), Step::Any];

impl Tree {
    /// Concatenates every terminal value below `id` in document order, skipping `EOF`.
    #[must_use]
    pub fn render_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        match self.value(id) {
            Some(_) if self.kind(id) == NodeKind::Eof => {}
            Some(value) => out.push_str(value),
            None => {
                for child in self.children(id) {
                    self.render_into(*child, out);
                }
            }
        }
    }

    /// Every terminal value below `id`, in document order, skipping `EOF`.
    #[must_use]
    pub fn terminal_values(&self, id: NodeId) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.value(current) {
                Some(_) if self.kind(current) == NodeKind::Eof => {}
                Some(value) => out.push(value),
                None => stack.extend(self.children(current).iter().rev()),
            }
        }
        out
    }

    /// Pre-order search for nodes of `kind`.
    ///
    /// Returns `id` itself if it matches. Matches nested inside a match are returned as
    /// well, after their enclosing match.
    #[must_use]
    pub fn find_all(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.find_all_of(id, &[kind])
    }

    /// Pre-order search for nodes of any of `kinds`.
    #[must_use]
    pub fn find_all_of(&self, id: NodeId, kinds: &[NodeKind]) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if kinds.contains(&self.kind(current)) {
                found.push(current);
            }
            stack.extend(self.children(current).iter().rev());
        }
        found
    }

    /// Restricted XPath over children.
    ///
    /// Each step selects children of the current nodes, either by exact kind or all of them
    /// for [`Step::Any`]. An empty path yields `[id]`. Terminals and rules without children
    /// never match a non-empty path.
    #[must_use]
    pub fn match_path(&self, id: NodeId, path: &[Step]) -> Vec<NodeId> {
        let Some((step, rest)) = path.split_first() else {
            return vec![id];
        };

        let mut found = Vec::new();
        for child in self.children(id) {
            let selected = match step {
                Step::Any => true,
                Step::Kind(kind) => self.kind(*child) == *kind,
            };
            if selected {
                found.extend(self.match_path(*child, rest));
            }
        }
        found
    }

    /// The first node matched by `path`.
    #[must_use]
    pub fn first_match(&self, id: NodeId, path: &[Step]) -> Option<NodeId> {
        self.match_path(id, path).into_iter().next()
    }

    /// The first direct child of `kind`.
    #[must_use]
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|c| self.kind(*c) == kind)
    }

    /// The name a declaration, call or reference node spells.
    ///
    /// Tries, in order, a plain identifier, a "certain" identifier and a keyword used as an
    /// identifier.
    #[must_use]
    pub fn identifier_name(&self, id: NodeId) -> Option<String> {
        [&PLAIN_IDENTIFIER[..], &CERTAIN_IDENTIFIER[..], &KEYWORD_IDENTIFIER[..]]
            .iter()
            .find_map(|path| self.first_match(id, path))
            .and_then(|found| self.value(found))
            .map(str::to_string)
    }

    /// Every `IDENTIFIER` value below `id`.
    #[must_use]
    pub fn collect_identifiers(&self, id: NodeId) -> FxHashSet<String> {
        self.find_all(id, NodeKind::Identifier)
            .into_iter()
            .filter_map(|ident| self.value(ident))
            .map(str::to_string)
            .collect()
    }

    /// Every kind occurring below `id`, `id` included.
    #[must_use]
    pub fn kinds_under(&self, id: NodeId) -> FxHashSet<NodeKind> {
        let mut kinds = FxHashSet::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            kinds.insert(self.kind(current));
            stack.extend(self.children(current));
        }
        kinds
    }

    /// Argument names of a procedure declaration, in declaration order.
    #[must_use]
    pub fn procedure_arguments(&self, id: NodeId) -> Vec<String> {
        self.match_path(id, &ARGUMENTS)
            .into_iter()
            .filter_map(|arg| self.identifier_name(arg))
            .collect()
    }

    /// Names explicitly bound inside `id`: `Dim`/`Static` variables, constants, line
    /// labels and loop control variables, in encounter order without duplicates.
    #[must_use]
    pub fn declared_locals(&self, id: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        for kind in [
            NodeKind::VariableSubStmt,
            NodeKind::ConstSubStmt,
            NodeKind::LineLabel,
            NodeKind::ForEachStmt,
            NodeKind::ForNextStmt,
        ] {
            for node in self.find_all(id, kind) {
                if let Some(name) = self.identifier_name(node) {
                    push_unique(&mut names, name);
                }
            }
        }
        names
    }

    /// Names bound inside `id`: [`Tree::declared_locals`] followed by the targets of
    /// `Set`/`Let` assignments, in encounter order without duplicates.
    #[must_use]
    pub fn local_variables(&self, id: NodeId) -> Vec<String> {
        let mut names = self.declared_locals(id);
        for name in self.assignment_targets(id) {
            push_unique(&mut names, name);
        }
        names
    }

    /// Names assigned by `Set`/`Let` statements below `id`.
    #[must_use]
    pub fn assignment_targets(&self, id: NodeId) -> Vec<String> {
        let mut names = Vec::new();
        for kind in [NodeKind::SetStmt, NodeKind::LetStmt] {
            for statement in self.find_all(id, kind) {
                let name = self
                    .first_match(statement, &ASSIGNMENT_TARGET)
                    .and_then(|target| self.identifier_name(target));
                if let Some(name) = name {
                    push_unique(&mut names, name);
                }
            }
        }
        names
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
