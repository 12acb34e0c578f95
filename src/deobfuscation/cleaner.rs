//! Dead statement and dead store elimination for one procedure.
//!
//! The [`Cleaner`] classifies every node of a procedure body into one of a few fixed
//! buckets and computes, bottom-up, whether the subtree may have an effect and which
//! variables it reads and writes. Statements without an effect are dropped from their
//! block. Variables that are assigned but never read become *unused*; assignments to them
//! lose their effect in the next round, which lets chains of dead stores collapse until a
//! fixed point is reached.
//!
//! Cleaning is transactional. Every child-list replacement is journaled, and a node kind
//! outside the supported set rolls the procedure back to its exact original shape before
//! the failure is returned.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{
    deobfuscation::translator::is_pure_builtin,
    tree::{NodeId, NodeKind, Tree},
};

/// Library names beyond the translator's tables that are known not to have effects.
const PURE_NAMES: [&str; 21] = [
    "Month", "Round", "Weekday", "StrConv", "vbUpperCase", "vbLowerCase", "vbProperCase", "Day",
    "Split", "Int", "Val", "Year", "Fix", "vbSunday", "vbMonday", "vbTuesday", "vbWednesday",
    "vbThursday", "vbFriday", "vbSaturday", "Hex",
];

/// Why a procedure could not be cleaned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanFailure {
    /// A node kind the cleaner has no rule for.
    #[error("unsupported construct '{0}'")]
    Unsupported(String),
    /// A supported kind with an unexpected shape.
    #[error("unexpected shape of '{kind}': {reason}")]
    Shape {
        /// Parser name of the node.
        kind: String,
        /// What was expected.
        reason: &'static str,
    },
}

/// What a subtree may do when executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effect {
    /// True unless the subtree is proven to have no observable effect.
    pub side_effect: bool,
    /// Variables read.
    pub reads: BTreeSet<String>,
    /// Variables written.
    pub writes: BTreeSet<String>,
}

impl Effect {
    fn pure() -> Self {
        Effect::default()
    }

    fn effectful() -> Self {
        Effect {
            side_effect: true,
            ..Effect::default()
        }
    }

    fn absorb(&mut self, other: Effect) {
        self.side_effect |= other.side_effect;
        self.reads.extend(other.reads);
        self.writes.extend(other.writes);
    }
}

/// Outcome of cleaning one procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Source text of every removed statement, in removal order.
    pub removed: Vec<String>,
    /// Rounds until the fixed point.
    pub passes: usize,
    /// Variables proven to be assigned but never read.
    pub unused: BTreeSet<String>,
    /// External variables the procedure assigns.
    pub external_written: BTreeSet<String>,
    /// External variables the procedure reads.
    pub external_read: BTreeSet<String>,
}

impl CleanReport {
    /// True if at least one statement was removed.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Pure,
    PassThrough,
    SideEffect,
    Handled,
    Unsupported,
}

fn classify(kind: NodeKind) -> Class {
    match kind {
        NodeKind::HexLiteral
        | NodeKind::OctLiteral
        | NodeKind::DoubleLiteral
        | NodeKind::IntegerLiteral
        | NodeKind::ShortLiteral
        | NodeKind::StringLiteral
        | NodeKind::DateLiteral
        | NodeKind::True
        | NodeKind::False
        | NodeKind::Nothing
        | NodeKind::Null
        | NodeKind::Empty
        | NodeKind::EndOfStatement
        | NodeKind::EndOfLine
        | NodeKind::Newline
        | NodeKind::Ws
        | NodeKind::Comment
        | NodeKind::RemComment
        | NodeKind::CommentToken
        | NodeKind::TypeHint
        | NodeKind::Dim
        | NodeKind::Static
        | NodeKind::Const
        | NodeKind::As
        | NodeKind::Let
        | NodeKind::Set
        | NodeKind::If
        | NodeKind::Then
        | NodeKind::Else
        | NodeKind::ElseIf
        | NodeKind::EndIf
        | NodeKind::For
        | NodeKind::Each
        | NodeKind::In
        | NodeKind::To
        | NodeKind::Step
        | NodeKind::Next
        | NodeKind::While
        | NodeKind::Wend
        | NodeKind::Do
        | NodeKind::Loop
        | NodeKind::Until
        | NodeKind::Boolean
        | NodeKind::Byte
        | NodeKind::Integer
        | NodeKind::Long
        | NodeKind::Single
        | NodeKind::Double
        | NodeKind::Currency
        | NodeKind::Date
        | NodeKind::String
        | NodeKind::Len
        | NodeKind::Plus
        | NodeKind::Minus
        | NodeKind::Mult
        | NodeKind::Div
        | NodeKind::IntDiv
        | NodeKind::Pow
        | NodeKind::Amp
        | NodeKind::Eq
        | NodeKind::Neq
        | NodeKind::Lt
        | NodeKind::Leq
        | NodeKind::Gt
        | NodeKind::Geq
        | NodeKind::PlusEq
        | NodeKind::MinusEq
        | NodeKind::And
        | NodeKind::Or
        | NodeKind::Xor
        | NodeKind::Not
        | NodeKind::Mod
        | NodeKind::Eqv
        | NodeKind::Imp
        | NodeKind::Like
        | NodeKind::LParen
        | NodeKind::RParen
        | NodeKind::Comma
        | NodeKind::Dot
        | NodeKind::Exclamation
        | NodeKind::Dollar
        | NodeKind::Percent
        | NodeKind::Hash
        | NodeKind::At => Class::Pure,

        NodeKind::ImplicitCallStmtInStmt
        | NodeKind::ImplicitCallStmtInBlock
        | NodeKind::Literal
        | NodeKind::ValueStmt
        | NodeKind::BlockStmt
        | NodeKind::ArgList
        | NodeKind::Arg
        | NodeKind::ConstStmt
        | NodeKind::VariableStmt
        | NodeKind::VariableListStmt
        | NodeKind::IfThenElseStmt
        | NodeKind::IfBlockStmt
        | NodeKind::IfElseIfBlockStmt
        | NodeKind::IfElseBlockStmt
        | NodeKind::IfConditionStmt
        | NodeKind::WhileWendStmt
        | NodeKind::DoLoopStmt
        | NodeKind::AmbiguousIdentifier
        | NodeKind::AmbiguousKeyword
        | NodeKind::CertainIdentifier
        | NodeKind::Subscript
        | NodeKind::Subscripts
        | NodeKind::AsTypeClause
        | NodeKind::Type
        | NodeKind::BaseType
        | NodeKind::IcsSVariableOrProcedureCall
        | NodeKind::IcsSProcedureOrArrayCall
        | NodeKind::IcsSMembersCall
        | NodeKind::IcsSMemberCall
        | NodeKind::IcsBProcedureCall
        | NodeKind::IcsBMemberProcedureCall
        | NodeKind::ArgsCall
        | NodeKind::ArgCall => Class::PassThrough,

        NodeKind::Variant | NodeKind::OnErrorStmt | NodeKind::ExitStmt => Class::SideEffect,

        NodeKind::Block
        | NodeKind::Identifier
        | NodeKind::LetStmt
        | NodeKind::SetStmt
        | NodeKind::ConstSubStmt
        | NodeKind::VariableSubStmt
        | NodeKind::ForNextStmt
        | NodeKind::ForEachStmt => Class::Handled,

        _ => Class::Unsupported,
    }
}

fn is_pure_name(name: &str) -> bool {
    is_pure_builtin(name) || PURE_NAMES.iter().any(|p| p.eq_ignore_ascii_case(name))
}

/// Removes effect-free statements and dead stores from one procedure.
pub struct Cleaner<'a> {
    tree: &'a mut Tree,
    external: FxHashSet<String>,
    assigned: FxHashSet<String>,
    unused: BTreeSet<String>,
    changed: bool,
    removed: Vec<String>,
    journal: Vec<(NodeId, Vec<NodeId>)>,
    max_passes: usize,
}

impl<'a> Cleaner<'a> {
    /// Creates a cleaner that edits `tree` in place.
    pub fn new(tree: &'a mut Tree) -> Self {
        Cleaner {
            tree,
            external: FxHashSet::default(),
            assigned: FxHashSet::default(),
            unused: BTreeSet::new(),
            changed: false,
            removed: Vec::new(),
            journal: Vec::new(),
            max_passes: 1000,
        }
    }

    /// Variables visible outside the procedure. Assignments to them are never removed.
    #[must_use]
    pub fn with_external<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external.extend(names.into_iter().map(Into::into));
        self
    }

    /// Upper bound on cleaning rounds.
    #[must_use]
    pub fn with_max_passes(mut self, max: usize) -> Self {
        self.max_passes = max.max(1);
        self
    }

    /// Cleans the procedure `node` named `name` to a fixed point.
    ///
    /// Parameters are treated as external: a `ByRef` argument written by the procedure
    /// is visible to the caller.
    ///
    /// # Errors
    ///
    /// A [`CleanFailure`] if the procedure contains a construct without a rule. The tree is
    /// then exactly as it was before the call.
    pub fn clean(mut self, node: NodeId, name: &str) -> Result<CleanReport, CleanFailure> {
        let parameters = self.tree.procedure_arguments(node);
        self.external.extend(parameters);

        let mut report = CleanReport::default();
        loop {
            report.passes += 1;
            self.changed = false;

            let effect = match self.procedure(node) {
                Ok(effect) => effect,
                Err(failure) => {
                    self.rollback();
                    return Err(failure);
                }
            };

            let before = self.unused.len();
            report.external_written.clear();
            for variable in std::mem::take(&mut self.assigned) {
                if effect.reads.contains(&variable) {
                    continue;
                }
                if self.external.contains(&variable) {
                    report.external_written.insert(variable);
                    continue;
                }
                if variable == name {
                    continue;
                }
                self.unused.insert(variable);
            }
            report.external_read = effect
                .reads
                .iter()
                .filter(|v| self.external.contains(*v))
                .cloned()
                .collect();

            let grew = self.unused.len() != before;
            if !(self.changed || grew) {
                break;
            }
            if report.passes >= self.max_passes {
                log::warn!("cleaning {name} stopped after {} passes", report.passes);
                break;
            }
        }

        report.removed = self.removed;
        report.unused = self.unused;
        Ok(report)
    }

    fn rollback(&mut self) {
        while let Some((node, children)) = self.journal.pop() {
            self.tree.set_children(node, children);
        }
    }

    fn replace_children(&mut self, node: NodeId, children: Vec<NodeId>) {
        if self.tree.children(node) == children.as_slice() {
            return;
        }
        let previous = self.tree.set_children(node, children);
        self.journal.push((node, previous));
    }

    fn failure(&self, node: NodeId) -> CleanFailure {
        CleanFailure::Unsupported(self.tree.kind_name(node).to_string())
    }

    fn shape(&self, node: NodeId, reason: &'static str) -> CleanFailure {
        CleanFailure::Shape {
            kind: self.tree.kind_name(node).to_string(),
            reason,
        }
    }

    fn procedure(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        let blocks = self.tree.match_path(node, &[NodeKind::Block.into()]);
        self.combine(&blocks)
    }

    fn combine(&mut self, nodes: &[NodeId]) -> Result<Effect, CleanFailure> {
        let mut effect = Effect::pure();
        for node in nodes {
            effect.absorb(self.handle(*node)?);
        }
        Ok(effect)
    }

    fn handle(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        match classify(self.tree.kind(node)) {
            Class::Pure => Ok(Effect::pure()),
            Class::PassThrough => {
                let children = self.tree.children(node).to_vec();
                self.combine(&children)
            }
            Class::SideEffect => Ok(Effect::effectful()),
            Class::Handled => self.handled(node),
            Class::Unsupported => Err(self.failure(node)),
        }
    }

    fn handled(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        match self.tree.kind(node) {
            NodeKind::Block => self.block(node),
            NodeKind::Identifier => Ok(self.identifier(node)),
            NodeKind::LetStmt | NodeKind::SetStmt | NodeKind::ConstSubStmt => self.setter(node),
            NodeKind::VariableSubStmt => self.declaration(node),
            NodeKind::ForNextStmt | NodeKind::ForEachStmt => self.counting_loop(node),
            _ => Err(self.failure(node)),
        }
    }

    /// Drops effect-free statements and rebuilds the separators between the rest.
    fn block(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        let children = self.tree.children(node).to_vec();
        let mut effect = Effect::pure();
        let mut rebuilt = Vec::with_capacity(children.len());

        for (index, child) in children.iter().enumerate() {
            let child_effect = self.handle(*child)?;
            if !child_effect.side_effect {
                let text = self.tree.render_text(*child);
                if text != "\n" {
                    self.changed = true;
                    if self.tree.kind(*child) != NodeKind::EndOfStatement {
                        log::debug!("removing `{}`", text.trim());
                        self.removed.push(text.trim().to_string());
                    }
                }
                continue;
            }

            effect.absorb(child_effect);
            rebuilt.push(*child);
            let separator = children
                .get(index + 1)
                .copied()
                .filter(|next| self.tree.kind(*next) == NodeKind::EndOfStatement)
                .filter(|next| self.tree.render_text(*next) == "\n");
            let separator = match separator {
                Some(existing) => existing,
                None => self.tree.add_newline(),
            };
            rebuilt.push(separator);
        }

        self.replace_children(node, rebuilt);
        Ok(effect)
    }

    fn identifier(&self, node: NodeId) -> Effect {
        let name = self.tree.value(node).unwrap_or_default();
        if is_pure_name(name) {
            return Effect::pure();
        }
        Effect {
            side_effect: !(self.unused.contains(name) || self.assigned.contains(name)),
            reads: BTreeSet::from([name.to_string()]),
            writes: BTreeSet::new(),
        }
    }

    fn setter(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        let mut target = None;
        let mut value = None;
        let mut typed = None;
        for child in self.tree.children(node).to_vec() {
            match self.tree.kind(child) {
                NodeKind::ImplicitCallStmtInStmt | NodeKind::AmbiguousIdentifier => {
                    target = Some(self.handle(child)?);
                }
                NodeKind::Ws
                | NodeKind::Eq
                | NodeKind::PlusEq
                | NodeKind::MinusEq
                | NodeKind::Set
                | NodeKind::Let
                | NodeKind::TypeHint => {}
                NodeKind::AsTypeClause => typed = Some(self.handle(child)?),
                NodeKind::ValueStmt => value = Some(self.handle(child)?),
                _ => return Err(self.failure(child)),
            }
        }
        let (Some(target), Some(mut value)) = (target, value) else {
            return Err(self.shape(node, "expected `target = value`"));
        };

        let single = match (target.reads.len(), target.writes.is_empty()) {
            (1, true) => target.reads.iter().next().cloned(),
            _ => None,
        };
        let Some(variable) = single else {
            value.side_effect = true;
            value.reads.extend(target.reads);
            value.writes.extend(target.writes);
            return Ok(value);
        };

        self.assigned.insert(variable.clone());
        value.writes.insert(variable.clone());
        if typed.is_some_and(|t| t.side_effect) {
            value.side_effect = true;
            value.reads.insert(variable);
            return Ok(value);
        }
        if !self.unused.contains(&variable) {
            value.side_effect = true;
        }
        Ok(value)
    }

    fn declaration(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        let names = self.tree.match_path(node, &[NodeKind::AmbiguousIdentifier.into()]);
        let [ident] = names.as_slice() else {
            return Err(self.shape(node, "expected one declared name"));
        };
        let variable = self.tree.render_text(*ident);
        self.assigned.insert(variable.clone());
        if self.unused.contains(&variable) {
            return Ok(Effect::pure());
        }
        Ok(Effect {
            side_effect: true,
            reads: BTreeSet::new(),
            writes: BTreeSet::from([variable]),
        })
    }

    /// `For`/`For Each`: the control variable is written, everything else is analyzed.
    fn counting_loop(&mut self, node: NodeId) -> Result<Effect, CleanFailure> {
        let names: BTreeSet<String> = self
            .tree
            .match_path(node, &[NodeKind::AmbiguousIdentifier.into()])
            .into_iter()
            .map(|ident| self.tree.render_text(ident))
            .collect();
        if names.len() != 1 {
            return Err(self.shape(node, "expected one loop variable"));
        }
        let Some(variable) = names.into_iter().next() else {
            return Err(self.shape(node, "expected one loop variable"));
        };
        self.assigned.insert(variable.clone());

        let rest: Vec<NodeId> = self
            .tree
            .children(node)
            .iter()
            .copied()
            .filter(|c| self.tree.kind(*c) != NodeKind::AmbiguousIdentifier)
            .collect();
        let mut effect = self.combine(&rest)?;
        effect.writes.insert(variable);
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::builder::TreeBuilder;

    #[test]
    fn test_dead_store_removed() {
        let mut b = TreeBuilder::new();
        let one = b.number(1);
        let dead = b.let_stmt("x", one);
        let two = b.number(2);
        let live = b.let_stmt("y", two);
        let y = b.var("y");
        let show = b.call_stmt("MsgBox", vec![y]);
        let proc = b.sub("Main", &[], vec![dead, live, show]);
        let mut tree = b.finish();

        let report = Cleaner::new(&mut tree).clean(proc, "Main").unwrap();
        assert_eq!(report.removed, vec!["x = 1"]);
        assert!(report.unused.contains("x"));
        assert_eq!(tree.render_text(proc), "Sub Main()\ny = 2\nMsgBox y\nEnd Sub");
    }

    #[test]
    fn test_chained_dead_stores_collapse() {
        let mut b = TreeBuilder::new();
        let one = b.number(1);
        let first = b.let_stmt("a", one);
        let a = b.var("a");
        let second = b.let_stmt("b", a);
        let proc = b.sub("Main", &[], vec![first, second]);
        let mut tree = b.finish();

        let report = Cleaner::new(&mut tree).clean(proc, "Main").unwrap();
        assert_eq!(report.removed, vec!["b = a", "a = 1"]);
        assert!(report.passes >= 3);
        assert_eq!(tree.render_text(proc), "Sub Main()\nEnd Sub");
    }

    #[test]
    fn test_return_value_and_parameters_kept() {
        let mut b = TreeBuilder::new();
        let one = b.number(1);
        let ret = b.let_stmt("F", one);
        let two = b.number(2);
        let byref = b.let_stmt("p", two);
        let proc = b.function("F", &["p"], vec![ret, byref]);
        let mut tree = b.finish();
        let before = tree.render_text(proc);

        let report = Cleaner::new(&mut tree).clean(proc, "F").unwrap();
        assert!(!report.changed());
        assert!(report.external_written.contains("p"));
        assert_eq!(tree.render_text(proc), before);
    }

    #[test]
    fn test_external_assignment_reported() {
        let mut b = TreeBuilder::new();
        let text = b.string("payload");
        let store = b.let_stmt("g", text);
        let other = b.var("h");
        let read = b.let_stmt("local", other);
        let local = b.var("local");
        let show = b.call_stmt("Debug", vec![local]);
        let proc = b.sub("Main", &[], vec![store, read, show]);
        let mut tree = b.finish();

        let report = Cleaner::new(&mut tree)
            .with_external(["g", "h"])
            .clean(proc, "Main")
            .unwrap();
        assert!(!report.changed());
        assert_eq!(report.external_written, BTreeSet::from(["g".to_string()]));
        assert_eq!(report.external_read, BTreeSet::from(["h".to_string()]));
    }

    #[test]
    fn test_unused_declaration_removed() {
        let mut b = TreeBuilder::new();
        let dim = b.dim("x");
        let one = b.number(1);
        let assign = b.let_stmt("x", one);
        let keep = b.call_stmt("DoIt", vec![]);
        let proc = b.sub("Main", &[], vec![dim, assign, keep]);
        let mut tree = b.finish();

        let report = Cleaner::new(&mut tree).clean(proc, "Main").unwrap();
        assert_eq!(report.removed.len(), 2);
        assert_eq!(tree.render_text(proc), "Sub Main()\nDoIt\nEnd Sub");
    }

    #[test]
    fn test_effectful_loop_kept_and_empty_loop_removed() {
        let mut b = TreeBuilder::new();
        let start = b.number(1);
        let end = b.number(3);
        let empty = b.for_next("i", start, end, None, vec![]);
        let i = b.var("j");
        let call = b.call_stmt("Work", vec![i]);
        let start = b.number(1);
        let end = b.number(3);
        let busy = b.for_next("j", start, end, None, vec![call]);
        let proc = b.sub("Main", &[], vec![empty, busy]);
        let mut tree = b.finish();

        let report = Cleaner::new(&mut tree).clean(proc, "Main").unwrap();
        assert_eq!(report.removed, vec!["For i = 1 To 3\nNext i"]);
        assert!(tree.render_text(proc).contains("For j = 1 To 3\nWork j\nNext j"));
    }

    #[test]
    fn test_failure_rolls_back() {
        let mut b = TreeBuilder::new();
        let code = b.number(65);
        let pure_call = b.call_stmt("Chr", vec![code]);
        let condition = b.boolean(true);
        let branch = b.if_stmt(vec![(condition, vec![pure_call])], None);
        let x = b.var("x");
        let select = b.select_case(x, vec![]);
        let proc = b.sub("Main", &[], vec![branch, select]);
        let mut tree = b.finish();
        let before = tree.render_text(proc);

        let failure = Cleaner::new(&mut tree).clean(proc, "Main").unwrap_err();
        assert_eq!(failure, CleanFailure::Unsupported("selectCaseStmt".to_string()));
        assert_eq!(tree.render_text(proc), before);
    }

    #[test]
    fn test_pure_conditional_removed() {
        let mut b = TreeBuilder::new();
        let code = b.number(65);
        let pure_call = b.call_stmt("Chr", vec![code]);
        let condition = b.boolean(true);
        let branch = b.if_stmt(vec![(condition, vec![pure_call])], None);
        let proc = b.sub("Main", &[], vec![branch]);
        let mut tree = b.finish();

        let report = Cleaner::new(&mut tree).clean(proc, "Main").unwrap();
        assert!(report.changed());
        assert_eq!(tree.render_text(proc), "Sub Main()\nEnd Sub");
    }

    #[test]
    fn test_classification_is_total() {
        assert_eq!(classify(NodeKind::Plus), Class::Pure);
        assert_eq!(classify(NodeKind::ValueStmt), Class::PassThrough);
        assert_eq!(classify(NodeKind::OnErrorStmt), Class::SideEffect);
        assert_eq!(classify(NodeKind::LetStmt), Class::Handled);
        assert_eq!(classify(NodeKind::SelectCaseStmt), Class::Unsupported);
        assert_eq!(classify(NodeKind::Unknown), Class::Unsupported);
        assert!(is_pure_name("chr"));
        assert!(is_pure_name("Weekday"));
        assert!(!is_pure_name("Shell"));
    }
}
