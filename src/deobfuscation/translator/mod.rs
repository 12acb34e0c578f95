//! Lowering of procedures and call expressions into the evaluable dialect.
//!
//! The [`Translator`] proves that a piece of macro code is straight-line computation over
//! known names and produces equivalent dialect source for the
//! [`Evaluator`](crate::emulation::Evaluator). Every node kind has a fixed policy (see
//! [`tables`]): kinds that produce values may only appear where a value is expected, kinds
//! that produce statements only in statement position, and anything outside the supported
//! set fails the whole translation. A translator is consumed by the lowering it performs,
//! so a failed attempt leaves no partial output behind.
//!
//! # Example
//!
//! ```text
//! Function Twice(n As Integer)          def Twice(n):
//!     Twice = n * 2               =>      n = int(n)
//! End Function                            Twice = ""
//!                                         Twice = (n * 2)
//!                                         return Twice
//! ```

mod tables;

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use strum::Display;
use thiserror::Error;

use crate::{
    emulation,
    tree::{NodeId, NodeKind, Tree},
};

use tables::{Lowering, Scalar};

pub use tables::is_pure_builtin;

const INDENT: &str = "  ";

/// Where a node is being lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Position {
    /// An expression whose value is used.
    Value,
    /// The left side of an assignment.
    Target,
    /// A statement on its own line.
    Statement,
}

/// Why a procedure or expression cannot be lowered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// The node kind has no lowering.
    #[error("unsupported construct '{0}'")]
    Unsupported(String),
    /// The node kind is not valid where it appears.
    #[error("'{kind}' cannot be used in {position} position")]
    Position {
        /// Parser name of the node.
        kind: String,
        /// Where it was found.
        position: Position,
    },
    /// A supported kind with children the lowering does not recognize.
    #[error("unexpected shape of '{kind}': {reason}")]
    Shape {
        /// Parser name of the node.
        kind: String,
        /// What was expected.
        reason: &'static str,
    },
    /// A library function called with an argument count it does not take.
    #[error("'{name}' does not take {found} argument(s)")]
    Arity {
        /// The library function.
        name: String,
        /// Arguments supplied.
        found: usize,
    },
    /// A name that is neither a known procedure, a variable, a library function nor a
    /// library constant.
    #[error("cannot resolve '{0}'")]
    Unresolved(String),
    /// A name that would collide with the dialect's keywords or built-ins.
    #[error("'{0}' is reserved in lowered code")]
    Reserved(String),
    /// A literal the dialect cannot represent.
    #[error("unsupported literal '{0}'")]
    Literal(String),
    /// A declared type the dialect cannot represent.
    #[error("unsupported type '{0}'")]
    Type(String),
}

type Lowered<T> = Result<T, TranslateError>;

/// A successfully lowered procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Name of the procedure, also the name of the emitted callable.
    pub name: String,
    /// Complete dialect source defining the callable.
    pub code: String,
    /// True if the procedure assigns its own name, i.e. returns a value.
    pub returns_value: bool,
}

#[derive(Default)]
struct Parameters {
    names: Vec<String>,
    variadic: Option<String>,
    prologue: Vec<String>,
}

impl Parameters {
    fn signature(&self) -> String {
        match &self.variadic {
            Some(_) => "*args".to_string(),
            None => self.names.join(", "),
        }
    }
}

/// Lowers one procedure or one expression.
///
/// Known procedures are called, known variables are read or indexed; every other name
/// must be a library function or constant.
pub struct Translator<'a> {
    tree: &'a Tree,
    own_name: Option<String>,
    own_is_function: bool,
    functions: FxHashSet<String>,
    variables: FxHashSet<String>,
    parameters: FxHashSet<String>,
    overridden: BTreeSet<String>,
    overridden_arrays: BTreeSet<String>,
    initialized: FxHashSet<String>,
    hoisted: Vec<String>,
    returns: bool,
    lines: Vec<String>,
    depth: usize,
    loops: usize,
}

impl<'a> Translator<'a> {
    /// Creates a translator over `tree` that knows no names yet.
    #[must_use]
    pub fn new(tree: &'a Tree) -> Self {
        Translator {
            tree,
            own_name: None,
            own_is_function: false,
            functions: FxHashSet::default(),
            variables: FxHashSet::default(),
            parameters: FxHashSet::default(),
            overridden: BTreeSet::new(),
            overridden_arrays: BTreeSet::new(),
            initialized: FxHashSet::default(),
            hoisted: Vec::new(),
            returns: false,
            lines: Vec::new(),
            depth: 0,
            loops: 0,
        }
    }

    /// Procedures that may be called from lowered code.
    #[must_use]
    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Variables that may be read from lowered code.
    #[must_use]
    pub fn with_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables.extend(names.into_iter().map(Into::into));
        self
    }

    /// Lowers a single expression (a `valueStmt` or anything that forwards to one).
    ///
    /// # Errors
    ///
    /// A [`TranslateError`] for the first construct that cannot be lowered.
    pub fn expression(mut self, node: NodeId) -> Result<String, TranslateError> {
        self.value(node)
    }

    /// Lowers a `Sub` or `Function` into a complete callable definition.
    ///
    /// # Errors
    ///
    /// A [`TranslateError`] for the first construct that cannot be lowered.
    pub fn procedure(mut self, node: NodeId) -> Result<Translation, TranslateError> {
        let kind = self.tree.kind(node);
        if !matches!(kind, NodeKind::SubStmt | NodeKind::FunctionStmt) {
            return Err(self.unsupported(node));
        }
        let name = self
            .tree
            .identifier_name(node)
            .ok_or_else(|| self.shape(node, "procedure without a name"))?;
        check_name(&name)?;

        self.own_is_function = kind == NodeKind::FunctionStmt;
        self.own_name = Some(name.clone());
        self.functions.insert(name.clone());

        let parameters = match self.tree.child_of_kind(node, NodeKind::ArgList) {
            Some(list) => self.parameters(list)?,
            None => Parameters::default(),
        };

        let blocks = self.tree.match_path(node, &[NodeKind::Block.into()]);
        if blocks.len() > 1 {
            return Err(self.shape(node, "more than one block"));
        }

        self.depth = 1;
        if let Some(block) = blocks.first() {
            self.statement(*block)?;
        }

        let mut prologue = parameters.prologue.clone();
        prologue.append(&mut self.hoisted);
        for array in &self.overridden_arrays {
            if !self.parameters.contains(array) && self.initialized.insert(array.clone()) {
                prologue.push(format!("{array} = []"));
            }
        }
        for scalar in &self.overridden {
            if !self.parameters.contains(scalar) && self.initialized.insert(scalar.clone()) {
                prologue.push(format!("{scalar} = \"\""));
            }
        }

        let mut code = format!("def {name}({}):\n", parameters.signature());
        for line in &prologue {
            code.push_str(INDENT);
            code.push_str(line);
            code.push('\n');
        }
        for line in &self.lines {
            code.push_str(line);
            code.push('\n');
        }
        if self.returns {
            code.push_str(&format!("{INDENT}return {name}\n"));
        } else if prologue.is_empty() && self.lines.is_empty() {
            code.push_str(&format!("{INDENT}pass\n"));
        }

        Ok(Translation {
            name,
            code,
            returns_value: self.returns,
        })
    }

    // Diagnostics

    fn unsupported(&self, node: NodeId) -> TranslateError {
        TranslateError::Unsupported(self.tree.kind_name(node).to_string())
    }

    fn shape(&self, node: NodeId, reason: &'static str) -> TranslateError {
        TranslateError::Shape {
            kind: self.tree.kind_name(node).to_string(),
            reason,
        }
    }

    fn misplaced(&self, node: NodeId, position: Position) -> TranslateError {
        TranslateError::Position {
            kind: self.tree.kind_name(node).to_string(),
            position,
        }
    }

    // Structure helpers

    /// Children that are not layout.
    fn meaningful(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .children(node)
            .iter()
            .copied()
            .filter(|c| tables::lowering(self.tree.kind(*c)) != Lowering::Skip)
            .collect()
    }

    fn only_child(&self, node: NodeId) -> Lowered<NodeId> {
        match self.meaningful(node).as_slice() {
            [child] => Ok(*child),
            _ => Err(self.shape(node, "expected exactly one child")),
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text.as_ref()));
    }

    /// Lowers an optional block one level deeper, followed by `trailer`.
    fn nested(&mut self, block: Option<NodeId>, trailer: &[String]) -> Lowered<()> {
        self.depth += 1;
        let before = self.lines.len();
        if let Some(block) = block {
            self.statement(block)?;
        }
        for line in trailer {
            self.line(line);
        }
        if self.lines.len() == before {
            self.line("pass");
        }
        self.depth -= 1;
        Ok(())
    }

    fn single_block(&self, node: NodeId) -> Lowered<Option<NodeId>> {
        let blocks = self.tree.match_path(node, &[NodeKind::Block.into()]);
        match blocks.as_slice() {
            [] => Ok(None),
            [block] => Ok(Some(*block)),
            _ => Err(self.shape(node, "more than one block")),
        }
    }

    /// The name an `ambiguousIdentifier` or `certainIdentifier` spells.
    fn name_of(&self, node: NodeId) -> Lowered<String> {
        if !matches!(
            self.tree.kind(node),
            NodeKind::AmbiguousIdentifier | NodeKind::CertainIdentifier
        ) {
            return Err(self.unsupported(node));
        }
        let name = self.tree.render_text(node);
        if name.is_empty() {
            return Err(self.shape(node, "empty identifier"));
        }
        Ok(name)
    }

    // Values

    fn value(&mut self, node: NodeId) -> Lowered<String> {
        match tables::lowering(self.tree.kind(node)) {
            Lowering::Value => self.value_kind(node),
            Lowering::Forward => {
                let child = self.only_child(node)?;
                self.value(child)
            }
            Lowering::Statement | Lowering::Either | Lowering::Skip => {
                Err(self.misplaced(node, Position::Value))
            }
            Lowering::Unsupported => Err(self.unsupported(node)),
        }
    }

    fn value_kind(&mut self, node: NodeId) -> Lowered<String> {
        let tree = self.tree;
        let text = || tree.value(node).unwrap_or_default().to_string();
        match self.tree.kind(node) {
            NodeKind::ValueStmt => self.value_stmt(node),
            NodeKind::Literal => {
                let child = self.only_child(node)?;
                self.value(child)
            }
            NodeKind::StringLiteral => {
                let literal = text();
                if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
                    Ok(literal)
                } else {
                    Err(TranslateError::Literal(literal))
                }
            }
            NodeKind::ShortLiteral | NodeKind::IntegerLiteral => decimal_literal(&text()),
            NodeKind::HexLiteral | NodeKind::OctLiteral => radix_literal(&text()),
            NodeKind::True => Ok("True".to_string()),
            NodeKind::False => Ok("False".to_string()),
            NodeKind::IcsSVariableOrProcedureCall | NodeKind::IcsSProcedureOrArrayCall => {
                let (name, args) = self.call_parts(node)?;
                self.resolve(name, args, Position::Value)
            }
            NodeKind::IcsSMembersCall => self.member_value(node),
            _ => Err(self.unsupported(node)),
        }
    }

    fn value_stmt(&mut self, node: NodeId) -> Lowered<String> {
        let parts = self.meaningful(node);
        let kinds: Vec<NodeKind> = parts.iter().map(|p| self.tree.kind(*p)).collect();
        match (parts.as_slice(), kinds.as_slice()) {
            ([single], _) => self.value(*single),
            ([_, inner, _], [NodeKind::LParen, _, NodeKind::RParen]) => self.value(*inner),
            ([left, op, right], [_, op_kind, _]) if self.tree.is_terminal(*op) => {
                let template =
                    tables::binary_operator(*op_kind).ok_or_else(|| self.unsupported(*op))?;
                let left = self.value(*left)?;
                let right = self.value(*right)?;
                Ok(template.render(&left, &right))
            }
            ([op, operand], [op_kind, _]) if self.tree.is_terminal(*op) => {
                let prefix = tables::unary_operator(*op_kind).ok_or_else(|| self.unsupported(*op))?;
                let operand = self.value(*operand)?;
                Ok(format!("({prefix}{operand})"))
            }
            _ => Err(self.shape(node, "not a literal, call, parenthesis or operator")),
        }
    }

    /// Name and lowered arguments of a call or reference.
    fn call_parts(&mut self, node: NodeId) -> Lowered<(String, Vec<String>)> {
        let mut name = None;
        let mut args = None;
        for child in self.tree.children(node).to_vec() {
            match self.tree.kind(child) {
                NodeKind::AmbiguousIdentifier | NodeKind::CertainIdentifier => {
                    name = Some(self.name_of(child)?);
                }
                NodeKind::TypeHint | NodeKind::Ws | NodeKind::LParen | NodeKind::RParen => {}
                NodeKind::ArgsCall | NodeKind::Subscripts => {
                    if args.is_some() {
                        return Err(self.shape(node, "chained call"));
                    }
                    args = Some(self.arguments(child)?);
                }
                _ => return Err(self.unsupported(child)),
            }
        }
        let name = name.ok_or_else(|| self.shape(node, "call without a name"))?;
        Ok((name, args.unwrap_or_default()))
    }

    fn arguments(&mut self, list: NodeId) -> Lowered<Vec<String>> {
        let mut args = Vec::new();
        let mut expecting = true;
        for child in self.tree.children(list).to_vec() {
            match self.tree.kind(child) {
                NodeKind::ArgCall | NodeKind::Subscript if expecting => {
                    args.push(self.value(child)?);
                    expecting = false;
                }
                NodeKind::Comma if !expecting => expecting = true,
                NodeKind::Ws => {}
                NodeKind::ArgCall | NodeKind::Subscript | NodeKind::Comma => {
                    return Err(self.shape(list, "missing argument"));
                }
                _ => return Err(self.unsupported(child)),
            }
        }
        if expecting && !args.is_empty() {
            return Err(self.shape(list, "missing argument"));
        }
        Ok(args)
    }

    fn resolve(&mut self, name: String, args: Vec<String>, position: Position) -> Lowered<String> {
        let is_own = self.own_name.as_deref() == Some(name.as_str());

        if position == Position::Target {
            check_name(&name)?;
            self.functions.remove(&name);
            self.variables.insert(name.clone());
            return match args.as_slice() {
                [] => {
                    if is_own && self.own_is_function {
                        self.returns = true;
                    }
                    self.overridden.insert(name.clone());
                    Ok(name)
                }
                [index] => {
                    self.overridden_arrays.insert(name.clone());
                    Ok(format!("{name}[{index}]"))
                }
                _ => Err(TranslateError::Unsupported(format!("{name}(multidimensional)"))),
            };
        }

        if is_own && args.is_empty() && self.own_is_function {
            // The function's own name without arguments reads its return value.
            self.functions.remove(&name);
            self.variables.insert(name.clone());
            self.overridden.insert(name.clone());
            return Ok(name);
        }

        // Known procedures and variables shadow library calls of the same name.
        if is_own || self.functions.contains(&name) {
            check_name(&name)?;
            return Ok(format!("{name}({})", args.join(", ")));
        }

        if self.variables.contains(&name) {
            check_name(&name)?;
            return match args.as_slice() {
                [] => Ok(name),
                [index] => Ok(format!("{name}[{index}]")),
                _ => Err(TranslateError::Unsupported(format!("{name}(multidimensional)"))),
            };
        }

        if let Some(call) = tables::library(&name) {
            if !call.accepts(args.len()) {
                return Err(TranslateError::Arity {
                    name,
                    found: args.len(),
                });
            }
            return Ok((call.render)(&args));
        }

        if args.is_empty() {
            if let Some(keyword) = tables::keyword(&name) {
                return Ok(keyword.to_string());
            }
        }

        Err(TranslateError::Unresolved(name))
    }

    fn member_value(&mut self, node: NodeId) -> Lowered<String> {
        let parts = self.meaningful(node);
        let [object, member] = parts.as_slice() else {
            return Err(self.shape(node, "expected one member access"));
        };
        if self.tree.kind(*member) != NodeKind::IcsSMemberCall {
            return Err(self.unsupported(*member));
        }
        let object = self.plain_reference(*object)?;
        let target = self
            .meaningful(*member)
            .into_iter()
            .find(|c| self.tree.kind(*c) != NodeKind::Dot)
            .ok_or_else(|| self.shape(*member, "member without a name"))?;
        if !matches!(
            self.tree.kind(target),
            NodeKind::IcsSVariableOrProcedureCall | NodeKind::IcsSProcedureOrArrayCall
        ) {
            return Err(self.unsupported(target));
        }
        let (method, args) = self.call_parts(target)?;
        method_call(&object, &method, &args)
    }

    /// The name of a reference without arguments.
    fn plain_reference(&mut self, node: NodeId) -> Lowered<String> {
        let node = match self.tree.kind(node) {
            NodeKind::ImplicitCallStmtInStmt => self.only_child(node)?,
            _ => node,
        };
        if self.tree.kind(node) != NodeKind::IcsSVariableOrProcedureCall {
            return Err(self.unsupported(node));
        }
        match self.call_parts(node)? {
            (name, args) if args.is_empty() => Ok(name),
            _ => Err(self.shape(node, "member access on a call")),
        }
    }

    fn target(&mut self, node: NodeId) -> Lowered<String> {
        let call = match self.tree.kind(node) {
            NodeKind::ImplicitCallStmtInStmt => self.only_child(node)?,
            _ => node,
        };
        match self.tree.kind(call) {
            NodeKind::IcsSVariableOrProcedureCall | NodeKind::IcsSProcedureOrArrayCall => {
                let (name, args) = self.call_parts(call)?;
                self.resolve(name, args, Position::Target)
            }
            _ => Err(self.misplaced(call, Position::Target)),
        }
    }

    // Statements

    fn statement(&mut self, node: NodeId) -> Lowered<()> {
        match tables::lowering(self.tree.kind(node)) {
            Lowering::Statement => self.statement_kind(node),
            Lowering::Either => {
                let call = self.block_call(node)?;
                self.line(call);
                Ok(())
            }
            Lowering::Forward => {
                let child = self.only_child(node)?;
                self.statement(child)
            }
            Lowering::Skip => Ok(()),
            Lowering::Value => Err(self.misplaced(node, Position::Statement)),
            Lowering::Unsupported => Err(self.unsupported(node)),
        }
    }

    fn statement_kind(&mut self, node: NodeId) -> Lowered<()> {
        match self.tree.kind(node) {
            NodeKind::Block => {
                for child in self.tree.children(node).to_vec() {
                    self.statement(child)?;
                }
                Ok(())
            }
            NodeKind::LetStmt | NodeKind::SetStmt => self.assignment(node),
            NodeKind::ConstStmt => self.constants(node),
            NodeKind::VariableStmt => self.declarations(node),
            NodeKind::IfThenElseStmt => self.if_stmt(node),
            NodeKind::WhileWendStmt => {
                let condition = self.condition(node)?;
                self.line(format!("while {condition}:"));
                let block = self.single_block(node)?;
                self.nested(block, &[])
            }
            NodeKind::DoLoopStmt => self.do_loop(node),
            NodeKind::ForNextStmt => self.for_next(node),
            NodeKind::OnErrorStmt => {
                let kinds: Vec<NodeKind> = self.meaningful(node).iter().map(|c| self.tree.kind(*c)).collect();
                if kinds == [NodeKind::OnError, NodeKind::Resume, NodeKind::Next] {
                    self.line("disable_errors()");
                    Ok(())
                } else {
                    Err(self.shape(node, "only `On Error Resume Next` is supported"))
                }
            }
            _ => Err(self.unsupported(node)),
        }
    }

    /// A statement-position call, lowered to an expression line.
    fn block_call(&mut self, node: NodeId) -> Lowered<String> {
        match self.tree.kind(node) {
            NodeKind::IcsBProcedureCall => {
                let (name, args) = self.call_parts(node)?;
                self.resolve(name, args, Position::Statement)
            }
            NodeKind::IcsBMemberProcedureCall => {
                let mut object = None;
                let mut method = None;
                let mut args = Vec::new();
                for child in self.meaningful(node) {
                    match self.tree.kind(child) {
                        NodeKind::ImplicitCallStmtInStmt => object = Some(self.plain_reference(child)?),
                        NodeKind::AmbiguousIdentifier => method = Some(self.name_of(child)?),
                        NodeKind::ArgsCall => args = self.arguments(child)?,
                        NodeKind::Dot | NodeKind::TypeHint => {}
                        _ => return Err(self.unsupported(child)),
                    }
                }
                match (object, method) {
                    (Some(object), Some(method)) => method_call(&object, &method, &args),
                    _ => Err(self.shape(node, "expected `Object.Method`")),
                }
            }
            _ => Err(self.unsupported(node)),
        }
    }

    fn assignment(&mut self, node: NodeId) -> Lowered<()> {
        let mut target = None;
        let mut operator = None;
        let mut value = None;
        for child in self.meaningful(node) {
            match self.tree.kind(child) {
                NodeKind::Let | NodeKind::Set => {}
                NodeKind::ImplicitCallStmtInStmt if target.is_none() => target = Some(child),
                kind @ (NodeKind::Eq | NodeKind::PlusEq | NodeKind::MinusEq) => operator = Some(kind),
                NodeKind::ValueStmt if operator.is_some() => value = Some(child),
                _ => return Err(self.unsupported(child)),
            }
        }
        let (Some(target), Some(operator), Some(value)) = (target, operator, value) else {
            return Err(self.shape(node, "expected `target = value`"));
        };

        let target = self.target(target)?;
        let value = self.value(value)?;
        let line = match operator {
            NodeKind::PlusEq => format!("{target} = ({target} + {value})"),
            NodeKind::MinusEq => format!("{target} = ({target} - {value})"),
            _ => format!("{target} = {value}"),
        };
        self.line(line);
        Ok(())
    }

    fn constants(&mut self, node: NodeId) -> Lowered<()> {
        for child in self.meaningful(node) {
            match self.tree.kind(child) {
                NodeKind::Const | NodeKind::Comma => {}
                NodeKind::ConstSubStmt => {
                    let mut name = None;
                    let mut value = None;
                    for part in self.meaningful(child) {
                        match self.tree.kind(part) {
                            NodeKind::AmbiguousIdentifier => name = Some(self.name_of(part)?),
                            NodeKind::ValueStmt => value = Some(part),
                            NodeKind::TypeHint | NodeKind::AsTypeClause | NodeKind::Eq => {}
                            _ => return Err(self.unsupported(part)),
                        }
                    }
                    let (Some(name), Some(value)) = (name, value) else {
                        return Err(self.shape(child, "expected `name = value`"));
                    };
                    check_name(&name)?;
                    let value = self.value(value)?;
                    self.functions.remove(&name);
                    self.variables.insert(name.clone());
                    self.line(format!("{name} = {value}"));
                }
                _ => return Err(self.unsupported(child)),
            }
        }
        Ok(())
    }

    fn declarations(&mut self, node: NodeId) -> Lowered<()> {
        for child in self.meaningful(node) {
            match self.tree.kind(child) {
                NodeKind::Dim | NodeKind::Static => {}
                NodeKind::VariableListStmt => {
                    for sub in self.meaningful(child) {
                        match self.tree.kind(sub) {
                            NodeKind::VariableSubStmt => self.declaration(sub)?,
                            NodeKind::Comma => {}
                            _ => return Err(self.unsupported(sub)),
                        }
                    }
                }
                _ => return Err(self.unsupported(child)),
            }
        }
        Ok(())
    }

    /// Registers a `Dim` variable and hoists its default value into the prologue.
    fn declaration(&mut self, node: NodeId) -> Lowered<()> {
        let mut name = None;
        let mut array = false;
        let mut scalar = Scalar::Variant;
        for child in self.meaningful(node) {
            match self.tree.kind(child) {
                NodeKind::AmbiguousIdentifier => name = Some(self.name_of(child)?),
                NodeKind::TypeHint => {}
                NodeKind::LParen | NodeKind::RParen => array = true,
                NodeKind::Subscripts => return Err(self.shape(node, "sized arrays are not supported")),
                NodeKind::AsTypeClause => scalar = self.as_type(child)?,
                _ => return Err(self.unsupported(child)),
            }
        }
        let name = name.ok_or_else(|| self.shape(node, "declaration without a name"))?;
        check_name(&name)?;
        self.functions.remove(&name);
        self.variables.insert(name.clone());

        let default = if array { Some("[]") } else { scalar.default_value() };
        if let Some(default) = default {
            if !self.parameters.contains(&name) && self.initialized.insert(name.clone()) {
                self.hoisted.push(format!("{name} = {default}"));
            }
        }
        Ok(())
    }

    fn as_type(&self, clause: NodeId) -> Lowered<Scalar> {
        let mut scalar = None;
        for child in self.meaningful(clause) {
            match self.tree.kind(child) {
                NodeKind::As => {}
                NodeKind::Type => {
                    let base = match self.meaningful(child).as_slice() {
                        [base] if self.tree.kind(*base) == NodeKind::BaseType => *base,
                        _ => return Err(TranslateError::Type(self.tree.render_text(child))),
                    };
                    let token = self.only_child(base)?;
                    scalar = Some(
                        Scalar::from_base_type(self.tree.kind(token))
                            .ok_or_else(|| TranslateError::Type(self.tree.render_text(token)))?,
                    );
                }
                _ => return Err(TranslateError::Type(self.tree.render_text(clause))),
            }
        }
        scalar.ok_or_else(|| self.shape(clause, "missing type"))
    }

    fn condition(&mut self, node: NodeId) -> Lowered<String> {
        let condition = self
            .tree
            .child_of_kind(node, NodeKind::ValueStmt)
            .or_else(|| self.tree.child_of_kind(node, NodeKind::IfConditionStmt))
            .ok_or_else(|| self.shape(node, "missing condition"))?;
        self.value(condition)
    }

    fn if_stmt(&mut self, node: NodeId) -> Lowered<()> {
        let parts = self.meaningful(node);
        if parts.first().is_some_and(|p| self.tree.kind(*p) == NodeKind::If) {
            return self.inline_if(node, &parts);
        }

        for part in parts {
            match self.tree.kind(part) {
                NodeKind::IfBlockStmt | NodeKind::IfElseIfBlockStmt => {
                    let keyword = if self.tree.kind(part) == NodeKind::IfBlockStmt {
                        "if"
                    } else {
                        "elif"
                    };
                    let condition = self.condition(part)?;
                    self.line(format!("{keyword} {condition}:"));
                    let block = self.single_block(part)?;
                    self.nested(block, &[])?;
                }
                NodeKind::IfElseBlockStmt => {
                    self.line("else:");
                    let block = self.single_block(part)?;
                    self.nested(block, &[])?;
                }
                NodeKind::EndIf => {}
                _ => return Err(self.unsupported(part)),
            }
        }
        Ok(())
    }

    /// `If c Then stmt [Else stmt]` on one line.
    fn inline_if(&mut self, node: NodeId, parts: &[NodeId]) -> Lowered<()> {
        let kinds: Vec<NodeKind> = parts.iter().map(|p| self.tree.kind(*p)).collect();
        let (condition, then, otherwise) = match (parts, kinds.as_slice()) {
            ([_, c, _, t], [_, NodeKind::IfConditionStmt, NodeKind::Then, NodeKind::BlockStmt]) => (*c, *t, None),
            (
                [_, c, _, t, _, e],
                [_, NodeKind::IfConditionStmt, NodeKind::Then, NodeKind::BlockStmt, NodeKind::Else, NodeKind::BlockStmt],
            ) => (*c, *t, Some(*e)),
            _ => return Err(self.shape(node, "unexpected single-line `If`")),
        };
        let condition = self.value(condition)?;
        self.line(format!("if {condition}:"));
        self.nested(Some(then), &[])?;
        if let Some(otherwise) = otherwise {
            self.line("else:");
            self.nested(Some(otherwise), &[])?;
        }
        Ok(())
    }

    fn do_loop(&mut self, node: NodeId) -> Lowered<()> {
        let children = self.tree.children(node).to_vec();
        let kind_at = |kinds: &[NodeKind]| {
            children
                .iter()
                .position(|c| kinds.contains(&self.tree.kind(*c)))
        };
        let loop_at = kind_at(&[NodeKind::Loop]).ok_or_else(|| self.shape(node, "missing `Loop`"))?;
        let Some(test_at) = kind_at(&[NodeKind::While, NodeKind::Until]) else {
            return Err(self.shape(node, "loop without a condition"));
        };
        let until = self.tree.kind(children[test_at]) == NodeKind::Until;
        let block = self.single_block(node)?;

        if test_at < loop_at {
            let condition = self.condition(node)?;
            if until {
                self.line(format!("while not {condition}:"));
            } else {
                self.line(format!("while {condition}:"));
            }
            return self.nested(block, &[]);
        }

        // Post-test: the body runs once before the condition is checked.
        self.line("while True:");
        self.depth += 1;
        if let Some(block) = block {
            self.statement(block)?;
        }
        let condition = self.condition(node)?;
        if until {
            self.line(format!("if {condition}:"));
        } else {
            self.line(format!("if not {condition}:"));
        }
        self.line(format!("{INDENT}break"));
        self.depth -= 1;
        Ok(())
    }

    fn for_next(&mut self, node: NodeId) -> Lowered<()> {
        let counter = self
            .tree
            .child_of_kind(node, NodeKind::AmbiguousIdentifier)
            .ok_or_else(|| self.shape(node, "missing loop variable"))?;
        let counter = self.name_of(counter)?;
        check_name(&counter)?;

        let bounds = self.tree.match_path(node, &[NodeKind::ValueStmt.into()]);
        let (start, end, step) = match bounds.as_slice() {
            [start, end] => (*start, *end, None),
            [start, end, step] => (*start, *end, Some(*step)),
            _ => return Err(self.shape(node, "expected `start To end [Step step]`")),
        };
        let start = self.value(start)?;
        let end = self.value(end)?;
        let step = match step {
            Some(step) => self.value(step)?,
            None => "1".to_string(),
        };
        self.functions.remove(&counter);
        self.variables.insert(counter.clone());

        let id = self.loops;
        self.loops += 1;
        let limit = format!("__limit{id}");
        let stride = format!("__step{id}");
        self.line(format!("{counter} = {start}"));
        self.line(format!("{limit} = {end}"));
        self.line(format!("{stride} = {step}"));
        self.line(format!(
            "while ((({stride} >= 0) and ({counter} <= {limit})) or (({stride} < 0) and ({counter} >= {limit}))):"
        ));
        let block = self.single_block(node)?;
        self.nested(block, &[format!("{counter} = ({counter} + {stride})")])
    }

    fn parameters(&mut self, list: NodeId) -> Lowered<Parameters> {
        let mut parameters = Parameters::default();
        for child in self.meaningful(list) {
            match self.tree.kind(child) {
                NodeKind::LParen | NodeKind::RParen | NodeKind::Comma => {}
                NodeKind::Arg => self.parameter(child, &mut parameters)?,
                _ => return Err(self.unsupported(child)),
            }
        }
        if parameters.variadic.is_some() && parameters.names.len() > 1 {
            return Err(self.shape(list, "`ParamArray` mixed with named parameters"));
        }
        if let Some(variadic) = &parameters.variadic {
            parameters.prologue = vec![format!("{variadic} = list(args)")];
        }
        Ok(parameters)
    }

    fn parameter(&mut self, arg: NodeId, parameters: &mut Parameters) -> Lowered<()> {
        let mut name = None;
        let mut scalar = Scalar::Variant;
        let mut variadic = false;
        for child in self.meaningful(arg) {
            match self.tree.kind(child) {
                NodeKind::ByVal | NodeKind::ByRef | NodeKind::TypeHint | NodeKind::LParen | NodeKind::RParen => {}
                NodeKind::ParamArray => variadic = true,
                NodeKind::AmbiguousIdentifier => name = Some(self.name_of(child)?),
                NodeKind::AsTypeClause => scalar = self.as_type(child)?,
                _ => return Err(self.unsupported(child)),
            }
        }
        let name = name.ok_or_else(|| self.shape(arg, "parameter without a name"))?;
        check_name(&name)?;

        if variadic {
            if scalar != Scalar::Variant {
                return Err(self.shape(arg, "typed `ParamArray`"));
            }
            parameters.variadic = Some(name.clone());
        } else if let Some(conversion) = scalar.conversion() {
            parameters.prologue.push(format!("{name} = {conversion}({name})"));
        }

        self.functions.remove(&name);
        self.variables.insert(name.clone());
        self.parameters.insert(name.clone());
        parameters.names.push(name);
        Ok(())
    }
}

fn check_name(name: &str) -> Lowered<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    if !valid || emulation::is_reserved(name) || name.starts_with("__") {
        return Err(TranslateError::Reserved(name.to_string()));
    }
    Ok(())
}

fn method_call(object: &str, method: &str, args: &[String]) -> Lowered<String> {
    let (object, method) = tables::member(object, method)
        .ok_or_else(|| TranslateError::Unresolved(format!("{object}.{method}")))?;
    Ok(format!("method_call(\"{object}\", \"{method}\", [{}])", args.join(", ")))
}

/// Decimal integer literal with its type suffix stripped.
fn decimal_literal(text: &str) -> Lowered<String> {
    let digits = text.trim_end_matches(['%', '&', '^']);
    digits
        .parse::<i64>()
        .map(|v| v.to_string())
        .map_err(|_| TranslateError::Literal(text.to_string()))
}

/// `&H..`/`&O..` literal as a decimal number.
///
/// Without a suffix the literal is an `Integer` if it fits 16 bits and a `Long` otherwise,
/// so `&HFFFF` is `-1` while `&HFFFF&` is `65535`.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn radix_literal(text: &str) -> Lowered<String> {
    let invalid = || TranslateError::Literal(text.to_string());
    let body = text.strip_prefix('&').ok_or_else(invalid)?;
    let (radix, digits) = match body.chars().next() {
        Some('H' | 'h') => (16, &body[1..]),
        Some('O' | 'o') => (8, &body[1..]),
        _ => (8, body),
    };
    let (digits, width) = if let Some(d) = digits.strip_suffix('%') {
        (d, 16)
    } else if let Some(d) = digits.strip_suffix('&') {
        (d, 32)
    } else if let Some(d) = digits.strip_suffix('^') {
        (d, 64)
    } else {
        (digits, 0)
    };
    let raw = u64::from_str_radix(digits, radix).map_err(|_| invalid())?;
    let value = match width {
        16 if raw <= 0xFFFF => i64::from(raw as u16 as i16),
        32 if raw <= 0xFFFF_FFFF => i64::from(raw as u32 as i32),
        64 => raw as i64,
        0 if raw <= 0xFFFF => i64::from(raw as u16 as i16),
        0 if raw <= 0xFFFF_FFFF => i64::from(raw as u32 as i32),
        _ => return Err(invalid()),
    };
    Ok(value.to_string())
}
