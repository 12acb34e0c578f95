//! Main deobfuscation engine.
//!
//! The [`Deobfuscator`] owns one [`Module`] and runs the enabled passes over it in a fixed
//! order:
//!
//! 1. **Attributes**: drop boilerplate module attributes
//! 2. **Arithmetic**: fold pure literal arithmetic
//! 3. **Whitespace**: canonicalize blanks and statement separators
//! 4. **Identifiers**: rename arguments, locals and referenced globals
//! 5. **Dead code**: run the [`Cleaner`] over every procedure
//! 6. **Resolve**: evaluate side-effect-free procedures and fold their call sites
//! 7. **Inline**: splice trivial zero-argument procedures into their callers
//!
//! Every pass is also public so callers can compose their own pipeline. Structural
//! failures of the module abort the run; failures local to one procedure are recorded in
//! the [`EventLog`] and leave that procedure untouched.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Instant,
};

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::{
    analysis::{DependencyAnalyzer, DependencyGraph},
    deobfuscation::{
        cleaner::Cleaner,
        config::{DeobfuscatorConfig, Passes},
        events::{EventKind, EventLog},
        result::DeobfuscationResult,
        translator::{is_pure_builtin, Translator},
    },
    emulation::{quote, Evaluator, Interpreter, Value},
    module::Module,
    tree::{NodeId, NodeKind, Step, Tree},
    Error, Result,
};

const ATTRIBUTES: &str = "attributes";
const ARITHMETIC: &str = "arithmetic";
const WHITESPACE: &str = "whitespace";
const IDENTIFIERS: &str = "identifiers";
const DEAD_CODE: &str = "dead-code";
const RESOLVE: &str = "resolve";
const INLINE: &str = "inline";

/// Kinds an expression may consist of to be folded by the arithmetic pass.
const ARITHMETIC_KINDS: [NodeKind; 8] = [
    NodeKind::ValueStmt,
    NodeKind::Literal,
    NodeKind::ShortLiteral,
    NodeKind::Ws,
    NodeKind::Plus,
    NodeKind::Minus,
    NodeKind::LParen,
    NodeKind::RParen,
];

/// Call shapes the resolution pass looks for in callers.
const CALL_SITES: [NodeKind; 3] = [
    NodeKind::IcsBProcedureCall,
    NodeKind::IcsSVariableOrProcedureCall,
    NodeKind::IcsSProcedureOrArrayCall,
];

type PassFn<E> = fn(&mut Deobfuscator<E>) -> Result<()>;

/// Runs the deobfuscation passes over one module.
///
/// # Example
///
/// ```rust,no_run
/// use macroscope::{
///     deobfuscation::{Deobfuscator, DeobfuscatorConfig},
///     module::Module,
///     tree::RawNode,
/// };
///
/// # fn example(json: &str) -> macroscope::Result<()> {
/// let module = Module::from_streams(&RawNode::streams_from_json(json)?)?;
/// let mut deobfuscator = Deobfuscator::new(module, DeobfuscatorConfig::default());
/// let result = deobfuscator.run()?;
///
/// println!("{}", deobfuscator.module().render());
/// println!("{}", result.summary());
/// # Ok(())
/// # }
/// ```
pub struct Deobfuscator<E = Interpreter> {
    module: Module,
    config: DeobfuscatorConfig,
    evaluator: E,
    events: EventLog,
    translated: Vec<String>,
    removed: Vec<String>,
    unresolved: BTreeMap<String, BTreeSet<String>>,
    iterations: usize,
}

impl Deobfuscator<Interpreter> {
    /// Creates a deobfuscator backed by the bundled [`Interpreter`].
    #[must_use]
    pub fn new(module: Module, config: DeobfuscatorConfig) -> Self {
        let evaluator = Interpreter::new(config.limits);
        Self::with_evaluator(module, config, evaluator)
    }
}

impl<E: Evaluator> Deobfuscator<E> {
    /// Creates a deobfuscator backed by a custom evaluator.
    #[must_use]
    pub fn with_evaluator(module: Module, config: DeobfuscatorConfig, evaluator: E) -> Self {
        Deobfuscator {
            module,
            config,
            evaluator,
            events: EventLog::new(),
            translated: Vec::new(),
            removed: Vec::new(),
            unresolved: BTreeMap::new(),
            iterations: 0,
        }
    }

    /// The module in its current state.
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Consumes the deobfuscator, returning the module.
    #[must_use]
    pub fn into_module(self) -> Module {
        self.module
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &DeobfuscatorConfig {
        &self.config
    }

    /// Runs every enabled pass in pipeline order.
    ///
    /// The collected events and outcome are moved into the returned result; the module
    /// stays with the deobfuscator.
    ///
    /// # Errors
    ///
    /// A module-level failure: a malformed tree, an arithmetic expression the evaluator
    /// rejects, or an exhausted name pool.
    pub fn run(&mut self) -> Result<DeobfuscationResult> {
        let start = Instant::now();
        let pipeline: [(Passes, &'static str, PassFn<E>); 7] = [
            (Passes::ATTRIBUTES, ATTRIBUTES, Self::remove_attributes),
            (Passes::ARITHMETIC, ARITHMETIC, Self::fold_arithmetic),
            (Passes::WHITESPACE, WHITESPACE, Self::canonicalize_whitespace),
            (Passes::IDENTIFIERS, IDENTIFIERS, Self::rename_identifiers),
            (Passes::DEAD_CODE, DEAD_CODE, Self::clean_procedures),
            (Passes::RESOLVE, RESOLVE, Self::resolve_procedures),
            (Passes::INLINE, INLINE, Self::inline_procedures),
        ];

        for (flag, name, pass) in pipeline {
            if !self.config.passes.contains(flag) {
                continue;
            }
            debug!("running pass {name}");
            self.events.record(EventKind::PassStarted).pass(name);
            if let Err(e) = pass(self) {
                self.events.record(EventKind::Error).pass(name).message(e.to_string());
                return Err(e);
            }
            self.events.record(EventKind::PassCompleted).pass(name);
        }

        let result = DeobfuscationResult {
            events: std::mem::take(&mut self.events),
            translated: std::mem::take(&mut self.translated),
            removed: std::mem::take(&mut self.removed),
            unresolved: std::mem::take(&mut self.unresolved),
            iterations: std::mem::take(&mut self.iterations),
            total_time: start.elapsed(),
        };

        info!("deobfuscation finished: {}", result.summary());
        Ok(result)
    }

    /// Removes attributes whose name is boilerplate and collapses the blank lines they
    /// leave behind.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other passes.
    pub fn remove_attributes(&mut self) -> Result<()> {
        let forest = self.module.attributes();
        let tree = self.module.tree_mut();
        let name_path: [Step; 2] = [
            NodeKind::ImplicitCallStmtInStmt.into(),
            NodeKind::IcsSVariableOrProcedureCall.into(),
        ];

        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for child in tree.children(forest).to_vec() {
            if tree.kind(child) == NodeKind::AttributeStmt {
                let name = tree
                    .first_match(child, &name_path)
                    .and_then(|call| tree.identifier_name(call));
                if let Some(name) = name.filter(|n| self.config.is_boilerplate(n)) {
                    removed.push(name);
                    continue;
                }
            }
            kept.push(child);
        }
        if removed.is_empty() {
            return Ok(());
        }

        let mut collapsed = Vec::with_capacity(kept.len());
        let mut at_line_start = true;
        for child in kept {
            let is_newline = tree.kind(child) == NodeKind::EndOfLine;
            if is_newline && at_line_start {
                continue;
            }
            at_line_start = is_newline;
            collapsed.push(child);
        }
        tree.set_children(forest, collapsed);

        for name in removed {
            self.events
                .record(EventKind::AttributeRemoved)
                .pass(ATTRIBUTES)
                .message(name);
        }
        Ok(())
    }

    /// Replaces expressions built only from integer literals, `+`, `-` and parentheses by
    /// their value.
    ///
    /// # Errors
    ///
    /// [`Error::Evaluation`] if the evaluator rejects such an expression.
    pub fn fold_arithmetic(&mut self) -> Result<()> {
        for forest in self.module.forests() {
            let candidates = self.module.tree().find_all(forest, NodeKind::ValueStmt);
            for node in candidates {
                let tree = self.module.tree();
                if !tree.is_within(node, forest) || !is_foldable(tree, node) {
                    continue;
                }

                let text = tree.render_text(node);
                let code = Translator::new(tree).expression(node).unwrap_or_else(|_| text.clone());
                let value = self
                    .evaluator
                    .evaluate(&code, &FxHashMap::default())
                    .map_err(Error::Evaluation)?;

                let tree = self.module.tree_mut();
                let Some(literal) = literal_node(tree, &value) else {
                    continue;
                };
                tree.set_children(node, vec![literal]);
                self.events
                    .record(EventKind::ConstantFolded)
                    .pass(ARITHMETIC)
                    .message(format!("{} -> {value}", text.trim()));
            }
        }
        Ok(())
    }

    /// Collapses every whitespace terminal to one space and every statement separator to a
    /// single newline.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other passes.
    pub fn canonicalize_whitespace(&mut self) -> Result<()> {
        for forest in self.module.forests() {
            let tree = self.module.tree_mut();
            for ws in tree.find_all(forest, NodeKind::Ws) {
                if tree.value(ws) != Some(" ") {
                    tree.set_value(ws, " ");
                }
            }
            for separator in tree.find_all(forest, NodeKind::EndOfStatement) {
                if is_canonical_separator(tree, separator) {
                    continue;
                }
                let newline = tree.add_terminal(NodeKind::Newline, "\n");
                let line = tree.add_rule(NodeKind::EndOfLine, vec![newline]);
                tree.set_children(separator, vec![line]);
            }
        }
        Ok(())
    }

    /// Renames procedure arguments and locals per procedure, then every global that is
    /// still referenced, to short fresh names.
    ///
    /// # Errors
    ///
    /// [`Error::NamesExhausted`] when the name scheme runs out.
    pub fn rename_identifiers(&mut self) -> Result<()> {
        let order = self.module.identifier_order().to_vec();

        for name in &order {
            let Some(node) = self.module.procedure(name) else {
                continue;
            };
            let tree = self.module.tree();
            let arguments = tree.procedure_arguments(node);
            let locals: Vec<String> = tree
                .local_variables(node)
                .into_iter()
                .filter(|local| local != name && !arguments.contains(local) && !order.contains(local))
                .collect();

            for old in arguments.iter().chain(&locals) {
                let new = self.module.fresh_name()?;
                self.module.rename_local(node, old, &new);
                self.events
                    .record(EventKind::IdentifierRenamed)
                    .pass(IDENTIFIERS)
                    .procedure(name.as_str())
                    .message(format!("{old} -> {new}"));
            }
        }

        let graph = DependencyAnalyzer::new(&self.module).build_graph();
        for old in &order {
            if !self.module.is_global(old) || !graph.is_referenced(old) {
                continue;
            }
            let new = self.module.fresh_name()?;
            let count = self.module.rename_global(old, &new);
            debug!("renamed global {old} to {new} ({count} occurrences)");
            self.events
                .record(EventKind::IdentifierRenamed)
                .pass(IDENTIFIERS)
                .message(format!("{old} -> {new}"));
        }
        Ok(())
    }

    /// Runs the [`Cleaner`] over every procedure.
    ///
    /// Module-level variables are external to every procedure. A procedure the cleaner
    /// cannot handle is left as it was.
    ///
    /// # Errors
    ///
    /// Never fails; local failures are recorded as events.
    pub fn clean_procedures(&mut self) -> Result<()> {
        let external: Vec<String> = self.module.variables().names().map(str::to_string).collect();
        let procedures: Vec<(String, NodeId)> = self
            .module
            .procedures()
            .iter()
            .map(|(name, node)| (name.to_string(), node))
            .collect();

        for (name, node) in procedures {
            let outcome = Cleaner::new(self.module.tree_mut())
                .with_external(external.iter().cloned())
                .with_max_passes(self.config.max_iterations)
                .clean(node, &name);

            match outcome {
                Ok(report) => {
                    for statement in &report.removed {
                        self.events
                            .record(EventKind::StatementRemoved)
                            .pass(DEAD_CODE)
                            .procedure(name.as_str())
                            .message(statement.trim());
                    }
                    if report.changed() {
                        self.events
                            .record(EventKind::ProcedureCleaned)
                            .pass(DEAD_CODE)
                            .procedure(name.as_str())
                            .message(format!("{} statements in {} passes", report.removed.len(), report.passes));
                    }
                }
                Err(failure) => {
                    debug!("cannot clean {name}: {failure}");
                    self.events
                        .record(EventKind::CleanFailed)
                        .pass(DEAD_CODE)
                        .procedure(name.as_str())
                        .message(failure.to_string());
                }
            }
        }
        Ok(())
    }

    /// Translates procedures whose dependencies are all evaluable, registers them and
    /// replaces their call sites by the computed values, to a fixed point.
    ///
    /// Translated procedures nobody depends on anymore are removed afterwards. Procedures
    /// left with dependencies that never became evaluable are reported as unresolved.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] if an unused procedure cannot be detached from the body.
    pub fn resolve_procedures(&mut self) -> Result<()> {
        let mut graph = DependencyAnalyzer::new(&self.module).build_graph();
        let names: Vec<String> = graph.procedures().map(|(name, _)| name.to_string()).collect();
        let resolved_before = self.events.count_kind(EventKind::CallResolved);
        let mut translated: BTreeSet<String> = self.translated.iter().cloned().collect();
        let mut failed: BTreeSet<String> = BTreeSet::new();
        let mut newly = Vec::new();

        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut progress = false;

            for name in &names {
                if translated.contains(name) || failed.contains(name) {
                    continue;
                }
                let ready = graph.dependencies(name).is_some_and(|deps| {
                    deps.classified
                        .iter()
                        .all(|d| translated.contains(d) || failed.contains(d) || is_pure_builtin(d))
                });
                if !ready {
                    continue;
                }
                let Some(node) = self.module.procedure(name) else {
                    continue;
                };

                let lowered = Translator::new(self.module.tree())
                    .with_functions(translated.iter().cloned())
                    .procedure(node);
                let registered = match lowered {
                    Ok(translation) => self
                        .evaluator
                        .register(name, &translation.code)
                        .map(|()| translation)
                        .map_err(|e| format!("evaluator rejected translation: {e}")),
                    Err(e) => Err(e.to_string()),
                };

                match registered {
                    Ok(translation) => {
                        debug!("translated {name}:\n{}", translation.code);
                        progress = true;
                        translated.insert(name.clone());
                        newly.push(name.clone());
                        self.translated.push(name.clone());
                        self.events
                            .record(EventKind::ProcedureTranslated)
                            .pass(RESOLVE)
                            .procedure(name.as_str());
                        self.resolve_callers(name, &mut graph, &translated);
                    }
                    Err(reason) => {
                        failed.insert(name.clone());
                        self.events
                            .record(EventKind::TranslationFailed)
                            .pass(RESOLVE)
                            .procedure(name.as_str())
                            .message(reason);
                    }
                }
            }

            if !progress {
                break;
            }
            if iterations >= self.config.max_iterations {
                warn!("resolution stopped after {iterations} iterations");
                self.events
                    .record(EventKind::Warning)
                    .pass(RESOLVE)
                    .message(format!("iteration limit of {iterations} reached"));
                break;
            }
        }
        self.iterations += iterations;

        for name in &newly {
            self.resolve_callers(name, &mut graph, &translated);
        }
        // Folded calls may leave literal arithmetic behind.
        if self.config.passes.contains(Passes::ARITHMETIC)
            && self.events.count_kind(EventKind::CallResolved) > resolved_before
        {
            self.fold_arithmetic()?;
        }
        self.remove_unused(&newly, &mut graph, RESOLVE)?;

        self.unresolved.clear();
        for (name, deps) in graph.procedures() {
            if translated.contains(name) {
                continue;
            }
            let pending: BTreeSet<String> = deps
                .classified
                .iter()
                .filter(|d| !translated.contains(*d))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }
            let listed: Vec<&str> = pending.iter().map(String::as_str).collect();
            self.events
                .record(EventKind::UnresolvedDependencies)
                .pass(RESOLVE)
                .procedure(name)
                .message(listed.join(", "));
            self.unresolved.insert(name.to_string(), pending);
        }
        Ok(())
    }

    /// Splices the body of trivial zero-argument procedures into the statements that call
    /// them, then removes the procedures nobody calls anymore.
    ///
    /// Callees are processed before their callers. Procedures on a dependency cycle are
    /// left alone.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] if an inlined procedure cannot be detached from the body.
    pub fn inline_procedures(&mut self) -> Result<()> {
        let mut graph = DependencyAnalyzer::new(&self.module).build_graph();
        let mut pending: BTreeMap<String, BTreeSet<String>> = graph
            .procedures()
            .map(|(name, deps)| {
                let callees = deps
                    .classified
                    .iter()
                    .filter(|d| self.module.procedures().contains(d))
                    .cloned()
                    .collect();
                (name.to_string(), callees)
            })
            .collect();
        let mut todo: Vec<String> = graph.procedures().map(|(name, _)| name.to_string()).collect();
        let mut inlined: Vec<String> = Vec::new();

        let mut rounds = 0;
        while !todo.is_empty() {
            rounds += 1;
            if rounds > self.config.max_iterations {
                self.events
                    .record(EventKind::Warning)
                    .pass(INLINE)
                    .message(format!("iteration limit of {} reached", self.config.max_iterations));
                break;
            }

            let ready: Vec<String> = todo
                .iter()
                .filter(|name| pending.get(*name).map_or(true, BTreeSet::is_empty))
                .cloned()
                .collect();
            if ready.is_empty() {
                let cycle: Vec<&str> = todo.iter().map(String::as_str).collect();
                self.events
                    .record(EventKind::Info)
                    .pass(INLINE)
                    .message(format!("dependency cycle among {}", cycle.join(", ")));
                break;
            }

            for name in ready {
                for callee in self.inline_into(&name)? {
                    if !inlined.contains(&callee) {
                        inlined.push(callee);
                    }
                }
                todo.retain(|n| *n != name);
                if let Some(callers) = graph.callers(&name) {
                    for caller in callers {
                        if let Some(callees) = pending.get_mut(caller) {
                            callees.remove(&name);
                        }
                    }
                }
            }
        }

        if inlined.is_empty() {
            return Ok(());
        }

        let rebuilt = DependencyAnalyzer::new(&self.module).build_graph();
        let orphaned: Vec<String> = graph
            .referenced()
            .filter(|name| !rebuilt.is_referenced(name))
            .map(str::to_string)
            .collect();
        for name in orphaned {
            graph.clear_callers(&name);
        }
        self.remove_unused(&inlined, &mut graph, INLINE)
    }

    /// Replaces every simple callout in `target` by the statements of its callee. Returns
    /// the callees that were inlined.
    fn inline_into(&mut self, target: &str) -> Result<Vec<String>> {
        let Some(node) = self.module.procedure(target) else {
            return Ok(Vec::new());
        };

        let mut inlined = Vec::new();
        let statements = self.module.tree().find_all(node, NodeKind::BlockStmt);
        for statement in statements {
            let tree = self.module.tree();
            if !tree.is_within(statement, node) {
                continue;
            }
            let Some(callee) = simple_callout(tree, statement) else {
                continue;
            };
            if callee == target {
                continue;
            }
            let Some(callee_node) = self.module.procedure(&callee) else {
                continue;
            };

            if !tree.procedure_arguments(callee_node).is_empty() {
                self.reject_inline(target, &callee, "takes arguments");
                continue;
            }
            let blocks = tree.match_path(callee_node, &[NodeKind::Block.into()]);
            let [block] = blocks[..] else {
                self.reject_inline(target, &callee, "does not have exactly one block");
                continue;
            };

            let statements = tree.children(block);
            let end = statements
                .iter()
                .rposition(|s| tree.kind(*s) != NodeKind::EndOfStatement)
                .map_or(0, |last| last + 1);
            let statements = statements[..end].to_vec();

            let tree = self.module.tree_mut();
            let copies = statements.into_iter().map(|s| tree.deep_copy(s)).collect();
            if !tree.replace_with(statement, copies) {
                return Err(malformed_error!("call of '{}' in '{}' is detached", callee, target));
            }

            self.events
                .record(EventKind::ProcedureInlined)
                .pass(INLINE)
                .procedure(target)
                .message(callee.as_str());
            inlined.push(callee);
        }
        Ok(inlined)
    }

    fn reject_inline(&self, target: &str, callee: &str, reason: &str) {
        self.events
            .record(EventKind::InlineRejected)
            .pass(INLINE)
            .procedure(target)
            .message(format!("{callee} {reason}"));
    }

    /// Folds the calls of the freshly translated `callee` in every procedure depending on
    /// it. A caller stops depending on `callee` once none of its calls remain.
    fn resolve_callers(
        &mut self,
        callee: &str,
        graph: &mut DependencyGraph,
        translated: &BTreeSet<String>,
    ) {
        let callers: Vec<String> = graph
            .callers(callee)
            .map(|callers| callers.iter().cloned().collect())
            .unwrap_or_default();

        for caller in callers {
            if self.replace_calls(callee, &caller, translated) {
                graph.remove_caller(callee, &caller);
            }
        }
    }

    /// Replaces the calls of `callee` inside `caller` that sit in value position. Returns
    /// true if `caller` no longer mentions `callee`.
    fn replace_calls(&mut self, callee: &str, caller: &str, translated: &BTreeSet<String>) -> bool {
        let Some(node) = self.module.procedure(caller) else {
            return false;
        };

        let sites: Vec<NodeId> = {
            let tree = self.module.tree();
            tree.find_all_of(node, &CALL_SITES)
                .into_iter()
                .filter(|site| tree.identifier_name(*site).as_deref() == Some(callee))
                .collect()
        };

        for site in sites {
            let tree = self.module.tree();
            if !tree.is_within(site, node) {
                continue;
            }
            let Some(expression) = value_position(tree, site) else {
                self.unresolved_call(caller, callee, "call is not in value position");
                continue;
            };

            let code = match Translator::new(tree)
                .with_functions(translated.iter().cloned())
                .expression(expression)
            {
                Ok(code) => code,
                Err(e) => {
                    self.unresolved_call(caller, callee, &e.to_string());
                    continue;
                }
            };
            let value = match self.evaluator.evaluate(&code, &FxHashMap::default()) {
                Ok(value) => value,
                Err(e) => {
                    self.unresolved_call(caller, callee, &e.to_string());
                    continue;
                }
            };

            let text = tree.render_text(expression);
            let tree = self.module.tree_mut();
            let Some(literal) = literal_node(tree, &value) else {
                self.unresolved_call(caller, callee, &format!("{} has no literal form", value.type_name()));
                continue;
            };
            tree.set_children(expression, vec![literal]);
            self.events
                .record(EventKind::CallResolved)
                .pass(RESOLVE)
                .procedure(caller)
                .message(format!("{} -> {value}", text.trim()));
        }

        !self.module.tree().collect_identifiers(node).contains(callee)
    }

    fn unresolved_call(&self, caller: &str, callee: &str, reason: &str) {
        self.events
            .record(EventKind::CallUnresolved)
            .pass(RESOLVE)
            .procedure(caller)
            .message(format!("{callee}: {reason}"));
    }

    /// Removes every candidate whose callers all went away, repeating while a removal
    /// orphans another candidate. Candidates nobody ever called are kept.
    fn remove_unused(&mut self, candidates: &[String], graph: &mut DependencyGraph, pass: &'static str) -> Result<()> {
        for _ in 0..self.config.max_iterations {
            let mut changed = false;
            for name in candidates {
                if !graph.callers(name).is_some_and(BTreeSet::is_empty) {
                    continue;
                }
                if !self.module.remove_procedure(name)? {
                    continue;
                }
                graph.remove_procedure(name);
                changed = true;
                self.removed.push(name.clone());
                self.events
                    .record(EventKind::ProcedureRemoved)
                    .pass(pass)
                    .procedure(name.as_str());
            }
            if !changed {
                return Ok(());
            }
        }
        warn!("removal of unused procedures did not converge");
        Ok(())
    }
}

fn is_foldable(tree: &Tree, node: NodeId) -> bool {
    let kinds = tree.kinds_under(node);
    kinds.iter().all(|kind| ARITHMETIC_KINDS.contains(kind))
        && [NodeKind::Plus, NodeKind::Minus, NodeKind::LParen]
            .iter()
            .any(|kind| kinds.contains(kind))
}

fn is_canonical_separator(tree: &Tree, separator: NodeId) -> bool {
    let [line] = tree.children(separator) else {
        return false;
    };
    if tree.kind(*line) != NodeKind::EndOfLine {
        return false;
    }
    let [newline] = tree.children(*line) else {
        return false;
    };
    tree.kind(*newline) == NodeKind::Newline && tree.value(*newline) == Some("\n")
}

/// The name a statement calls if it is nothing but a bare call without arguments.
fn simple_callout(tree: &Tree, statement: NodeId) -> Option<String> {
    let mut node = statement;
    while tree.kind(node) != NodeKind::Identifier {
        let [only] = tree.children(node) else {
            return None;
        };
        node = *only;
    }
    tree.value(node).map(str::to_string)
}

/// The `valueStmt` that consists of nothing but the call at `site`.
fn value_position(tree: &Tree, site: NodeId) -> Option<NodeId> {
    let holder = tree.parent(site)?;
    let expression = tree.parent(holder)?;
    (tree.kind(holder) == NodeKind::ImplicitCallStmtInStmt
        && tree.kind(expression) == NodeKind::ValueStmt
        && tree.children(expression) == [holder])
        .then_some(expression)
}

/// Builds the literal subtree of `value`, ready to be the only child of a `valueStmt`.
///
/// Lists become an `Array(...)` call so the result can be lowered again. Values without
/// a literal form yield `None`.
fn literal_node(tree: &mut Tree, value: &Value) -> Option<NodeId> {
    value.to_literal()?;
    let node = match value {
        Value::Int(n) => {
            let text = tree.add_terminal(NodeKind::ShortLiteral, n.to_string());
            tree.add_rule(NodeKind::Literal, vec![text])
        }
        Value::Str(s) => {
            let text = tree.add_terminal(NodeKind::StringLiteral, quote(s));
            tree.add_rule(NodeKind::Literal, vec![text])
        }
        Value::Bool(b) => {
            let token = if *b {
                tree.add_terminal(NodeKind::True, "True")
            } else {
                tree.add_terminal(NodeKind::False, "False")
            };
            tree.add_rule(NodeKind::Literal, vec![token])
        }
        Value::List(items) => {
            let mut arguments = Vec::new();
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    arguments.push(tree.add_terminal(NodeKind::Comma, ","));
                    arguments.push(tree.add_terminal(NodeKind::Ws, " "));
                }
                let inner = literal_node(tree, item)?;
                let element = tree.add_rule(NodeKind::ValueStmt, vec![inner]);
                arguments.push(tree.add_rule(NodeKind::ArgCall, vec![element]));
            }

            let name = tree.add_terminal(NodeKind::Identifier, "Array");
            let name = tree.add_rule(NodeKind::AmbiguousIdentifier, vec![name]);
            let mut children = vec![name, tree.add_terminal(NodeKind::LParen, "(")];
            if !arguments.is_empty() {
                children.push(tree.add_rule(NodeKind::ArgsCall, arguments));
            }
            children.push(tree.add_terminal(NodeKind::RParen, ")"));
            let call = tree.add_rule(NodeKind::IcsSProcedureOrArrayCall, children);
            tree.add_rule(NodeKind::ImplicitCallStmtInStmt, vec![call])
        }
        Value::Map(_) | Value::Empty => return None,
    };
    Some(node)
}
