//! Procedure dependency graph.
//!
//! For every registered procedure the analyzer computes the identifiers it uses but does
//! not bind itself, and narrows them down to the ones naming a known global variable or
//! procedure. Inverting the narrowed sets yields the caller map the orchestrator uses to
//! find call sites and to decide when a procedure has become unused.
//!
//! The graph is a snapshot. It is rebuilt from scratch after every structural change to the
//! module instead of being patched incrementally.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::{module::Module, tree::NodeId};

/// Dependencies of one procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureDependencies {
    /// Every identifier used but not bound by the procedure.
    ///
    /// Names outside [`classified`](Self::classified) are "unexplained": built-ins, object
    /// members or undeclared variables.
    pub free: BTreeSet<String>,
    /// The free identifiers naming a known global variable or procedure.
    pub classified: BTreeSet<String>,
}

impl ProcedureDependencies {
    /// Free identifiers that name neither a global variable nor a procedure.
    pub fn unexplained(&self) -> impl Iterator<Item = &str> {
        self.free
            .iter()
            .filter(|name| !self.classified.contains(*name))
            .map(String::as_str)
    }
}

/// Forward and reverse dependencies of every procedure in a module.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    procedures: FxHashMap<String, ProcedureDependencies>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Number of procedures in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the graph holds no procedure.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Procedures in declaration order together with their dependencies.
    pub fn procedures(&self) -> impl Iterator<Item = (&str, &ProcedureDependencies)> {
        self.order
            .iter()
            .filter_map(|name| self.procedures.get(name).map(|deps| (name.as_str(), deps)))
    }

    /// The dependencies of procedure `name`.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Option<&ProcedureDependencies> {
        self.procedures.get(name)
    }

    /// The procedures that depend on `name`.
    ///
    /// `None` means no procedure ever depended on `name`; an empty set means every
    /// dependent was resolved or removed since the graph was built.
    #[must_use]
    pub fn callers(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.reverse.get(name)
    }

    /// True if at least one procedure depends on `name`.
    #[must_use]
    pub fn is_referenced(&self, name: &str) -> bool {
        self.reverse.contains_key(name)
    }

    /// Every name with a reverse entry.
    pub fn referenced(&self) -> impl Iterator<Item = &str> {
        self.reverse.keys().map(String::as_str)
    }

    /// Marks `caller` as no longer depending on `dependency`. Returns whether the edge
    /// existed.
    pub fn remove_caller(&mut self, dependency: &str, caller: &str) -> bool {
        self.reverse
            .get_mut(dependency)
            .is_some_and(|callers| callers.remove(caller))
    }

    /// Forgets every caller of `name`, keeping the reverse entry itself.
    pub fn clear_callers(&mut self, name: &str) {
        if let Some(callers) = self.reverse.get_mut(name) {
            callers.clear();
        }
    }

    /// Drops procedure `name` from the graph.
    ///
    /// Its own reverse entry is removed and it is discarded from the caller set of every
    /// dependency. Returns the dependencies that lost a caller.
    pub fn remove_procedure(&mut self, name: &str) -> Vec<String> {
        self.reverse.remove(name);
        self.order.retain(|n| n != name);
        let Some(deps) = self.procedures.remove(name) else {
            return Vec::new();
        };

        let mut touched = Vec::new();
        for dependency in &deps.classified {
            if self.remove_caller(dependency, name) {
                touched.push(dependency.clone());
            }
        }
        touched
    }
}

/// Computes [`DependencyGraph`]s over a [`Module`].
///
/// # Examples
///
/// ```rust,no_run
/// use macroscope::{analysis::DependencyAnalyzer, module::Module, tree::RawNode};
///
/// # fn example(streams: Vec<RawNode>) -> macroscope::Result<()> {
/// let module = Module::from_streams(&streams)?;
/// let graph = DependencyAnalyzer::new(&module).build_graph();
/// for (name, deps) in graph.procedures() {
///     println!("{name} -> {:?}", deps.classified);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DependencyAnalyzer<'a> {
    module: &'a Module,
}

impl<'a> DependencyAnalyzer<'a> {
    /// Creates an analyzer over `module`.
    #[must_use]
    pub fn new(module: &'a Module) -> Self {
        DependencyAnalyzer { module }
    }

    /// Dependencies of the procedure declared at `node` under the name `name`.
    ///
    /// Arguments and explicitly declared locals are bound. Implicit assignment targets are
    /// bound too unless they name a known global, so writing a module-level variable does
    /// not hide it.
    #[must_use]
    pub fn procedure_dependencies(&self, name: &str, node: NodeId) -> ProcedureDependencies {
        let tree = self.module.tree();
        let mut free = tree.collect_identifiers(node);
        free.remove(name);

        for argument in tree.procedure_arguments(node) {
            free.remove(&argument);
        }
        for local in tree.declared_locals(node) {
            free.remove(&local);
        }
        for target in tree.assignment_targets(node) {
            if !self.module.is_global(&target) {
                free.remove(&target);
            }
        }

        let classified = free
            .iter()
            .filter(|id| self.module.is_global(id))
            .cloned()
            .collect();

        ProcedureDependencies {
            free: free.into_iter().collect(),
            classified,
        }
    }

    /// Builds the graph over every registered procedure.
    #[must_use]
    pub fn build_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::default();

        for (name, node) in self.module.procedures().iter() {
            let deps = self.procedure_dependencies(name, node);
            for dependency in &deps.classified {
                graph
                    .reverse
                    .entry(dependency.clone())
                    .or_default()
                    .insert(name.to_string());
            }
            graph.order.push(name.to_string());
            graph.procedures.insert(name.to_string(), deps);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::builder::TreeBuilder, tree::NodeKind};

    /// ```text
    /// Dim shared
    /// Function Leaf(a): Dim tmp: tmp = a: Leaf = tmp + shared: End Function
    /// Sub Caller(): local = Leaf(1): shared = local: MsgBox local: End Sub
    /// Sub Entry(): Caller: End Sub
    /// ```
    fn sample() -> Module {
        let mut b = TreeBuilder::new();
        let shared = b.dim_global("shared");

        let dim = b.dim("tmp");
        let a = b.var("a");
        let copy = b.let_stmt("tmp", a);
        let tmp = b.var("tmp");
        let global = b.var("shared");
        let sum = b.binary(tmp, NodeKind::Plus, global);
        let ret = b.let_stmt("Leaf", sum);
        let leaf = b.function("Leaf", &["a"], vec![dim, copy, ret]);

        let one = b.number(1);
        let call = b.call("Leaf", vec![one]);
        let assign = b.let_stmt("local", call);
        let local = b.var("local");
        let write = b.let_stmt("shared", local);
        let local = b.var("local");
        let msg = b.call_stmt("MsgBox", vec![local]);
        let caller = b.sub("Caller", &[], vec![assign, write, msg]);

        let invoke = b.call_stmt("Caller", vec![]);
        let entry = b.sub("Entry", &[], vec![invoke]);

        b.module(vec![], vec![shared], vec![leaf, caller, entry])
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_procedure_dependencies() {
        let module = sample();
        let analyzer = DependencyAnalyzer::new(&module);
        let graph = analyzer.build_graph();

        let leaf = graph.dependencies("Leaf").cloned().unwrap_or_default();
        assert_eq!(leaf.free, set(&["shared"]));
        assert_eq!(leaf.classified, set(&["shared"]));

        let caller = graph.dependencies("Caller").cloned().unwrap_or_default();
        assert_eq!(caller.free, set(&["Leaf", "MsgBox", "shared"]));
        assert_eq!(caller.classified, set(&["Leaf", "shared"]));
        assert_eq!(caller.unexplained().collect::<Vec<_>>(), vec!["MsgBox"]);

        let entry = graph.dependencies("Entry").cloned().unwrap_or_default();
        assert_eq!(entry.classified, set(&["Caller"]));
    }

    #[test]
    fn test_reverse_map() {
        let module = sample();
        let graph = DependencyAnalyzer::new(&module).build_graph();

        assert_eq!(graph.callers("Leaf"), Some(&set(&["Caller"])));
        assert_eq!(graph.callers("shared"), Some(&set(&["Caller", "Leaf"])));
        assert_eq!(graph.callers("Caller"), Some(&set(&["Entry"])));
        assert_eq!(graph.callers("Entry"), None);
        assert!(!graph.is_referenced("Entry"));
        assert_eq!(
            graph.procedures().map(|(n, _)| n).collect::<Vec<_>>(),
            vec!["Leaf", "Caller", "Entry"]
        );
    }

    #[test]
    fn test_remove_procedure_releases_callees() {
        let module = sample();
        let mut graph = DependencyAnalyzer::new(&module).build_graph();

        let touched = graph.remove_procedure("Caller");
        assert_eq!(touched, vec!["Leaf".to_string(), "shared".to_string()]);
        assert_eq!(graph.callers("Leaf"), Some(&BTreeSet::new()));
        assert!(graph.callers("Caller").is_none());
        assert!(graph.dependencies("Caller").is_none());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_recursion_is_not_a_dependency() {
        let mut b = TreeBuilder::new();
        let n = b.var("n");
        let call = b.call("Fact", vec![n]);
        let ret = b.let_stmt("Fact", call);
        let fact = b.function("Fact", &["n"], vec![ret]);
        let module = b.module(vec![], vec![], vec![fact]);

        let graph = DependencyAnalyzer::new(&module).build_graph();
        assert!(graph.dependencies("Fact").is_some_and(|d| d.free.is_empty()));
        assert!(!graph.is_referenced("Fact"));
    }
}
