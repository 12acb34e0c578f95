//! The analyzed unit.
//!
//! A [`Module`] gathers all macro streams of one document into three forests that share a
//! single [`Tree`] arena:
//!
//! - `attributes` - `Attribute VB_Name = ...` marker statements
//! - `declarations` - module-level variable and constant declarations
//! - `body` - `Sub` and `Function` declarations, each wrapped in a `moduleBodyElement`
//!
//! Alongside the forests the module keeps two name registries, one for procedures and one
//! for global variables, and the pool of identifiers known to the module that the fresh-name
//! allocator must avoid. Renaming and procedure removal go through the module so that the
//! registries and the pool follow every edit.

use log::debug;

use crate::{
    tree::{FreshNames, NodeId, NodeKind, RawNode, Step, Tree},
    Result,
};

/// Ordered name → declaration map.
///
/// Insertion order is the declaration order in the module, which is the order passes
/// visit procedures in.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<(String, NodeId)>,
}

impl Registry {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The declaration node registered for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// True if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Registers `name`. A later declaration of the same name replaces the node but keeps
    /// the original position.
    pub fn insert(&mut self, name: impl Into<String>, node: NodeId) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((name, node)),
        }
    }

    /// Removes `name`, returning its node.
    pub fn remove(&mut self, name: &str) -> Option<NodeId> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Moves the entry for `old` to `new`, keeping its position.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == old) {
            Some(entry) => {
                entry.0 = new.to_string();
                true
            }
            None => false,
        }
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(n, id)| (n.as_str(), *id))
    }
}

const SECTIONS: [NodeKind; 3] = [
    NodeKind::ModuleAttributes,
    NodeKind::ModuleDeclarations,
    NodeKind::ModuleBody,
];

/// One document's macro code.
#[derive(Debug, Clone)]
pub struct Module {
    tree: Tree,
    attributes: NodeId,
    declarations: NodeId,
    body: NodeId,
    procedures: Registry,
    variables: Registry,
    identifier_order: Vec<String>,
    names: Option<FreshNames>,
}

impl Module {
    /// Builds a module from the parse trees of all macro streams of a document.
    ///
    /// Each stream root is either a `startRule` wrapping a `module`, or a `module`. The
    /// attribute, declaration and body sections of all streams are concatenated in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) for a root of any other kind
    /// or for records violating the node invariant.
    pub fn from_streams(streams: &[RawNode]) -> Result<Module> {
        let mut tree = Tree::new();
        let mut sections: [Vec<NodeId>; 3] = Default::default();

        for (index, raw) in streams.iter().enumerate() {
            let root = tree.import(raw)?;
            let module = match tree.kind(root) {
                NodeKind::Module => Some(root),
                NodeKind::StartRule => tree.child_of_kind(root, NodeKind::Module),
                _ => {
                    return Err(malformed_error!(
                        "stream {} has root '{}', expected 'startRule' or 'module'",
                        index,
                        tree.kind_name(root)
                    ))
                }
            };
            let Some(module) = module else {
                continue;
            };

            for (section, kind) in sections.iter_mut().zip(SECTIONS) {
                section.extend(tree.match_path(module, &[Step::Kind(kind), Step::Any]));
            }
        }

        let [attributes, declarations, body] = sections;
        Ok(Module::from_parts(tree, attributes, declarations, body))
    }

    /// Builds a module from nodes already living in `tree`.
    ///
    /// The three lists become the children of fresh forest roots.
    #[must_use]
    pub fn from_parts(
        mut tree: Tree,
        attributes: Vec<NodeId>,
        declarations: Vec<NodeId>,
        body: Vec<NodeId>,
    ) -> Module {
        let attributes = tree.add_rule(NodeKind::ModuleAttributes, attributes);
        let declarations = tree.add_rule(NodeKind::ModuleDeclarations, declarations);
        let body = tree.add_rule(NodeKind::ModuleBody, body);

        let mut module = Module {
            tree,
            attributes,
            declarations,
            body,
            procedures: Registry::default(),
            variables: Registry::default(),
            identifier_order: Vec::new(),
            names: None,
        };
        module.populate();
        module
    }

    fn populate(&mut self) {
        let declarations = self
            .tree
            .find_all_of(self.declarations, &[NodeKind::VariableSubStmt, NodeKind::ConstSubStmt]);
        for node in declarations {
            if let Some(name) = self.tree.identifier_name(node) {
                self.variables.insert(name.clone(), node);
                self.identifier_order.push(name);
            }
        }

        let procedures = self
            .tree
            .find_all_of(self.body, &[NodeKind::SubStmt, NodeKind::FunctionStmt]);
        for node in procedures {
            if let Some(name) = self.tree.identifier_name(node) {
                self.procedures.insert(name.clone(), node);
                self.identifier_order.push(name);
            }
        }
    }

    /// The shared arena.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the shared arena.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Root of the attribute forest.
    #[must_use]
    pub fn attributes(&self) -> NodeId {
        self.attributes
    }

    /// Root of the declaration forest.
    #[must_use]
    pub fn declarations(&self) -> NodeId {
        self.declarations
    }

    /// Root of the body forest.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The three forest roots in rendering order.
    #[must_use]
    pub fn forests(&self) -> [NodeId; 3] {
        [self.attributes, self.declarations, self.body]
    }

    /// Registered procedures.
    #[must_use]
    pub fn procedures(&self) -> &Registry {
        &self.procedures
    }

    /// Registered global variables and constants.
    #[must_use]
    pub fn variables(&self) -> &Registry {
        &self.variables
    }

    /// Global names in the order they were registered: variables first, then procedures.
    ///
    /// The list reflects the names at construction time and is not updated by renames.
    #[must_use]
    pub fn identifier_order(&self) -> &[String] {
        &self.identifier_order
    }

    /// The declaration node of procedure `name`.
    #[must_use]
    pub fn procedure(&self, name: &str) -> Option<NodeId> {
        self.procedures.get(name)
    }

    /// True if `name` is a registered procedure or global variable.
    #[must_use]
    pub fn is_global(&self, name: &str) -> bool {
        self.procedures.contains(name) || self.variables.contains(name)
    }

    /// Reconstructs the module source.
    #[must_use]
    pub fn render(&self) -> String {
        self.forests()
            .iter()
            .map(|forest| self.tree.render_text(*forest))
            .collect()
    }

    /// True if any identifier in the module spells `name`.
    #[must_use]
    pub fn mentions(&self, name: &str) -> bool {
        self.forests().iter().any(|forest| {
            self.tree
                .find_all(*forest, NodeKind::Identifier)
                .into_iter()
                .any(|ident| self.tree.value(ident) == Some(name))
        })
    }

    /// Allocates a name not used anywhere in the module.
    ///
    /// The known-identifier pool is seeded from the declaration and body forests on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamesExhausted`](crate::Error::NamesExhausted) when the name scheme
    /// is used up.
    pub fn fresh_name(&mut self) -> Result<String> {
        let (tree, declarations, body) = (&self.tree, self.declarations, self.body);
        self.names
            .get_or_insert_with(|| {
                let mut known = tree.collect_identifiers(declarations);
                known.extend(tree.collect_identifiers(body));
                FreshNames::new(known)
            })
            .next_name()
    }

    fn forget_if_unused(&mut self, name: &str) {
        if !self.mentions(name) {
            if let Some(names) = &mut self.names {
                names.forget(name);
            }
        }
    }

    fn remember(&mut self, name: &str) {
        if let Some(names) = &mut self.names {
            names.insert(name);
        }
    }

    /// Renames every occurrence of `old` below `scope`. Returns the number of identifiers
    /// rewritten.
    pub fn rename_local(&mut self, scope: NodeId, old: &str, new: &str) -> usize {
        let mut renamed = 0;
        for ident in self.tree.find_all(scope, NodeKind::Identifier) {
            if self.tree.value(ident) == Some(old) {
                self.tree.set_value(ident, new);
                renamed += 1;
            }
        }
        self.remember(new);
        self.forget_if_unused(old);
        renamed
    }

    /// Renames the global `old` to `new` across all three forests.
    ///
    /// Composite identifiers of the form `old_suffix` become `new_suffix`; the registries
    /// follow both the plain and the composite renames. Returns the number of identifiers
    /// rewritten.
    pub fn rename_global(&mut self, old: &str, new: &str) -> usize {
        let prefix = format!("{old}_");
        let mut composites = Vec::new();
        let mut renamed = 0;

        for forest in self.forests() {
            for ident in self.tree.find_all(forest, NodeKind::Identifier) {
                let Some(value) = self.tree.value(ident) else {
                    continue;
                };
                if value == old {
                    self.tree.set_value(ident, new);
                    renamed += 1;
                } else if let Some(suffix) = value.strip_prefix(&prefix) {
                    let composite = format!("{new}_{suffix}");
                    composites.push((value.to_string(), composite.clone()));
                    self.tree.set_value(ident, composite);
                    renamed += 1;
                }
            }
        }

        self.procedures.rename(old, new);
        self.variables.rename(old, new);
        self.remember(new);
        self.forget_if_unused(old);

        for (before, after) in composites {
            debug!("renamed composite identifier {before} to {after}");
            self.procedures.rename(&before, &after);
            self.variables.rename(&before, &after);
            self.remember(&after);
            self.forget_if_unused(&before);
        }
        renamed
    }

    /// Deletes procedure `name` from the body.
    ///
    /// The procedure's `moduleBodyElement` wrapper is removed together with a directly
    /// following `endOfLine` separator. Returns false if `name` is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) if the declaration is not the
    /// only child of a `moduleBodyElement` inside the body.
    pub fn remove_procedure(&mut self, name: &str) -> Result<bool> {
        let Some(node) = self.procedures.get(name) else {
            return Ok(false);
        };

        let element = self
            .tree
            .parent(node)
            .filter(|p| self.tree.kind(*p) == NodeKind::ModuleBodyElement)
            .ok_or_else(|| malformed_error!("procedure '{}' is not wrapped in a moduleBodyElement", name))?;
        if self.tree.children(element).len() != 1 {
            return Err(malformed_error!(
                "moduleBodyElement of '{}' has {} children",
                name,
                self.tree.children(element).len()
            ));
        }
        let container = self
            .tree
            .parent(element)
            .ok_or_else(|| malformed_error!("moduleBodyElement of '{}' is detached", name))?;

        let index = self.tree.detach(element).unwrap_or_default();
        if let Some(next) = self.tree.children(container).get(index).copied() {
            if self.tree.kind(next) == NodeKind::EndOfLine {
                self.tree.detach(next);
            }
        }

        self.procedures.remove(name);
        debug!("removed procedure {name}");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::builder::TreeBuilder, Error};

    fn two_procedures() -> Module {
        let mut b = TreeBuilder::new();
        let global = b.dim_global("counter");
        let one = b.number(1);
        let set = b.let_stmt("counter", one);
        let helper = b.sub("Helper", &[], vec![set]);
        let call = b.call_stmt("Helper", vec![]);
        let main = b.sub("Main", &[], vec![call]);
        b.module(vec![], vec![global], vec![helper, main])
    }

    #[test]
    fn test_registries() {
        let module = two_procedures();
        assert_eq!(module.procedures().names().collect::<Vec<_>>(), vec!["Helper", "Main"]);
        assert_eq!(module.variables().names().collect::<Vec<_>>(), vec!["counter"]);
        assert_eq!(module.identifier_order(), &["counter", "Helper", "Main"]);
        assert!(module.is_global("Main"));
        assert!(!module.is_global("Other"));
    }

    #[test]
    fn test_fresh_name_skips_identifiers_in_use() -> crate::Result<()> {
        let mut b = TreeBuilder::new();
        let global = b.dim_global("_a_");
        let one = b.number(1);
        let set = b.let_stmt("_b_", one);
        let main = b.sub("Main", &[], vec![set]);
        let mut module = b.module(vec![], vec![global], vec![main]);

        assert_eq!(module.fresh_name()?, "_c_");
        assert_eq!(module.fresh_name()?, "_d_");
        Ok(())
    }

    #[test]
    fn test_render() {
        let module = two_procedures();
        assert_eq!(
            module.render(),
            "Dim counter\nSub Helper()\ncounter = 1\nEnd Sub\nSub Main()\nHelper\nEnd Sub\n"
        );
    }

    #[test]
    fn test_remove_procedure() -> crate::Result<()> {
        let mut module = two_procedures();
        assert!(module.remove_procedure("Helper")?);
        assert!(!module.remove_procedure("Helper")?);
        assert!(module.procedure("Helper").is_none());
        assert_eq!(module.render(), "Dim counter\nSub Main()\nHelper\nEnd Sub\n");
        Ok(())
    }

    #[test]
    fn test_remove_unwrapped_procedure_is_malformed() {
        let mut b = TreeBuilder::new();
        let proc = b.sub("Loose", &[], vec![]);
        let tree = b.finish();
        let mut module = Module::from_parts(tree, vec![], vec![], vec![proc]);
        assert!(matches!(
            module.remove_procedure("Loose"),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_rename_global_with_composites() {
        let mut b = TreeBuilder::new();
        let global = b.dim_global("Doc");
        let one = b.number(1);
        let set = b.let_stmt("Doc", one);
        let handler = b.sub("Doc_Open", &[], vec![set]);
        let mut module = b.module(vec![], vec![global], vec![handler]);

        let renamed = module.rename_global("Doc", "_a_");
        assert_eq!(renamed, 3);
        assert!(module.variables().contains("_a_"));
        assert!(module.procedures().contains("_a__Open"));
        assert!(!module.mentions("Doc"));
        assert!(module.render().contains("Sub _a__Open()"));
    }

    #[test]
    fn test_rename_local_is_scoped() -> crate::Result<()> {
        let mut b = TreeBuilder::new();
        let one = b.number(1);
        let first = b.let_stmt("x", one);
        let two = b.number(2);
        let second = b.let_stmt("x", two);
        let a = b.sub("A", &[], vec![first]);
        let c = b.sub("C", &[], vec![second]);
        let mut module = b.module(vec![], vec![], vec![a, c]);

        let fresh = module.fresh_name()?;
        assert_eq!(fresh, "_a_");
        let scope = module.procedure("A").ok_or(Error::Error("missing".into()))?;
        assert_eq!(module.rename_local(scope, "x", &fresh), 1);
        assert!(module.render().contains("_a_ = 1"));
        assert!(module.render().contains("x = 2"));
        assert!(module.mentions("x"));
        Ok(())
    }

    #[test]
    fn test_from_streams() -> crate::Result<()> {
        let stream = RawNode::rule(
            "startRule",
            vec![
                RawNode::rule(
                    "module",
                    vec![
                        RawNode::rule(
                            "moduleAttributes",
                            vec![RawNode::rule(
                                "attributeStmt",
                                vec![RawNode::terminal("ATTRIBUTE", "Attribute")],
                            )],
                        ),
                        RawNode::rule(
                            "moduleBody",
                            vec![RawNode::terminal("WS", " ")],
                        ),
                    ],
                ),
                RawNode::terminal("EOF", "<EOF>"),
            ],
        );
        let module = Module::from_streams(&[stream.clone(), stream])?;
        assert_eq!(module.render(), "AttributeAttribute  ");
        assert_eq!(module.tree().children(module.attributes()).len(), 2);

        let bad = RawNode::terminal("WS", " ");
        assert!(matches!(Module::from_streams(&[bad]), Err(Error::Malformed { .. })));
        Ok(())
    }
}
