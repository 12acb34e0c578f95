//! The JSON input contract.
//!
//! The external parser serializes every node as `{"name": .., "value": .., "children": [..]}`
//! where `name` is the rule name or the token display name. Terminals carry `value`, rules
//! carry `children` (omitted when the rule matched nothing).

use serde::{Deserialize, Serialize};

use crate::{
    tree::{NodeId, Payload, Tree},
    Error, Result,
};

/// Deepest nesting accepted when importing a tree.
pub const MAX_TREE_DEPTH: usize = 4096;

/// A node as serialized by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// Rule name or token display name.
    pub name: String,
    /// Token text, present on terminals only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Children of a rule, in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawNode>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Streams {
    Many(Vec<RawNode>),
    One(RawNode),
}

impl RawNode {
    /// A terminal record.
    pub fn terminal(name: impl Into<String>, value: impl Into<String>) -> Self {
        RawNode {
            name: name.into(),
            value: Some(value.into()),
            children: None,
        }
    }

    /// A rule record.
    pub fn rule(name: impl Into<String>, children: Vec<RawNode>) -> Self {
        RawNode {
            name: name.into(),
            value: None,
            children: Some(children),
        }
    }

    /// Decodes the macro streams of one document.
    ///
    /// Accepts either a single tree or an array of trees, one per stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a node tree.
    pub fn streams_from_json(json: &str) -> Result<Vec<RawNode>> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let streams = Streams::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(match streams {
            Streams::Many(nodes) => nodes,
            Streams::One(node) => vec![node],
        })
    }
}

impl Tree {
    /// Imports a parser record and everything below it. The imported root is detached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for a record carrying both a value and children and
    /// [`Error::RecursionLimit`] for trees nested deeper than [`MAX_TREE_DEPTH`].
    pub fn import(&mut self, raw: &RawNode) -> Result<NodeId> {
        self.import_at(raw, 0)
    }

    fn import_at(&mut self, raw: &RawNode, depth: usize) -> Result<NodeId> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::RecursionLimit(MAX_TREE_DEPTH));
        }

        let children = raw.children.as_deref().unwrap_or_default();
        match &raw.value {
            Some(_) if !children.is_empty() => Err(malformed_error!(
                "node '{}' carries both a value and {} children",
                raw.name,
                children.len()
            )),
            Some(value) => Ok(self.add_named(&raw.name, Payload::Terminal(value.clone()))),
            None => {
                let ids = children
                    .iter()
                    .map(|child| self.import_at(child, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.add_named(&raw.name, Payload::Rule(ids)))
            }
        }
    }

    /// Serializes the subtree at `id` back into parser records.
    #[must_use]
    pub fn to_raw(&self, id: NodeId) -> RawNode {
        let name = self.kind_name(id).to_string();
        match self.value(id) {
            Some(value) => RawNode::terminal(name, value),
            None if self.children(id).is_empty() => RawNode {
                name,
                value: None,
                children: None,
            },
            None => RawNode::rule(
                name,
                self.children(id).iter().map(|c| self.to_raw(*c)).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    const SAMPLE: &str = r#"{"name": "valueStmt", "children": [
        {"name": "literal", "children": [{"name": "SHORTLITERAL", "value": "1"}]},
        {"name": "WS", "value": " "},
        {"name": "'+'", "value": "+"},
        {"name": "WS", "value": " "},
        {"name": "mysteryRule"}
    ]}"#;

    #[test]
    fn test_single_and_many_streams() -> crate::Result<()> {
        assert_eq!(RawNode::streams_from_json(SAMPLE)?.len(), 1);
        let many = format!("[{SAMPLE}, {SAMPLE}]");
        assert_eq!(RawNode::streams_from_json(&many)?.len(), 2);
        assert!(matches!(RawNode::streams_from_json("[1, 2]"), Err(Error::Json(_))));
        Ok(())
    }

    #[test]
    fn test_import_and_round_trip() -> crate::Result<()> {
        let raw = RawNode::streams_from_json(SAMPLE)?.remove(0);
        let mut tree = Tree::new();
        let root = tree.import(&raw)?;

        assert_eq!(tree.kind(root), NodeKind::ValueStmt);
        assert_eq!(tree.render_text(root), "1 + ");
        let mystery = tree.children(root)[4];
        assert_eq!(tree.kind(mystery), NodeKind::Unknown);
        assert_eq!(tree.kind_name(mystery), "mysteryRule");
        for child in tree.children(root) {
            assert_eq!(tree.parent(*child), Some(root));
        }

        assert_eq!(tree.to_raw(root), raw);
        Ok(())
    }

    #[test]
    fn test_value_and_children_is_malformed() {
        let raw = RawNode {
            name: "WS".to_string(),
            value: Some(" ".to_string()),
            children: Some(vec![RawNode::terminal("EOF", "")]),
        };
        let mut tree = Tree::new();
        assert!(matches!(tree.import(&raw), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let mut raw = RawNode::terminal("IDENTIFIER", "x");
        for _ in 0..=MAX_TREE_DEPTH {
            raw = RawNode::rule("valueStmt", vec![raw]);
        }
        let mut tree = Tree::new();
        assert!(matches!(tree.import(&raw), Err(Error::RecursionLimit(MAX_TREE_DEPTH))));
    }
}
