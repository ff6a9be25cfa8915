//! The compiled redirect index.
//!
//! Exact rules live in a map keyed by normalized path. Pattern rules live in
//! an arena of nodes; each node owns an ordered mapping from child pattern
//! text to child handle, and node 0 is a root pattern that matches any path.
//! Nodes never point back at their parent, so the whole index is plain data
//! that can be serialized as-is.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Pattern of the implicit root node.
pub const ROOT_PATTERN: &str = "^.*$";

// =============================================================================
// Exact Index
// =============================================================================

/// One exact redirect for a path, distinguished by its query terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactEntry {
    /// `key` / `key=value` terms in source order; compared as a set
    pub query: Vec<String>,
    pub code: u16,
    pub to: String,
}

// =============================================================================
// Pattern Forest
// =============================================================================

/// Handle of a node inside a [`PatternForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A pattern rule attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRedirect {
    pub code: u16,
    pub from: String,
    pub to: String,
}

/// A gate in the pattern hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternNode {
    /// Anchored pattern that must match before anything below is considered
    pub regex: String,
    /// Rules attached at this level, in declaration order
    pub redirects: Vec<PatternRedirect>,
    /// Child pattern text to child handle, in insertion order
    pub children: Vec<(String, NodeId)>,
}

impl PatternNode {
    fn new(regex: &str) -> Self {
        Self {
            regex: regex.to_string(),
            redirects: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up a direct child by its pattern text.
    pub fn child(&self, regex: &str) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(key, _)| key == regex)
            .map(|(_, id)| *id)
    }
}

/// Arena of pattern nodes rooted at [`NodeId::ROOT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternForest {
    nodes: Vec<PatternNode>,
}

impl Default for PatternForest {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternForest {
    pub fn new() -> Self {
        Self {
            nodes: vec![PatternNode::new(ROOT_PATTERN)],
        }
    }

    pub fn root(&self) -> &PatternNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&PatternNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A forest always has its root, so it is empty when nothing hangs off it.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].redirects.is_empty()
    }

    pub fn redirect_count(&self) -> usize {
        self.nodes.iter().map(|node| node.redirects.len()).sum()
    }

    /// Return the child of `parent` keyed by `regex`, creating it if missing.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this forest.
    pub fn child_or_insert(&mut self, parent: NodeId, regex: &str) -> NodeId {
        if let Some(existing) = self.nodes[parent.index()].child(regex) {
            return existing;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PatternNode::new(regex));
        self.nodes[parent.index()].children.push((regex.to_string(), id));
        id
    }

    /// # Panics
    ///
    /// Panics if `node` does not belong to this forest.
    pub fn push_redirect(&mut self, node: NodeId, redirect: PatternRedirect) {
        self.nodes[node.index()].redirects.push(redirect);
    }

    /// Check the structural invariants a deserialized forest must hold:
    /// a root exists and every child handle points further into the arena
    /// than its parent. The second rule rules out cycles and dangling handles.
    pub fn check_structure(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("pattern forest has no root".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            for (key, child) in &node.children {
                let child_index = child.index();
                if child_index <= index || child_index >= self.nodes.len() {
                    return Err(format!("node {} has invalid child handle {}", index, child_index));
                }
                if self.nodes[child_index].regex != *key {
                    return Err(format!("node {} child key does not match node {}", index, child_index));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Exclusions
// =============================================================================

/// Paths and patterns that are never redirected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    /// Literal paths, compared against the request path before normalization
    pub punctual: BTreeSet<String>,
    /// Anchored patterns, tested in order
    pub patterns: Vec<String>,
}

impl Exclusions {
    pub fn is_empty(&self) -> bool {
        self.punctual.is_empty() && self.patterns.is_empty()
    }
}

// =============================================================================
// Redirect Index
// =============================================================================

/// Build options that also govern matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOptions {
    /// Keep trailing slashes significant for exact paths
    pub trailing_slash: bool,
    /// Fall back to the first entry of an exact path when no query set matches
    pub always_redirect: bool,
}

/// Everything the matcher needs, produced once per configuration load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectIndex {
    pub options: MatchOptions,
    pub exact: BTreeMap<String, Vec<ExactEntry>>,
    pub forest: PatternForest,
    pub exclusions: Exclusions,
}

impl RedirectIndex {
    pub fn exact_entries(&self, normalized_path: &str) -> &[ExactEntry] {
        self.exact
            .get(normalized_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn exact_rule_count(&self) -> usize {
        self.exact.values().map(Vec::len).sum()
    }

    pub fn pattern_rule_count(&self) -> usize {
        self.forest.redirect_count()
    }
}
