use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::error::TaxonomyError;
use crate::model::{HierarchyNode, Level};

/// The canonical four-level taxonomy. Immutable once constructed.
///
/// Nodes are kept per level in declaration order; lookups go through a
/// per-level name index.
#[derive(Debug, Clone)]
pub struct HierarchyStore {
    levels: [Vec<HierarchyNode>; 4],
    index: [HashMap<String, usize>; 4],
}

impl HierarchyStore {
    /// Build the store, validating the forest invariant: L0 nodes have no
    /// parent, every other node's parent exists at the enclosing level.
    pub fn new(nodes: impl IntoIterator<Item = HierarchyNode>) -> Result<Self, TaxonomyError> {
        let mut levels: [Vec<HierarchyNode>; 4] = Default::default();
        let mut index: [HashMap<String, usize>; 4] = Default::default();

        for node in nodes {
            let li = node.level.index();
            match (node.level.parent_level(), &node.parent) {
                (None, Some(parent)) => {
                    return Err(TaxonomyError::SchemaViolation {
                        level: node.level,
                        name: node.name,
                        reason: format!("root node must not declare a parent (found '{parent}')"),
                    });
                }
                (Some(parent_level), None) => {
                    return Err(TaxonomyError::SchemaViolation {
                        level: node.level,
                        name: node.name,
                        reason: format!("missing parent (expected a {parent_level} node)"),
                    });
                }
                _ => {}
            }
            if index[li].contains_key(&node.name) {
                return Err(TaxonomyError::DuplicateNode {
                    level: node.level,
                    name: node.name,
                });
            }
            index[li].insert(node.name.clone(), levels[li].len());
            levels[li].push(node);
        }

        // Parents may be declared after their children, so check once all are in.
        for level in [Level::L1, Level::L2, Level::L3] {
            let parent_level = level.parent_level().unwrap_or(Level::L0);
            for node in &levels[level.index()] {
                let Some(parent) = node.parent.as_deref() else {
                    continue;
                };
                if !index[parent_level.index()].contains_key(parent) {
                    return Err(TaxonomyError::SchemaViolation {
                        level,
                        name: node.name.clone(),
                        reason: format!("parent '{parent}' not found in {parent_level}"),
                    });
                }
            }
        }

        let store = Self { levels, index };
        log::debug!(
            "hierarchy loaded: {} L0, {} L1, {} L2, {} L3",
            store.levels[0].len(),
            store.levels[1].len(),
            store.levels[2].len(),
            store.levels[3].len(),
        );
        Ok(store)
    }

    pub fn get_node(&self, level: Level, name: &str) -> Option<&HierarchyNode> {
        let li = level.index();
        self.index[li].get(name).map(|&i| &self.levels[li][i])
    }

    pub fn contains(&self, level: Level, name: &str) -> bool {
        self.index[level.index()].contains_key(name)
    }

    /// The node one level up from `(level, name)`. `None` for L0 nodes and
    /// for names the store does not hold.
    pub fn parent_of(&self, level: Level, name: &str) -> Option<&HierarchyNode> {
        let node = self.get_node(level, name)?;
        let parent_level = level.parent_level()?;
        self.get_node(parent_level, node.parent.as_deref()?)
    }

    /// The node itself followed by each ancestor up to its L0 root.
    pub fn lineage(&self, level: Level, name: &str) -> Vec<&HierarchyNode> {
        let mut chain = Vec::new();
        let mut current = self.get_node(level, name);
        while let Some(node) = current {
            chain.push(node);
            current = node
                .parent
                .as_deref()
                .and_then(|p| node.level.parent_level().and_then(|pl| self.get_node(pl, p)));
        }
        chain
    }

    /// Nodes at `level`, in declaration order.
    pub fn nodes(&self, level: Level) -> &[HierarchyNode] {
        &self.levels[level.index()]
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct NodesByName<'a>(&'a [HierarchyNode]);

impl Serialize for NodesByName<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|n| (&n.name, n)))
    }
}

/// `{"L0": {name: node, ...}, "L1": ...}`; empty levels are omitted.
impl Serialize for HierarchyStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            Level::ALL
                .iter()
                .filter(|l| !self.levels[l.index()].is_empty())
                .map(|l| (l.as_str(), NodesByName(&self.levels[l.index()]))),
        )
    }
}
