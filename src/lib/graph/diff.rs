//! Mergeable record of graph changes.

use super::{Connection, Node, NodeId, Uniform};

use std::{
    collections::{BTreeMap, BTreeSet},
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Every change produced by one or more graph mutations.
///
/// Diffs merge field by field: lists are concatenated in order, sets are united and maps are
/// overlaid, so merging is associative.
pub struct GraphDiff {
    #[allow(missing_docs)]
    pub added_nodes: Vec<Node>,
    #[allow(missing_docs)]
    pub removed_nodes: Vec<NodeId>,
    /// Nodes patched in place (position and/or parameters).
    pub modified_nodes: Vec<NodeId>,
    #[allow(missing_docs)]
    pub added_connections: Vec<Connection>,
    #[allow(missing_docs)]
    pub removed_connections: Vec<Connection>,
    /// Nodes whose compiled result is stale and must be recompiled before use.
    pub invalidated: BTreeSet<NodeId>,
    /// Uniforms added or changed, keyed by id.
    pub updated_uniforms: BTreeMap<String, Uniform>,
    #[allow(missing_docs)]
    pub removed_uniforms: Vec<String>,
    #[allow(missing_docs)]
    pub added_includes: Vec<String>,
    #[allow(missing_docs)]
    pub removed_includes: Vec<String>,
    /// Non fatal problems met while applying a batch.
    pub warnings: Vec<String>,
}

impl GraphDiff {
    /// Check that the diff records nothing at all.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge `other` after `self`.
    pub fn merge(mut self, other: GraphDiff) -> Self {
        self += other;
        self
    }

    /// Shorthand for a diff carrying a single warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            warnings: vec![message.into()],
            ..Default::default()
        }
    }
}

impl AddAssign for GraphDiff {
    fn add_assign(&mut self, rhs: Self) {
        let GraphDiff {
            added_nodes,
            removed_nodes,
            modified_nodes,
            added_connections,
            removed_connections,
            invalidated,
            updated_uniforms,
            removed_uniforms,
            added_includes,
            removed_includes,
            warnings,
        } = rhs;

        self.added_nodes.extend(added_nodes);
        self.removed_nodes.extend(removed_nodes);
        self.modified_nodes.extend(modified_nodes);
        self.added_connections.extend(added_connections);
        self.removed_connections.extend(removed_connections);
        self.invalidated.extend(invalidated);
        self.updated_uniforms.extend(updated_uniforms);
        self.removed_uniforms.extend(removed_uniforms);
        self.added_includes.extend(added_includes);
        self.removed_includes.extend(removed_includes);
        self.warnings.extend(warnings);
    }
}

impl Add for GraphDiff {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.merge(rhs)
    }
}

impl Sum<GraphDiff> for GraphDiff {
    fn sum<I: Iterator<Item = GraphDiff>>(iter: I) -> Self {
        iter.reduce(|acc, cur| acc + cur).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{graph::ParameterValue, types::Type};

    use pretty_assertions::assert_eq;

    fn diff(node: &str, warning: &str) -> GraphDiff {
        let mut diff = GraphDiff::warning(warning);
        diff.removed_nodes.push(node.into());
        diff.invalidated.insert(node.into());
        diff
    }

    #[test]
    fn merge_is_associative_and_ordered() {
        let (a, b, c) = (diff("a", "1"), diff("b", "2"), diff("a", "3"));

        let left = (a.clone() + b.clone()) + c.clone();
        let right = a + (b + c);

        assert_eq!(left, right);
        assert_eq!(left.removed_nodes, vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(left.warnings, vec!["1", "2", "3"]);
        assert_eq!(left.invalidated.len(), 2);
    }

    #[test]
    fn uniform_maps_overlay() {
        let mut first = GraphDiff::default();
        first
            .updated_uniforms
            .insert("u".into(), Uniform::new("u", Type::FLOAT));

        let mut second = GraphDiff::default();
        let mut replaced = Uniform::new("u", Type::VEC2);
        replaced.default_value = Some(ParameterValue::FloatVector(vec![0., 1.]));
        second.updated_uniforms.insert("u".into(), replaced.clone());

        let merged: GraphDiff = [first, second].into_iter().sum();
        assert_eq!(merged.updated_uniforms.get("u"), Some(&replaced));
    }

    #[test]
    fn empty() {
        assert!(GraphDiff::default().is_empty());
        assert!(!GraphDiff::warning("oops").is_empty());
        assert!(std::iter::empty::<GraphDiff>().sum::<GraphDiff>().is_empty());
    }
}
