//! Diffing of an incoming [Graph] snapshot against the live [GraphStore].

use super::{store::GraphStore, Connection, ConnectionId, Graph, Node, NodeId, Uniform};

use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Debug, Default, PartialEq)]
/// Changes needed to turn the live graph into the incoming one, computed without touching
/// either of them.
pub struct Reconciliation {
    /// Live connections absent from the incoming graph.
    pub removed_connections: Vec<ConnectionId>,
    /// Live nodes absent from the incoming graph.
    pub removed_nodes: Vec<NodeId>,
    /// Live uniforms absent from the incoming graph.
    pub removed_uniforms: Vec<String>,
    /// Live includes absent from the incoming graph.
    pub removed_includes: Vec<String>,
    /// Incoming includes absent from the live graph.
    pub added_includes: Vec<String>,
    /// Incoming uniforms that are new or differ from their live counterpart.
    pub updated_uniforms: Vec<Uniform>,
    /// Incoming nodes absent from the live graph.
    pub added_nodes: Vec<Node>,
    /// Incoming connections absent from the live graph.
    pub added_connections: Vec<Connection>,
    /// Incoming versions of nodes present in both graphs with different content.
    pub modified_nodes: Vec<Node>,
}

impl Reconciliation {
    /// Check that the graphs were already identical.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Compute the [Reconciliation] bringing `live` to `incoming`.
pub fn reconcile(live: &GraphStore, incoming: &Graph) -> Reconciliation {
    let incoming_nodes: HashMap<&NodeId, &Node> = incoming
        .nodes
        .iter()
        .map(|node| (&node.identifier, node))
        .collect();
    let incoming_connections: BTreeSet<ConnectionId> =
        incoming.connections.iter().map(Connection::id).collect();

    let mut result = Reconciliation {
        removed_connections: live
            .connections()
            .into_iter()
            .map(Connection::id)
            .filter(|id| !incoming_connections.contains(id))
            .collect(),
        removed_nodes: live
            .nodes()
            .filter(|node| !incoming_nodes.contains_key(&node.identifier))
            .map(|node| node.identifier.clone())
            .collect(),
        removed_uniforms: live
            .uniforms()
            .keys()
            .filter(|id| !incoming.uniforms.contains_key(*id))
            .cloned()
            .collect(),
        removed_includes: live
            .includes()
            .iter()
            .filter(|include| !incoming.includes.contains(&include.path))
            .map(|include| include.path.clone())
            .collect(),
        added_includes: incoming
            .includes
            .iter()
            .filter(|path| !live.includes().iter().any(|include| &include.path == *path))
            .cloned()
            .collect(),
        updated_uniforms: incoming
            .uniforms
            .values()
            .filter(|uniform| live.uniform(&uniform.id) != Some(*uniform))
            .cloned()
            .collect(),
        added_connections: incoming
            .connections
            .iter()
            .filter(|connection| live.connection(&connection.id()).is_none())
            .map(|connection| Connection {
                r#type: None,
                ..connection.clone()
            })
            .collect(),
        ..Default::default()
    };

    for node in &incoming.nodes {
        match live.node(&node.identifier) {
            None => result.added_nodes.push(node.clone()),
            Some(current) if current != node => result.modified_nodes.push(node.clone()),
            Some(_) => {}
        }
    }

    result
}
