//! Indexed in-memory graph.
//!
//! Every mutation returns the [GraphDiff] it produced, with `invalidated` holding the mutated
//! node and everything reachable downstream of it.

use super::{
    diff::GraphDiff, Connection, ConnectionId, Graph, Name, Node, NodeId, ParameterValue,
    SocketRef, Uniform,
};
use crate::{
    error::{Error, Result},
    types::Type,
};

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::debug;

#[derive(Clone, Debug, Default, PartialEq)]
/// Socket names of a node that currently take part in a connection.
pub struct ConnectedSockets {
    /// Connected input sockets.
    pub inputs: BTreeSet<Name>,
    /// Connected output sockets with their number of consumers.
    pub outputs: BTreeMap<Name, usize>,
}

impl ConnectedSockets {
    fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Included source fragment.
pub struct Include {
    /// Workspace-relative path.
    pub path: String,
    /// Contents, if they could be resolved.
    pub source: Option<String>,
}

#[derive(Clone, Debug, Default)]
/// Owner of nodes, connections, uniforms and includes, with lookups in both directions.
pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    connections: HashMap<ConnectionId, Connection>,
    /// Input socket to the connection feeding it.
    upstream: HashMap<SocketRef, ConnectionId>,
    /// Output socket to the connections it feeds.
    downstream: HashMap<SocketRef, BTreeSet<ConnectionId>>,
    connected: HashMap<NodeId, ConnectedSockets>,
    uniforms: BTreeMap<String, Uniform>,
    includes: Vec<Include>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(missing_docs)]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Same as [node](Self::node), failing with [Error::NodeNotFound].
    pub fn try_node(&self, id: &NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::NodeNotFound(id.clone()))
    }

    #[allow(missing_docs)]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    #[allow(missing_docs)]
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Connections sorted by identifier.
    pub fn connections(&self) -> Vec<&Connection> {
        let mut connections: Vec<_> = self.connections.iter().collect();
        connections.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
        connections.into_iter().map(|(_, c)| c).collect()
    }

    /// Connection feeding the given input socket.
    pub fn upstream(&self, input: &SocketRef) -> Option<&Connection> {
        self.upstream
            .get(input)
            .and_then(|id| self.connections.get(id))
    }

    /// Connections fed by the given output socket.
    pub fn downstream(&self, output: &SocketRef) -> impl Iterator<Item = &Connection> {
        self.downstream
            .get(output)
            .into_iter()
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }

    /// Connections leaving the node, from any of its outputs.
    pub fn outgoing(&self, id: &NodeId) -> Vec<&Connection> {
        self.connected
            .get(id)
            .map(|sockets| {
                sockets
                    .outputs
                    .keys()
                    .flat_map(|socket| self.downstream(&SocketRef::new(id.clone(), socket.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Connections entering the node, in input name order.
    pub fn incoming(&self, id: &NodeId) -> Vec<&Connection> {
        self.connected
            .get(id)
            .map(|sockets| {
                sockets
                    .inputs
                    .iter()
                    .filter_map(|socket| self.upstream(&SocketRef::new(id.clone(), socket.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sockets of the node currently part of a connection, even if the node's compiler no
    /// longer declares them.
    pub fn connected_sockets(&self, id: &NodeId) -> Option<&ConnectedSockets> {
        self.connected.get(id)
    }

    #[allow(missing_docs)]
    pub fn uniforms(&self) -> &BTreeMap<String, Uniform> {
        &self.uniforms
    }

    #[allow(missing_docs)]
    pub fn uniform(&self, id: &str) -> Option<&Uniform> {
        self.uniforms.get(id)
    }

    #[allow(missing_docs)]
    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    /// The seeds and every node reachable from them by following connections downstream.
    pub fn downstream_closure<'a>(
        &self,
        seeds: impl IntoIterator<Item = &'a NodeId>,
    ) -> BTreeSet<NodeId> {
        let mut reached = BTreeSet::new();
        let mut next: VecDeque<NodeId> = seeds.into_iter().cloned().collect();

        while let Some(current) = next.pop_front() {
            if !reached.insert(current.clone()) {
                continue;
            }

            for connection in self.outgoing(&current) {
                if !reached.contains(&connection.to.node_id) {
                    next.push_back(connection.to.node_id.clone());
                }
            }
        }

        reached
    }

    /// The node and every node it depends on, dependencies first.
    pub fn upstream_order(&self, id: &NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        // (node, children pushed)
        let mut stack = vec![(id.clone(), false)];

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }

            if !visited.insert(current.clone()) {
                continue;
            }

            stack.push((current.clone(), true));
            for connection in self.incoming(&current).into_iter().rev() {
                if !visited.contains(&connection.from.node_id) {
                    stack.push((connection.from.node_id.clone(), false));
                }
            }
        }

        order
    }

    /// Identifier derived from `base` that no node uses yet.
    pub fn unique_id(&self, base: &str) -> NodeId {
        (1..)
            .map(|index| NodeId::from(format!("{base}_{index}")))
            .find(|id| !self.nodes.contains_key(id))
            .unwrap_or_default()
    }

    /// Add a node under its own identifier.
    pub fn insert_node(&mut self, node: Node) -> Result<GraphDiff> {
        if self.nodes.contains_key(&node.identifier) {
            return Err(Error::DuplicateNodeIdentifier(node.identifier));
        }

        let id = node.identifier.clone();
        debug!("Adding node `{id}` of type `{}`", node.node_type);

        self.order.push(id.clone());
        self.nodes.insert(id.clone(), node.clone());

        let mut diff = GraphDiff::default();
        diff.added_nodes.push(node);
        diff.invalidated.insert(id);
        Ok(diff)
    }

    /// Remove a node along with every connection touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<GraphDiff> {
        if !self.nodes.contains_key(id) {
            return Err(Error::NodeNotFound(id.clone()));
        }

        let mut diff = GraphDiff {
            invalidated: self.downstream_closure([id]),
            ..Default::default()
        };

        let touching: Vec<Connection> = self
            .incoming(id)
            .into_iter()
            .chain(self.outgoing(id))
            .cloned()
            .collect();
        for connection in touching {
            diff += self.remove_connection(&connection.id());
        }

        debug!("Removing node `{id}`");
        self.nodes.remove(id);
        self.order.retain(|other| other != id);
        self.connected.remove(id);
        diff.removed_nodes.push(id.clone());

        Ok(diff)
    }

    /// Add a connection. Both nodes must exist and the input must be free.
    pub fn insert_connection(&mut self, connection: Connection) -> Result<GraphDiff> {
        for endpoint in [&connection.from, &connection.to] {
            if !self.nodes.contains_key(&endpoint.node_id) {
                return Err(Error::NodeNotFound(endpoint.node_id.clone()));
            }
        }

        let id = connection.id();
        if self.connections.contains_key(&id) {
            return Err(Error::DuplicateConnection(id));
        }

        if self.upstream.contains_key(&connection.to) {
            return Err(Error::InputOccupied(connection.to));
        }

        debug!("Connecting {id}");

        self.upstream.insert(connection.to.clone(), id.clone());
        self.downstream
            .entry(connection.from.clone())
            .or_default()
            .insert(id.clone());

        self.connected
            .entry(connection.to.node_id.clone())
            .or_default()
            .inputs
            .insert(connection.to.socket_id.clone());
        *self
            .connected
            .entry(connection.from.node_id.clone())
            .or_default()
            .outputs
            .entry(connection.from.socket_id.clone())
            .or_default() += 1;

        self.connections.insert(id, connection.clone());

        let mut diff = GraphDiff {
            invalidated: self.downstream_closure([&connection.to.node_id]),
            ..Default::default()
        };
        diff.added_connections.push(connection);
        Ok(diff)
    }

    /// Remove a connection; removing an absent connection is a no-op.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> GraphDiff {
        let Some(connection) = self.connections.remove(id) else {
            return GraphDiff::default();
        };

        debug!("Disconnecting {id}");

        self.upstream.remove(&connection.to);
        if let Some(consumers) = self.downstream.get_mut(&connection.from) {
            consumers.remove(id);
            if consumers.is_empty() {
                self.downstream.remove(&connection.from);
            }
        }

        if let Some(sockets) = self.connected.get_mut(&connection.to.node_id) {
            sockets.inputs.remove(&connection.to.socket_id);
        }
        if let Some(sockets) = self.connected.get_mut(&connection.from.node_id) {
            if let Some(count) = sockets.outputs.get_mut(&connection.from.socket_id) {
                *count -= 1;
                if *count == 0 {
                    sockets.outputs.remove(&connection.from.socket_id);
                }
            }
        }
        for node in [&connection.from.node_id, &connection.to.node_id] {
            if self.connected.get(node).is_some_and(ConnectedSockets::is_empty) {
                self.connected.remove(node);
            }
        }

        let mut diff = GraphDiff {
            invalidated: self.downstream_closure([&connection.to.node_id]),
            ..Default::default()
        };
        diff.removed_connections.push(connection);
        diff
    }

    /// Set a parameter of a node.
    pub fn update_parameter(
        &mut self,
        id: &NodeId,
        name: Name,
        value: ParameterValue,
    ) -> Result<GraphDiff> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.clone()))?;

        if node.parameters.get(&name) == Some(&value) {
            return Ok(GraphDiff::default());
        }

        debug!("Setting `{name}` of `{id}` to {value:?}");
        node.parameters.insert(name, value);

        let mut diff = GraphDiff {
            invalidated: self.downstream_closure([id]),
            ..Default::default()
        };
        diff.modified_nodes.push(id.clone());
        Ok(diff)
    }

    /// Move a node. Positions do not affect compilation, so nothing is invalidated.
    pub fn translate_node(&mut self, id: &NodeId, dx: f64, dy: f64) -> Result<GraphDiff> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.clone()))?
            .position
            .translate(dx, dy);

        Ok(GraphDiff {
            modified_nodes: vec![id.clone()],
            ..Default::default()
        })
    }

    /// Overwrite a node's content in place, keeping its identity.
    pub fn patch_node(&mut self, incoming: Node) -> Result<GraphDiff> {
        let node = self
            .nodes
            .get_mut(&incoming.identifier)
            .ok_or_else(|| Error::NodeNotFound(incoming.identifier.clone()))?;

        if *node == incoming {
            return Ok(GraphDiff::default());
        }

        let semantic = node.node_type != incoming.node_type || node.parameters != incoming.parameters;
        let Node {
            identifier,
            node_type,
            position,
            parameters,
        } = incoming;

        node.node_type = node_type;
        node.position = position;
        node.parameters = parameters;

        let mut diff = GraphDiff::default();
        if semantic {
            diff.invalidated = self.downstream_closure([&identifier]);
        }
        diff.modified_nodes.push(identifier);
        Ok(diff)
    }

    /// Refresh the cached producer type of a connection. Returns whether it changed.
    pub fn set_connection_type(&mut self, id: &ConnectionId, r#type: Type) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) if connection.r#type.as_ref() != Some(&r#type) => {
                connection.r#type = Some(r#type);
                true
            }
            _ => false,
        }
    }

    /// Add or replace a uniform.
    pub fn set_uniform(&mut self, uniform: Uniform) -> GraphDiff {
        if self.uniforms.get(&uniform.id) == Some(&uniform) {
            return GraphDiff::default();
        }

        self.uniforms.insert(uniform.id.clone(), uniform.clone());

        let mut diff = GraphDiff::default();
        diff.updated_uniforms.insert(uniform.id.clone(), uniform);
        diff
    }

    /// Remove a uniform; removing an absent uniform is a no-op.
    pub fn remove_uniform(&mut self, id: &str) -> GraphDiff {
        match self.uniforms.remove(id) {
            Some(_) => GraphDiff {
                removed_uniforms: vec![id.to_owned()],
                ..Default::default()
            },
            None => GraphDiff::default(),
        }
    }

    /// Record an include, replacing the source of an existing one with the same path.
    pub fn add_include(&mut self, path: &str, source: Option<String>) -> GraphDiff {
        if let Some(include) = self.includes.iter_mut().find(|include| include.path == path) {
            include.source = source;
            return GraphDiff::default();
        }

        self.includes.push(Include {
            path: path.to_owned(),
            source,
        });

        GraphDiff {
            added_includes: vec![path.to_owned()],
            ..Default::default()
        }
    }

    /// Forget an include; removing an absent include is a no-op.
    pub fn remove_include(&mut self, path: &str) -> GraphDiff {
        let before = self.includes.len();
        self.includes.retain(|include| include.path != path);

        if self.includes.len() == before {
            return GraphDiff::default();
        }

        GraphDiff {
            removed_includes: vec![path.to_owned()],
            ..Default::default()
        }
    }

    /// Serializable snapshot of the whole store.
    pub fn snapshot(&self) -> Graph {
        Graph {
            version: Graph::VERSION,
            includes: self
                .includes
                .iter()
                .map(|include| include.path.clone())
                .collect(),
            nodes: self.nodes().cloned().collect(),
            connections: self.connections().into_iter().cloned().collect(),
            uniforms: self.uniforms.clone(),
        }
    }
}
