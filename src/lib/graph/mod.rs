//! Graph data model: nodes, connections, uniforms and the serializable [Graph] snapshot.

pub mod diff;
pub mod parameters;
pub mod reconcile;
pub mod store;

pub use parameters::{ParameterKind, ParameterType, ParameterValue};

use crate::types::Type;

use std::collections::BTreeMap;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
/// Wrapper around [String].
pub struct NodeId(String);

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl NodeId {
    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
/// Wrapper around [String].
pub struct Name(String);

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Name {
    #[allow(missing_docs)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[display(fmt = "{}.{}", node_id, socket_id)]
/// Reference to a socket of a [Node].
pub struct SocketRef {
    /// Owning node.
    pub node_id: NodeId,
    /// Socket name.
    pub socket_id: Name,
}

impl SocketRef {
    #[allow(missing_docs)]
    pub fn new(node_id: impl Into<NodeId>, socket_id: impl Into<Name>) -> Self {
        Self {
            node_id: node_id.into(),
            socket_id: socket_id.into(),
        }
    }
}

#[macro_export]
/// Shorthand to reference node sockets.
/// # Example
/// ```
/// use shadegraph::{sref, graph::{SocketRef, Name, NodeId}};
///
/// let socket = sref!(node "node_name" "socket_name");
/// assert_eq!(socket, SocketRef::new(NodeId::from("node_name"), Name::from("socket_name")));
///
/// let id = NodeId::from("other");
/// assert_eq!(sref!(node id.clone() => "out"), SocketRef::new(id, "out"));
/// ```
macro_rules! sref {
    (node $node:literal $field:literal) => {
        $crate::graph::SocketRef::new(
            $crate::graph::NodeId::from($node),
            $crate::graph::Name::from($field),
        )
    };

    (node $node:expr => $field:expr) => {
        $crate::graph::SocketRef::new($node, $field)
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
/// Position of a node on the editing canvas.
pub struct Position {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
}

impl Position {
    #[allow(missing_docs)]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset the position in place.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }
}

/// Named parameters of a node.
pub type Parameters = BTreeMap<Name, ParameterValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A single operation in the graph.
pub struct Node {
    /// Unique and stable identifier.
    pub identifier: NodeId,
    /// Selects the compiler used for the node.
    pub node_type: String,
    #[serde(default)]
    #[allow(missing_docs)]
    pub position: Position,
    #[serde(default)]
    #[allow(missing_docs)]
    pub parameters: Parameters,
}

impl Node {
    #[allow(missing_docs)]
    pub fn new(identifier: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            node_type: node_type.into(),
            position: Position::default(),
            parameters: Parameters::new(),
        }
    }

    /// Builder-style position setter.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, name: impl Into<Name>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(transparent)]
/// Canonical identifier of a [Connection], derived from both of its endpoints.
pub struct ConnectionId(String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Directed link from an output socket to an input socket.
pub struct Connection {
    /// Producing output socket.
    pub from: SocketRef,
    /// Consuming input socket.
    pub to: SocketRef,
    /// Last known type of the producing socket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<Type>,
}

impl Connection {
    #[allow(missing_docs)]
    pub fn new(from: SocketRef, to: SocketRef) -> Self {
        Self {
            from,
            to,
            r#type: None,
        }
    }

    /// Canonical identifier, a pure function of both endpoints.
    pub fn id(&self) -> ConnectionId {
        ConnectionId(format!(
            "({}:{})->({}:{})",
            self.from.node_id, self.from.socket_id, self.to.node_id, self.to.socket_id
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Named external input of the shader.
pub struct Uniform {
    #[allow(missing_docs)]
    pub id: String,
    #[allow(missing_docs)]
    pub r#type: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub default_value: Option<ParameterValue>,
}

impl Uniform {
    #[allow(missing_docs)]
    pub fn new(id: impl Into<String>, r#type: Type) -> Self {
        Self {
            id: id.into(),
            r#type,
            default_value: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Serializable snapshot of all editable state.
pub struct Graph {
    #[allow(missing_docs)]
    pub version: u32,
    /// Workspace-relative paths of included source fragments.
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    #[allow(missing_docs)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    #[allow(missing_docs)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    #[allow(missing_docs)]
    pub uniforms: BTreeMap<String, Uniform>,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            version: Graph::VERSION,
            includes: Vec::new(),
            nodes: Vec::new(),
            connections: Vec::new(),
            uniforms: BTreeMap::new(),
        }
    }
}

impl Graph {
    /// Format version written by this crate.
    pub const VERSION: u32 = 1;

    /// Parse a graph from its JSON document form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize the graph to its JSON document form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
