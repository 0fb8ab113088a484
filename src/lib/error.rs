//! Errors raised while editing or compiling a graph.

use crate::{
    catalog::ParseError,
    graph::{ConnectionId, Name, NodeId, ParameterKind, SocketRef},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// Graph editing and compilation error.
pub enum Error {
    #[error("Node `{0}` does not exist")]
    /// The referenced node is not part of the graph.
    NodeNotFound(NodeId),

    #[error("Node `{node}` has no socket `{socket}`")]
    /// A socket was requested from a compiled node that does not produce it.
    SocketNotFound {
        /// Node that was looked up.
        node: NodeId,
        /// Missing socket.
        socket: Name,
    },

    #[error("Parameter `{name}` of node `{node}` holds a {got} value, expected {expected}")]
    /// A parameter was read with a different kind than the one stored.
    ParameterTypeMismatch {
        /// Node owning the parameter.
        node: NodeId,
        /// Parameter name.
        name: Name,
        /// Kind requested by the reader.
        expected: ParameterKind,
        /// Kind actually stored.
        got: ParameterKind,
    },

    #[error("Unknown node type `{0}`")]
    /// No compiler is registered for this node type.
    UnknownNodeType(String),

    #[error("Connection `{0}` already exists")]
    /// The exact same connection is already part of the graph.
    DuplicateConnection(ConnectionId),

    #[error("Input `{0}` is already connected")]
    /// An input socket can only be fed by a single connection.
    InputOccupied(SocketRef),

    #[error("Node identifier `{0}` is already in use")]
    /// Two nodes cannot share an identifier.
    DuplicateNodeIdentifier(NodeId),

    #[error("Uniform `{0}` does not exist")]
    /// A custom uniform node references an unknown uniform.
    UniformNotFound(String),

    #[error("Function `{0}` is not exported by any include")]
    /// A function node references a function missing from the catalog.
    FunctionNotFound(String),

    #[error("{0}")]
    /// A type could not be synthesized or converted.
    UnsupportedConversion(String),

    #[error(transparent)]
    /// An included source fragment could not be parsed.
    Parse(#[from] ParseError),

    #[error("Detected a cycle through {}", .0.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" -> "))]
    /// Compilation reached a node that is already being compiled.
    CyclicGraph(Vec<NodeId>),
}

/// Result type defaulting to the crate [Error].
pub type Result<T, E = Error> = std::result::Result<T, E>;
