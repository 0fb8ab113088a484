#![warn(missing_docs)]

//! Library used by the shadegraph tool. Provides a typed shader node graph, an incremental
//! per-node compiler with caching and invalidation, and a reconciler that merges externally
//! edited graph snapshots into a live graph while preserving node identity.

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod types;

pub use error::{Error, Result};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        catalog::{FsResolver, FunctionCatalog, NoSources, SourceResolver},
        compiler::{
            context::{Context, Expression, Variable},
            nodes::{NodeCompiler, NodeInfo, Registry},
            Compiler, CompilerOptions, GraphNotifier,
        },
        error::{Error, Result},
        graph::{
            diff::GraphDiff, store::GraphStore, Connection, Graph, Name, Node, NodeId,
            ParameterKind, ParameterValue, Position, SocketRef, Uniform,
        },
        sref,
        types::{ScalarBase, Type},
    };
}
