//! Node compilers, one per node type, and the registry that dispatches to them.

mod arithmetic;
mod function;
mod input;
mod literal;
mod output;
mod texture;
mod vector;

pub use arithmetic::{BinaryOperator, CastCompiler, NegateCompiler};
pub use function::{CustomFunctionCompiler, FunctionCompiler};
pub use input::{uniform_identifier, BuiltinInput, CustomUniformCompiler, BUILTIN_INPUTS};
pub use literal::{ColorCompiler, LiteralCompiler};
pub use output::{to_vec4, OutputCompiler};
pub use texture::TextureCompiler;
pub use vector::{ComposeCompiler, SplitCompiler, SwizzleCompiler};

use super::{
    builtins::BUILTINS,
    context::{Context, NodeContext},
};
use crate::{
    error::{Error, Result},
    graph::{Name, Node, NodeId, Parameters},
    types::Type,
};

use std::collections::HashMap;

use dyn_clone::DynClone;
use lazy_static::lazy_static;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Name and current type of a socket.
pub struct SocketInfo {
    #[allow(missing_docs)]
    pub name: Name,
    #[allow(missing_docs)]
    pub r#type: Type,
}

impl SocketInfo {
    #[allow(missing_docs)]
    pub fn new(name: impl Into<Name>, r#type: Type) -> Self {
        Self {
            name: name.into(),
            r#type,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Sockets a node currently exposes.
pub struct Sockets {
    #[allow(missing_docs)]
    pub inputs: Vec<SocketInfo>,
    #[allow(missing_docs)]
    pub outputs: Vec<SocketInfo>,
}

impl Sockets {
    /// Builder-style input declaration.
    pub fn input(mut self, name: impl Into<Name>, r#type: Type) -> Self {
        self.inputs.push(SocketInfo::new(name, r#type));
        self
    }

    /// Builder-style output declaration.
    pub fn output(mut self, name: impl Into<Name>, r#type: Type) -> Self {
        self.outputs.push(SocketInfo::new(name, r#type));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Description of a node as currently connected, for display.
pub struct NodeInfo {
    #[allow(missing_docs)]
    pub identifier: NodeId,
    #[allow(missing_docs)]
    pub node_type: String,
    #[allow(missing_docs)]
    pub label: String,
    #[allow(missing_docs)]
    pub description: String,
    #[allow(missing_docs)]
    pub inputs: Vec<SocketInfo>,
    #[allow(missing_docs)]
    pub outputs: Vec<SocketInfo>,
    /// Node parameters, completed with the defaults of its type.
    pub parameters: Parameters,
    /// Why the node cannot currently be compiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeInfo {
    pub(crate) fn new(node: &Node, label: String, description: String) -> Self {
        Self {
            identifier: node.identifier.clone(),
            node_type: node.node_type.clone(),
            label,
            description,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: node.parameters.clone(),
            error: None,
        }
    }
}

/// Turns a node and its compiled inputs into expressions.
pub trait NodeCompiler: DynClone + Send + Sync {
    /// Display name.
    fn label(&self) -> String;

    /// One line summary for tooltips.
    fn description(&self) -> String {
        String::new()
    }

    /// Sockets of the node given what is currently connected to it.
    fn sockets(&self, context: &NodeContext) -> Result<Sockets>;

    /// Compile the node.
    fn compile(&self, context: &NodeContext) -> Result<Context>;

    /// Parameters given to freshly added nodes.
    fn default_parameters(&self) -> Parameters {
        Parameters::new()
    }

    /// Whether inputs may rely on implicit promotion rather than exact types.
    fn can_implicitly_cast_input(&self) -> bool {
        false
    }
}

dyn_clone::clone_trait_object!(NodeCompiler);

#[derive(Clone, Default)]
/// Node type to compiler table.
pub struct Registry {
    compilers: HashMap<String, Box<dyn NodeCompiler>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiler, replacing any previous compiler of the same node type.
    pub fn register(&mut self, node_type: impl Into<String>, compiler: Box<dyn NodeCompiler>) {
        self.compilers.insert(node_type.into(), compiler);
    }

    /// Compiler of a node type.
    pub fn get(&self, node_type: &str) -> Result<&dyn NodeCompiler> {
        self.compilers
            .get(node_type)
            .map(Box::as_ref)
            .ok_or_else(|| Error::UnknownNodeType(node_type.to_owned()))
    }

    /// Every registered node type, sorted.
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.compilers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Registry of every node type shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        for (node_type, literal) in LiteralCompiler::ALL {
            registry.register(node_type, Box::new(literal));
        }
        registry.register("color", Box::new(ColorCompiler));

        for input in BUILTIN_INPUTS.iter() {
            registry.register(input.node_type, Box::new(input.clone()));
        }
        registry.register("custom_uniform", Box::new(CustomUniformCompiler));

        for operator in BinaryOperator::ALL {
            registry.register(operator.node_type(), Box::new(operator));
        }
        registry.register("negate", Box::new(NegateCompiler));
        registry.register("cast", Box::new(CastCompiler));

        for size in 2..=4 {
            registry.register(format!("vec{size}"), Box::new(ComposeCompiler::new(size)));
        }
        registry.register("split", Box::new(SplitCompiler));
        registry.register("swizzle", Box::new(SwizzleCompiler));

        for signature in BUILTINS.iter() {
            registry.register(
                signature.name.clone(),
                Box::new(FunctionCompiler::new(signature)),
            );
        }
        registry.register("function", Box::new(CustomFunctionCompiler));

        registry.register("texture", Box::new(TextureCompiler));
        registry.register("output", Box::new(OutputCompiler::new("Output")));
        registry.register("preview", Box::new(OutputCompiler::new("Preview")));

        registry
    }
}

lazy_static! {
    /// Shared copy of [Registry::builtin].
    pub static ref DEFAULT_REGISTRY: Registry = Registry::builtin();
}
