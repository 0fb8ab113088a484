//! Compiled node results and the view of the graph handed to node compilers.

use super::{engine::Engine, nodes::Registry};
use crate::{
    catalog::{FunctionCatalog, FunctionDefinition},
    error::{Error, Result},
    graph::{store::GraphStore, Name, Node, NodeId, ParameterType, SocketRef, Uniform},
    types::Type,
};

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Source text producing one value.
pub struct Expression {
    #[allow(missing_docs)]
    pub r#type: Type,
    /// Generated source.
    pub data: String,
    /// Cheap and pure enough to be repeated at every use site.
    pub trivial: bool,
}

impl Expression {
    /// Non-trivial expression.
    pub fn new(r#type: Type, data: impl Into<String>) -> Self {
        Self {
            r#type,
            data: data.into(),
            trivial: false,
        }
    }

    /// Expression safe to inline anywhere, such as a literal or a variable name.
    pub fn trivial(r#type: Type, data: impl Into<String>) -> Self {
        Self {
            r#type,
            data: data.into(),
            trivial: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Local binding declared before the expressions that use it.
pub struct Variable {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub r#type: Type,
    /// Initializer source.
    pub data: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
/// Compiled result of a single node.
pub struct Context {
    /// Bindings to declare, in order, before any output is used.
    pub variables: Vec<Variable>,
    /// Expression of every output socket.
    pub outputs: BTreeMap<Name, Expression>,
}

impl Context {
    /// Builder-style output setter.
    pub fn with_output(mut self, socket: impl Into<Name>, expression: Expression) -> Self {
        self.outputs.insert(socket.into(), expression);
        self
    }

    /// Bind a non-trivial expression to a variable named `name` and return a reference to it.
    /// Trivial expressions are returned untouched.
    pub fn hoist(&mut self, name: String, expression: Expression) -> Expression {
        if expression.trivial {
            return expression;
        }

        let reference = Expression::trivial(expression.r#type.clone(), name.clone());
        self.variables.push(Variable {
            name,
            r#type: expression.r#type,
            data: expression.data,
        });
        reference
    }

    #[allow(missing_docs)]
    pub fn output(&self, socket: &str) -> Option<&Expression> {
        self.outputs.get(&Name::from(socket))
    }
}

#[derive(Clone, Copy)]
/// Everything compilation reads besides the node itself.
pub struct Environment<'a> {
    #[allow(missing_docs)]
    pub store: &'a GraphStore,
    #[allow(missing_docs)]
    pub registry: &'a Registry,
    #[allow(missing_docs)]
    pub catalog: &'a FunctionCatalog,
}

/// Node being compiled, with access to its upstream results.
pub struct NodeContext<'a> {
    engine: &'a Engine,
    env: Environment<'a>,
    node: &'a Node,
    detached: Option<&'a Name>,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(engine: &'a Engine, env: Environment<'a>, node: &'a Node) -> Self {
        Self {
            engine,
            env,
            node,
            detached: None,
        }
    }

    /// Same context, acting as if `socket` were not connected.
    pub(crate) fn detach(mut self, socket: &'a Name) -> Self {
        self.detached = Some(socket);
        self
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> &NodeId {
        &self.node.identifier
    }

    #[allow(missing_docs)]
    pub fn node(&self) -> &Node {
        self.node
    }

    /// Check whether an input socket is fed by a connection.
    pub fn is_connected(&self, socket: &str) -> bool {
        self.upstream(socket).is_some()
    }

    fn upstream(&self, socket: &str) -> Option<&'a crate::graph::Connection> {
        if self.detached.is_some_and(|name| name.as_str() == socket) {
            return None;
        }

        self.env
            .store
            .upstream(&SocketRef::new(self.node.identifier.clone(), socket))
    }

    /// Compile the producer of an input socket and return its expression, `None` when the
    /// input is not connected.
    pub fn try_get_input(&self, socket: &str) -> Result<Option<Expression>> {
        let Some(connection) = self.upstream(socket) else {
            return Ok(None);
        };

        let upstream = self.engine.compile(self.env, &connection.from.node_id)?;
        upstream
            .outputs
            .get(&connection.from.socket_id)
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::SocketNotFound {
                node: connection.from.node_id.clone(),
                socket: connection.from.socket_id.clone(),
            })
    }

    /// Type flowing into an input socket, `None` when the input is not connected.
    pub fn input_type(&self, socket: &str) -> Result<Option<Type>> {
        Ok(self.try_get_input(socket)?.map(|expression| expression.r#type))
    }

    /// Read a parameter, `None` when it is not set. A value of another kind is an error,
    /// never coerced.
    pub fn try_get_param<T: ParameterType>(&self, name: &str) -> Result<Option<&'a T>> {
        let name = Name::from(name);
        let Some(value) = self.node.parameters.get(&name) else {
            return Ok(None);
        };

        T::extract(value)
            .map(Some)
            .ok_or_else(|| Error::ParameterTypeMismatch {
                node: self.node.identifier.clone(),
                name,
                expected: T::KIND,
                got: value.kind(),
            })
    }

    /// Read a parameter, falling back to `default` when it is not set.
    pub fn param_or<T: ParameterType + Clone>(&self, name: &str, default: T) -> Result<T> {
        Ok(self.try_get_param::<T>(name)?.cloned().unwrap_or(default))
    }

    /// Graph uniform by id.
    pub fn uniform(&self, id: &str) -> Result<&'a Uniform> {
        self.env
            .store
            .uniform(id)
            .ok_or_else(|| Error::UniformNotFound(id.to_owned()))
    }

    /// Exported function by name.
    pub fn function(&self, name: &str) -> Result<&'a FunctionDefinition> {
        self.env
            .catalog
            .get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_owned()))
    }

    /// Variable name, unique to this node and socket. The length prefix keeps the node id
    /// apart from the socket when either contains `_`.
    pub fn variable_name(&self, socket: &str) -> String {
        let id = sanitize(self.node.identifier.as_str());
        format!("n{}_{id}_{}", id.len(), sanitize(socket))
    }
}

/// Injective mapping of any name onto identifier characters.
///
/// Alphanumerics are kept and `X` is doubled. Any other character becomes `X<hex code>X`,
/// except an `_` between two non-underscores, so the result never starts or ends with `_`
/// and never contains `__` (reserved in GLSL).
pub fn sanitize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut sanitized = String::with_capacity(name.len());

    for (index, &c) in chars.iter().enumerate() {
        let inner = index > 0
            && index + 1 < chars.len()
            && chars[index - 1] != '_'
            && chars[index + 1] != '_';

        match c {
            'X' => sanitized.push_str("XX"),
            '_' if inner => sanitized.push('_'),
            c if c.is_ascii_alphanumeric() => sanitized.push(c),
            c => sanitized.push_str(&format!("X{:x}X", c as u32)),
        }
    }

    sanitized
}
