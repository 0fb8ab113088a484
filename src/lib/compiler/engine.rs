//! Memoized per-node compilation.

use super::{
    context::{Context, Environment, NodeContext},
    nodes::{NodeInfo, SocketInfo, Sockets},
};
use crate::{
    error::{Error, Result},
    graph::{Name, NodeId, SocketRef},
    types::Type,
};

use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    rc::Rc,
};

use log::{debug, trace};

#[derive(Debug, Default)]
/// Cache of compiled nodes. A cached result stays valid until the node is invalidated.
pub struct Engine {
    cache: RefCell<HashMap<NodeId, Rc<Context>>>,
    /// Nodes currently being compiled, outermost first.
    stack: RefCell<Vec<NodeId>>,
    /// Nodes compiled since the last [take_compiled](Engine::take_compiled).
    compiled: RefCell<Vec<NodeId>>,
}

impl Engine {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a node, reusing the cached result when there is one.
    pub fn compile(&self, env: Environment, id: &NodeId) -> Result<Rc<Context>> {
        let node = env.store.try_node(id)?;

        if let Some(context) = self.cache.borrow().get(id) {
            trace!("Cache hit for `{id}`");
            return Ok(Rc::clone(context));
        }

        if let Some(start) = self.stack.borrow().iter().position(|other| other == id) {
            let mut cycle = self.stack.borrow()[start..].to_vec();
            cycle.push(id.clone());
            return Err(Error::CyclicGraph(cycle));
        }

        let compiler = env.registry.get(&node.node_type)?;

        self.stack.borrow_mut().push(id.clone());
        let result = compiler.compile(&NodeContext::new(self, env, node));
        self.stack.borrow_mut().pop();

        let context = Rc::new(result?);
        debug!("Compiled `{id}` ({})", node.node_type);

        self.cache.borrow_mut().insert(id.clone(), Rc::clone(&context));
        self.compiled.borrow_mut().push(id.clone());
        Ok(context)
    }

    /// Cached result of a node, without compiling it.
    pub fn cached(&self, id: &NodeId) -> Option<Rc<Context>> {
        self.cache.borrow().get(id).cloned()
    }

    /// Drop the cached results of the given nodes.
    pub fn invalidate<'a>(&self, ids: impl IntoIterator<Item = &'a NodeId>) {
        let mut cache = self.cache.borrow_mut();
        for id in ids {
            if cache.remove(id).is_some() {
                trace!("Evicted `{id}`");
            }
        }
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Nodes compiled since the previous call, in completion order.
    pub fn take_compiled(&self) -> Vec<NodeId> {
        std::mem::take(&mut *self.compiled.borrow_mut())
    }

    /// Declared type of an input socket of `id`, ignoring whatever currently feeds it.
    pub fn input_socket_type(&self, env: Environment, input: &SocketRef) -> Result<Type> {
        let node = env.store.try_node(&input.node_id)?;
        let compiler = env.registry.get(&node.node_type)?;
        let context = NodeContext::new(self, env, node).detach(&input.socket_id);

        compiler
            .sockets(&context)?
            .inputs
            .into_iter()
            .find(|socket| socket.name == input.socket_id)
            .map(|socket| socket.r#type)
            .ok_or_else(|| Error::SocketNotFound {
                node: input.node_id.clone(),
                socket: input.socket_id.clone(),
            })
    }

    /// Current type of an output socket, compiling its node if needed. A node that does not
    /// compile yet reports the type its compiler declares for the socket.
    pub fn output_socket_type(&self, env: Environment, output: &SocketRef) -> Result<Type> {
        let node = env.store.try_node(&output.node_id)?;

        let r#type = match self.compile(env, &output.node_id) {
            Ok(context) => context
                .outputs
                .get(&output.socket_id)
                .map(|expression| expression.r#type.clone()),
            Err(error) => {
                trace!("`{}` does not compile ({error}), using its declared sockets", node.identifier);
                env.registry
                    .get(&node.node_type)?
                    .sockets(&NodeContext::new(self, env, node))?
                    .outputs
                    .into_iter()
                    .find(|socket| socket.name == output.socket_id)
                    .map(|socket| socket.r#type)
            }
        };

        r#type.ok_or_else(|| Error::SocketNotFound {
                node: output.node_id.clone(),
                socket: output.socket_id.clone(),
            })
    }

    /// Describe the current sockets and state of a node. Problems with the node itself end up
    /// in [NodeInfo::error] instead of failing.
    pub fn describe(&self, env: Environment, id: &NodeId) -> Result<NodeInfo> {
        let node = env.store.try_node(id)?;

        let compiler = match env.registry.get(&node.node_type) {
            Ok(compiler) => compiler,
            Err(error) => {
                let mut info = NodeInfo::new(node, node.node_type.clone(), String::new());
                info.error = Some(error.to_string());
                self.add_orphan_sockets(env, id, &mut info);
                return Ok(info);
            }
        };

        let mut info = NodeInfo::new(node, compiler.label(), compiler.description());
        for (name, value) in compiler.default_parameters() {
            info.parameters.entry(name).or_insert(value);
        }

        let context = NodeContext::new(self, env, node);
        match compiler.sockets(&context) {
            Ok(Sockets { inputs, outputs }) => {
                info.inputs = inputs;
                info.outputs = outputs;
            }
            Err(error) => info.error = Some(error.to_string()),
        }

        if info.error.is_none() {
            if let Err(error) = self.compile(env, id) {
                info.error = Some(error.to_string());
            }
        }

        self.add_orphan_sockets(env, id, &mut info);
        Ok(info)
    }

    /// Connected sockets the compiler no longer declares stay visible, typed after the last
    /// known type of their connection.
    fn add_orphan_sockets(&self, env: Environment, id: &NodeId, info: &mut NodeInfo) {
        let Some(connected) = env.store.connected_sockets(id) else {
            return;
        };

        let declared = |sockets: &[SocketInfo]| -> BTreeSet<Name> {
            sockets.iter().map(|socket| socket.name.clone()).collect()
        };

        let inputs = declared(&info.inputs);
        for name in connected.inputs.iter().filter(|name| !inputs.contains(*name)) {
            let r#type = env
                .store
                .upstream(&SocketRef::new(id.clone(), name.clone()))
                .and_then(|connection| connection.r#type.clone())
                .unwrap_or(Type::Error);
            info.inputs.push(SocketInfo::new(name.clone(), r#type));
        }

        let outputs = declared(&info.outputs);
        for name in connected.outputs.keys().filter(|name| !outputs.contains(*name)) {
            let r#type = env
                .store
                .downstream(&SocketRef::new(id.clone(), name.clone()))
                .find_map(|connection| connection.r#type.clone())
                .unwrap_or(Type::Error);
            info.outputs.push(SocketInfo::new(name.clone(), r#type));
        }
    }
}
