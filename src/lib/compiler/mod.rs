//! Public editing and compilation surface.
//!
//! Every mutation goes through [Compiler], which applies it to the [GraphStore], evicts the
//! invalidated nodes from the compilation cache, hands the resulting [GraphDiff] to the
//! [GraphNotifier] and returns it.

pub mod builtins;
pub mod context;
pub mod engine;
pub mod nodes;
pub mod resolver;
mod shader;

use self::{
    context::{Context, Environment},
    engine::Engine,
    nodes::{NodeInfo, Registry, DEFAULT_REGISTRY},
};
use crate::{
    catalog::{parse_fragment, FunctionCatalog, NoSources, SourceResolver},
    error::{Error, Result},
    graph::{
        diff::GraphDiff, reconcile::reconcile, store::GraphStore, Connection, ConnectionId, Graph,
        Name, Node, NodeId, ParameterValue, Position, SocketRef, Uniform,
    },
};

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
};

use log::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Settings of the generated fragment shader.
pub struct CompilerOptions {
    /// Argument of the `#version` directive.
    pub version: String,
    /// Default float precision.
    pub precision: String,
    /// Name of the fragment color output.
    pub output: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            version: "300 es".to_owned(),
            precision: "highp".to_owned(),
            output: "fragColor".to_owned(),
        }
    }
}

/// Receives every diff produced by a [Compiler] mutation.
pub trait GraphNotifier {
    #[allow(missing_docs)]
    fn notify(&mut self, diff: &GraphDiff);
}

impl<F: FnMut(&GraphDiff)> GraphNotifier for F {
    fn notify(&mut self, diff: &GraphDiff) {
        self(diff)
    }
}

/// Live graph with incremental compilation.
pub struct Compiler {
    store: GraphStore,
    engine: Engine,
    registry: Registry,
    catalog: FunctionCatalog,
    resolver: Box<dyn SourceResolver>,
    notifier: Option<Box<dyn GraphNotifier>>,
    options: CompilerOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Empty graph using the built-in node types, without any include source.
    pub fn new() -> Self {
        Self {
            store: GraphStore::new(),
            engine: Engine::new(),
            registry: DEFAULT_REGISTRY.clone(),
            catalog: FunctionCatalog::default(),
            resolver: Box::new(NoSources),
            notifier: None,
            options: CompilerOptions::default(),
        }
    }

    /// Builder-style options setter.
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder-style include resolver setter.
    pub fn with_resolver(mut self, resolver: impl SourceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Builder-style registry setter. Cached results are dropped.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self.engine.clear();
        self
    }

    /// Send every future diff to `notifier`.
    pub fn set_notifier(&mut self, notifier: impl GraphNotifier + 'static) {
        self.notifier = Some(Box::new(notifier));
    }

    #[allow(missing_docs)]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    #[allow(missing_docs)]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serializable snapshot of the graph.
    pub fn graph(&self) -> Graph {
        self.store.snapshot()
    }

    #[allow(missing_docs)]
    pub fn uniforms(&self) -> &BTreeMap<String, Uniform> {
        self.store.uniforms()
    }

    /// Functions exported by the includes.
    pub fn functions(&self) -> &FunctionCatalog {
        &self.catalog
    }

    fn env(&self) -> Environment<'_> {
        Environment {
            store: &self.store,
            registry: &self.registry,
            catalog: &self.catalog,
        }
    }

    /// Evict what the diff invalidated and notify.
    fn commit(&mut self, diff: GraphDiff) -> GraphDiff {
        if !diff.invalidated.is_empty() {
            debug!("Invalidating {} node(s)", diff.invalidated.len());
        }
        self.engine.invalidate(&diff.invalidated);

        if !diff.is_empty() {
            if let Some(notifier) = &mut self.notifier {
                notifier.notify(&diff);
            }
        }

        diff
    }

    /// Add a node of the given type with a fresh identifier and default parameters.
    pub fn add_node(&mut self, node_type: &str, position: Position) -> Result<GraphDiff> {
        let parameters = self.registry.get(node_type)?.default_parameters();

        let node = Node {
            identifier: self.store.unique_id(node_type),
            node_type: node_type.to_owned(),
            position,
            parameters,
        };

        let diff = self.store.insert_node(node)?;
        Ok(self.commit(diff))
    }

    /// Add a node under its own identifier.
    pub fn insert_node(&mut self, node: Node) -> Result<GraphDiff> {
        let diff = self.store.insert_node(node)?;
        Ok(self.commit(diff))
    }

    /// Add several nodes. Nothing is added if any identifier is already taken.
    pub fn insert_nodes(&mut self, nodes: Vec<Node>) -> Result<GraphDiff> {
        let mut seen = BTreeSet::new();
        for node in &nodes {
            if self.store.contains(&node.identifier) || !seen.insert(&node.identifier) {
                return Err(Error::DuplicateNodeIdentifier(node.identifier.clone()));
            }
        }

        let mut diff = GraphDiff::default();
        for node in nodes {
            diff += self.store.insert_node(node)?;
        }
        Ok(self.commit(diff))
    }

    /// Remove a node and its connections.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<GraphDiff> {
        let diff = self.store.remove_node(id)?;
        Ok(self.commit(diff))
    }

    /// Remove several nodes. Nothing is removed if any of them does not exist.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> Result<GraphDiff> {
        let ids: BTreeSet<&NodeId> = ids.iter().collect();
        for id in &ids {
            self.store.try_node(id)?;
        }

        let mut diff = GraphDiff::default();
        for id in ids {
            diff += self.store.remove_node(id)?;
        }
        Ok(self.commit(diff))
    }

    /// Connect an output to an input, replacing the connection currently feeding the input.
    pub fn add_connection(&mut self, from: SocketRef, to: SocketRef) -> Result<GraphDiff> {
        let diff = self.connect(Connection::new(from, to))?;
        Ok(self.commit(diff))
    }

    fn connect(&mut self, connection: Connection) -> Result<GraphDiff> {
        for endpoint in [&connection.from, &connection.to] {
            self.store.try_node(&endpoint.node_id)?;
        }

        let mut diff = GraphDiff::default();
        if let Some(existing) = self.store.upstream(&connection.to) {
            let existing = existing.id();
            if existing == connection.id() {
                return Err(Error::DuplicateConnection(existing));
            }
            diff += self.store.remove_connection(&existing);
        }

        diff += self.store.insert_connection(connection)?;
        Ok(diff)
    }

    /// Add several connections. Failing connections are skipped and reported as warnings.
    pub fn add_connections(&mut self, connections: Vec<Connection>) -> GraphDiff {
        let mut diff = GraphDiff::default();

        for connection in connections {
            let id = connection.id();
            match self.connect(connection) {
                Ok(added) => diff += added,
                Err(error) => {
                    warn!("Skipping connection {id}: {error}");
                    diff += GraphDiff::warning(format!("{id}: {error}"));
                }
            }
        }

        self.commit(diff)
    }

    /// Remove a connection; removing an absent connection is a no-op.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> GraphDiff {
        let diff = self.store.remove_connection(id);
        self.commit(diff)
    }

    #[allow(missing_docs)]
    pub fn remove_connections(&mut self, ids: &[ConnectionId]) -> GraphDiff {
        let diff = ids.iter().map(|id| self.store.remove_connection(id)).sum();
        self.commit(diff)
    }

    /// Set a node parameter.
    pub fn update_parameter(
        &mut self,
        id: &NodeId,
        name: Name,
        value: ParameterValue,
    ) -> Result<GraphDiff> {
        let diff = self.store.update_parameter(id, name, value)?;
        Ok(self.commit(diff))
    }

    /// Move a node on the canvas.
    pub fn translate_node(&mut self, id: &NodeId, dx: f64, dy: f64) -> Result<GraphDiff> {
        let diff = self.store.translate_node(id, dx, dy)?;
        Ok(self.commit(diff))
    }

    /// Nodes of a type whose text parameter `name` equals `value`.
    fn nodes_referencing(&self, node_type: &str, name: &str, value: &str) -> Vec<NodeId> {
        let name = Name::from(name);
        self.store
            .nodes()
            .filter(|node| node.node_type == node_type)
            .filter(|node| {
                node.parameters
                    .get(&name)
                    .and_then(ParameterValue::as_text)
                    .is_some_and(|text| text == value)
            })
            .map(|node| node.identifier.clone())
            .collect()
    }

    /// Rebuild the function catalog and invalidate every custom function node.
    fn rebuild_catalog(&mut self) -> GraphDiff {
        let (catalog, errors) = FunctionCatalog::from_includes(self.store.includes());
        self.catalog = catalog;

        let mut diff = GraphDiff::default();
        for error in errors {
            warn!("{error}");
            diff += GraphDiff::warning(error.to_string());
        }

        let function_nodes: Vec<NodeId> = self
            .store
            .nodes()
            .filter(|node| node.node_type == "function")
            .map(|node| node.identifier.clone())
            .collect();
        diff.invalidated = self.store.downstream_closure(&function_nodes);
        diff
    }

    /// Include a source fragment. A fragment that fails to parse is not added; one that
    /// cannot be resolved is recorded with a warning and contributes no function.
    pub fn add_include(&mut self, path: &str) -> Result<GraphDiff> {
        let source = self
            .resolver
            .resolve(&[path.to_owned()])
            .into_iter()
            .next()
            .flatten();

        if let Some(source) = &source {
            parse_fragment(path, source)?;
        }

        let mut diff = GraphDiff::default();
        if source.is_none() {
            warn!("Include `{path}` could not be resolved");
            diff += GraphDiff::warning(format!("Include `{path}` could not be resolved"));
        }

        diff += self.store.add_include(path, source);
        diff += self.rebuild_catalog();
        Ok(self.commit(diff))
    }

    /// Forget an include and the functions it exported.
    pub fn remove_include(&mut self, path: &str) -> GraphDiff {
        let mut diff = self.store.remove_include(path);
        if !diff.is_empty() {
            diff += self.rebuild_catalog();
        }
        self.commit(diff)
    }

    fn set_uniform(&mut self, uniform: Uniform) -> GraphDiff {
        let users = self.nodes_referencing("custom_uniform", "uniform", &uniform.id);
        let mut diff = self.store.set_uniform(uniform);
        if !diff.is_empty() {
            diff.invalidated = self.store.downstream_closure(&users);
        }
        diff
    }

    fn unset_uniform(&mut self, id: &str) -> GraphDiff {
        let mut diff = self.store.remove_uniform(id);
        if !diff.is_empty() {
            let users = self.nodes_referencing("custom_uniform", "uniform", id);
            diff.invalidated = self.store.downstream_closure(&users);
        }
        diff
    }

    /// Add or replace a uniform.
    pub fn update_uniform(&mut self, uniform: Uniform) -> GraphDiff {
        let diff = self.set_uniform(uniform);
        self.commit(diff)
    }

    #[allow(missing_docs)]
    pub fn update_uniforms(&mut self, uniforms: Vec<Uniform>) -> GraphDiff {
        let diff = uniforms
            .into_iter()
            .map(|uniform| self.set_uniform(uniform))
            .sum();
        self.commit(diff)
    }

    /// Remove a uniform; removing an absent uniform is a no-op.
    pub fn remove_uniform(&mut self, id: &str) -> GraphDiff {
        let diff = self.unset_uniform(id);
        self.commit(diff)
    }

    #[allow(missing_docs)]
    pub fn remove_uniforms(&mut self, ids: &[String]) -> GraphDiff {
        let diff = ids.iter().map(|id| self.unset_uniform(id)).sum();
        self.commit(diff)
    }

    /// Bring the live graph to `graph`, patching nodes present in both in place.
    pub fn load_graph(&mut self, graph: Graph) -> GraphDiff {
        let changes = reconcile(&self.store, &graph);
        if changes.is_empty() {
            return GraphDiff::default();
        }

        debug!("Reconciling graph: {changes:?}");
        let mut diff = GraphDiff::default();

        for id in &changes.removed_connections {
            diff += self.store.remove_connection(id);
        }
        for id in &changes.removed_nodes {
            match self.store.remove_node(id) {
                Ok(removed) => diff += removed,
                Err(error) => diff += GraphDiff::warning(error.to_string()),
            }
        }
        for id in &changes.removed_uniforms {
            diff += self.unset_uniform(id);
        }
        for path in &changes.removed_includes {
            diff += self.store.remove_include(path);
        }

        let sources = self.resolver.resolve(&changes.added_includes);
        for (path, source) in changes.added_includes.iter().zip(sources) {
            if source.is_none() {
                diff += GraphDiff::warning(format!("Include `{path}` could not be resolved"));
            }
            diff += self.store.add_include(path, source);
        }
        if !changes.removed_includes.is_empty() || !changes.added_includes.is_empty() {
            diff += self.rebuild_catalog();
        }

        for uniform in changes.updated_uniforms {
            diff += self.set_uniform(uniform);
        }

        for node in changes.added_nodes {
            match self.store.insert_node(node) {
                Ok(added) => diff += added,
                Err(error) => diff += GraphDiff::warning(error.to_string()),
            }
        }
        for connection in changes.added_connections {
            let id = connection.id();
            match self.store.insert_connection(connection) {
                Ok(added) => diff += added,
                Err(error) => diff += GraphDiff::warning(format!("{id}: {error}")),
            }
        }
        for node in changes.modified_nodes {
            match self.store.patch_node(node) {
                Ok(patched) => diff += patched,
                Err(error) => diff += GraphDiff::warning(error.to_string()),
            }
        }

        self.commit(diff)
    }

    /// Standalone graph holding the given nodes, the connections between them, the uniforms
    /// they reference and every include.
    pub fn copy_nodes(&self, ids: &[NodeId]) -> Result<Graph> {
        for id in ids {
            self.store.try_node(id)?;
        }
        let selected: BTreeSet<&NodeId> = ids.iter().collect();

        let nodes: Vec<Node> = self
            .store
            .nodes()
            .filter(|node| selected.contains(&node.identifier))
            .cloned()
            .collect();

        let connections = self
            .store
            .connections()
            .into_iter()
            .filter(|connection| {
                selected.contains(&connection.from.node_id) && selected.contains(&connection.to.node_id)
            })
            .cloned()
            .collect();

        let uniforms = nodes
            .iter()
            .filter(|node| node.node_type == "custom_uniform")
            .filter_map(|node| node.parameters.get(&Name::from("uniform"))?.as_text())
            .filter_map(|id| self.store.uniform(id))
            .map(|uniform| (uniform.id.clone(), uniform.clone()))
            .collect();

        Ok(Graph {
            includes: self.graph().includes,
            nodes,
            connections,
            uniforms,
            ..Default::default()
        })
    }

    /// Add the content of a copied graph under fresh identifiers, offset by `(dx, dy)`.
    /// Existing uniforms and includes are kept as they are.
    pub fn paste_nodes(&mut self, graph: Graph, dx: f64, dy: f64) -> GraphDiff {
        let mut diff = GraphDiff::default();
        let mut renamed: HashMap<NodeId, NodeId> = HashMap::new();

        let missing_includes: Vec<String> = graph
            .includes
            .into_iter()
            .filter(|path| !self.store.includes().iter().any(|include| &include.path == path))
            .collect();
        let sources = self.resolver.resolve(&missing_includes);
        for (path, source) in missing_includes.iter().zip(sources) {
            diff += self.store.add_include(path, source);
        }
        if !missing_includes.is_empty() {
            diff += self.rebuild_catalog();
        }

        for uniform in graph.uniforms.into_values() {
            if self.store.uniform(&uniform.id).is_none() {
                diff += self.set_uniform(uniform);
            }
        }

        for mut node in graph.nodes {
            let id = self.store.unique_id(&node.node_type);
            renamed.insert(node.identifier.clone(), id.clone());
            node.identifier = id;
            node.position.translate(dx, dy);

            match self.store.insert_node(node) {
                Ok(added) => diff += added,
                Err(error) => diff += GraphDiff::warning(error.to_string()),
            }
        }

        for connection in graph.connections {
            let (Some(from), Some(to)) = (
                renamed.get(&connection.from.node_id),
                renamed.get(&connection.to.node_id),
            ) else {
                diff += GraphDiff::warning(format!(
                    "{}: endpoint missing from the pasted nodes",
                    connection.id()
                ));
                continue;
            };

            let connection = Connection::new(
                SocketRef::new(from.clone(), connection.from.socket_id),
                SocketRef::new(to.clone(), connection.to.socket_id),
            );
            match self.connect(connection) {
                Ok(added) => diff += added,
                Err(error) => diff += GraphDiff::warning(error.to_string()),
            }
        }

        self.commit(diff)
    }

    /// Compile a node, reusing every cached result still valid.
    pub fn compile(&mut self, id: &NodeId) -> Result<Rc<Context>> {
        let context = self.engine.compile(self.env(), id)?;
        self.refresh_connection_types();
        Ok(context)
    }

    /// Record the output types of freshly compiled nodes on their outgoing connections.
    fn refresh_connection_types(&mut self) {
        let mut updates = Vec::new();

        for id in self.engine.take_compiled() {
            let Some(context) = self.engine.cached(&id) else {
                continue;
            };

            for connection in self.store.outgoing(&id) {
                if let Some(expression) = context.outputs.get(&connection.from.socket_id) {
                    updates.push((connection.id(), expression.r#type.clone()));
                }
            }
        }

        for (id, r#type) in updates {
            self.store.set_connection_type(&id, r#type);
        }
    }

    /// Check whether `from` may feed `to`. Self connections and connections closing a cycle
    /// are refused; otherwise the types must convert, implicitly if the consuming node allows
    /// it and strictly if not.
    pub fn can_connect(&self, from: &SocketRef, to: &SocketRef) -> Result<bool> {
        let consumer = self.store.try_node(&to.node_id)?;
        self.store.try_node(&from.node_id)?;

        if from.node_id == to.node_id
            || self
                .store
                .downstream_closure([&to.node_id])
                .contains(&from.node_id)
        {
            return Ok(false);
        }

        let output = self.engine.output_socket_type(self.env(), from)?;
        let input = self.engine.input_socket_type(self.env(), to)?;

        Ok(if self.registry.get(&consumer.node_type)?.can_implicitly_cast_input() {
            output.can_implicitly_convert(&input)
        } else {
            output.can_strictly_convert(&input)
        })
    }

    /// Describe the given nodes. Nodes that fail to compile carry an error message instead of
    /// failing the whole call.
    pub fn get_info(&self, ids: &[NodeId]) -> Result<Vec<NodeInfo>> {
        ids.iter()
            .map(|id| self.engine.describe(self.env(), id))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{sref, types::Type};

    use std::cell::RefCell;

    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    fn ids(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|&id| NodeId::from(id)).collect()
    }

    /// a -> b -> c, d -> c
    fn chain() -> Compiler {
        let mut compiler = Compiler::new();
        compiler
            .insert_nodes(vec![
                Node::new("a", "float").with("value", 1.),
                Node::new("b", "sin"),
                Node::new("c", "add"),
                Node::new("d", "float").with("value", 2.),
            ])
            .unwrap();
        compiler
            .add_connections(vec![
                Connection::new(sref!(node "a" "out"), sref!(node "b" "x")),
                Connection::new(sref!(node "b" "out"), sref!(node "c" "a")),
                Connection::new(sref!(node "d" "out"), sref!(node "c" "b")),
            ]);
        compiler
    }

    #[test]
    fn cached_results_are_shared() {
        let mut compiler = chain();

        let first = compiler.compile(&"c".into()).unwrap();
        let second = compiler.compile(&"c".into()).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.output("out").unwrap().data, "(sin(1.0) + 2.0)");
    }

    #[test]
    fn invalidated_nodes_are_rebuilt() {
        let mut compiler = chain();
        let before_c = compiler.compile(&"c".into()).unwrap();
        let before_d = compiler.compile(&"d".into()).unwrap();

        let diff = compiler
            .update_parameter(&"a".into(), "value".into(), 3.0.into())
            .unwrap();
        assert_eq!(diff.invalidated, ids(&["a", "b", "c"]));

        let after_c = compiler.compile(&"c".into()).unwrap();
        assert!(!Rc::ptr_eq(&before_c, &after_c));
        assert_eq!(after_c.output("out").unwrap().data, "(sin(3.0) + 2.0)");
        assert!(Rc::ptr_eq(&before_d, &compiler.compile(&"d".into()).unwrap()));
    }

    #[test]
    fn missing_nodes() {
        let mut compiler = chain();
        assert_eq!(
            compiler.compile(&"zz".into()).err(),
            Some(Error::NodeNotFound("zz".into()))
        );
    }

    #[test]
    fn cycles_fail_fast() {
        let mut compiler = chain();
        compiler.insert_node(Node::new("n", "negate")).unwrap();
        compiler
            .add_connection(sref!(node "c" "out"), sref!(node "n" "a"))
            .unwrap();
        compiler
            .add_connection(sref!(node "n" "out"), sref!(node "b" "x"))
            .unwrap();

        assert!(matches!(
            compiler.compile(&"c".into()),
            Err(Error::CyclicGraph(cycle)) if cycle.first() == cycle.last()
        ));
    }

    #[test]
    fn connecting_into_an_occupied_input_replaces_it() {
        let mut compiler = chain();

        let diff = compiler
            .add_connection(sref!(node "d" "out"), sref!(node "b" "x"))
            .unwrap();
        assert_eq!(diff.removed_connections.len(), 1);
        assert_eq!(diff.removed_connections[0].from, sref!(node "a" "out"));
        assert_eq!(diff.added_connections.len(), 1);

        assert_eq!(
            compiler.add_connection(sref!(node "d" "out"), sref!(node "b" "x")),
            Err(Error::DuplicateConnection(
                Connection::new(sref!(node "d" "out"), sref!(node "b" "x")).id()
            ))
        );
    }

    #[test]
    fn bad_connections_in_a_batch_become_warnings() {
        let mut compiler = chain();
        compiler.insert_node(Node::new("e", "float")).unwrap();

        let diff = compiler.add_connections(vec![
            Connection::new(sref!(node "ghost" "out"), sref!(node "c" "a")),
            Connection::new(sref!(node "a" "out"), sref!(node "b" "x")),
            Connection::new(sref!(node "e" "out"), sref!(node "c" "a")),
        ]);

        assert_eq!(diff.warnings.len(), 2);
        assert_eq!(diff.added_connections.len(), 1);
    }

    #[test]
    fn can_connect() {
        let mut compiler = chain();
        compiler
            .insert_nodes(vec![
                Node::new("v", "vec2"),
                Node::new("m", "min"),
                Node::new("i", "int"),
            ])
            .unwrap();
        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "m" "x"))
            .unwrap();

        // Cycles and self loops.
        assert!(!compiler.can_connect(&sref!(node "c" "out"), &sref!(node "a" "x")).unwrap());
        assert!(!compiler.can_connect(&sref!(node "b" "out"), &sref!(node "b" "x")).unwrap());

        // Strict conversion for functions.
        assert!(compiler.can_connect(&sref!(node "d" "out"), &sref!(node "m" "y")).unwrap());
        assert!(!compiler.can_connect(&sref!(node "i" "out"), &sref!(node "m" "y")).unwrap());

        // The input being replaced does not constrain its own type.
        compiler.insert_node(Node::new("v3", "vec3")).unwrap();
        assert!(compiler.can_connect(&sref!(node "v3" "out"), &sref!(node "m" "x")).unwrap());

        // Implicit conversion for constructors.
        assert!(compiler.can_connect(&sref!(node "i" "out"), &sref!(node "v" "y")).unwrap());

        // Producers that do not compile yet use their declared type.
        compiler.insert_node(Node::new("open", "add")).unwrap();
        assert!(compiler.can_connect(&sref!(node "open" "out"), &sref!(node "c" "b")).unwrap());

        assert!(matches!(
            compiler.can_connect(&sref!(node "d" "out"), &sref!(node "m" "nope")),
            Err(Error::SocketNotFound { .. })
        ));
    }

    #[test]
    fn info_reports_errors_per_node() {
        let mut compiler = chain();
        compiler
            .insert_nodes(vec![Node::new("broken", "add"), Node::new("alien", "teapot")])
            .unwrap();

        let infos = compiler
            .get_info(&["c".into(), "broken".into(), "alien".into()])
            .unwrap();

        assert_eq!(infos[0].error, None);
        assert_eq!(infos[0].label, "Add");
        assert!(infos[1].error.is_some());
        assert_eq!(infos[1].inputs.len(), 2);
        assert_eq!(
            infos[2].error,
            Some(Error::UnknownNodeType("teapot".into()).to_string())
        );

        assert!(compiler.get_info(&["ghost".into()]).is_err());
    }

    #[test]
    fn orphan_sockets_stay_visible() {
        let mut compiler = chain();
        compiler.compile(&"c".into()).unwrap();

        // `b` turns into a node without any `x` input.
        let mut graph = compiler.graph();
        graph.nodes[1].node_type = "time".to_owned();
        compiler.load_graph(graph);

        let info = compiler.get_info(&["b".into()]).unwrap().remove(0);
        assert_eq!(info.inputs.len(), 1);
        assert_eq!(info.inputs[0].name, Name::from("x"));
        assert_eq!(info.inputs[0].r#type, Type::FLOAT);
    }

    #[test]
    fn connection_types_follow_compilation() {
        let mut compiler = chain();
        let id = Connection::new(sref!(node "a" "out"), sref!(node "b" "x")).id();
        assert_eq!(compiler.store().connection(&id).unwrap().r#type, None);

        compiler.compile(&"b".into()).unwrap();
        assert_eq!(
            compiler.store().connection(&id).unwrap().r#type,
            Some(Type::FLOAT)
        );
    }

    #[test]
    fn add_node_uses_fresh_ids_and_defaults() {
        let mut compiler = Compiler::new();

        let first = compiler.add_node("vec2", Position::new(1., 2.)).unwrap();
        let second = compiler.add_node("vec2", Position::default()).unwrap();

        assert_eq!(first.added_nodes[0].identifier, NodeId::from("vec2_1"));
        assert_eq!(second.added_nodes[0].identifier, NodeId::from("vec2_2"));
        assert_eq!(
            first.added_nodes[0].parameters.get(&Name::from("y")),
            Some(&ParameterValue::Number(0.))
        );
        assert_eq!(
            compiler.add_node("teapot", Position::default()),
            Err(Error::UnknownNodeType("teapot".into()))
        );
    }

    #[test]
    fn batches_are_all_or_nothing() {
        let mut compiler = chain();

        assert_eq!(
            compiler.insert_nodes(vec![Node::new("x", "float"), Node::new("a", "float")]),
            Err(Error::DuplicateNodeIdentifier("a".into()))
        );
        assert!(compiler.store().node(&"x".into()).is_none());

        assert!(compiler.remove_nodes(&["a".into(), "ghost".into()]).is_err());
        assert!(compiler.store().contains(&"a".into()));

        let diff = compiler.remove_nodes(&["a".into(), "d".into()]).unwrap();
        assert_eq!(diff.removed_nodes.len(), 2);
        assert_eq!(diff.invalidated, ids(&["a", "b", "c", "d"]));
    }

    #[test]
    fn load_graph_patches_in_place() {
        let mut compiler = chain();
        let before_d = compiler.compile(&"d".into()).unwrap();

        let mut graph = compiler.graph();
        graph.nodes[0].position = Position::new(40., 0.);
        graph.nodes[0]
            .parameters
            .insert("value".into(), ParameterValue::Number(5.));
        graph.nodes.push(Node::new("t", "time"));
        graph
            .connections
            .retain(|connection| connection.to != sref!(node "c" "b"));
        graph
            .connections
            .push(Connection::new(sref!(node "t" "out"), sref!(node "c" "b")));

        let diff = compiler.load_graph(graph.clone());

        assert_eq!(diff.modified_nodes, vec![NodeId::from("a")]);
        assert_eq!(diff.added_nodes, vec![Node::new("t", "time")]);
        assert_eq!(diff.removed_connections.len(), 1);
        assert_eq!(diff.added_connections.len(), 1);
        assert!(diff.removed_nodes.is_empty());
        assert!(diff.invalidated.contains(&NodeId::from("c")));
        assert!(!diff.invalidated.contains(&NodeId::from("d")));

        assert!(Rc::ptr_eq(&before_d, &compiler.compile(&"d".into()).unwrap()));
        assert_eq!(
            compiler.compile(&"c".into()).unwrap().output("out").unwrap().data,
            "(sin(5.0) + u_time)"
        );
        assert_float_eq!(
            compiler.store().node(&"a".into()).unwrap().position.x,
            40.,
            abs <= f64::EPSILON
        );

        assert!(compiler.load_graph(graph).is_empty());
    }

    #[test]
    fn copy_and_paste() {
        let mut compiler = chain();
        compiler.update_uniform(Uniform::new("tint", Type::VEC3));
        compiler
            .insert_node(Node::new("u", "custom_uniform").with("uniform", "tint"))
            .unwrap();

        let copied = compiler
            .copy_nodes(&["a".into(), "b".into(), "u".into()])
            .unwrap();
        assert_eq!(copied.nodes.len(), 3);
        assert_eq!(copied.connections.len(), 1);
        assert_eq!(copied.uniforms.len(), 1);

        let diff = compiler.paste_nodes(copied, 10., 5.);
        let pasted: Vec<_> = diff
            .added_nodes
            .iter()
            .map(|node| node.identifier.as_str())
            .collect();
        assert_eq!(pasted, vec!["float_1", "sin_1", "custom_uniform_1"]);
        assert_eq!(
            diff.added_connections,
            vec![Connection::new(sref!(node "float_1" "out"), sref!(node "sin_1" "x"))]
        );
        assert!(diff.updated_uniforms.is_empty());
        assert!(diff.warnings.is_empty());

        let position = compiler.store().node(&"sin_1".into()).unwrap().position;
        assert_float_eq!(position.x, 10., abs <= f64::EPSILON);
        assert_float_eq!(position.y, 5., abs <= f64::EPSILON);

        assert!(compiler.copy_nodes(&["ghost".into()]).is_err());
    }

    #[test]
    fn uniform_edits_invalidate_their_users() {
        let mut compiler = Compiler::new();
        compiler
            .insert_nodes(vec![
                Node::new("u", "custom_uniform").with("uniform", "tint"),
                Node::new("out", "output"),
                Node::new("other", "time"),
            ])
            .unwrap();
        compiler
            .add_connection(sref!(node "u" "out"), sref!(node "out" "color"))
            .unwrap();

        let diff = compiler.update_uniforms(vec![Uniform::new("tint", Type::VEC3)]);
        assert_eq!(diff.invalidated, ids(&["out", "u"]));

        assert!(compiler
            .update_uniform(Uniform::new("tint", Type::VEC3))
            .is_empty());

        let diff = compiler.remove_uniforms(&["tint".to_owned(), "ghost".to_owned()]);
        assert_eq!(diff.removed_uniforms, vec!["tint".to_owned()]);
        assert_eq!(diff.invalidated, ids(&["out", "u"]));
    }

    #[test]
    fn includes() {
        let sources = HashMap::from([
            (
                "lib.glsl".to_owned(),
                "#pragma editor: export\nfloat twice(float x) { return 2.0 * x; }\n".to_owned(),
            ),
            ("broken.glsl".to_owned(), "float (".to_owned()),
        ]);
        let mut compiler = Compiler::new().with_resolver(sources);
        compiler
            .insert_node(Node::new("f", "function").with("function", "twice"))
            .unwrap();
        assert!(compiler.compile(&"f".into()).is_err());

        let diff = compiler.add_include("lib.glsl").unwrap();
        assert_eq!(diff.added_includes, vec!["lib.glsl".to_owned()]);
        assert!(diff.invalidated.contains(&NodeId::from("f")));
        assert!(compiler.functions().get("twice").is_some());
        assert_eq!(
            compiler.compile(&"f".into()).unwrap().output("out").unwrap().data,
            "twice(0.0)"
        );

        assert!(matches!(
            compiler.add_include("broken.glsl"),
            Err(Error::Parse(_))
        ));
        assert_eq!(compiler.graph().includes, vec!["lib.glsl".to_owned()]);

        let diff = compiler.add_include("missing.glsl").unwrap();
        assert_eq!(diff.warnings.len(), 1);
        assert_eq!(compiler.graph().includes.len(), 2);

        let diff = compiler.remove_include("lib.glsl");
        assert_eq!(diff.removed_includes, vec!["lib.glsl".to_owned()]);
        assert!(compiler.functions().is_empty());
        assert_eq!(
            compiler.compile(&"f".into()).err(),
            Some(Error::FunctionNotFound("twice".into()))
        );
    }

    #[test]
    fn notifier_sees_every_non_empty_diff() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut compiler = Compiler::new();
        {
            let seen = Rc::clone(&seen);
            compiler.set_notifier(move |diff: &GraphDiff| seen.borrow_mut().push(diff.clone()));
        }

        compiler.insert_node(Node::new("a", "float")).unwrap();
        compiler.translate_node(&"a".into(), 1., 1.).unwrap();
        compiler.remove_connection(
            &Connection::new(sref!(node "a" "out"), sref!(node "a" "x")).id(),
        );

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].added_nodes.len(), 1);
        assert_eq!(seen[1].modified_nodes, vec![NodeId::from("a")]);
    }
}
