use std::{fs, path::PathBuf};

use anyhow::{bail, Context as _};
use clap::Parser;
use log::{info, warn};

use shadegraph::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "shadegraph")]
#[command(about = "Compile a node of a shader graph into a fragment shader")]
struct Args {
    /// Graph document, as JSON
    graph: PathBuf,

    /// Node to compile
    node: String,

    /// Directory includes are resolved from, defaults to the graph's directory
    #[arg(long)]
    root: Option<PathBuf>,

    /// Argument of the `#version` directive
    #[arg(long = "version-directive", default_value = "300 es")]
    version_directive: String,

    /// Print the node's sockets and state as JSON instead of a shader
    #[arg(long)]
    info: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let json = fs::read_to_string(&args.graph)
        .with_context(|| format!("Could not read `{}`", args.graph.display()))?;
    let graph = Graph::from_json(&json)
        .with_context(|| format!("`{}` is not a valid graph", args.graph.display()))?;

    let root = args.root.clone().unwrap_or_else(|| {
        args.graph
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default()
    });
    info!("Resolving includes from `{}`", root.display());

    let mut compiler = Compiler::new()
        .with_resolver(FsResolver::new(root))
        .with_options(CompilerOptions {
            version: args.version_directive.clone(),
            ..Default::default()
        });

    let diff = compiler.load_graph(graph);
    for warning in &diff.warnings {
        warn!("{warning}");
    }

    let id = NodeId::from(args.node.as_str());
    if args.info {
        let info = compiler.get_info(&[id])?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    match compiler.fragment_shader(&id) {
        Ok(shader) => print!("{shader}"),
        Err(error) => bail!("Could not compile `{id}`: {error}"),
    }

    Ok(())
}
