//! Assembly of a complete fragment shader around a compiled node.

use super::{
    nodes::{to_vec4, uniform_identifier, BUILTIN_INPUTS},
    Compiler,
};
use crate::{
    error::{Error, Result},
    graph::NodeId,
};

use std::collections::BTreeSet;

use log::debug;

impl Compiler {
    /// Fragment shader displaying the first output of a node.
    pub fn fragment_shader(&mut self, id: &NodeId) -> Result<String> {
        let context = self.compile(id)?;
        let (_, result) = context
            .outputs
            .iter()
            .next()
            .ok_or_else(|| Error::UnsupportedConversion(format!("node `{id}` has no output")))?;
        let color = to_vec4(result)?;

        let cone = self.store.upstream_order(id);
        let node_types: BTreeSet<&str> = cone
            .iter()
            .filter_map(|id| self.store.node(id))
            .map(|node| node.node_type.as_str())
            .collect();

        let mut lines = vec![
            format!("#version {}", self.options.version),
            format!("precision {} float;", self.options.precision),
            String::new(),
        ];

        lines.extend(
            BUILTIN_INPUTS
                .iter()
                .filter(|input| input.uniform && node_types.contains(input.node_type))
                .map(|input| format!("uniform {} {};", input.r#type, input.identifier)),
        );
        lines.extend(
            self.store
                .uniforms()
                .values()
                .map(|uniform| format!("uniform {} {};", uniform.r#type, uniform_identifier(&uniform.id))),
        );

        lines.push("in vec2 v_uv;".to_owned());
        lines.push(format!("out vec4 {};", self.options.output));
        lines.push(String::new());

        for include in self.store.includes() {
            if let Some(source) = &include.source {
                lines.push(source.trim_end().to_owned());
                lines.push(String::new());
            }
        }

        lines.push("void main() {".to_owned());
        for node in &cone {
            let Some(compiled) = self.engine.cached(node) else {
                continue;
            };
            lines.extend(compiled.variables.iter().map(|variable| {
                format!("    {} {} = {};", variable.r#type, variable.name, variable.data)
            }));
        }
        lines.push(format!("    {} = {};", self.options.output, color.data));
        lines.push("}".to_owned());

        debug!("Assembled fragment shader for `{id}` from {} node(s)", cone.len());
        Ok(lines.join("\n") + "\n")
    }
}
