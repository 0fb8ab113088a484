use super::{NodeCompiler, Sockets};
use crate::{
    compiler::context::{sanitize, Context, Expression, NodeContext},
    error::Result,
    graph::{ParameterValue, Parameters},
    types::Type,
};

use lazy_static::lazy_static;
use map_macro::btree_map;

#[derive(Clone, Debug, PartialEq)]
/// Value provided by the shader environment itself.
pub struct BuiltinInput {
    /// Node type.
    pub node_type: &'static str,
    #[allow(missing_docs)]
    pub label: &'static str,
    /// Name of the value in the generated source.
    pub identifier: &'static str,
    #[allow(missing_docs)]
    pub r#type: Type,
    /// Whether the value must be declared as a uniform.
    pub uniform: bool,
}

lazy_static! {
    /// Every built-in input.
    pub static ref BUILTIN_INPUTS: Vec<BuiltinInput> = vec![
        BuiltinInput {
            node_type: "time",
            label: "Time",
            identifier: "u_time",
            r#type: Type::FLOAT,
            uniform: true,
        },
        BuiltinInput {
            node_type: "resolution",
            label: "Resolution",
            identifier: "u_resolution",
            r#type: Type::VEC2,
            uniform: true,
        },
        BuiltinInput {
            node_type: "uv",
            label: "UV",
            identifier: "v_uv",
            r#type: Type::VEC2,
            uniform: false,
        },
        BuiltinInput {
            node_type: "frag_coord",
            label: "Fragment coordinates",
            identifier: "gl_FragCoord",
            r#type: Type::VEC4,
            uniform: false,
        },
    ];
}

impl NodeCompiler for BuiltinInput {
    fn label(&self) -> String {
        self.label.to_owned()
    }

    fn description(&self) -> String {
        format!("`{}` provided by the renderer", self.identifier)
    }

    fn sockets(&self, _context: &NodeContext) -> Result<Sockets> {
        Ok(Sockets::default().output("out", self.r#type.clone()))
    }

    fn compile(&self, _context: &NodeContext) -> Result<Context> {
        Ok(Context::default().with_output(
            "out",
            Expression::trivial(self.r#type.clone(), self.identifier),
        ))
    }
}

/// Name of a graph uniform in the generated source.
pub fn uniform_identifier(id: &str) -> String {
    format!("u_{}", sanitize(id))
}

#[derive(Clone, Copy, Debug, Default)]
/// Reference to a graph uniform, named by the `uniform` parameter.
pub struct CustomUniformCompiler;

impl CustomUniformCompiler {
    fn uniform_type(context: &NodeContext) -> Result<(String, Type)> {
        let id = context.param_or("uniform", String::new())?;
        let r#type = context.uniform(&id)?.r#type.clone();
        Ok((id, r#type))
    }
}

impl NodeCompiler for CustomUniformCompiler {
    fn label(&self) -> String {
        "Uniform".to_owned()
    }

    fn description(&self) -> String {
        "Value of a graph uniform".to_owned()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        let (_, r#type) = Self::uniform_type(context)?;
        Ok(Sockets::default().output("out", r#type))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let (id, r#type) = Self::uniform_type(context)?;
        Ok(Context::default().with_output(
            "out",
            Expression::trivial(r#type, uniform_identifier(&id)),
        ))
    }

    fn default_parameters(&self) -> Parameters {
        btree_map! { "uniform".into() => ParameterValue::from("") }
    }
}
