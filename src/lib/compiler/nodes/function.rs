use super::{NodeCompiler, Sockets};
use crate::{
    compiler::{
        context::{Context, Expression, NodeContext},
        resolver::{Signature, TemplateResolver},
    },
    error::{Error, Result},
    graph::{Name, ParameterValue, Parameters},
    types::Type,
};

use map_macro::btree_map;

/// Check a connected argument against its parameter type, or substitute the default value of
/// that type when the argument is open.
fn argument(
    context: &NodeContext,
    function: &str,
    name: &Name,
    r#type: &Type,
) -> Result<String> {
    match context.try_get_input(name.as_str())? {
        Some(input) if input.r#type.can_strictly_convert(r#type) => Ok(input.data),
        Some(input) => Err(Error::UnsupportedConversion(format!(
            "argument `{name}` of `{function}` expects `{}`, got `{}`",
            r#type, input.r#type
        ))),
        None => r#type.default_expression(),
    }
}

#[derive(Clone, Debug)]
/// Built-in generic function.
pub struct FunctionCompiler {
    signature: &'static Signature,
}

impl FunctionCompiler {
    #[allow(missing_docs)]
    pub fn new(signature: &'static Signature) -> Self {
        Self { signature }
    }

    /// Resolver narrowed by every connected input.
    fn narrowed(&self, context: &NodeContext) -> Result<TemplateResolver<'static>> {
        let mut resolver = TemplateResolver::new(self.signature);

        for (name, param) in &self.signature.params {
            if let Some(connected) = context.input_type(name.as_str())? {
                resolver.narrow(param, &connected)?;
            }
        }

        Ok(resolver)
    }
}

impl NodeCompiler for FunctionCompiler {
    fn label(&self) -> String {
        self.signature.name.clone()
    }

    fn description(&self) -> String {
        self.signature.to_string()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        let resolver = self.narrowed(context)?;

        let mut sockets = Sockets::default();
        for (name, param) in &self.signature.params {
            sockets = sockets.input(name.clone(), resolver.resolve(param)?);
        }

        Ok(sockets.output("out", resolver.resolve(&self.signature.out_type)?))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let mut resolver = self.narrowed(context)?;
        resolver.collapse();

        let arguments = self
            .signature
            .params
            .iter()
            .map(|(name, param)| {
                argument(context, &self.signature.name, name, &resolver.resolve(param)?)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Context::default().with_output(
            "out",
            Expression::new(
                resolver.resolve(&self.signature.out_type)?,
                format!("{}({})", self.signature.name, arguments.join(", ")),
            ),
        ))
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Call of a function exported by an include, named by the `function` parameter.
pub struct CustomFunctionCompiler;

impl CustomFunctionCompiler {
    fn name(context: &NodeContext) -> Result<String> {
        context.param_or("function", String::new())
    }
}

impl NodeCompiler for CustomFunctionCompiler {
    fn label(&self) -> String {
        "Function".to_owned()
    }

    fn description(&self) -> String {
        "Call a function exported by an include".to_owned()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        let function = context.function(&Self::name(context)?)?;

        let mut sockets = Sockets::default();
        for parameter in &function.parameters {
            sockets = sockets.input(parameter.name.clone(), parameter.r#type.clone());
        }
        if let Some(output) = &function.output {
            sockets = sockets.output("out", output.clone());
        }

        Ok(sockets)
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let function = context.function(&Self::name(context)?)?;

        let arguments = function
            .parameters
            .iter()
            .map(|parameter| argument(context, &function.name, &parameter.name, &parameter.r#type))
            .collect::<Result<Vec<_>>>()?;

        let Some(output) = &function.output else {
            return Ok(Context::default());
        };

        Ok(Context::default().with_output(
            "out",
            Expression::new(
                output.clone(),
                format!("{}({})", function.name, arguments.join(", ")),
            ),
        ))
    }

    fn default_parameters(&self) -> Parameters {
        btree_map! { "function".into() => ParameterValue::from("") }
    }
}

#[cfg(test)]
mod test {
    use crate::prelude::*;

    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    fn compiler() -> Compiler {
        let mut compiler = Compiler::new();
        compiler
            .insert_nodes(vec![
                Node::new("f1", "float").with("value", 1.),
                Node::new("v2", "vec2"),
                Node::new("v3", "vec3"),
                Node::new("min", "min"),
            ])
            .unwrap();
        compiler
    }

    #[test]
    fn open_arguments_take_default_values() {
        let mut compiler = compiler();
        compiler
            .add_connection(sref!(node "f1" "out"), sref!(node "min" "x"))
            .unwrap();

        let context = compiler.compile(&"min".into()).unwrap();
        assert_eq!(
            context.output("out").unwrap(),
            &Expression::new(Type::FLOAT, "min(1.0, 0.0)")
        );
    }

    #[test]
    fn broadcast_arguments() {
        let mut compiler = compiler();
        compiler
            .add_connection(sref!(node "v3" "out"), sref!(node "min" "x"))
            .unwrap();
        compiler
            .add_connection(sref!(node "f1" "out"), sref!(node "min" "y"))
            .unwrap();

        let context = compiler.compile(&"min".into()).unwrap();
        let out = context.output("out").unwrap();
        assert_eq!(out.r#type, Type::VEC3);
        assert_eq!(out.data, "min(vec3(0.0, 0.0, 0.0), 1.0)");
    }

    #[test]
    fn fully_open_functions_collapse_to_their_first_alternative() {
        let mut compiler = compiler();
        let context = compiler.compile(&"min".into()).unwrap();

        assert_eq!(context.output("out").unwrap().data, "min(0.0, 0.0)");
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let mut compiler = compiler();
        compiler
            .add_connection(sref!(node "v2" "out"), sref!(node "min" "x"))
            .unwrap();
        compiler
            .add_connection(sref!(node "v3" "out"), sref!(node "min" "y"))
            .unwrap();

        assert!(matches!(
            compiler.compile(&"min".into()),
            Err(Error::UnsupportedConversion(_))
        ));
    }

    #[test]
    fn sockets_follow_connections() {
        let mut compiler = compiler();

        let info = compiler.get_info(&["min".into()]).unwrap().remove(0);
        assert_eq!(info.outputs[0].r#type.alternatives().len(), 12);

        compiler
            .add_connection(sref!(node "v2" "out"), sref!(node "min" "x"))
            .unwrap();
        let info = compiler.get_info(&["min".into()]).unwrap().remove(0);
        assert_eq!(info.outputs[0].r#type, Type::VEC2);
        assert_eq!(info.inputs[1].r#type, Type::variant([Type::VEC2, Type::FLOAT]));
        assert_eq!(info.error, None);
    }

    const LIBRARY: &str = "
#pragma editor: export
vec3 palette(float t, vec3 tint) { return tint * t; }

#pragma editor: export
void touch(vec2 uv) {}
";

    fn with_library() -> Compiler {
        let sources = HashMap::from([("lib.glsl".to_owned(), LIBRARY.to_owned())]);
        let mut compiler = compiler().with_resolver(sources);
        compiler.add_include("lib.glsl").unwrap();
        compiler
    }

    #[test]
    fn custom_functions() {
        let mut compiler = with_library();
        compiler
            .insert_node(Node::new("p", "function").with("function", "palette"))
            .unwrap();
        compiler
            .add_connection(sref!(node "f1" "out"), sref!(node "p" "t"))
            .unwrap();

        let context = compiler.compile(&"p".into()).unwrap();
        assert_eq!(
            context.output("out").unwrap(),
            &Expression::new(Type::VEC3, "palette(1.0, vec3(0.0, 0.0, 0.0))")
        );
    }

    #[test]
    fn custom_functions_check_argument_types() {
        let mut compiler = with_library();
        compiler
            .insert_node(Node::new("p", "function").with("function", "palette"))
            .unwrap();
        compiler
            .add_connection(sref!(node "v2" "out"), sref!(node "p" "t"))
            .unwrap();

        assert!(matches!(
            compiler.compile(&"p".into()),
            Err(Error::UnsupportedConversion(_))
        ));
    }

    #[test]
    fn void_functions_have_no_output() {
        let mut compiler = with_library();
        compiler
            .insert_node(Node::new("t", "function").with("function", "touch"))
            .unwrap();

        assert!(compiler.compile(&"t".into()).unwrap().outputs.is_empty());
    }

    #[test]
    fn unknown_functions() {
        let mut compiler = with_library();
        compiler
            .insert_node(Node::new("u", "function").with("function", "nope"))
            .unwrap();

        assert_eq!(
            compiler.compile(&"u".into()).err(),
            Some(Error::FunctionNotFound("nope".into()))
        );
    }
}
