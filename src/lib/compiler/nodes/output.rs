use super::{NodeCompiler, Sockets};
use crate::{
    compiler::context::{Context, Expression, NodeContext},
    error::{Error, Result},
    types::{ScalarBase, Type},
};

/// Widen or reshape a scalar or vector expression to a displayable `vec4`: scalars are
/// broadcast to grey, missing channels are zero and alpha is opaque.
pub fn to_vec4(expression: &Expression) -> Result<Expression> {
    let data = &expression.data;

    let (base, size) = match (expression.r#type.base(), expression.r#type.size()) {
        (Some(base), Some(size)) => (base, size),
        _ => {
            return Err(Error::UnsupportedConversion(format!(
                "cannot display `{}`",
                expression.r#type
            )))
        }
    };

    let data = match size {
        1 => format!("vec4(vec3({data}), 1.0)"),
        2 => format!("vec4({data}, 0.0, 1.0)"),
        3 => format!("vec4({data}, 1.0)"),
        _ if base == ScalarBase::Float => return Ok(expression.clone()),
        _ => format!("vec4({data})"),
    };

    Ok(Expression::new(Type::VEC4, data))
}

#[derive(Clone, Debug)]
/// Sink showing its input as a color.
pub struct OutputCompiler {
    label: &'static str,
}

impl OutputCompiler {
    #[allow(missing_docs)]
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl NodeCompiler for OutputCompiler {
    fn label(&self) -> String {
        self.label.to_owned()
    }

    fn description(&self) -> String {
        "Display a value as a color".to_owned()
    }

    fn sockets(&self, _context: &NodeContext) -> Result<Sockets> {
        Ok(Sockets::default()
            .input("color", Type::any_scalar_or_vector())
            .output("color", Type::VEC4))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let color = match context.try_get_input("color")? {
            Some(input) => to_vec4(&input)?,
            None => Expression::trivial(Type::VEC4, "vec4(0.0, 0.0, 0.0, 1.0)"),
        };

        Ok(Context::default().with_output("color", color))
    }
}
