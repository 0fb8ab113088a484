use super::{NodeCompiler, Sockets};
use crate::{
    compiler::context::{Context, Expression, NodeContext},
    error::{Error, Result},
    graph::{ParameterValue, Parameters},
    types::{ScalarBase, Type},
};

use map_macro::btree_map;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Constant scalar taken from the `value` parameter.
pub struct LiteralCompiler {
    base: ScalarBase,
}

impl LiteralCompiler {
    /// Every literal node type.
    pub const ALL: [(&'static str, LiteralCompiler); 4] = [
        ("float", LiteralCompiler { base: ScalarBase::Float }),
        ("int", LiteralCompiler { base: ScalarBase::Int }),
        ("uint", LiteralCompiler { base: ScalarBase::Uint }),
        ("bool", LiteralCompiler { base: ScalarBase::Bool }),
    ];

    fn literal(&self, context: &NodeContext) -> Result<String> {
        if self.base == ScalarBase::Bool {
            return Ok(context.param_or("value", false)?.to_string());
        }

        let value = context.param_or("value", 0.)?;
        if !value.is_finite() {
            return Err(Error::UnsupportedConversion(format!(
                "`{value}` cannot be written as a {} literal",
                self.base.glsl_name()
            )));
        }

        Ok(match self.base {
            ScalarBase::Int => format!("{}", value.trunc() as i64),
            ScalarBase::Uint => format!("{}u", value.trunc().max(0.) as u64),
            ScalarBase::Double => format!("{}lf", float_literal(value)),
            _ => float_literal(value),
        })
    }
}

/// Decimal form of a float that always keeps a fractional part.
pub fn float_literal(value: f64) -> String {
    let text = value.to_string();
    if text.contains(['.', 'e']) {
        text
    } else {
        format!("{text}.0")
    }
}

impl NodeCompiler for LiteralCompiler {
    fn label(&self) -> String {
        let name = self.base.glsl_name();
        format!("{}{}", name[..1].to_uppercase(), &name[1..])
    }

    fn description(&self) -> String {
        format!("Constant {} value", self.base.glsl_name())
    }

    fn sockets(&self, _context: &NodeContext) -> Result<Sockets> {
        Ok(Sockets::default().output("out", Type::scalar(self.base)))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        Ok(Context::default().with_output(
            "out",
            Expression::trivial(Type::scalar(self.base), self.literal(context)?),
        ))
    }

    fn default_parameters(&self) -> Parameters {
        let value = match self.base {
            ScalarBase::Bool => ParameterValue::Boolean(false),
            _ => ParameterValue::Number(0.),
        };
        btree_map! { "value".into() => value }
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Constant `vec4` taken from the `color` parameter.
pub struct ColorCompiler;

impl NodeCompiler for ColorCompiler {
    fn label(&self) -> String {
        "Color".to_owned()
    }

    fn description(&self) -> String {
        "Constant RGBA color".to_owned()
    }

    fn sockets(&self, _context: &NodeContext) -> Result<Sockets> {
        Ok(Sockets::default().output("out", Type::VEC4))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let color = context.param_or("color", [0f32, 0., 0., 1.])?;
        let components: Vec<_> = color
            .iter()
            .map(|&channel| float_literal(f64::from(channel)))
            .collect();

        Ok(Context::default().with_output(
            "out",
            Expression::trivial(Type::VEC4, format!("vec4({})", components.join(", "))),
        ))
    }

    fn default_parameters(&self) -> Parameters {
        btree_map! { "color".into() => ParameterValue::Color([0., 0., 0., 1.]) }
    }
}
