use super::{NodeCompiler, Sockets};
use crate::{
    compiler::context::{Context, Expression, NodeContext},
    error::{Error, Result},
    graph::{ParameterValue, Parameters},
    types::Type,
};

use map_macro::btree_map;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Infix operator over two inputs `a` and `b`.
pub enum BinaryOperator {
    #[allow(missing_docs)]
    Add,
    #[allow(missing_docs)]
    Subtract,
    #[allow(missing_docs)]
    Multiply,
    #[allow(missing_docs)]
    Divide,
}

impl BinaryOperator {
    /// Every operator.
    pub const ALL: [BinaryOperator; 4] = [
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
    ];

    #[allow(missing_docs)]
    pub fn node_type(self) -> &'static str {
        match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Subtract => "subtract",
            BinaryOperator::Multiply => "multiply",
            BinaryOperator::Divide => "divide",
        }
    }

    #[allow(missing_docs)]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

fn operand(context: &NodeContext, socket: &str) -> Result<Expression> {
    context.try_get_input(socket)?.ok_or_else(|| {
        Error::UnsupportedConversion(format!(
            "operand `{socket}` of `{}` is not connected",
            context.id()
        ))
    })
}

impl NodeCompiler for BinaryOperator {
    fn label(&self) -> String {
        let name = self.node_type();
        format!("{}{}", name[..1].to_uppercase(), &name[1..])
    }

    fn description(&self) -> String {
        format!("a {} b", self.symbol())
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        // The result takes the type of `a`.
        let a = context.input_type("a")?.unwrap_or_else(Type::any_numeric);

        Ok(Sockets::default()
            .input("a", Type::any_numeric())
            .input("b", Type::any_numeric())
            .output("out", a))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let a = operand(context, "a")?;
        let b = operand(context, "b")?;

        Ok(Context::default().with_output(
            "out",
            Expression::new(a.r#type, format!("({} {} {})", a.data, self.symbol(), b.data)),
        ))
    }

    fn can_implicitly_cast_input(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Unary minus.
pub struct NegateCompiler;

impl NodeCompiler for NegateCompiler {
    fn label(&self) -> String {
        "Negate".to_owned()
    }

    fn description(&self) -> String {
        "-a".to_owned()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        let a = context.input_type("a")?.unwrap_or_else(Type::any_numeric);

        Ok(Sockets::default()
            .input("a", Type::any_numeric())
            .output("out", a))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let a = operand(context, "a")?;

        Ok(Context::default().with_output(
            "out",
            Expression::new(a.r#type, format!("(-{})", a.data)),
        ))
    }

    fn can_implicitly_cast_input(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Explicit conversion to the scalar or vector type named by the `type` parameter.
pub struct CastCompiler;

impl CastCompiler {
    fn target(context: &NodeContext) -> Result<Type> {
        let name = context.param_or("type", "float".to_owned())?;
        let target: Type = name.parse().map_err(Error::UnsupportedConversion)?;

        if target.is_scalar() || target.is_vector() {
            Ok(target)
        } else {
            Err(Error::UnsupportedConversion(format!(
                "cannot cast to `{target}`, only scalars and vectors are supported"
            )))
        }
    }
}

impl NodeCompiler for CastCompiler {
    fn label(&self) -> String {
        "Cast".to_owned()
    }

    fn description(&self) -> String {
        "Convert a value to another scalar or vector type".to_owned()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        Ok(Sockets::default()
            .input("value", Type::any_scalar_or_vector())
            .output("out", Self::target(context)?))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let target = Self::target(context)?;

        let Some(value) = context.try_get_input("value")? else {
            return Ok(Context::default()
                .with_output("out", Expression::trivial(target.clone(), target.default_expression()?)));
        };

        let (Some(from), Some(to)) = (value.r#type.size(), target.size()) else {
            return Err(Error::UnsupportedConversion(format!(
                "cannot cast `{}` to `{target}`",
                value.r#type
            )));
        };

        // Vectors may be truncated or built from a scalar, never widened.
        if from > 1 && to > from {
            return Err(Error::UnsupportedConversion(format!(
                "cannot widen `{}` to `{target}`",
                value.r#type
            )));
        }

        let expression = if value.r#type == target {
            value
        } else {
            Expression::new(target.clone(), format!("{target}({})", value.data))
        };

        Ok(Context::default().with_output("out", expression))
    }

    fn default_parameters(&self) -> Parameters {
        btree_map! { "type".into() => ParameterValue::from("float") }
    }

    fn can_implicitly_cast_input(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use crate::prelude::*;

    use pretty_assertions::assert_eq;

    fn compiler() -> Compiler {
        let mut compiler = Compiler::new();
        compiler
            .insert_nodes(vec![
                Node::new("f1", "float").with("value", 1.),
                Node::new("f2", "float").with("value", 2.5),
                Node::new("i", "int").with("value", 3.),
                Node::new("v", "vec3"),
            ])
            .unwrap();
        compiler
    }

    #[test]
    fn operators_wrap_in_parentheses() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("mul", "multiply")).unwrap();
        compiler
            .add_connection(sref!(node "f1" "out"), sref!(node "mul" "a"))
            .unwrap();
        compiler
            .add_connection(sref!(node "f2" "out"), sref!(node "mul" "b"))
            .unwrap();

        let out = compiler.compile(&"mul".into()).unwrap().output("out").cloned();
        assert_eq!(out, Some(Expression::new(Type::FLOAT, "(1.0 * 2.5)")));
    }

    #[test]
    fn unconnected_operand_is_an_error() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("add", "add")).unwrap();
        compiler
            .add_connection(sref!(node "f1" "out"), sref!(node "add" "a"))
            .unwrap();

        assert!(matches!(
            compiler.compile(&"add".into()),
            Err(Error::UnsupportedConversion(_))
        ));
    }

    #[test]
    fn result_type_follows_the_first_operand() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("add", "add")).unwrap();
        compiler
            .add_connection(sref!(node "i" "out"), sref!(node "add" "a"))
            .unwrap();
        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "add" "b"))
            .unwrap();

        let out = compiler.compile(&"add".into()).unwrap();
        assert_eq!(out.output("out").unwrap().r#type, Type::scalar(ScalarBase::Int));
    }

    #[test]
    fn negate() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("neg", "negate")).unwrap();
        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "neg" "a"))
            .unwrap();

        let out = compiler.compile(&"neg".into()).unwrap();
        assert_eq!(
            out.output("out").unwrap().data,
            "(-vec3(0.0, 0.0, 0.0))"
        );
    }

    #[test]
    fn casts() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("cast", "cast")).unwrap();
        compiler
            .update_parameter(&"cast".into(), "type".into(), "ivec2".into())
            .unwrap();

        let out = compiler.compile(&"cast".into()).unwrap();
        assert_eq!(
            out.output("out").unwrap(),
            &Expression::trivial(Type::vector(ScalarBase::Int, 2), "ivec2(0, 0)")
        );

        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "cast" "value"))
            .unwrap();
        let out = compiler.compile(&"cast".into()).unwrap();
        assert_eq!(
            out.output("out").unwrap().data,
            "ivec2(vec3(0.0, 0.0, 0.0))"
        );

        compiler
            .update_parameter(&"cast".into(), "type".into(), "vec4".into())
            .unwrap();
        assert!(compiler.compile(&"cast".into()).is_err());

        compiler
            .update_parameter(&"cast".into(), "type".into(), "sampler2D".into())
            .unwrap();
        assert!(compiler.compile(&"cast".into()).is_err());
    }
}
