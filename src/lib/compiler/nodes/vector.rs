use super::{literal::float_literal, NodeCompiler, Sockets};
use crate::{
    compiler::context::{Context, Expression, NodeContext},
    error::{Error, Result},
    graph::{ParameterValue, Parameters},
    types::{ScalarBase, Type},
};

use map_macro::btree_map;

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];
const MEMBER_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Float vector built from one scalar per component. Unconnected components read the
/// parameter of the same name.
pub struct ComposeCompiler {
    size: u8,
}

impl ComposeCompiler {
    #[allow(missing_docs)]
    pub fn new(size: u8) -> Self {
        Self { size }
    }

    fn components(&self) -> &'static [&'static str] {
        &COMPONENTS[..self.size as usize]
    }

    fn r#type(&self) -> Type {
        Type::vector(ScalarBase::Float, self.size)
    }
}

impl NodeCompiler for ComposeCompiler {
    fn label(&self) -> String {
        format!("Vec{}", self.size)
    }

    fn description(&self) -> String {
        format!("Build a vec{} from its components", self.size)
    }

    fn sockets(&self, _context: &NodeContext) -> Result<Sockets> {
        Ok(self
            .components()
            .iter()
            .fold(Sockets::default(), |sockets, &component| {
                sockets.input(component, Type::FLOAT)
            })
            .output("out", self.r#type()))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let mut trivial = true;
        let mut arguments = Vec::with_capacity(self.size as usize);

        for &component in self.components() {
            match context.try_get_input(component)? {
                Some(input) if !input.r#type.can_implicitly_convert(&Type::FLOAT) => {
                    return Err(Error::UnsupportedConversion(format!(
                        "component `{component}` of `{}` expects `float`, got `{}`",
                        self.r#type(),
                        input.r#type
                    )));
                }
                Some(input) => {
                    trivial &= input.trivial;
                    arguments.push(input.data);
                }
                None => arguments.push(float_literal(context.param_or(component, 0.)?)),
            }
        }

        let data = format!("{}({})", self.r#type(), arguments.join(", "));
        let expression = if trivial {
            Expression::trivial(self.r#type(), data)
        } else {
            Expression::new(self.r#type(), data)
        };

        Ok(Context::default().with_output("out", expression))
    }

    fn default_parameters(&self) -> Parameters {
        self.components()
            .iter()
            .map(|&component| (component.into(), ParameterValue::Number(0.)))
            .collect()
    }

    fn can_implicitly_cast_input(&self) -> bool {
        true
    }
}

/// Connected vector of a decomposing node, hoisted so that every output can reference it.
fn hoisted_vector(context: &NodeContext, result: &mut Context) -> Result<Option<Expression>> {
    let Some(vector) = context.try_get_input("vector")? else {
        return Ok(None);
    };

    if !vector.r#type.is_vector() && !vector.r#type.is_scalar() {
        return Err(Error::UnsupportedConversion(format!(
            "cannot access the components of `{}`",
            vector.r#type
        )));
    }

    Ok(Some(result.hoist(context.variable_name("vector"), vector)))
}

#[derive(Clone, Copy, Debug, Default)]
/// One output per component of the connected vector.
pub struct SplitCompiler;

impl NodeCompiler for SplitCompiler {
    fn label(&self) -> String {
        "Split".to_owned()
    }

    fn description(&self) -> String {
        "Access every component of a vector".to_owned()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        let connected = context.input_type("vector")?;
        let (component, size) = match &connected {
            Some(ty) => (ty.component_type()?, ty.size().unwrap_or(1)),
            None => (Type::FLOAT, 4),
        };

        Ok(COMPONENTS[..size as usize].iter().fold(
            Sockets::default().input("vector", Type::any_scalar_or_vector()),
            |sockets, &name| sockets.output(name, component.clone()),
        ))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let mut result = Context::default();

        let Some(vector) = hoisted_vector(context, &mut result)? else {
            for name in COMPONENTS {
                result = result.with_output(name, Expression::trivial(Type::FLOAT, "0.0"));
            }
            return Ok(result);
        };

        let component = vector.r#type.component_type()?;
        if vector.r#type.is_scalar() {
            return Ok(result.with_output("x", vector));
        }

        let size = vector.r#type.size().unwrap_or(1) as usize;
        for name in &COMPONENTS[..size] {
            result = result.with_output(
                *name,
                Expression::trivial(component.clone(), format!("{}.{name}", vector.data)),
            );
        }

        Ok(result)
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Field access on the connected vector, `member` naming one to four components.
pub struct SwizzleCompiler;

impl SwizzleCompiler {
    /// Indices of the swizzled components, all taken from a single naming set.
    fn indices(member: &str) -> Result<Vec<usize>> {
        let invalid = || Error::UnsupportedConversion(format!("`{member}` is not a valid swizzle"));

        if member.is_empty() || member.len() > 4 {
            return Err(invalid());
        }

        MEMBER_SETS
            .iter()
            .find_map(|set| member.chars().map(|c| set.find(c)).collect::<Option<Vec<_>>>())
            .ok_or_else(invalid)
    }

    fn output_type(member: &str, input: &Type) -> Result<Type> {
        let indices = Self::indices(member)?;

        // Scalars have no fields; only their single component can be selected.
        if input.is_scalar() {
            return match indices[..] {
                [0] => Ok(input.clone()),
                _ => Err(Error::UnsupportedConversion(format!(
                    "`{input}` is a scalar, `{member}` cannot be selected"
                ))),
            };
        }

        let size = input.size().unwrap_or(0) as usize;

        if let Some(index) = indices.iter().find(|&&index| index >= size) {
            return Err(Error::UnsupportedConversion(format!(
                "`{input}` has no component {}",
                index + 1
            )));
        }

        let base = input.base().unwrap_or(ScalarBase::Float);
        Ok(Type::shaped(base, indices.len() as u8))
    }
}

impl NodeCompiler for SwizzleCompiler {
    fn label(&self) -> String {
        "Swizzle".to_owned()
    }

    fn description(&self) -> String {
        "Select and reorder vector components".to_owned()
    }

    fn sockets(&self, context: &NodeContext) -> Result<Sockets> {
        let member = context.param_or("member", "x".to_owned())?;
        let out = match context.input_type("vector")? {
            Some(input) => Self::output_type(&member, &input)?,
            None => Type::shaped(ScalarBase::Float, Self::indices(&member)?.len() as u8),
        };

        Ok(Sockets::default()
            .input("vector", Type::any_scalar_or_vector())
            .output("out", out))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let member = context.param_or("member", "x".to_owned())?;

        let Some(vector) = context.try_get_input("vector")? else {
            let out = Type::shaped(ScalarBase::Float, Self::indices(&member)?.len() as u8);
            return Ok(Context::default()
                .with_output("out", Expression::trivial(out.clone(), out.default_expression()?)));
        };

        let out = Self::output_type(&member, &vector.r#type)?;
        if vector.r#type.is_scalar() {
            return Ok(Context::default().with_output("out", vector));
        }

        // Operator results need the parentheses.
        let data = if vector.trivial {
            format!("{}.{member}", vector.data)
        } else {
            format!("({}).{member}", vector.data)
        };

        Ok(Context::default().with_output(
            "out",
            Expression {
                r#type: out,
                data,
                trivial: vector.trivial,
            },
        ))
    }

    fn default_parameters(&self) -> Parameters {
        btree_map! { "member".into() => ParameterValue::from("x") }
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
                Node::new("f", "float").with("value", 2.),
                Node::new("t", "time"),
                Node::new("v", "vec3").with("y", 0.5),
                Node::new("s", "sin"),
                Node::new("n", "normalize"),
            ])
            .unwrap();
        compiler
    }

    #[test]
    fn compose_reads_parameters_for_open_components() {
        let mut compiler = compiler();
        compiler
            .add_connection(sref!(node "f" "out"), sref!(node "v" "x"))
            .unwrap();

        let out = compiler.compile(&"v".into()).unwrap();
        assert_eq!(
            out.output("out").unwrap(),
            &Expression::trivial(Type::VEC3, "vec3(2.0, 0.5, 0.0)")
        );
    }

    #[test]
    fn compose_is_trivial_only_over_trivial_components() {
        let mut compiler = compiler();
        compiler
            .add_connection(sref!(node "t" "out"), sref!(node "s" "x"))
            .unwrap();
        compiler
            .add_connection(sref!(node "s" "out"), sref!(node "v" "z"))
            .unwrap();

        let out = compiler.compile(&"v".into()).unwrap();
        let out = out.output("out").unwrap();
        assert_eq!(out.data, "vec3(0.0, 0.5, sin(u_time))");
        assert!(!out.trivial);
    }

    #[test]
    fn split_hoists_non_trivial_vectors() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("split", "split")).unwrap();
        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "n" "x"))
            .unwrap();
        compiler
            .add_connection(sref!(node "n" "out"), sref!(node "split" "vector"))
            .unwrap();

        let context = compiler.compile(&"split".into()).unwrap();
        assert_eq!(
            context.variables,
            vec![Variable {
                name: "n5_split_vector".into(),
                r#type: Type::VEC3,
                data: "normalize(vec3(0.0, 0.5, 0.0))".into(),
            }]
        );
        assert_eq!(context.outputs.len(), 3);
        assert_eq!(
            context.output("z").unwrap(),
            &Expression::trivial(Type::FLOAT, "n5_split_vector.z")
        );
    }

    #[test]
    fn split_inlines_trivial_vectors() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("split", "split")).unwrap();
        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "split" "vector"))
            .unwrap();

        let context = compiler.compile(&"split".into()).unwrap();
        assert!(context.variables.is_empty());
        assert_eq!(
            context.output("y").unwrap().data,
            "vec3(0.0, 0.5, 0.0).y"
        );
    }

    #[test]
    fn swizzles() {
        let mut compiler = compiler();
        compiler
            .insert_node(Node::new("sw", "swizzle").with("member", "zyx"))
            .unwrap();
        compiler
            .add_connection(sref!(node "v" "out"), sref!(node "n" "x"))
            .unwrap();
        compiler
            .add_connection(sref!(node "n" "out"), sref!(node "sw" "vector"))
            .unwrap();

        let out = compiler.compile(&"sw".into()).unwrap();
        assert_eq!(
            out.output("out").unwrap(),
            &Expression::new(Type::VEC3, "(normalize(vec3(0.0, 0.5, 0.0))).zyx")
        );

        for member in ["xw", "xg", "", "xyzwx", "q"] {
            compiler
                .update_parameter(&"sw".into(), "member".into(), member.into())
                .unwrap();
            assert!(compiler.compile(&"sw".into()).is_err(), "{member}");
        }

        compiler
            .update_parameter(&"sw".into(), "member".into(), "bgr".into())
            .unwrap();
        assert_eq!(
            compiler.compile(&"sw".into()).unwrap().output("out").unwrap().r#type,
            Type::VEC3
        );
    }

    #[test]
    fn scalar_swizzles_pass_through() {
        let mut compiler = compiler();
        compiler
            .insert_node(Node::new("sw", "swizzle").with("member", "x"))
            .unwrap();
        compiler
            .add_connection(sref!(node "f" "out"), sref!(node "sw" "vector"))
            .unwrap();

        assert_eq!(
            compiler.compile(&"sw".into()).unwrap().output("out").unwrap(),
            &Expression::trivial(Type::FLOAT, "2.0")
        );

        for member in ["y", "xx", "r"] {
            compiler
                .update_parameter(&"sw".into(), "member".into(), member.into())
                .unwrap();
            let result = compiler.compile(&"sw".into());
            if member == "r" {
                assert_eq!(result.unwrap().output("out").unwrap().data, "2.0");
            } else {
                assert!(matches!(result, Err(Error::UnsupportedConversion(_))), "{member}");
            }
        }
    }

    #[test]
    fn compose_rejects_non_scalar_components() {
        let mut compiler = compiler();
        compiler.insert_node(Node::new("v2", "vec2")).unwrap();
        compiler
            .add_connection(sref!(node "v2" "out"), sref!(node "v" "x"))
            .unwrap();

        assert!(matches!(
            compiler.compile(&"v".into()),
            Err(Error::UnsupportedConversion(_))
        ));

        // Integers widen to float.
        compiler.insert_node(Node::new("i", "int").with("value", 3.)).unwrap();
        compiler
            .add_connection(sref!(node "i" "out"), sref!(node "v" "x"))
            .unwrap();
        assert_eq!(
            compiler.compile(&"v".into()).unwrap().output("out").unwrap().data,
            "vec3(3, 0.5, 0.0)"
        );
    }
}
