//! Generic shapes of the built-in shading functions.

use super::resolver::{Constraint, ParamType, Signature};
use crate::{
    graph::Name,
    types::{ScalarBase, Type},
};

use lazy_static::lazy_static;
use map_macro::hash_map;

const FLOAT: &[ScalarBase] = &[ScalarBase::Float];
const SIGNED: &[ScalarBase] = &[ScalarBase::Float, ScalarBase::Int];
const NUMERIC: &[ScalarBase] = &[ScalarBase::Float, ScalarBase::Int, ScalarBase::Uint];
const COMPARABLE: &[ScalarBase] = &[
    ScalarBase::Float,
    ScalarBase::Int,
    ScalarBase::Uint,
    ScalarBase::Bool,
];
const VECTORS: &[u8] = &[2, 3, 4];

fn signature(name: &str, out_type: ParamType, params: &[(&str, ParamType)], t: Constraint) -> Signature {
    Signature {
        name: name.to_owned(),
        out_type,
        params: params
            .iter()
            .map(|(name, ty)| (Name::from(*name), ty.clone()))
            .collect(),
        templates: hash_map! { "T".to_owned() => t },
    }
}

/// `genType f(genType x)` style function.
fn unary(name: &str, bases: &[ScalarBase]) -> Signature {
    signature(
        name,
        ParamType::whole("T"),
        &[("x", ParamType::whole("T"))],
        Constraint::new(bases, &[1, 2, 3, 4]),
    )
}

/// Component-wise comparison returning a `bool` vector.
fn comparison(name: &str, bases: &[ScalarBase]) -> Signature {
    signature(
        name,
        ParamType::bool_shaped("T"),
        &[("x", ParamType::whole("T")), ("y", ParamType::whole("T"))],
        Constraint::new(bases, VECTORS),
    )
}

lazy_static! {
    /// Every built-in function, in menu order.
    pub static ref BUILTINS: Vec<Signature> = {
        let t = ParamType::whole("T");
        let t_or_c = ParamType::type_or_component("T");
        let component = ParamType::component("T");

        let mut builtins: Vec<Signature> = [
            "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "atan", "exp", "log",
            "exp2", "log2", "sqrt", "inversesqrt", "floor", "ceil", "fract", "normalize",
        ]
        .into_iter()
        .map(|name| unary(name, FLOAT))
        .collect();

        builtins.extend([
            unary("abs", SIGNED),
            unary("sign", SIGNED),
            signature(
                "pow",
                t.clone(),
                &[("x", t.clone()), ("y", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "mod",
                t.clone(),
                &[("x", t.clone()), ("y", t_or_c.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "min",
                t.clone(),
                &[("x", t.clone()), ("y", t_or_c.clone())],
                Constraint::new(NUMERIC, &[1, 2, 3, 4]),
            ),
            signature(
                "max",
                t.clone(),
                &[("x", t.clone()), ("y", t_or_c.clone())],
                Constraint::new(NUMERIC, &[1, 2, 3, 4]),
            ),
            signature(
                "clamp",
                t.clone(),
                &[("x", t.clone()), ("minVal", t_or_c.clone()), ("maxVal", t_or_c.clone())],
                Constraint::new(NUMERIC, &[1, 2, 3, 4]),
            ),
            signature(
                "mix",
                t.clone(),
                &[("x", t.clone()), ("y", t.clone()), ("a", t_or_c.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "step",
                t.clone(),
                &[("edge", t_or_c.clone()), ("x", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "smoothstep",
                t.clone(),
                &[("edge0", t_or_c.clone()), ("edge1", t_or_c.clone()), ("x", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "length",
                component.clone(),
                &[("x", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "distance",
                component.clone(),
                &[("p0", t.clone()), ("p1", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "dot",
                component.clone(),
                &[("x", t.clone()), ("y", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "cross",
                t.clone(),
                &[("x", t.clone()), ("y", t.clone())],
                Constraint::new(FLOAT, &[3]),
            ),
            signature(
                "reflect",
                t.clone(),
                &[("I", t.clone()), ("N", t.clone())],
                Constraint::gen_type(),
            ),
            signature(
                "refract",
                t.clone(),
                &[("I", t.clone()), ("N", t.clone()), ("eta", component)],
                Constraint::gen_type(),
            ),
            signature(
                "faceforward",
                t.clone(),
                &[("N", t.clone()), ("I", t.clone()), ("Nref", t)],
                Constraint::gen_type(),
            ),
            comparison("lessThan", NUMERIC),
            comparison("lessThanEqual", NUMERIC),
            comparison("greaterThan", NUMERIC),
            comparison("greaterThanEqual", NUMERIC),
            comparison("equal", COMPARABLE),
            comparison("notEqual", COMPARABLE),
            signature(
                "any",
                ParamType::Concrete(Type::BOOL),
                &[("x", ParamType::bool_shaped("T"))],
                Constraint::new(&[ScalarBase::Bool], VECTORS),
            ),
            signature(
                "all",
                ParamType::Concrete(Type::BOOL),
                &[("x", ParamType::bool_shaped("T"))],
                Constraint::new(&[ScalarBase::Bool], VECTORS),
            ),
            signature(
                "not",
                ParamType::bool_shaped("T"),
                &[("x", ParamType::bool_shaped("T"))],
                Constraint::new(&[ScalarBase::Bool], VECTORS),
            ),
        ]);

        builtins
    };
}

/// Built-in function by name.
pub fn builtin(name: &str) -> Option<&'static Signature> {
    BUILTINS.iter().find(|signature| signature.name == name)
}
