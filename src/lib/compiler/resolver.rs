//! Narrowing of generic function templates from connected types.

use crate::{
    error::{Error, Result},
    graph::Name,
    types::{ScalarBase, Type},
};

use std::{collections::HashMap, fmt};

use log::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Scalar bases and shapes a template may still take. A size of 1 stands for a scalar.
pub struct Constraint {
    #[allow(missing_docs)]
    pub bases: Vec<ScalarBase>,
    #[allow(missing_docs)]
    pub sizes: Vec<u8>,
}

impl Constraint {
    #[allow(missing_docs)]
    pub fn new(bases: &[ScalarBase], sizes: &[u8]) -> Self {
        Self {
            bases: bases.to_vec(),
            sizes: sizes.to_vec(),
        }
    }

    /// Float scalars and vectors of any size.
    pub fn gen_type() -> Self {
        Self::new(&[ScalarBase::Float], &[1, 2, 3, 4])
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty() || self.sizes.is_empty()
    }

    /// Keep what both constraints allow, in `self`'s order.
    pub fn intersect(&self, other: &Constraint) -> Constraint {
        Constraint {
            bases: self
                .bases
                .iter()
                .copied()
                .filter(|base| other.bases.contains(base))
                .collect(),
            sizes: self
                .sizes
                .iter()
                .copied()
                .filter(|size| other.sizes.contains(size))
                .collect(),
        }
    }

    fn union(mut self, other: Constraint) -> Constraint {
        for base in other.bases {
            if !self.bases.contains(&base) {
                self.bases.push(base);
            }
        }
        for size in other.sizes {
            if !self.sizes.contains(&size) {
                self.sizes.push(size);
            }
        }
        self
    }

    /// Keep only the first base and size.
    pub fn collapse(&mut self) {
        self.bases.truncate(1);
        self.sizes.truncate(1);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How a parameter relates to its template.
pub enum TemplateRole {
    /// The template itself.
    Whole,
    /// Scalar type of the template's components.
    Component,
    /// Either the template itself or its component type.
    TypeOrComponent,
    /// `bool` based type shaped like the template.
    BoolShaped,
}

const ALL_SIZES: [u8; 4] = [1, 2, 3, 4];

impl TemplateRole {
    /// What a connected `ty` tells about the template.
    fn admits(self, ty: &Type) -> Constraint {
        let (Some(base), Some(size)) = (ty.base(), ty.size()) else {
            return Constraint::new(&[], &[]);
        };

        match self {
            TemplateRole::Whole => Constraint::new(&[base], &[size]),
            TemplateRole::Component if size == 1 => Constraint::new(&[base], &ALL_SIZES),
            TemplateRole::Component => Constraint::new(&[], &[]),
            TemplateRole::TypeOrComponent if size == 1 => Constraint::new(&[base], &ALL_SIZES),
            TemplateRole::TypeOrComponent => Constraint::new(&[base], &[size]),
            TemplateRole::BoolShaped if base == ScalarBase::Bool => {
                Constraint::new(&ScalarBase::ALL, &[size])
            }
            TemplateRole::BoolShaped => Constraint::new(&[], &[]),
        }
    }

    /// Every type the parameter may take under `constraint`.
    fn alternatives(self, constraint: &Constraint) -> Type {
        let shaped = |base: ScalarBase| constraint.sizes.iter().map(move |&size| Type::shaped(base, size));

        match self {
            TemplateRole::Whole => Type::variant(constraint.bases.iter().flat_map(|&base| shaped(base))),
            TemplateRole::Component => {
                Type::variant(constraint.bases.iter().map(|&base| Type::scalar(base)))
            }
            TemplateRole::TypeOrComponent => Type::variant(
                constraint
                    .bases
                    .iter()
                    .flat_map(|&base| shaped(base).chain([Type::scalar(base)])),
            ),
            TemplateRole::BoolShaped => Type::variant(shaped(ScalarBase::Bool)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Type of a function parameter or output.
pub enum ParamType {
    /// Fixed type.
    Concrete(Type),
    /// Type derived from a named template.
    Template(String, TemplateRole),
}

impl ParamType {
    /// The template itself.
    pub fn whole(template: &str) -> Self {
        ParamType::Template(template.to_owned(), TemplateRole::Whole)
    }

    /// Component type of a template.
    pub fn component(template: &str) -> Self {
        ParamType::Template(template.to_owned(), TemplateRole::Component)
    }

    /// Either a template or its component type.
    pub fn type_or_component(template: &str) -> Self {
        ParamType::Template(template.to_owned(), TemplateRole::TypeOrComponent)
    }

    /// `bool` based type shaped like a template.
    pub fn bool_shaped(template: &str) -> Self {
        ParamType::Template(template.to_owned(), TemplateRole::BoolShaped)
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Shape of a generic function.
pub struct Signature {
    /// Function name, also used as the node type.
    pub name: String,
    /// Type of the `out` socket.
    pub out_type: ParamType,
    /// Parameters in call order.
    pub params: Vec<(Name, ParamType)>,
    /// Initial constraint of every template.
    pub templates: HashMap<String, Constraint>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<_> = self.params.iter().map(|(name, _)| name.as_str()).collect();
        write!(f, "{}({})", self.name, params.join(", "))
    }
}

/// Narrowing state of every template of a [Signature].
pub struct TemplateResolver<'a> {
    signature: &'a Signature,
    constraints: HashMap<String, Constraint>,
}

impl<'a> TemplateResolver<'a> {
    #[allow(missing_docs)]
    pub fn new(signature: &'a Signature) -> Self {
        Self {
            signature,
            constraints: signature.templates.clone(),
        }
    }

    fn constraint(&self, template: &str) -> Result<&Constraint> {
        self.constraints.get(template).ok_or_else(|| {
            Error::UnsupportedConversion(format!(
                "`{}` has no template `{template}`",
                self.signature
            ))
        })
    }

    /// Narrow the template of `param` with a type connected to it. A variant narrows to
    /// whatever any of its alternatives allows.
    pub fn narrow(&mut self, param: &ParamType, connected: &Type) -> Result<()> {
        let ParamType::Template(template, role) = param else {
            return Ok(());
        };

        let admitted = connected
            .alternatives()
            .iter()
            .map(|alternative| role.admits(alternative))
            .reduce(Constraint::union)
            .unwrap_or_else(|| Constraint::new(&[], &[]));

        let narrowed = self.constraint(template)?.intersect(&admitted);
        if narrowed.is_empty() {
            return Err(Error::UnsupportedConversion(format!(
                "`{connected}` cannot be used for template `{template}` of `{}`",
                self.signature
            )));
        }

        trace!("`{}`: `{template}` narrowed to {narrowed:?}", self.signature.name);
        self.constraints.insert(template.clone(), narrowed);
        Ok(())
    }

    /// Settle every template on its first remaining alternative.
    pub fn collapse(&mut self) {
        for constraint in self.constraints.values_mut() {
            constraint.collapse();
        }
    }

    /// Current type of a parameter or output, a variant when several remain possible.
    pub fn resolve(&self, param: &ParamType) -> Result<Type> {
        match param {
            ParamType::Concrete(ty) => Ok(ty.clone()),
            ParamType::Template(template, role) => {
                let constraint = self.constraint(template)?;
                match role.alternatives(constraint) {
                    Type::Error => Err(Error::UnsupportedConversion(format!(
                        "template `{template}` of `{}` has no possible type left",
                        self.signature
                    ))),
                    ty => Ok(ty),
                }
            }
        }
    }
}
