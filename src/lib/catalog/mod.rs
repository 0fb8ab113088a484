//! Catalog of user functions exported by included source fragments.
//!
//! A function is exported when the directive right before its definition carries an
//! `editor:` pragma list containing `export`:
//!
//! ```glsl
//! #pragma editor: export
//! vec3 palette(float t, vec3 tint) { return tint * t; }
//! ```

mod sources;

pub use sources::{FsResolver, NoSources, SourceResolver};

use crate::{graph::Name, graph::store::Include, types::Type};

use std::{collections::HashMap, fmt};

use log::{debug, warn};
use pest::{
    error::LineColLocation,
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "lib/pest/catalog.pest"]
struct CatalogParser;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{path}:{}: {kind}", line_of(.line))]
/// Error raised while reading an included source fragment.
pub struct ParseError {
    /// Path of the offending include.
    pub path: String,
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where it went wrong.
    pub line: LineColLocation,
}

fn line_of(location: &LineColLocation) -> String {
    match location {
        LineColLocation::Pos((line, col)) | LineColLocation::Span((line, col), _) => {
            format!("{line}:{col}")
        }
    }
}

impl ParseError {
    fn new(path: &str, kind: ErrorKind, line: LineColLocation) -> Self {
        Self {
            path: path.to_owned(),
            kind,
            line,
        }
    }

    fn code(path: &str, error: CodeError, pair: &Pair<Rule>) -> Self {
        let (start, end) = pair.as_span().split();
        Self::new(
            path,
            ErrorKind::Code(error),
            LineColLocation::Span(start.line_col(), end.line_col()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// Kind of [ParseError].
pub enum ErrorKind {
    #[error("{0}")]
    /// The fragment is not valid source.
    Parsing(Box<pest::error::Error<Rule>>),
    #[error("{0}")]
    /// The fragment is valid source but an exported function cannot be used.
    Code(CodeError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// Problem with an exported function.
pub enum CodeError {
    #[error("function `{0}` is exported twice")]
    /// Two exported functions share a name.
    Redefinition(String),
    #[error("unsupported type `{0}` (expected one of void, float, vec2, vec3, vec4)")]
    /// Declared type outside of the supported vocabulary.
    UnsupportedType(String),
    #[error("unsupported parameter qualifier `{0}`, only `in` parameters are allowed")]
    /// Parameter that is not a plain input.
    UnsupportedQualifier(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Direction of a function parameter. Only inputs are supported.
pub enum ParameterMode {
    #[default]
    #[allow(missing_docs)]
    In,
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("in")
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Parameter of an exported function.
pub struct FunctionParameter {
    #[allow(missing_docs)]
    pub name: Name,
    #[allow(missing_docs)]
    pub mode: ParameterMode,
    #[allow(missing_docs)]
    pub r#type: Type,
}

#[derive(Clone, Debug, PartialEq)]
/// Exported function signature.
pub struct FunctionDefinition {
    #[allow(missing_docs)]
    pub name: String,
    /// Parameters in declaration order.
    pub parameters: Vec<FunctionParameter>,
    /// Return type, `None` for `void`.
    pub output: Option<Type>,
    /// Every pragma of the export directive.
    pub pragmas: Vec<String>,
    /// Include that defines the function.
    pub include: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Name to definition map of every exported function.
pub struct FunctionCatalog {
    functions: HashMap<String, FunctionDefinition>,
}

impl FunctionCatalog {
    /// Build the catalog from every resolved include. Fragments that fail to parse are left
    /// out and their errors returned alongside.
    pub fn from_includes(includes: &[Include]) -> (Self, Vec<ParseError>) {
        let mut catalog = Self::default();
        let mut errors = Vec::new();

        for include in includes {
            let Some(source) = &include.source else {
                continue;
            };

            match parse_fragment(&include.path, source) {
                Ok(functions) => {
                    for function in functions {
                        if let Some(previous) = catalog.functions.get(&function.name) {
                            warn!(
                                "`{}` from `{}` shadows the one from `{}`",
                                function.name, function.include, previous.include
                            );
                        }
                        catalog.functions.insert(function.name.clone(), function);
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        debug!("Function catalog holds {} function(s)", catalog.functions.len());
        (catalog, errors)
    }

    #[allow(missing_docs)]
    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    /// Every exported function, in no particular order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.values()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Extract the exported functions of a single source fragment.
pub fn parse_fragment(path: &str, source: &str) -> Result<Vec<FunctionDefinition>, ParseError> {
    let mut pairs = CatalogParser::parse(Rule::source, source).map_err(|err| {
        let line = err.line_col.clone();
        ParseError::new(path, ErrorKind::Parsing(Box::new(err)), line)
    })?;

    let Some(root) = pairs.next() else {
        return Ok(Vec::new());
    };

    let mut functions: Vec<FunctionDefinition> = Vec::new();
    // Pragmas of the directive immediately preceding the current item.
    let mut pending: Option<Vec<String>> = None;

    for item in root.into_inner() {
        match item.as_rule() {
            Rule::directive => pending = pragmas(item.as_str()),
            Rule::function => {
                let Some(pragmas) = pending.take() else {
                    continue;
                };

                if !pragmas.iter().any(|pragma| pragma == "export") {
                    continue;
                }

                let pair = item.clone();
                let Some(function) = parse_function(path, item.into_inner(), pragmas)? else {
                    continue;
                };

                if functions.iter().any(|other| other.name == function.name) {
                    return Err(ParseError::code(
                        path,
                        CodeError::Redefinition(function.name),
                        &pair,
                    ));
                }

                functions.push(function);
            }
            _ => pending = None,
        }
    }

    Ok(functions)
}

/// Pragma list of an `editor:` directive, `None` for any other directive.
fn pragmas(directive: &str) -> Option<Vec<String>> {
    let (_, list) = directive.split_once("editor:")?;

    Some(
        list.split(',')
            .map(str::trim)
            .filter(|pragma| !pragma.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

/// `None` for prototypes, which declare but do not define a function.
fn parse_function(
    path: &str,
    mut inner: Pairs<Rule>,
    pragmas: Vec<String>,
) -> Result<Option<FunctionDefinition>, ParseError> {
    let (Some(return_type), Some(name), Some(parameters), Some(end)) =
        (inner.next(), inner.next(), inner.next(), inner.next())
    else {
        return Ok(None);
    };

    if end.as_rule() == Rule::prototype {
        return Ok(None);
    }

    let output = match return_type.as_str() {
        "void" => None,
        _ => Some(supported_type(path, &return_type)?),
    };

    let parameters = parameters
        .into_inner()
        .map(|parameter| parse_parameter(path, parameter))
        .collect::<Result<_, _>>()?;

    Ok(Some(FunctionDefinition {
        name: name.as_str().to_owned(),
        parameters,
        output,
        pragmas,
        include: path.to_owned(),
    }))
}

fn parse_parameter(path: &str, parameter: Pair<Rule>) -> Result<FunctionParameter, ParseError> {
    let mut r#type = None;
    let mut name = None;

    for pair in parameter.into_inner() {
        match pair.as_rule() {
            Rule::qualifier => match pair.as_str() {
                "in" | "const" => {}
                other => {
                    return Err(ParseError::code(
                        path,
                        CodeError::UnsupportedQualifier(other.to_owned()),
                        &pair,
                    ))
                }
            },
            Rule::type_name => r#type = Some(supported_type(path, &pair)?),
            Rule::identifier => name = Some(Name::from(pair.as_str())),
            Rule::array_suffix => {
                return Err(ParseError::code(
                    path,
                    CodeError::UnsupportedType(format!("{}[]", r#type.unwrap_or(Type::Error))),
                    &pair,
                ))
            }
            _ => {}
        }
    }

    Ok(FunctionParameter {
        name: name.unwrap_or_default(),
        mode: ParameterMode::In,
        r#type: r#type.unwrap_or(Type::Error),
    })
}

fn supported_type(path: &str, pair: &Pair<Rule>) -> Result<Type, ParseError> {
    match pair.as_str() {
        "float" => Ok(Type::FLOAT),
        "vec2" => Ok(Type::VEC2),
        "vec3" => Ok(Type::VEC3),
        "vec4" => Ok(Type::VEC4),
        other => Err(ParseError::code(
            path,
            CodeError::UnsupportedType(other.to_owned()),
            pair,
        )),
    }
}
