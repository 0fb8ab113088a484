//! Tagged node parameter values.

use std::{fmt, path::PathBuf, str::FromStr};

use paste::paste;
use serde::{Deserialize, Serialize};

/// Rust types that can be read out of a [ParameterValue] with a matching [ParameterKind].
pub trait ParameterType {
    /// Kind tag of the type.
    const KIND: ParameterKind;

    /// Borrow the contained value if `value` has the right tag.
    fn extract(value: &ParameterValue) -> Option<&Self>;
}

macro_rules! parameter_value {
    { $($(#[$attr:meta])* $name:ident : $type:ty),+ $(,)? } => {
        paste! {
            #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
            #[serde(tag = "kind", content = "value", rename_all = "camelCase")]
            /// Possible parameter values.
            pub enum ParameterValue {
                $(
                    $(#[$attr])*
                    $name($type),
                )+
            }

            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(rename_all = "camelCase")]
            /// Possible parameter kinds.
            pub enum ParameterKind {
                $(
                    $(#[$attr])*
                    $name,
                )+
            }

            impl ParameterValue {
                /// Tag of the contained value.
                pub fn kind(&self) -> ParameterKind {
                    match self {
                        $(
                            ParameterValue::$name(_) => ParameterKind::$name,
                        )+
                    }
                }

                $(
                    #[doc = concat!("Contained value if it is a [", stringify!($name), "](ParameterValue::", stringify!($name), ").")]
                    pub fn [<as_ $name:snake>](&self) -> Option<&$type> {
                        <$type as ParameterType>::extract(self)
                    }
                )+
            }

            $(
                impl ParameterType for $type {
                    const KIND: ParameterKind = ParameterKind::$name;

                    fn extract(value: &ParameterValue) -> Option<&Self> {
                        match value {
                            ParameterValue::$name(inner) => Some(inner),
                            #[allow(unreachable_patterns)]
                            _ => None,
                        }
                    }
                }

                impl From<$type> for ParameterValue {
                    fn from(value: $type) -> Self {
                        ParameterValue::$name(value)
                    }
                }
            )+

            impl fmt::Display for ParameterKind {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    match self {
                        $(
                            ParameterKind::$name => f.write_str(stringify!([<$name:snake>])),
                        )+
                    }
                }
            }

            impl FromStr for ParameterKind {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Ok(match s {
                        $(
                            stringify!([<$name:snake>]) => Self::$name,
                        )+
                        other => Err(format!("Unrecognized parameter kind `{other}`."))?,
                    })
                }
            }
        }
    };
}

parameter_value! {
    /// Plain number
    Number: f64,
    /// Boolean flag
    Boolean: bool,
    /// Free-form text
    Text: String,
    /// RGBA color
    Color: [f32; 4],
    /// List of floats
    FloatVector: Vec<f32>,
    /// Workspace-relative file path
    Path: PathBuf,
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_match_values() {
        assert_eq!(ParameterValue::from(1.5).kind(), ParameterKind::Number);
        assert_eq!(ParameterValue::from("x").kind(), ParameterKind::Text);
        assert_eq!(
            ParameterValue::from([1., 0., 0., 1.]).kind(),
            ParameterKind::Color
        );
        assert_eq!(ParameterValue::from(1.5).as_number(), Some(&1.5));
        assert_eq!(ParameterValue::from(true).as_number(), None);
        assert_eq!(ParameterValue::from(true).as_boolean(), Some(&true));
    }

    #[test]
    fn kind_names() {
        assert_eq!(ParameterKind::FloatVector.to_string(), "float_vector");
        assert_eq!("float_vector".parse(), Ok(ParameterKind::FloatVector));
        assert!("integer".parse::<ParameterKind>().is_err());
    }

    #[test]
    fn serialized_form_is_tagged() {
        let json = serde_json::to_string(&ParameterValue::Number(2.)).unwrap();
        assert_eq!(json, r#"{"kind":"number","value":2.0}"#);

        let back: ParameterValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ParameterValue::Number(2.));
    }
}
