//! Scalar values and bound parameters.
//!
//! A [`Parameter`] is either a plain [`Value`] or a value tagged with a
//! [`BindType`] that forces how the connector binds it. Connectors call
//! [`Parameter::resolve`] to get the final binding type and the coerced value.

use std::{borrow::Cow, fmt};

use serde::Serialize;

use crate::error::{DbError, Result};

/// A scalar that can be bound to a placeholder or read from a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Driver-independent binding type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindType {
    Boolean,
    Integer,
    Float,
    String,
    Null,
    Blob,
}

/// A bound parameter, optionally carrying a type hint.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Raw(Value),
    Typed(BindType, Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(v) => Some(v),
            Value::Text(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    /// The binding type inferred from the runtime variant.
    pub fn bind_type(&self) -> BindType {
        match self {
            Value::Null => BindType::Null,
            Value::Bool(_) => BindType::Boolean,
            Value::Integer(_) => BindType::Integer,
            Value::Float(_) => BindType::Float,
            Value::Text(_) => BindType::String,
            Value::Blob(_) => BindType::Blob,
        }
    }

    /// Converts this value so it can be bound as `target`.
    ///
    /// Returns the value unchanged (borrowed) when it already has the right
    /// shape. NULL stays NULL for every target.
    pub fn coerce(&self, target: BindType) -> std::result::Result<Cow<'_, Value>, String> {
        let fail = || format!("cannot bind {} as {}", self.describe(), target);

        if self.is_null() || self.bind_type() == target {
            return Ok(Cow::Borrowed(self));
        }

        let coerced = match (target, self) {
            (BindType::Null, _) => Value::Null,

            (BindType::Boolean, Value::Integer(v)) => Value::Bool(*v != 0),
            (BindType::Boolean, Value::Float(v)) => Value::Bool(*v != 0.0),
            (BindType::Boolean, Value::Text(v)) => {
                match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "t" | "yes" | "on" => Value::Bool(true),
                    "0" | "false" | "f" | "no" | "off" | "" => Value::Bool(false),
                    _ => return Err(fail()),
                }
            }

            (BindType::Integer, Value::Bool(v)) => Value::Integer(i64::from(*v)),
            (BindType::Integer, Value::Float(v)) if v.is_finite() => Value::Integer(*v as i64),
            (BindType::Integer, Value::Text(v)) => {
                Value::Integer(v.trim().parse().map_err(|_| fail())?)
            }

            (BindType::Float, Value::Bool(v)) => Value::Float(if *v { 1.0 } else { 0.0 }),
            (BindType::Float, Value::Integer(v)) => Value::Float(*v as f64),
            (BindType::Float, Value::Text(v)) => Value::Float(v.trim().parse().map_err(|_| fail())?),

            (BindType::String, Value::Bool(v)) => Value::Text(if *v { "1" } else { "0" }.into()),
            (BindType::String, Value::Integer(v)) => Value::Text(v.to_string()),
            (BindType::String, Value::Float(v)) => Value::Text(v.to_string()),
            (BindType::String, Value::Blob(v)) => {
                Value::Text(String::from_utf8(v.clone()).map_err(|_| fail())?)
            }

            (BindType::Blob, Value::Text(v)) => Value::Blob(v.as_bytes().to_vec()),

            _ => return Err(fail()),
        };

        Ok(Cow::Owned(coerced))
    }

    fn describe(&self) -> String {
        match self {
            Value::Null => "NULL".into(),
            Value::Blob(v) => format!("blob of {} bytes", v.len()),
            Value::Text(v) => format!("text {v:?}"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Blob(v) => write!(f, "x'{}'", hex::encode(v)),
        }
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindType::Boolean => "boolean",
            BindType::Integer => "integer",
            BindType::Float => "float",
            BindType::String => "string",
            BindType::Null => "null",
            BindType::Blob => "blob",
        };
        f.write_str(name)
    }
}

impl BindType {
    /// Parses a type hint name such as `integer` or `blob`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(BindType::Boolean),
            "int" | "integer" => Some(BindType::Integer),
            "float" | "double" | "real" => Some(BindType::Float),
            "str" | "string" | "text" => Some(BindType::String),
            "null" => Some(BindType::Null),
            "blob" | "binary" => Some(BindType::Blob),
            _ => None,
        }
    }
}

impl Parameter {
    pub fn typed(bind_type: BindType, value: impl Into<Value>) -> Self {
        Parameter::Typed(bind_type, value.into())
    }

    /// The wrapped value with any type hint stripped.
    pub fn value(&self) -> &Value {
        match self {
            Parameter::Raw(value) | Parameter::Typed(_, value) => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Parameter::Raw(value) | Parameter::Typed(_, value) => value,
        }
    }

    /// Resolves the binding type and the value to bind.
    ///
    /// `index` is the 1-based placeholder position, used for error reporting.
    pub fn resolve(&self, index: usize) -> Result<(BindType, Cow<'_, Value>)> {
        match self {
            Parameter::Raw(value) => Ok((value.bind_type(), Cow::Borrowed(value))),
            Parameter::Typed(hint, value) => {
                let coerced = value
                    .coerce(*hint)
                    .map_err(|message| DbError::Binding { index, message })?;
                let bind_type = if coerced.is_null() {
                    BindType::Null
                } else {
                    *hint
                };
                Ok((bind_type, coerced))
            }
        }
    }
}

/// Resolves every parameter of a statement, failing on the first one that
/// cannot be bound.
pub fn resolve_parameters(parameters: &[Parameter]) -> Result<Vec<(BindType, Cow<'_, Value>)>> {
    parameters
        .iter()
        .enumerate()
        .map(|(i, param)| param.resolve(i + 1))
        .collect()
}

/// Strips type hints from a parameter list.
pub fn flatten_parameters(parameters: &[Parameter]) -> Vec<Value> {
    parameters.iter().map(|p| p.value().clone()).collect()
}

impl From<Value> for Parameter {
    fn from(value: Value) -> Self {
        Parameter::Raw(value)
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => |$v:ident| $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $conv
                }
            }

            impl From<$ty> for Parameter {
                fn from(v: $ty) -> Self {
                    Parameter::Raw(Value::from(v))
                }
            }
        )*
    };
}

impl_value_from! {
    bool => |v| Value::Bool(v),
    i32 => |v| Value::Integer(i64::from(v)),
    i64 => |v| Value::Integer(v),
    u32 => |v| Value::Integer(i64::from(v)),
    f64 => |v| Value::Float(v),
    String => |v| Value::Text(v),
    &str => |v| Value::Text(v.to_string()),
    Vec<u8> => |v| Value::Blob(v),
    &[u8] => |v| Value::Blob(v.to_vec()),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_parameter_infers_type() {
        let param = Parameter::from(42);
        let (bind, value) = param.resolve(1).unwrap();
        assert_eq!(bind, BindType::Integer);
        assert_eq!(value.as_ref(), &Value::Integer(42));

        let param = Parameter::from(vec![1u8, 2, 3]);
        let (bind, _) = param.resolve(1).unwrap();
        assert_eq!(bind, BindType::Blob);

        let param = Parameter::from(Value::Null);
        let (bind, _) = param.resolve(1).unwrap();
        assert_eq!(bind, BindType::Null);
    }

    #[test]
    fn test_typed_parameter_coerces_text() {
        let param = Parameter::typed(BindType::Integer, "12");
        let (bind, value) = param.resolve(1).unwrap();
        assert_eq!(bind, BindType::Integer);
        assert_eq!(value.into_owned(), Value::Integer(12));

        let param = Parameter::typed(BindType::Boolean, "false");
        assert_eq!(param.resolve(1).unwrap().1.into_owned(), Value::Bool(false));

        let param = Parameter::typed(BindType::String, 7);
        assert_eq!(param.resolve(1).unwrap().1.into_owned(), Value::Text("7".into()));
    }

    #[test]
    fn test_typed_parameter_keeps_matching_value_borrowed() {
        let param = Parameter::typed(BindType::Blob, vec![0u8; 16]);
        let (_, value) = param.resolve(1).unwrap();
        assert!(matches!(value, Cow::Borrowed(_)));
    }

    #[test]
    fn test_typed_null_hint_binds_null() {
        let param = Parameter::typed(BindType::Null, "anything");
        let (bind, value) = param.resolve(1).unwrap();
        assert_eq!(bind, BindType::Null);
        assert!(value.is_null());

        let param = Parameter::typed(BindType::Integer, Value::Null);
        assert_eq!(param.resolve(1).unwrap().0, BindType::Null);
    }

    #[test]
    fn test_unbindable_values_are_binding_errors() {
        let err = Parameter::typed(BindType::Integer, "abc").resolve(3).unwrap_err();
        assert!(matches!(err, DbError::Binding { index: 3, .. }));

        let err = Parameter::typed(BindType::Integer, vec![1u8]).resolve(1).unwrap_err();
        assert!(err.to_string().contains("blob of 1 bytes"));

        assert!(Parameter::typed(BindType::Boolean, "maybe").resolve(1).is_err());
        assert!(Parameter::typed(BindType::Float, f64::NAN)
            .resolve(1)
            .unwrap()
            .1
            .as_f64()
            .is_some_and(f64::is_nan));
        assert!(Parameter::typed(BindType::Integer, f64::INFINITY).resolve(1).is_err());
    }

    #[test]
    fn test_resolve_parameters_reports_position() {
        let params = vec![
            Parameter::from("ok"),
            Parameter::typed(BindType::Integer, "1"),
            Parameter::typed(BindType::Integer, "x"),
        ];
        let err = resolve_parameters(&params).unwrap_err();
        assert!(matches!(err, DbError::Binding { index: 3, .. }));
    }

    #[test]
    fn test_flatten_strips_type_tags() {
        let params = vec![
            Parameter::typed(BindType::Blob, "payload"),
            Parameter::from(5),
        ];
        assert_eq!(
            flatten_parameters(&params),
            vec![Value::Text("payload".into()), Value::Integer(5)]
        );
    }

    #[test]
    fn test_bind_type_names() {
        assert_eq!(BindType::from_name("INT"), Some(BindType::Integer));
        assert_eq!(BindType::from_name("blob"), Some(BindType::Blob));
        assert_eq!(BindType::from_name("uuid"), None);
        assert_eq!(BindType::Boolean.to_string(), "boolean");
    }

    #[test]
    fn test_display_blob_as_hex_literal() {
        assert_eq!(Value::Blob(vec![0xde, 0xad]).to_string(), "x'dead'");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_values_serialize_untagged() {
        let row = vec![
            Value::Null,
            Value::Bool(true),
            Value::Integer(3),
            Value::Text("x".into()),
        ];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[null,true,3,"x"]"#);
        assert_eq!(serde_json::to_string(&Value::Blob(vec![1, 2])).unwrap(), "[1,2]");
    }
}
