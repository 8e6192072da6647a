//! Field definitions
//!
//! A Definition describes one field: its type tag, an optional casting
//! rule applied before validation, and whether it is an array/map of some
//! element type or a nested schema. Definitions form a tree; resolution
//! walks it segment by segment.

use crate::schema::Schema;
use chrono::{DateTime, Utc};
use veneer_core::{Error, Result, Value};
use std::sync::Arc;

/// Scalar type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// UTF-8 string
    String,
    /// Int or Float
    Number,
    /// Boolean
    Boolean,
    /// Timestamp
    Date,
}

impl ScalarType {
    /// Type tag used in validation errors
    pub fn tag(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
        }
    }
}

/// Casting rules applied to incoming values before validation
///
/// A closed set; a definition either names one of these or performs no
/// coercion at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastRule {
    /// Render scalars as strings
    ToString,
    /// Parse numeric strings, widen booleans to 0/1
    ToNumber,
    /// Accept 0/1 and "true"/"false"
    ToBoolean,
    /// Parse RFC 3339 strings into dates
    ToDate,
}

/// The shape of a field
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A scalar leaf
    Scalar(ScalarType),
    /// Free-form object; paths beneath it are out of schema scope
    Mixed,
    /// An object governed by its own schema
    Nested(Arc<Schema>),
    /// Array of a single element type
    Array(Box<Definition>),
    /// String-keyed map of a single element type
    Map(Box<Definition>),
}

/// One field's definition
#[derive(Debug, Clone)]
pub struct Definition {
    kind: FieldKind,
    cast: Option<CastRule>,
    default: Option<Value>,
}

impl Definition {
    /// A string field
    pub fn string() -> Self {
        Self::scalar(ScalarType::String)
    }

    /// A numeric field
    pub fn number() -> Self {
        Self::scalar(ScalarType::Number)
    }

    /// A boolean field
    pub fn boolean() -> Self {
        Self::scalar(ScalarType::Boolean)
    }

    /// A date field
    pub fn date() -> Self {
        Self::scalar(ScalarType::Date)
    }

    /// A scalar field of the given type
    pub fn scalar(scalar: ScalarType) -> Self {
        Definition {
            kind: FieldKind::Scalar(scalar),
            cast: None,
            default: None,
        }
    }

    /// A free-form object field; no validation applies beneath it
    pub fn mixed() -> Self {
        Definition {
            kind: FieldKind::Mixed,
            cast: None,
            default: None,
        }
    }

    /// An object field governed by a nested schema
    pub fn nested(schema: Arc<Schema>) -> Self {
        Definition {
            kind: FieldKind::Nested(schema),
            cast: None,
            default: None,
        }
    }

    /// An array of the given element type
    pub fn array(element: Definition) -> Self {
        Definition {
            kind: FieldKind::Array(Box::new(element)),
            cast: None,
            default: None,
        }
    }

    /// A string-keyed map of the given element type
    pub fn map(element: Definition) -> Self {
        Definition {
            kind: FieldKind::Map(Box::new(element)),
            cast: None,
            default: None,
        }
    }

    /// Attach a casting rule
    pub fn with_cast(mut self, cast: CastRule) -> Self {
        self.cast = Some(cast);
        self
    }

    /// Attach a default value, used by [`Schema::build`]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The field's kind
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The default value, if any
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// True for array fields
    pub fn is_array(&self) -> bool {
        matches!(self.kind, FieldKind::Array(_))
    }

    /// True for map fields
    pub fn is_map(&self) -> bool {
        matches!(self.kind, FieldKind::Map(_))
    }

    /// Element definition for array/map fields
    pub fn element(&self) -> Option<&Definition> {
        match &self.kind {
            FieldKind::Array(el) | FieldKind::Map(el) => Some(el),
            _ => None,
        }
    }

    /// Nested schema for schema-typed fields (directly or as array/map element)
    pub fn nested_schema(&self) -> Option<&Arc<Schema>> {
        match &self.kind {
            FieldKind::Nested(schema) => Some(schema),
            _ => None,
        }
    }

    /// Type tag used in validation errors
    pub fn type_tag(&self) -> &'static str {
        match &self.kind {
            FieldKind::Scalar(s) => s.tag(),
            FieldKind::Mixed => "mixed",
            FieldKind::Nested(_) => "schema",
            FieldKind::Array(_) => "array",
            FieldKind::Map(_) => "map",
        }
    }

    /// Apply the casting rule, then validate
    ///
    /// Returns the (possibly coerced) value, or the validation error that
    /// rejected it. Null always passes: absence is expressed as Null and
    /// cleared with unset.
    pub fn cast(&self, value: Value, path: &str) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        let value = match self.cast {
            Some(rule) => apply_cast(rule, value, path, self.type_tag())?,
            None => value,
        };
        self.validate(&value, path, true)?;
        Ok(value)
    }

    /// Validate a value against this definition
    ///
    /// `whole` selects whether `value` is the entire field (an array field
    /// expects an Array) or a single element of it (an array field
    /// validates against its element type). Null always passes.
    pub fn validate(&self, value: &Value, path: &str, whole: bool) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        match &self.kind {
            FieldKind::Scalar(scalar) => {
                let ok = match scalar {
                    ScalarType::String => matches!(value, Value::String(_)),
                    ScalarType::Number => value.is_number(),
                    ScalarType::Boolean => matches!(value, Value::Bool(_)),
                    ScalarType::Date => matches!(value, Value::Date(_)),
                };
                if ok {
                    Ok(())
                } else {
                    Err(Error::validation(
                        path,
                        scalar.tag(),
                        format!("got {}", value.type_name()),
                    ))
                }
            }
            FieldKind::Mixed => Ok(()),
            FieldKind::Nested(schema) => match value.as_object() {
                Some(map) => {
                    for (name, field) in schema.fields() {
                        if let Some(v) = map.get(name) {
                            field.validate(v, &format!("{path}.{name}"), true)?;
                        }
                    }
                    Ok(())
                }
                None => Err(Error::validation(
                    path,
                    "schema",
                    format!("got {}", value.type_name()),
                )),
            },
            FieldKind::Array(element) => {
                if whole {
                    match value.as_array() {
                        Some(items) => {
                            for (i, item) in items.iter().enumerate() {
                                element.validate(item, &format!("{path}.{i}"), true)?;
                            }
                            Ok(())
                        }
                        None => Err(Error::validation(
                            path,
                            "array",
                            format!("got {}", value.type_name()),
                        )),
                    }
                } else {
                    element.validate(value, path, true)
                }
            }
            FieldKind::Map(element) => {
                if whole {
                    match value.as_object() {
                        Some(map) => {
                            for (key, v) in map {
                                element.validate(v, &format!("{path}.{key}"), true)?;
                            }
                            Ok(())
                        }
                        None => Err(Error::validation(
                            path,
                            "map",
                            format!("got {}", value.type_name()),
                        )),
                    }
                } else {
                    element.validate(value, path, true)
                }
            }
        }
    }
}

fn apply_cast(rule: CastRule, value: Value, path: &str, expected: &'static str) -> Result<Value> {
    let rejected = |value: &Value| {
        Err(Error::validation(
            path,
            expected,
            format!("cannot cast {}", value.type_name()),
        ))
    };
    match rule {
        CastRule::ToString => match value {
            Value::String(_) => Ok(value),
            Value::Int(i) => Ok(Value::String(i.to_string())),
            Value::Float(f) => Ok(Value::String(f.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => rejected(&other),
        },
        CastRule::ToNumber => match value {
            Value::Int(_) | Value::Float(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(b as i64)),
            Value::String(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    Ok(Value::Int(i))
                } else if let Ok(f) = s.parse::<f64>() {
                    Ok(Value::Float(f))
                } else {
                    rejected(&Value::String(s))
                }
            }
            other => rejected(&other),
        },
        CastRule::ToBoolean => match value {
            Value::Bool(_) => Ok(value),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::String(s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => rejected(&Value::String(s)),
            },
            other => rejected(&other),
        },
        CastRule::ToDate => match value {
            Value::Date(_) => Ok(value),
            Value::String(s) => match DateTime::parse_from_rfc3339(&s) {
                Ok(d) => Ok(Value::Date(d.with_timezone(&Utc))),
                Err(_) => rejected(&Value::String(s)),
            },
            other => rejected(&other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_validation() {
        let def = Definition::number();
        assert!(def.validate(&Value::Int(3), "n", true).is_ok());
        assert!(def.validate(&Value::Float(3.5), "n", true).is_ok());
        let err = def.validate(&Value::from("x"), "n", true).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("'n'"));
    }

    #[test]
    fn test_null_always_passes() {
        assert!(Definition::string().validate(&Value::Null, "s", true).is_ok());
        assert!(Definition::array(Definition::number())
            .validate(&Value::Null, "a", true)
            .is_ok());
    }

    #[test]
    fn test_array_whole_vs_element() {
        let def = Definition::array(Definition::number());
        let arr = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert!(def.validate(&arr, "a", true).is_ok());
        // element-position validation accepts a bare number
        assert!(def.validate(&Value::Int(1), "a.0", false).is_ok());
        // and rejects an array where an element is expected
        assert!(def.validate(&arr, "a.0", false).is_err());
    }

    #[test]
    fn test_cast_to_number() {
        let def = Definition::number().with_cast(CastRule::ToNumber);
        assert_eq!(def.cast(Value::from("42"), "n").unwrap(), Value::Int(42));
        assert_eq!(
            def.cast(Value::from("2.5"), "n").unwrap(),
            Value::Float(2.5)
        );
        assert!(def.cast(Value::from("nope"), "n").is_err());
    }

    #[test]
    fn test_cast_to_date() {
        let def = Definition::date().with_cast(CastRule::ToDate);
        let cast = def
            .cast(Value::from("2024-05-01T12:00:00Z"), "at")
            .unwrap();
        assert!(matches!(cast, Value::Date(_)));
    }
}
