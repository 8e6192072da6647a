//! Value types for Veneer
//!
//! This module defines:
//! - Value: Unified enum for all document field values
//! - FieldMap: Ordered map of top-level (or nested) object fields
//! - Tree-walk helpers: get_at_path / set_at_path / remove_at_path
//!
//! ## Value Model
//!
//! The Value enum has exactly 8 variants: Null, Bool, Int, Float, String,
//! Date, Array, Object. This is the JSON data model plus `Date`, which the
//! storage layer passes through as a typed bind parameter instead of text.
//!
//! ### Type Rules
//!
//! - No implicit type coercions (casting is the schema layer's job)
//! - `Int(1) != Float(1.0)` - different types are NEVER equal
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`

use crate::error::{Error, Result};
use crate::path::{DocPath, PathSegment};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered field map used for document roots and nested objects
///
/// A BTreeMap keeps iteration (and therefore SQL column emission) order
/// deterministic.
pub type FieldMap = BTreeMap<String, Value>;

/// Canonical document value type
///
/// Different types are NEVER equal, even if they contain the same "value":
/// `Int(1) != Float(1.0)`. Float equality follows IEEE-754 semantics.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Timestamp, passed through to storage as-is
    Date(DateTime<Utc>),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys
    Object(FieldMap),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            // Different types are never equal
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "number",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a numeric value (Int or Float)
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Get as bool if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the numeric value as f64 (Int or Float)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array slice if this is an Array
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as mutable array if this is an Array
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as object map if this is an Object
    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Get as mutable object map if this is an Object
    pub fn as_object_mut(&mut self) -> Option<&mut FieldMap> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Numeric addition used when folding an increment into a pending set
    ///
    /// Int + Int stays Int; any Float operand widens the result to Float.
    /// Returns None if either side is not numeric.
    pub fn numeric_add(&self, delta: &Value) -> Option<Value> {
        match (self, delta) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a + b)),
            (a, b) => {
                let (a, b) = (a.as_number()?, b.as_number()?);
                Some(Value::Float(a + b))
            }
        }
    }

    /// Convert to a `serde_json::Value`
    ///
    /// Dates are encoded as RFC 3339 strings; this matches how they are
    /// embedded when a Date sits inside a JSON-typed column.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Build a Value from a `serde_json::Value`
    ///
    /// Whole numbers land in `Int`, everything else numeric in `Float`.
    /// Strings stay strings; there is no opportunistic date recovery.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Serialize to compact JSON text
    pub fn to_json_text(&self) -> String {
        self.to_json().to_string()
    }

    /// Opportunistically parse text that is syntactically a JSON object or
    /// array literal back into a structured value
    ///
    /// Returns None for anything else, including text that merely starts
    /// with a brace but fails to parse; the caller keeps the raw string.
    pub fn parse_json_text(text: &str) -> Option<Value> {
        let trimmed = text.trim_start();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return None;
        }
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .map(Value::from_json)
    }
}

// Display renders the JSON encoding
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<FieldMap> for Value {
    fn from(v: FieldMap) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// =============================================================================
// Tree-walk helpers
// =============================================================================

/// Read the value at `path`, if present
pub fn get_at_path<'a>(root: &'a FieldMap, path: &DocPath) -> Option<&'a Value> {
    let mut segments = path.segments().iter();
    let first = match segments.next()? {
        PathSegment::Key(k) => k,
        PathSegment::Index(_) => return None,
    };
    let mut current = root.get(first)?;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(k), Value::Object(map)) => map.get(k)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable variant of [`get_at_path`]
pub fn get_at_path_mut<'a>(root: &'a mut FieldMap, path: &DocPath) -> Option<&'a mut Value> {
    let mut segments = path.segments().iter();
    let first = match segments.next()? {
        PathSegment::Key(k) => k,
        PathSegment::Index(_) => return None,
    };
    let mut current = root.get_mut(first)?;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(k), Value::Object(map)) => map.get_mut(k)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects for key segments
///
/// Array indices must address an existing element or the one-past-the-end
/// position (which appends). Anything else is an invalid operation.
pub fn set_at_path(root: &mut FieldMap, path: &DocPath, value: Value) -> Result<()> {
    let segments = path.segments();
    let first = match segments.first() {
        Some(PathSegment::Key(k)) => k.clone(),
        _ => {
            return Err(Error::InvalidOperation(
                "path must start with a field name".to_string(),
            ))
        }
    };
    if segments.len() == 1 {
        root.insert(first, value);
        return Ok(());
    }

    let mut current = root
        .entry(first)
        .or_insert_with(|| Value::Object(FieldMap::new()));
    for (pos, segment) in segments[1..].iter().enumerate() {
        let last = pos == segments.len() - 2;
        match segment {
            PathSegment::Key(k) => {
                // non-objects on the way down are overwritten
                if !matches!(current, Value::Object(_)) {
                    *current = Value::Object(FieldMap::new());
                }
                let Value::Object(map) = current else {
                    return Err(Error::InvalidOperation(format!(
                        "cannot descend into non-object at {path}"
                    )));
                };
                if last {
                    map.insert(k.clone(), value);
                    return Ok(());
                }
                current = map
                    .entry(k.clone())
                    .or_insert_with(|| Value::Object(FieldMap::new()));
            }
            PathSegment::Index(i) => {
                let items = current.as_array_mut().ok_or_else(|| {
                    Error::InvalidOperation(format!("cannot index into non-array at {path}"))
                })?;
                if *i > items.len() {
                    return Err(Error::InvalidOperation(format!(
                        "index {i} out of bounds at {path}"
                    )));
                }
                if *i == items.len() {
                    items.push(Value::Object(FieldMap::new()));
                }
                if last {
                    items[*i] = value;
                    return Ok(());
                }
                current = &mut items[*i];
            }
        }
    }
    unreachable!("loop returns on the last segment")
}

/// Remove and return the value at `path`
///
/// Removing an array element shifts later elements down.
pub fn remove_at_path(root: &mut FieldMap, path: &DocPath) -> Option<Value> {
    let parent = path.parent()?;
    let last = path.last_segment()?;
    if parent.is_empty() {
        return match last {
            PathSegment::Key(k) => root.remove(k),
            PathSegment::Index(_) => None,
        };
    }
    let container = get_at_path_mut(root, &parent)?;
    match (last, container) {
        (PathSegment::Key(k), Value::Object(map)) => map.remove(k),
        (PathSegment::Index(i), Value::Array(items)) => {
            if *i < items.len() {
                Some(items.remove(*i))
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_map() -> FieldMap {
        let mut inner = FieldMap::new();
        inner.insert("level".to_string(), Value::Int(3));
        let mut root = FieldMap::new();
        root.insert("config".to_string(), Value::Object(inner));
        root.insert(
            "tags".to_string(),
            Value::Array(vec![Value::from("a"), Value::from("b")]),
        );
        root
    }

    #[test]
    fn test_type_equality_is_strict() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::String("1".into()), Value::Int(1));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_numeric_add() {
        assert_eq!(
            Value::Int(50).numeric_add(&Value::Int(10)),
            Some(Value::Int(60))
        );
        assert_eq!(
            Value::Int(1).numeric_add(&Value::Float(0.5)),
            Some(Value::Float(1.5))
        );
        assert_eq!(Value::String("x".into()).numeric_add(&Value::Int(1)), None);
    }

    #[test]
    fn test_json_round_trip() {
        let original = Value::Object(sample_map());
        let text = original.to_json_text();
        let parsed = Value::parse_json_text(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_json_text_rejects_scalars() {
        assert_eq!(Value::parse_json_text("plain text"), None);
        assert_eq!(Value::parse_json_text("42"), None);
        // looks like JSON but is malformed: keep the raw string
        assert_eq!(Value::parse_json_text("{not json"), None);
    }

    #[test]
    fn test_date_encodes_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let json = Value::Date(date).to_json();
        assert_eq!(json, serde_json::json!("2024-05-01T12:00:00.000Z"));
    }

    #[test]
    fn test_get_at_path() {
        let map = sample_map();
        let path: DocPath = "config.level".parse().unwrap();
        assert_eq!(get_at_path(&map, &path), Some(&Value::Int(3)));
        let path: DocPath = "tags.1".parse().unwrap();
        assert_eq!(get_at_path(&map, &path), Some(&Value::from("b")));
        let path: DocPath = "missing.level".parse().unwrap();
        assert_eq!(get_at_path(&map, &path), None);
    }

    #[test]
    fn test_set_at_path_creates_intermediates() {
        let mut map = FieldMap::new();
        let path: DocPath = "a.b.c".parse().unwrap();
        set_at_path(&mut map, &path, Value::Int(1)).unwrap();
        assert_eq!(get_at_path(&map, &path), Some(&Value::Int(1)));
    }

    #[test]
    fn test_set_at_path_array_append() {
        let mut map = sample_map();
        let path: DocPath = "tags.2".parse().unwrap();
        set_at_path(&mut map, &path, Value::from("c")).unwrap();
        assert_eq!(get_at_path(&map, &path), Some(&Value::from("c")));

        let oob: DocPath = "tags.9".parse().unwrap();
        assert!(set_at_path(&mut map, &oob, Value::Null).is_err());
    }

    #[test]
    fn test_remove_at_path() {
        let mut map = sample_map();
        let path: DocPath = "tags.0".parse().unwrap();
        assert_eq!(remove_at_path(&mut map, &path), Some(Value::from("a")));
        let tags = map.get("tags").unwrap().as_array().unwrap();
        assert_eq!(tags.len(), 1);

        let path: DocPath = "config.level".parse().unwrap();
        assert_eq!(remove_at_path(&mut map, &path), Some(Value::Int(3)));
    }
}
