//! Connection pool contract
//!
//! The engine consumes a relational database through this narrow surface:
//! acquire one connection, run exactly one statement, release. Release is
//! RAII - dropping the boxed connection returns it to its pool on every
//! exit path, success or failure.
//!
//! `SqlValue` is the closed bind-parameter vocabulary. Structured document
//! values are serialized before they reach a connection: arrays and
//! objects become JSON text, dates pass through typed, everything else
//! maps one-to-one.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use veneer_core::{FieldMap, Result, Value};

/// A bind parameter or result cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Integer
    Int(i64),
    /// Double
    Float(f64),
    /// Text (including JSON-typed column text)
    Text(String),
    /// Boolean
    Bool(bool),
    /// Timestamp, passed through without text encoding
    Date(DateTime<Utc>),
}

impl SqlValue {
    /// Serialize a document value for storage
    ///
    /// Null stays NULL, dates pass through as-is, arrays and plain objects
    /// become JSON-encoded text, scalars pass through unchanged.
    pub fn from_document(value: &Value) -> SqlValue {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Int(i) => SqlValue::Int(*i),
            Value::Float(f) => SqlValue::Float(*f),
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Date(d) => SqlValue::Date(*d),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_json_text()),
        }
    }

    /// Recover a document value from a result cell
    ///
    /// Any text cell that is syntactically a JSON object/array literal is
    /// opportunistically parsed back into a structured value; a parse
    /// failure leaves the raw string.
    pub fn into_document(self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Int(i) => Value::Int(i),
            SqlValue::Float(f) => Value::Float(f),
            SqlValue::Bool(b) => Value::Bool(b),
            SqlValue::Date(d) => Value::Date(d),
            SqlValue::Text(s) => match Value::parse_json_text(&s) {
                Some(parsed) => parsed,
                None => Value::String(s),
            },
        }
    }
}

/// One result row: column name to cell value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: BTreeMap<String, SqlValue>,
}

impl SqlRow {
    /// Create an empty row
    pub fn new() -> Self {
        SqlRow {
            columns: BTreeMap::new(),
        }
    }

    /// Add a cell (builder pattern)
    pub fn cell(mut self, column: impl Into<String>, value: SqlValue) -> Self {
        self.columns.insert(column.into(), value);
        self
    }

    /// Get a cell by column name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Convert the row into a document field map with JSON recovery
    pub fn into_fields(self) -> FieldMap {
        self.columns
            .into_iter()
            .map(|(name, cell)| (name, cell.into_document()))
            .collect()
    }
}

impl FromIterator<(String, SqlValue)> for SqlRow {
    fn from_iter<T: IntoIterator<Item = (String, SqlValue)>>(iter: T) -> Self {
        SqlRow {
            columns: iter.into_iter().collect(),
        }
    }
}

/// A live connection to the relational engine
///
/// Implementations wrap their native errors into [`Error::Storage`]; no
/// engine-specific error shape crosses this boundary.
pub trait Connection {
    /// Execute a statement, returning the affected row count
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Execute a query, returning its rows
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>>;
}

/// Supplies one transient connection per operation
///
/// `acquire` may block awaiting availability. The returned box is released
/// by dropping it; implementations attach their return-to-pool logic to
/// Drop so release happens on every exit path.
pub trait ConnectionPool: Send + Sync {
    /// Acquire a connection for the duration of one statement
    fn acquire(&self) -> Result<Box<dyn Connection + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use veneer_core::Value;

    #[test]
    fn test_serialize_nested_as_json_text() {
        let value = Value::Array(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(
            SqlValue::from_document(&value),
            SqlValue::Text("[1,\"a\"]".to_string())
        );
    }

    #[test]
    fn test_date_passes_through() {
        let now = Utc::now();
        let sql = SqlValue::from_document(&Value::Date(now));
        assert_eq!(sql, SqlValue::Date(now));
        assert_eq!(sql.into_document(), Value::Date(now));
    }

    #[test]
    fn test_json_recovery_on_read() {
        let cell = SqlValue::Text("{\"a\":1}".to_string());
        let value = cell.into_document();
        assert_eq!(value.as_object().unwrap().get("a"), Some(&Value::Int(1)));

        // malformed JSON-looking text stays a string
        let cell = SqlValue::Text("{oops".to_string());
        assert_eq!(cell.into_document(), Value::String("{oops".to_string()));
    }

    #[test]
    fn test_row_into_fields() {
        let row = SqlRow::new()
            .cell("_id", SqlValue::Text("a1".into()))
            .cell("tags", SqlValue::Text("[\"vip\"]".into()));
        let fields = row.into_fields();
        assert_eq!(fields.get("_id"), Some(&Value::String("a1".into())));
        assert_eq!(
            fields.get("tags"),
            Some(&Value::Array(vec![Value::from("vip")]))
        );
    }
}
