//! End-to-end account flow through the facade crate: create, mutate
//! through the navigator, flush, and read back.

use std::sync::Arc;
use veneer::testing::RecordingPool;
use veneer::{Definition, FieldMap, Filter, Model, Schema, SqlRow, SqlValue, Value};

fn accounts() -> (Model, Arc<RecordingPool>) {
    let schema = Schema::builder()
        .field("_id", Definition::string())
        .field("balance", Definition::number())
        .field("tags", Definition::array(Definition::string()))
        .build();
    let pool = Arc::new(RecordingPool::new());
    let model = Model::new("accounts", schema, pool.clone());
    (model, pool)
}

#[test]
fn create_mutate_flush_read_back() {
    let (model, pool) = accounts();

    // create and persist
    let mut fields = FieldMap::new();
    fields.insert("_id".to_string(), Value::from("a1"));
    fields.insert("balance".to_string(), Value::Int(100));
    fields.insert("tags".to_string(), Value::Array(vec![]));
    let mut doc = model.new_document(fields).unwrap();
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "INSERT INTO accounts (_id, balance, tags) VALUES (?, ?, ?)");
    assert_eq!(params.len(), 3);

    // declare two mutations, flush once
    doc.query().prop("balance").inc(25i64).unwrap();
    doc.query().prop("tags").push("vip").unwrap();
    pool.clear();
    doc.save().unwrap();
    assert_eq!(pool.statement_count(), 1);
    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(
        sql,
        "UPDATE accounts SET balance = balance + ?, \
         tags = JSON_ARRAY_APPEND(COALESCE(tags, JSON_ARRAY()), '$', ?) WHERE _id = ?"
    );
    assert_eq!(
        params,
        vec![
            SqlValue::Int(25),
            SqlValue::Text("vip".into()),
            SqlValue::Text("a1".into()),
        ]
    );

    // read back what the engine would now hold
    pool.script_rows(vec![SqlRow::new()
        .cell("_id", SqlValue::Text("a1".into()))
        .cell("balance", SqlValue::Int(125))
        .cell("tags", SqlValue::Text("[\"vip\"]".into()))]);
    let found = model.find_one(Filter::id("a1")).unwrap().unwrap();
    assert_eq!(found.get("balance"), Some(&Value::Int(125)));
    assert_eq!(
        found.get("tags"),
        Some(&Value::Array(vec![Value::from("vip")]))
    );
}

#[test]
fn round_trip_preserves_nested_shapes_and_dates() {
    // nested arrays/objects survive the JSON-typed column encoding
    let mut nested = FieldMap::new();
    nested.insert(
        "kinds".to_string(),
        Value::Array(vec![Value::Int(1), Value::Null, Value::from("x")]),
    );
    let mut fields = FieldMap::new();
    fields.insert("profile".to_string(), Value::Object(nested));
    let value = Value::Object(fields);

    let stored = SqlValue::from_document(&value);
    assert!(matches!(stored, SqlValue::Text(_)));
    assert_eq!(stored.into_document(), value);

    // top-level dates pass through the bind layer typed, both directions
    let now = chrono::Utc::now();
    let bound = SqlValue::from_document(&Value::Date(now));
    assert_eq!(bound.into_document(), Value::Date(now));
}
