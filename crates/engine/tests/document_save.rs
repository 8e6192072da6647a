//! Document save flow: insert, pending-buffer flush, merge law at save
//! time, cache interaction, and error propagation.

mod common;

use common::{account_row, accounts_model};
use veneer_core::{FieldMap, Value};
use veneer_engine::{Filter, SqlValue};

fn new_account_fields(id: &str, balance: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("_id".to_string(), Value::from(id));
    fields.insert("balance".to_string(), Value::Int(balance));
    fields.insert("tags".to_string(), Value::Array(vec![]));
    fields
}

#[test]
fn insert_persists_all_fields() {
    let (model, pool) = accounts_model();
    let mut doc = model.new_document(new_account_fields("a1", 100)).unwrap();
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "INSERT INTO accounts (_id, balance, tags) VALUES (?, ?, ?)");
    assert_eq!(
        params,
        vec![
            SqlValue::Text("a1".into()),
            SqlValue::Int(100),
            SqlValue::Text("[]".into()),
        ]
    );
    assert!(!doc.is_new());
}

#[test]
fn inc_and_push_flush_as_one_update() {
    let (model, pool) = accounts_model();
    let mut doc = model.new_document(new_account_fields("a1", 100)).unwrap();
    doc.save().unwrap();
    pool.clear();

    doc.query().prop("balance").inc(25i64).unwrap();
    doc.query().prop("tags").push("vip").unwrap();
    doc.save().unwrap();

    let statements = pool.statements();
    assert_eq!(statements.len(), 1);
    let (sql, params) = &statements[0];
    assert_eq!(
        sql,
        "UPDATE accounts SET balance = balance + ?, \
         tags = JSON_ARRAY_APPEND(COALESCE(tags, JSON_ARRAY()), '$', ?) WHERE _id = ?"
    );
    assert_eq!(
        params,
        &vec![
            SqlValue::Int(25),
            SqlValue::Text("vip".into()),
            SqlValue::Text("a1".into()),
        ]
    );
    assert!(doc.pending().is_empty());
    // the live map observed both mutations
    assert_eq!(doc.get("balance"), Some(&Value::Int(125)));
    assert_eq!(
        doc.get("tags"),
        Some(&Value::Array(vec![Value::from("vip")]))
    );
}

#[test]
fn save_is_idempotent_without_mutations() {
    let (model, pool) = accounts_model();
    let mut doc = model.new_document(new_account_fields("a1", 100)).unwrap();
    doc.save().unwrap();
    let after_insert = pool.statement_count();

    doc.save().unwrap();
    doc.save().unwrap();
    assert_eq!(pool.statement_count(), after_insert);
}

#[test]
fn set_then_inc_collapses_to_single_set() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    doc.query().prop("balance").set(50i64).unwrap();
    doc.query().prop("balance").inc(10i64).unwrap();
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "UPDATE accounts SET balance = ? WHERE _id = ?");
    assert_eq!(
        params,
        vec![SqlValue::Int(60), SqlValue::Text("a1".into())]
    );
}

#[test]
fn unset_after_set_flushes_null() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    doc.query().prop("name").set("zed").unwrap();
    {
        let mut nav = doc.query().prop("name");
        nav.remove().unwrap();
    }
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "UPDATE accounts SET name = NULL WHERE _id = ?");
    assert_eq!(params, vec![SqlValue::Text("a1".into())]);
}

#[test]
fn pull_by_id_emits_one_statement_per_value() {
    let (model, pool) = accounts_model();
    let members = "[{\"_id\":\"m1\",\"role\":\"admin\"},{\"_id\":\"m2\",\"role\":\"mod\"}]";
    pool.script_rows(vec![account_row("a1", 100, "[]")
        .cell("members", SqlValue::Text(members.to_string()))]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    let mut member = FieldMap::new();
    member.insert("_id".to_string(), Value::from("m1"));
    doc.query()
        .prop("members")
        .pull(Value::Object(member))
        .unwrap();
    doc.save().unwrap();

    let statements = pool.statements();
    assert_eq!(statements.len(), 1);
    let (sql, params) = &statements[0];
    assert_eq!(
        sql,
        "UPDATE accounts SET members = IF(JSON_SEARCH(members, 'one', ?, NULL, '$[*]._id') IS NULL, \
         members, JSON_REMOVE(members, JSON_UNQUOTE(JSON_SEARCH(members, 'one', ?, NULL, '$[*]._id')))) \
         WHERE _id = ?"
    );
    assert_eq!(
        params,
        &vec![
            SqlValue::Text("m1".into()),
            SqlValue::Text("m1".into()),
            SqlValue::Text("a1".into()),
        ]
    );
    // the live array dropped the member
    let remaining = doc.get("members").unwrap().as_array().unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn pull_scalar_uses_pull_all_shape() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[\"vip\",\"beta\"]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    doc.query().prop("tags").pull("vip").unwrap();
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(
        sql,
        "UPDATE accounts SET tags = IF(JSON_SEARCH(tags, 'one', ?, NULL, '$[*]') IS NULL, \
         tags, JSON_REMOVE(tags, JSON_UNQUOTE(JSON_SEARCH(tags, 'one', ?, NULL, '$[*]')))) \
         WHERE _id = ?"
    );
    assert_eq!(params.len(), 3);
    assert_eq!(
        doc.get("tags"),
        Some(&Value::Array(vec![Value::from("beta")]))
    );
}

#[test]
fn validation_failure_surfaces_and_writes_nothing() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    let err = doc.query().prop("balance").set("not a number").unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("balance"));
    assert!(doc.pending().is_empty());

    doc.save().unwrap();
    assert_eq!(pool.statement_count(), 0);
}

#[test]
fn nested_set_writes_whole_column() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    doc.query()
        .prop("config.moderation.enabled")
        .set(true)
        .unwrap();
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "UPDATE accounts SET config = ? WHERE _id = ?");
    assert_eq!(
        params,
        vec![
            SqlValue::Text("{\"moderation\":{\"enabled\":true}}".into()),
            SqlValue::Text("a1".into()),
        ]
    );
}

#[test]
fn cache_reflects_pending_mutations_before_save() {
    let (model, pool) = accounts_model();
    let mut doc = model.new_document(new_account_fields("a1", 100)).unwrap();
    doc.save().unwrap();
    assert!(model.cache().contains("a1"));

    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut read_back = model.find_one(Filter::id("a1")).unwrap().unwrap();
    read_back.query().prop("balance").inc(25i64).unwrap();

    // mirrored optimistically, before the physical write
    let cached = model.cache().get("a1").unwrap();
    assert_eq!(cached.get("balance"), Some(&Value::Int(125)));
}

#[test]
fn unforced_insert_does_not_clobber_cache() {
    let (model, _pool) = accounts_model();
    let mut doc = model.new_document(new_account_fields("a1", 100)).unwrap();
    doc.save().unwrap();

    let mut stale = model.new_document(new_account_fields("a1", 0)).unwrap();
    stale.save().unwrap();
    let cached = model.cache().get("a1").unwrap();
    assert_eq!(cached.get("balance"), Some(&Value::Int(100)));

    let mut forced = model.new_document_forced(new_account_fields("a1", 7)).unwrap();
    forced.save().unwrap();
    let cached = model.cache().get("a1").unwrap();
    assert_eq!(cached.get("balance"), Some(&Value::Int(7)));
}

#[test]
fn storage_failure_propagates_and_releases_connection() {
    let (model, pool) = accounts_model();
    let mut doc = model.new_document(new_account_fields("a1", 100)).unwrap();
    pool.fail_next("connection reset");
    let err = doc.save().unwrap_err();
    assert!(err.to_string().contains("storage error"));
    assert_eq!(pool.acquired(), pool.released());
}

#[test]
fn direct_field_assignment_joins_the_set_group() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    doc.set_field("name", "zed").unwrap();
    assert_eq!(doc.get("name"), Some(&Value::from("zed")));
    doc.save().unwrap();

    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "UPDATE accounts SET name = ? WHERE _id = ?");
    assert_eq!(
        params,
        vec![SqlValue::Text("zed".into()), SqlValue::Text("a1".into())]
    );
}

#[test]
fn generated_identifier_is_24_hex_chars() {
    let pool = std::sync::Arc::new(veneer_engine::testing::RecordingPool::new());
    // no schema-defined identifier: the layer generates one
    let schema = veneer_schema::Schema::builder()
        .field("n", veneer_schema::Definition::number())
        .build();
    let model = veneer_engine::Model::new("counters", schema, pool.clone());

    let mut fields = FieldMap::new();
    fields.insert("n".to_string(), Value::Int(1));
    let mut doc = model.new_document(fields).unwrap();
    doc.save().unwrap();

    let id = doc.id().unwrap();
    assert_eq!(id.len(), 24);
    assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
}
