//! Path-navigator behavior: schema-tracked descent, by-identifier
//! selection and substitution, push/pull constraints, and removal.

mod common;

use common::{account_row, accounts_model};
use veneer_core::{FieldMap, Value};
use veneer_engine::{Filter, SqlValue};

fn member(id: &str, role: &str) -> Value {
    let mut map = FieldMap::new();
    map.insert("_id".to_string(), Value::from(id));
    map.insert("role".to_string(), Value::from(role));
    Value::Object(map)
}

fn doc_with_members() -> (veneer_engine::Model, std::sync::Arc<veneer_engine::testing::RecordingPool>, veneer_engine::Document)
{
    let (model, pool) = accounts_model();
    let members = "[{\"_id\":\"m1\",\"role\":\"admin\"},{\"_id\":\"m2\",\"role\":\"mod\"}]";
    pool.script_rows(vec![account_row("a1", 100, "[]")
        .cell("members", SqlValue::Text(members.to_string()))]);
    let doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();
    (model, pool, doc)
}

#[test]
fn get_reads_through_nested_paths() {
    let (_model, _pool, mut doc) = doc_with_members();
    let nav = doc.query();
    assert_eq!(
        nav.get("members.0.role", &[]),
        Some(Value::from("admin"))
    );
    assert_eq!(nav.get("members.9.role", &[]), None);
}

#[test]
fn get_substitutes_array_index_by_identifier() {
    let (_model, _pool, mut doc) = doc_with_members();
    let nav = doc.query();
    assert_eq!(
        nav.get("members.:id.role", &[Value::from("m2")]),
        Some(Value::from("mod"))
    );
    // no element carries that identifier
    assert_eq!(
        nav.get("members.:id.role", &[Value::from("nope")]),
        None
    );
}

#[test]
fn id_selects_array_element_for_mutation() {
    let (_model, pool, mut doc) = doc_with_members();
    doc.query()
        .id("members", "m2")
        .prop("role")
        .set("owner")
        .unwrap();
    assert_eq!(
        doc.query().get("members.1.role", &[]),
        Some(Value::from("owner"))
    );

    doc.save().unwrap();
    // nested set flushes the whole members column
    let (sql, _) = pool.last_statement().unwrap();
    assert_eq!(sql, "UPDATE accounts SET members = ? WHERE _id = ?");
}

#[test]
fn get_by_id_falls_back_to_property_name() {
    let (_model, _pool, mut doc) = doc_with_members();
    // config is not array/map-shaped, so the identifier is a plain key
    let nav = doc.query().prop("config").get_by_id("greeting");
    assert_eq!(nav.path().to_string(), "config.greeting");
}

#[test]
fn ascend_with_double_dot() {
    let (_model, _pool, mut doc) = doc_with_members();
    let nav = doc.query().prop("members.0.role").prop("..").prop("_id");
    assert_eq!(nav.path().to_string(), "members.0._id");
}

#[test]
fn push_rejects_duplicate_identifiers() {
    let (_model, _pool, mut doc) = doc_with_members();
    let err = doc
        .query()
        .prop("members")
        .push(member("m1", "imposter"))
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("m1"));

    doc.query()
        .prop("members")
        .push(member("m3", "newcomer"))
        .unwrap();
    assert_eq!(doc.get("members").unwrap().as_array().unwrap().len(), 3);
}

#[test]
fn push_into_map_requires_identifier_and_unique_key() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    // a bare scalar cannot enter a keyed map
    let err = doc.query().prop("levels").push(3i64).unwrap_err();
    assert!(err.is_validation());

    let mut entry = FieldMap::new();
    entry.insert("_id".to_string(), Value::from("alice"));
    doc.query().prop("levels").push(Value::Object(entry.clone())).unwrap();
    assert!(doc
        .get("levels")
        .unwrap()
        .as_object()
        .unwrap()
        .contains_key("alice"));

    let err = doc
        .query()
        .prop("levels")
        .push(Value::Object(entry))
        .unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn pull_from_map_deletes_the_key() {
    let (model, pool) = accounts_model();
    pool.script_rows(vec![account_row("a1", 100, "[]")
        .cell("levels", SqlValue::Text("{\"alice\":3}".to_string()))]);
    let mut doc = model.find_one(Filter::id("a1")).unwrap().unwrap();
    pool.clear();

    doc.query().prop("levels").pull("alice").unwrap();
    assert_eq!(
        doc.get("levels"),
        Some(&Value::Object(FieldMap::new()))
    );

    doc.save().unwrap();
    // key deletion on a nested path flushes the whole column
    let (sql, params) = pool.last_statement().unwrap();
    assert_eq!(sql, "UPDATE accounts SET levels = ? WHERE _id = ?");
    assert_eq!(
        params,
        vec![SqlValue::Text("{}".into()), SqlValue::Text("a1".into())]
    );
}

#[test]
fn remove_selected_array_element_pulls_by_id() {
    let (_model, pool, mut doc) = doc_with_members();
    {
        let mut nav = doc.query().id("members", "m1");
        nav.remove().unwrap();
    }
    assert_eq!(doc.get("members").unwrap().as_array().unwrap().len(), 1);

    doc.save().unwrap();
    let statements = pool.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].0.contains("JSON_REMOVE(members"));
}

#[test]
fn push_on_scalar_path_is_a_silent_noop() {
    let (_model, pool, mut doc) = doc_with_members();
    doc.query().prop("balance").push("x").unwrap();
    assert!(doc.pending().is_empty());
    doc.save().unwrap();
    assert_eq!(pool.statement_count(), 0);
}

#[test]
fn untracked_paths_skip_validation() {
    let (_model, _pool, mut doc) = doc_with_members();
    // config is free-form: anything goes, no definition governs it
    doc.query()
        .prop("config.limits.max")
        .set(Value::Array(vec![Value::Int(1), Value::from("two")]))
        .unwrap();
    assert!(doc
        .query()
        .get("config.limits.max", &[])
        .is_some());
}
