//! Shared fixtures for engine integration tests

use std::sync::Arc;
use veneer_engine::testing::RecordingPool;
use veneer_engine::{Model, SqlRow, SqlValue};
use veneer_schema::{Definition, Schema};

/// The accounts schema used across tests: a number column, a scalar
/// array, an array of identified members, a free-form config object, and
/// a keyed map.
pub fn account_schema() -> Schema {
    let member = Schema::builder()
        .field("_id", Definition::string())
        .field("role", Definition::string())
        .build_shared();
    let level = Schema::builder()
        .field("_id", Definition::string())
        .field("value", Definition::number())
        .build_shared();
    Schema::builder()
        .field("_id", Definition::string())
        .field("name", Definition::string())
        .field("balance", Definition::number())
        .field("tags", Definition::array(Definition::string()))
        .field("members", Definition::array(Definition::nested(member)))
        .field("levels", Definition::map(Definition::nested(level)))
        .field("config", Definition::mixed())
        .build()
}

/// A model over the accounts table backed by a recording pool
pub fn accounts_model() -> (Model, Arc<RecordingPool>) {
    let pool = Arc::new(RecordingPool::new());
    let model = Model::new("accounts", account_schema(), pool.clone());
    (model, pool)
}

/// A persisted-looking row for account `id`
pub fn account_row(id: &str, balance: i64, tags_json: &str) -> SqlRow {
    SqlRow::new()
        .cell("_id", SqlValue::Text(id.to_string()))
        .cell("balance", SqlValue::Int(balance))
        .cell("tags", SqlValue::Text(tags_json.to_string()))
}
