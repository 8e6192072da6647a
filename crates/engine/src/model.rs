//! Collection façade
//!
//! A Model fronts one relational table: it owns the schema, the cache
//! handle, and the pool handle, compiles declarative queries into SQL,
//! and executes bulk insert/update/delete/count directly (bypassing the
//! Document pending buffer).
//!
//! Every compiled operation acquires one pooled connection, executes, and
//! releases it by drop on every exit path. There is no cross-operation
//! locking and no retry; a lost write race resolves to the engine's
//! native last-write-wins column semantics.

use crate::aggregate::Pipeline;
use crate::cache::{DocumentCache, ProcessCache};
use crate::cursor::Cursor;
use crate::document::Document;
use crate::filter::Filter;
use crate::pool::{ConnectionPool, SqlRow, SqlValue};
use crate::update::UpdateDoc;
use std::sync::Arc;
use tracing::{debug, warn};
use veneer_core::{Error, FieldMap, ObjectId, Result, Value};
use veneer_schema::Schema;

/// Model configuration
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Name of the primary-key column holding the document identifier
    pub id_column: String,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            id_column: "_id".to_string(),
        }
    }
}

/// Options for bulk updates
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Update every matching row instead of capping at one
    pub multi: bool,
}

/// Options for bulk deletes
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Delete every matching row instead of capping at one
    pub multi: bool,
}

/// Options for inserts
#[derive(Debug, Clone, Copy)]
pub struct InsertOptions {
    /// Abort on the first failing insert (true, the default) or continue
    /// past failures and aggregate the identifiers that made it
    pub ordered: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        InsertOptions { ordered: true }
    }
}

struct ModelInner {
    table: String,
    schema: Arc<Schema>,
    pool: Arc<dyn ConnectionPool>,
    cache: Arc<dyn DocumentCache>,
    options: ModelOptions,
}

/// The collection/table façade
///
/// Clone-cheap: clones share the table, schema, cache, and pool.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("table", &self.inner.table)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a model with the default process-local cache and options
    pub fn new(table: impl Into<String>, schema: Schema, pool: Arc<dyn ConnectionPool>) -> Self {
        Self::with_parts(
            table,
            Arc::new(schema),
            pool,
            Arc::new(ProcessCache::new()),
            ModelOptions::default(),
        )
    }

    /// Create a model with an injected cache service and explicit options
    pub fn with_parts(
        table: impl Into<String>,
        schema: Arc<Schema>,
        pool: Arc<dyn ConnectionPool>,
        cache: Arc<dyn DocumentCache>,
        options: ModelOptions,
    ) -> Self {
        Model {
            inner: Arc::new(ModelInner {
                table: table.into(),
                schema,
                pool,
                cache,
                options,
            }),
        }
    }

    /// The backing table name
    pub fn table(&self) -> &str {
        &self.inner.table
    }

    /// The collection schema
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// The injected cache service
    pub fn cache(&self) -> &dyn DocumentCache {
        self.inner.cache.as_ref()
    }

    /// The identifier column name
    pub fn id_column(&self) -> &str {
        &self.inner.options.id_column
    }

    // ------------------------------------------------------------------
    // reads
    // ------------------------------------------------------------------

    /// Build a deferred query; no I/O happens here
    pub fn find(&self, filter: Filter) -> Cursor {
        Cursor::new(self.clone(), filter)
    }

    /// First match or none
    pub fn find_one(&self, filter: Filter) -> Result<Option<Document>> {
        let docs = self.find(filter).limit(1).exec()?;
        Ok(docs.into_iter().next())
    }

    /// Look one document up by identifier
    pub fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Document>> {
        self.find_one(Filter::id(id))
    }

    /// Count matches with a COUNT(*) statement
    pub fn count(&self, filter: Filter) -> Result<u64> {
        let (body, params) = filter.compile(self.id_column());
        let mut sql = format!("SELECT COUNT(*) AS n FROM {}", self.table());
        if let Some(body) = body {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }
        let rows = self.query(&sql, &params)?;
        match rows.first().and_then(|row| row.get("n")) {
            Some(SqlValue::Int(n)) => Ok(*n as u64),
            Some(SqlValue::Float(n)) => Ok(*n as u64),
            _ => Err(Error::storage("count query returned no usable row")),
        }
    }

    /// Run an aggregation pipeline, yielding plain records
    pub fn aggregate(&self, pipeline: Pipeline) -> Result<Vec<FieldMap>> {
        let (sql, params) = pipeline.compile(self.table(), self.id_column());
        let rows = self.query(&sql, &params)?;
        Ok(rows.into_iter().map(SqlRow::into_fields).collect())
    }

    // ------------------------------------------------------------------
    // bulk writes
    // ------------------------------------------------------------------

    /// Update matching rows directly
    ///
    /// Affects at most one row unless `multi` is set, mirroring
    /// single-document-update-by-default semantics. Returns the affected
    /// row count.
    pub fn update(&self, filter: Filter, update: UpdateDoc, options: UpdateOptions) -> Result<u64> {
        if update.is_empty() {
            return Ok(0);
        }
        let (fragments, mut params) = update.compile()?;
        let (body, mut filter_params) = filter.compile(self.id_column());
        let mut sql = format!("UPDATE {} SET {}", self.table(), fragments.join(", "));
        if let Some(body) = body {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }
        if !options.multi {
            sql.push_str(" LIMIT 1");
        }
        params.append(&mut filter_params);
        self.execute(&sql, &params)
    }

    /// Delete matching rows directly
    ///
    /// Affects at most one row unless `multi` is set. Returns the
    /// affected row count.
    pub fn delete(&self, filter: Filter, options: DeleteOptions) -> Result<u64> {
        let (body, params) = filter.compile(self.id_column());
        let mut sql = format!("DELETE FROM {}", self.table());
        if let Some(body) = body {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }
        if !options.multi {
            sql.push_str(" LIMIT 1");
        }
        self.execute(&sql, &params)
    }

    /// Insert one document, returning its identifier when one is known
    pub fn insert_one(&self, fields: FieldMap) -> Result<Option<String>> {
        let mut built = self.schema().build(fields)?;
        self.schema().validate_document(&built)?;
        let id = self.ensure_id(&mut built);

        let columns: Vec<&str> = built.keys().map(String::as_str).collect();
        let holes = vec!["?"; columns.len()].join(", ");
        let params: Vec<SqlValue> = built.values().map(SqlValue::from_document).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            columns.join(", "),
            holes
        );
        self.execute(&sql, &params)?;
        Ok(id)
    }

    /// Insert a batch of documents
    ///
    /// With `ordered` (the default) the first failure aborts and
    /// propagates. Unordered inserts continue past failures and return
    /// the identifiers that were inserted.
    pub fn insert(&self, docs: Vec<FieldMap>, options: InsertOptions) -> Result<Vec<String>> {
        let mut inserted = Vec::new();
        for fields in docs {
            match self.insert_one(fields) {
                Ok(Some(id)) => inserted.push(id),
                Ok(None) => {}
                Err(e) if options.ordered => return Err(e),
                Err(e) => {
                    warn!(table = self.table(), error = %e, "unordered insert continuing past failure");
                }
            }
        }
        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // documents
    // ------------------------------------------------------------------

    /// Create an unsaved document, casting fields and filling defaults
    pub fn new_document(&self, fields: FieldMap) -> Result<Document> {
        let built = self.schema().build(fields)?;
        Ok(Document::new(self.clone(), built, false))
    }

    /// Create an unsaved document whose eventual insert may overwrite an
    /// existing cache entry
    pub fn new_document_forced(&self, fields: FieldMap) -> Result<Document> {
        let built = self.schema().build(fields)?;
        Ok(Document::new(self.clone(), built, true))
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    /// Make sure a new document carries an identifier
    ///
    /// Generates a 24-hex random identifier only when the field is absent
    /// and the schema does not itself define the identifier column.
    /// Returns the identifier when one is known.
    pub(crate) fn ensure_id(&self, fields: &mut FieldMap) -> Option<String> {
        let id_column = self.id_column().to_string();
        match fields.get(&id_column) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Int(i)) => Some(i.to_string()),
            _ => {
                // the schema owning this column means it decides the value
                if self.schema().field(&id_column).is_some() {
                    return None;
                }
                let id = ObjectId::new().to_string();
                fields.insert(id_column, Value::String(id.clone()));
                Some(id)
            }
        }
    }

    pub(crate) fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        debug!(table = self.table(), sql, params = params.len(), "execute");
        let mut conn = self.inner.pool.acquire()?;
        conn.execute(sql, params)
        // conn drops here, releasing back to the pool on every exit path
    }

    pub(crate) fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>> {
        debug!(table = self.table(), sql, params = params.len(), "query");
        let mut conn = self.inner.pool.acquire()?;
        conn.query(sql, params)
    }
}
