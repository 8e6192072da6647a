//! Documents and pending atomic operations
//!
//! A Document wraps one row's field map plus a buffer of declared-but-not-
//! flushed atomic operations. Mutations are declarative: the navigator (or
//! direct field assignment) queues operations, `save` translates the
//! accumulated buffer into one UPDATE statement sequence, and the buffer
//! is empty again after a successful save.
//!
//! ## Merge law
//!
//! Before a new operation is appended, every pending operation on the
//! same path or on a strict-prefix path is consulted. A later operation
//! may cancel, replace, or numerically compose with an earlier one; the
//! precedence table lives in [`PendingOps::merge`] and is deliberately
//! order-sensitive. Suppression is silent.
//!
//! ## Cache interaction
//!
//! Once queued, an operation is mirrored into the model cache's copy of
//! this document immediately - if and only if an entry already exists and
//! the document is not new. Other in-process holders observe the pending
//! mutation before the physical write completes, at the cost of being
//! wrong if that write later fails.

use crate::model::Model;
use crate::pool::SqlValue;
use tracing::debug;
use veneer_core::value::{get_at_path_mut, remove_at_path, set_at_path};
use veneer_core::{DocPath, Error, FieldMap, Result, Value};

/// A mutation intent queued against a path until flushed
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicOp {
    /// Replace the value at the path
    Set(Value),
    /// Numerically increment the value at the path
    Inc(Value),
    /// Clear the value at the path
    Unset,
    /// Append elements to the array at the path
    Push(Vec<Value>),
    /// Remove array elements whose `_id` subfield matches one of these ids
    Pull(Vec<Value>),
    /// Remove array elements equal to one of these scalar values
    PullAll(Vec<Value>),
}

impl AtomicOp {
    /// Operator name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            AtomicOp::Set(_) => "set",
            AtomicOp::Inc(_) => "inc",
            AtomicOp::Unset => "unset",
            AtomicOp::Push(_) => "push",
            AtomicOp::Pull(_) => "pull",
            AtomicOp::PullAll(_) => "pullAll",
        }
    }
}

/// One pending operation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOp {
    /// Target path
    pub path: DocPath,
    /// The operation
    pub op: AtomicOp,
}

/// Ordered buffer of pending operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingOps {
    ops: Vec<PendingOp>,
}

impl PendingOps {
    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of pending operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Iterate the buffer in queue order
    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.iter()
    }

    /// Drop everything (after a successful flush)
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Register `new` at `path`, applying the merge precedence table
    ///
    /// Scans all existing operations. For an operation on the exact path:
    /// a new Set/Unset discards it outright; a new Pull/PullAll is
    /// suppressed by a pending whole-value operator (Set/Inc/Unset); a new
    /// Inc folds into a pending Set (or composes with a pending Inc) and
    /// is otherwise suppressed; a new Push is suppressed by a pending Set
    /// and extends a pending Push. For an operation on a strict prefix of
    /// the new path: a new Set/Inc/Unset discards it (the more specific
    /// write wins), while a new Push/Pull/PullAll is suppressed by
    /// anything pending there except an increment. Operations on a strict
    /// descendant path are left alone.
    pub fn merge(&mut self, path: DocPath, mut new: AtomicOp) {
        let mut suppress = false;
        let mut idx = 0;
        while idx < self.ops.len() {
            let existing_path = self.ops[idx].path.clone();
            if existing_path == path {
                let drop_existing = match (&mut new, &mut self.ops[idx].op) {
                    // replace-wins: the new whole-value write stands alone
                    (AtomicOp::Set(_) | AtomicOp::Unset, _) => true,
                    (
                        AtomicOp::Pull(_) | AtomicOp::PullAll(_),
                        AtomicOp::Set(_) | AtomicOp::Inc(_) | AtomicOp::Unset,
                    ) => {
                        suppress = true;
                        false
                    }
                    (AtomicOp::Pull(new_ids), AtomicOp::Pull(ids)) => {
                        ids.append(new_ids);
                        suppress = true;
                        false
                    }
                    (AtomicOp::PullAll(new_values), AtomicOp::PullAll(values)) => {
                        values.append(new_values);
                        suppress = true;
                        false
                    }
                    (AtomicOp::Inc(delta), AtomicOp::Set(value)) => {
                        if let Some(sum) = value.numeric_add(delta) {
                            *value = sum;
                        }
                        suppress = true;
                        false
                    }
                    (AtomicOp::Inc(delta), AtomicOp::Inc(pending)) => {
                        if let Some(sum) = pending.numeric_add(delta) {
                            *pending = sum;
                        }
                        suppress = true;
                        false
                    }
                    // cannot increment something already unset/pushed/pulled
                    (AtomicOp::Inc(_), _) => {
                        suppress = true;
                        false
                    }
                    (AtomicOp::Push(_), AtomicOp::Set(_)) => {
                        suppress = true;
                        false
                    }
                    (AtomicOp::Push(new_elements), AtomicOp::Push(elements)) => {
                        elements.append(new_elements);
                        suppress = true;
                        false
                    }
                    _ => false,
                };
                if drop_existing {
                    self.ops.remove(idx);
                    continue;
                }
            } else if existing_path.is_strict_ancestor_of(&path) {
                match &new {
                    AtomicOp::Set(_) | AtomicOp::Inc(_) | AtomicOp::Unset => {
                        self.ops.remove(idx);
                        continue;
                    }
                    AtomicOp::Push(_) | AtomicOp::Pull(_) | AtomicOp::PullAll(_) => {
                        if !matches!(self.ops[idx].op, AtomicOp::Inc(_)) {
                            suppress = true;
                        }
                    }
                }
            }
            idx += 1;
        }
        if !suppress {
            self.ops.push(PendingOp { path, op: new });
        }
    }
}

/// Apply one operation to a field map (live document or cached copy)
pub(crate) fn apply_op(fields: &mut FieldMap, path: &DocPath, op: &AtomicOp) {
    match op {
        AtomicOp::Set(value) => {
            let _ = set_at_path(fields, path, value.clone());
        }
        AtomicOp::Inc(delta) => match get_at_path_mut(fields, path) {
            Some(current) => {
                if let Some(sum) = current.numeric_add(delta) {
                    *current = sum;
                }
            }
            // incrementing an absent field starts from zero
            None => {
                let _ = set_at_path(fields, path, delta.clone());
            }
        },
        AtomicOp::Unset => {
            remove_at_path(fields, path);
        }
        AtomicOp::Push(elements) => match get_at_path_mut(fields, path) {
            Some(Value::Array(items)) => items.extend(elements.iter().cloned()),
            Some(_) => {}
            None => {
                let _ = set_at_path(fields, path, Value::Array(elements.clone()));
            }
        },
        AtomicOp::Pull(ids) => {
            if let Some(Value::Array(items)) = get_at_path_mut(fields, path) {
                items.retain(|el| match el.as_object().and_then(|m| m.get("_id")) {
                    Some(el_id) => !ids.contains(el_id),
                    None => true,
                });
            }
        }
        AtomicOp::PullAll(values) => {
            if let Some(Value::Array(items)) = get_at_path_mut(fields, path) {
                items.retain(|el| !values.contains(el));
            }
        }
    }
}

/// One logical record plus its buffered mutations
#[derive(Debug, Clone)]
pub struct Document {
    model: Model,
    fields: FieldMap,
    is_new: bool,
    forced: bool,
    pending: PendingOps,
}

impl Document {
    pub(crate) fn new(model: Model, fields: FieldMap, forced: bool) -> Self {
        Document {
            model,
            fields,
            is_new: true,
            forced,
            pending: PendingOps::default(),
        }
    }

    pub(crate) fn from_row(model: Model, fields: FieldMap) -> Self {
        Document {
            model,
            fields,
            is_new: false,
            forced: false,
            pending: PendingOps::default(),
        }
    }

    /// The model this document belongs to
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// True until the first successful save
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The document identifier, if present
    pub fn id(&self) -> Option<String> {
        match self.fields.get(self.model.id_column()) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Int(i)) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Read a top-level field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The raw field map
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// A plain copy of the field map
    pub fn to_plain_object(&self) -> FieldMap {
        self.fields.clone()
    }

    /// The pending buffer (inspectable, mutated through queueing only)
    pub fn pending(&self) -> &PendingOps {
        &self.pending
    }

    /// Validate the current fields against the model's schema
    pub fn validate(&self) -> Result<()> {
        self.model.schema().validate_document(&self.fields)
    }

    /// Assign a top-level field directly
    ///
    /// The assignment is reflected into the Set group and mirrors into the
    /// cache like any navigated mutation. Values are cast and validated
    /// when the schema governs the field.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = match self.model.schema().field(name) {
            Some(def) => def.cast(value.into(), name)?,
            None => value.into(),
        };
        self.queue(DocPath::field(name), AtomicOp::Set(value));
        Ok(())
    }

    /// Open the path navigator on this document
    pub fn query(&mut self) -> crate::navigator::DocumentQuery<'_> {
        crate::navigator::DocumentQuery::new(self)
    }

    /// Queue an operation: merge-law registration, live-map application,
    /// optimistic cache mirror
    pub(crate) fn queue(&mut self, path: DocPath, op: AtomicOp) {
        apply_op(&mut self.fields, &path, &op);
        if !self.is_new {
            if let Some(id) = self.id() {
                let cache = self.model.cache();
                if cache.contains(&id) {
                    if let Some(mut entry) = cache.get(&id) {
                        apply_op(&mut entry, &path, &op);
                        cache.put(&id, entry);
                    }
                }
            }
        }
        self.pending.merge(path, op);
    }

    /// Flush buffered mutations as one physical write
    ///
    /// New documents validate and INSERT all current fields. Documents
    /// with an empty buffer do nothing. Otherwise the buffer compiles to
    /// one UPDATE keyed by identifier (plus one statement per pulled
    /// value), parameters bound in fragment-emission order with the
    /// identifier last, and the buffer is cleared on success.
    pub fn save(&mut self) -> Result<()> {
        if self.is_new {
            return self.insert_new();
        }
        if self.pending.is_empty() {
            return Ok(());
        }
        let id = self
            .id()
            .ok_or_else(|| Error::InvalidOperation("document has no identifier".to_string()))?;

        let mut fragments: Vec<String> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();
        let mut touched_columns: Vec<String> = Vec::new();
        let mut follow_ups: Vec<(String, Vec<SqlValue>)> = Vec::new();

        // fixed group order: set, inc, unset, push, then pull/pullAll
        for pending in self.pending.iter() {
            if let AtomicOp::Set(value) = &pending.op {
                self.emit_set_like(
                    pending,
                    Some(value),
                    &mut fragments,
                    &mut params,
                    &mut touched_columns,
                );
            }
        }
        for pending in self.pending.iter() {
            if let AtomicOp::Inc(delta) = &pending.op {
                if pending.path.len() == 1 {
                    let column = column_of(&pending.path);
                    if !touched_columns.contains(&column) {
                        params.push(SqlValue::from_document(delta));
                        fragments.push(format!("{column} = {column} + ?"));
                        touched_columns.push(column);
                    }
                } else {
                    self.emit_set_like(
                        pending,
                        None,
                        &mut fragments,
                        &mut params,
                        &mut touched_columns,
                    );
                }
            }
        }
        for pending in self.pending.iter() {
            if matches!(pending.op, AtomicOp::Unset) {
                if pending.path.len() == 1 {
                    let column = column_of(&pending.path);
                    if !touched_columns.contains(&column) {
                        fragments.push(format!("{column} = NULL"));
                        touched_columns.push(column);
                    }
                } else {
                    self.emit_set_like(
                        pending,
                        None,
                        &mut fragments,
                        &mut params,
                        &mut touched_columns,
                    );
                }
            }
        }
        for pending in self.pending.iter() {
            if let AtomicOp::Push(elements) = &pending.op {
                if elements.is_empty() {
                    continue;
                }
                let column = column_of(&pending.path);
                let json_path = pending.path.sql_json_path();
                let mut expr = format!("JSON_ARRAY_APPEND(COALESCE({column}, JSON_ARRAY())");
                for element in elements {
                    let hole = match element {
                        Value::Array(_) | Value::Object(_) => "CAST(? AS JSON)",
                        _ => "?",
                    };
                    expr.push_str(&format!(", '{json_path}', {hole}"));
                    params.push(SqlValue::from_document(element));
                }
                expr.push(')');
                fragments.push(format!("{column} = {expr}"));
                touched_columns.push(column);
            }
        }
        for pending in self.pending.iter() {
            match &pending.op {
                AtomicOp::Pull(ids) => {
                    let json_path = pending.path.sql_json_path();
                    for pulled in ids {
                        follow_ups.push(self.pull_statement(
                            &pending.path,
                            &format!("{json_path}[*]._id"),
                            pulled,
                            &id,
                        ));
                    }
                }
                AtomicOp::PullAll(values) => {
                    let json_path = pending.path.sql_json_path();
                    for pulled in values {
                        follow_ups.push(self.pull_statement(
                            &pending.path,
                            &format!("{json_path}[*]"),
                            pulled,
                            &id,
                        ));
                    }
                }
                _ => {}
            }
        }

        if !fragments.is_empty() {
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                self.model.table(),
                fragments.join(", "),
                self.model.id_column(),
            );
            params.push(SqlValue::Text(id.clone()));
            debug!(table = self.model.table(), ops = self.pending.len(), "flushing document update");
            self.model.execute(&sql, &params)?;
        }
        // one statement per pulled value, not wrapped in a transaction
        for (sql, stmt_params) in follow_ups {
            self.model.execute(&sql, &stmt_params)?;
        }

        self.pending.clear();
        let cache = self.model.cache();
        if cache.contains(&id) {
            cache.put(&id, self.fields.clone());
        }
        Ok(())
    }

    fn insert_new(&mut self) -> Result<()> {
        self.model.schema().validate_document(&self.fields)?;
        self.model.ensure_id(&mut self.fields);

        let columns: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        let holes = vec!["?"; columns.len()].join(", ");
        let params: Vec<SqlValue> = self.fields.values().map(SqlValue::from_document).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.model.table(),
            columns.join(", "),
            holes
        );
        debug!(table = self.model.table(), "inserting new document");
        self.model.execute(&sql, &params)?;

        if let Some(id) = self.id() {
            self.model
                .cache()
                .insert_new(&id, self.fields.clone(), self.forced);
        }
        self.is_new = false;
        self.pending.clear();
        Ok(())
    }

    // A dotted set/inc/unset cannot address into the column from the
    // UPDATE compiler; it is emitted as a whole-column JSON write of the
    // live top-level value, which already reflects the queued mutation.
    fn emit_set_like(
        &self,
        pending: &PendingOp,
        direct: Option<&Value>,
        fragments: &mut Vec<String>,
        params: &mut Vec<SqlValue>,
        touched_columns: &mut Vec<String>,
    ) {
        let column = column_of(&pending.path);
        if touched_columns.contains(&column) {
            return;
        }
        let value = if pending.path.len() == 1 {
            match direct {
                Some(v) => SqlValue::from_document(v),
                None => SqlValue::from_document(self.fields.get(&column).unwrap_or(&Value::Null)),
            }
        } else {
            SqlValue::from_document(self.fields.get(&column).unwrap_or(&Value::Null))
        };
        params.push(value);
        fragments.push(format!("{column} = ?"));
        touched_columns.push(column);
    }

    fn pull_statement(
        &self,
        path: &DocPath,
        search_path: &str,
        value: &Value,
        id: &str,
    ) -> (String, Vec<SqlValue>) {
        let column = column_of(path);
        let search = format!("JSON_SEARCH({column}, 'one', ?, NULL, '{search_path}')");
        let sql = format!(
            "UPDATE {} SET {column} = IF({search} IS NULL, {column}, JSON_REMOVE({column}, JSON_UNQUOTE({search}))) WHERE {} = ?",
            self.model.table(),
            self.model.id_column(),
        );
        let bound = SqlValue::from_document(value);
        (
            sql,
            vec![bound.clone(), bound, SqlValue::Text(id.to_string())],
        )
    }
}

fn column_of(path: &DocPath) -> String {
    path.first_key().unwrap_or_default().to_string()
}
