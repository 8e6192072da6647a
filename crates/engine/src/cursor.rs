//! Deferred read queries
//!
//! A Cursor is a chainable builder bound to one Model and filter. Nothing
//! touches the database until `exec`; the accumulated state then compiles
//! to exactly one SELECT.

use crate::document::Document;
use crate::filter::{field_ref, parse_path, Filter};
use crate::model::Model;
use crate::pool::SqlValue;
use veneer_core::Result;

/// Sentinel emitted when an OFFSET is requested without an explicit
/// LIMIT; OFFSET-only queries are not portable, so the maximum row count
/// is spelled out first.
pub const MAX_ROWS_SENTINEL: &str = "18446744073709551615";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    /// SQL keyword
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A deferred, chainable read-query builder
#[derive(Debug, Clone)]
pub struct Cursor {
    model: Model,
    filter: Filter,
    skip: Option<u64>,
    limit: Option<u64>,
    sort: Vec<(String, SortOrder)>,
    projection: Option<Vec<String>>,
}

impl Cursor {
    pub(crate) fn new(model: Model, filter: Filter) -> Self {
        Cursor {
            model,
            filter,
            skip: None,
            limit: None,
            sort: Vec::new(),
            projection: None,
        }
    }

    /// Skip the first `n` matching rows
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Cap the result set at `n` rows
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Add a sort key (keys accumulate in call order)
    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push((field.to_string(), order));
        self
    }

    /// Project a subset of columns instead of `*`
    pub fn project(mut self, columns: Vec<String>) -> Self {
        self.projection = Some(columns);
        self
    }

    /// Count matches via the model, ignoring skip/limit/sort
    pub fn count(&self) -> Result<u64> {
        self.model.count(self.filter.clone())
    }

    /// Compile and run the SELECT, wrapping each row into a Document
    pub fn exec(&self) -> Result<Vec<Document>> {
        let (sql, params) = self.build_select();
        let rows = self.model.query(&sql, &params)?;
        Ok(rows
            .into_iter()
            .map(|row| Document::from_row(self.model.clone(), row.into_fields()))
            .collect())
    }

    pub(crate) fn build_select(&self) -> (String, Vec<SqlValue>) {
        let columns = match &self.projection {
            Some(cols) if !cols.is_empty() => cols.join(", "),
            _ => "*".to_string(),
        };
        let mut sql = format!("SELECT {} FROM {}", columns, self.model.table());

        let (where_body, params) = self.filter.compile(self.model.id_column());
        if let Some(body) = where_body {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }

        if !self.sort.is_empty() {
            let keys: Vec<String> = self
                .sort
                .iter()
                .map(|(field, order)| {
                    format!("{} {}", field_ref(&parse_path(field), true), order.sql())
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        match (self.limit, self.skip) {
            (Some(limit), Some(skip)) => {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {skip}"));
            }
            (Some(limit), None) => {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            (None, Some(skip)) => {
                sql.push_str(&format!(" LIMIT {MAX_ROWS_SENTINEL} OFFSET {skip}"));
            }
            (None, None) => {}
        }

        (sql, params)
    }
}
