//! Filter vocabulary and WHERE-clause compiler
//!
//! Filters are a closed, typed vocabulary: one variant per comparison
//! operator plus ordered `And`/`Or` combinators. Unrecognized operators
//! are unrepresentable; this is a deliberate tightening of the dynamic
//! source vocabulary, which silently skipped unknown tags.
//!
//! Compilation produces SQL text plus positionally-bound parameters.
//! A field path without dots compiles to a bare column reference; a
//! dotted path compiles to a JSON extraction against the first segment
//! as the column, unquoted when compared against scalars.

use crate::pool::SqlValue;
use veneer_core::{DocPath, Value};

/// Comparison conditions on one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCond {
    /// Equality
    Eq(Value),
    /// Inequality
    Ne(Value),
    /// Greater than
    Gt(Value),
    /// Greater than or equal
    Gte(Value),
    /// Less than
    Lt(Value),
    /// Less than or equal
    Lte(Value),
    /// Member of the given set; an empty set compiles to no clause
    In(Vec<Value>),
    /// Not a member of the given set; an empty set compiles to no clause
    Nin(Vec<Value>),
    /// Field present (IS NOT NULL) or absent (IS NULL)
    Exists(bool),
    /// Regular-expression match
    Regex(String),
    /// SQL LIKE pattern match
    Like(String),
}

/// One filter clause
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// A condition on a field path
    Field(DocPath, FieldCond),
    /// Equality on the collection's identifier column
    Id(Value),
    /// Every sub-filter must match
    And(Vec<Filter>),
    /// At least one sub-filter must match
    Or(Vec<Filter>),
}

/// An ordered conjunction of clauses
///
/// Clauses compile in declaration order; parameter binding follows the
/// same order. An empty filter matches everything (no WHERE clause).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// A filter that matches every document
    pub fn all() -> Self {
        Filter::default()
    }

    /// Shorthand for equality on the identifier column
    pub fn id(value: impl Into<Value>) -> Self {
        Filter {
            clauses: vec![Clause::Id(value.into())],
        }
    }

    /// Add a raw clause
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Add a condition on a field path
    pub fn field(self, path: &str, cond: FieldCond) -> Self {
        self.clause(Clause::Field(parse_path(path), cond))
    }

    /// Equality on a field
    pub fn eq(self, path: &str, value: impl Into<Value>) -> Self {
        self.field(path, FieldCond::Eq(value.into()))
    }

    /// Inequality on a field
    pub fn ne(self, path: &str, value: impl Into<Value>) -> Self {
        self.field(path, FieldCond::Ne(value.into()))
    }

    /// Greater-than on a field
    pub fn gt(self, path: &str, value: impl Into<Value>) -> Self {
        self.field(path, FieldCond::Gt(value.into()))
    }

    /// Greater-or-equal on a field
    pub fn gte(self, path: &str, value: impl Into<Value>) -> Self {
        self.field(path, FieldCond::Gte(value.into()))
    }

    /// Less-than on a field
    pub fn lt(self, path: &str, value: impl Into<Value>) -> Self {
        self.field(path, FieldCond::Lt(value.into()))
    }

    /// Less-or-equal on a field
    pub fn lte(self, path: &str, value: impl Into<Value>) -> Self {
        self.field(path, FieldCond::Lte(value.into()))
    }

    /// Set membership on a field
    pub fn is_in(self, path: &str, values: Vec<Value>) -> Self {
        self.field(path, FieldCond::In(values))
    }

    /// Set exclusion on a field
    pub fn not_in(self, path: &str, values: Vec<Value>) -> Self {
        self.field(path, FieldCond::Nin(values))
    }

    /// Presence check on a field
    pub fn exists(self, path: &str, present: bool) -> Self {
        self.field(path, FieldCond::Exists(present))
    }

    /// Regular-expression match on a field
    pub fn regex(self, path: &str, pattern: impl Into<String>) -> Self {
        self.field(path, FieldCond::Regex(pattern.into()))
    }

    /// LIKE pattern match on a field
    pub fn like(self, path: &str, pattern: impl Into<String>) -> Self {
        self.field(path, FieldCond::Like(pattern.into()))
    }

    /// Conjunction of sub-filters
    pub fn and(self, filters: Vec<Filter>) -> Self {
        self.clause(Clause::And(filters))
    }

    /// Disjunction of sub-filters
    pub fn or(self, filters: Vec<Filter>) -> Self {
        self.clause(Clause::Or(filters))
    }

    /// True when no clauses were declared
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Compile to a WHERE-clause body plus bound parameters
    ///
    /// Returns None when nothing constrains the match set (empty filter,
    /// or every clause elided such as `In` on an empty set).
    pub fn compile(&self, id_column: &str) -> (Option<String>, Vec<SqlValue>) {
        let mut params = Vec::new();
        let body = self.compile_into(id_column, &mut params);
        (body, params)
    }

    fn compile_into(&self, id_column: &str, params: &mut Vec<SqlValue>) -> Option<String> {
        let mut fragments = Vec::new();
        for clause in &self.clauses {
            match clause {
                Clause::Field(path, cond) => {
                    if let Some(frag) = compile_cond(path, cond, params) {
                        fragments.push(frag);
                    }
                }
                Clause::Id(value) => {
                    params.push(SqlValue::from_document(value));
                    fragments.push(format!("{id_column} = ?"));
                }
                Clause::And(filters) => {
                    if let Some(frag) = compile_group(filters, " AND ", id_column, params) {
                        fragments.push(frag);
                    }
                }
                Clause::Or(filters) => {
                    if let Some(frag) = compile_group(filters, " OR ", id_column, params) {
                        fragments.push(frag);
                    }
                }
            }
        }
        if fragments.is_empty() {
            None
        } else {
            Some(fragments.join(" AND "))
        }
    }
}

fn compile_group(
    filters: &[Filter],
    joiner: &str,
    id_column: &str,
    params: &mut Vec<SqlValue>,
) -> Option<String> {
    let subs: Vec<String> = filters
        .iter()
        .filter_map(|f| f.compile_into(id_column, params))
        .collect();
    if subs.is_empty() {
        None
    } else {
        Some(format!("({})", subs.join(joiner)))
    }
}

fn compile_cond(path: &DocPath, cond: &FieldCond, params: &mut Vec<SqlValue>) -> Option<String> {
    match cond {
        FieldCond::Eq(v) => Some(binary(path, "=", v, params)),
        FieldCond::Ne(v) => Some(binary(path, "!=", v, params)),
        FieldCond::Gt(v) => Some(binary(path, ">", v, params)),
        FieldCond::Gte(v) => Some(binary(path, ">=", v, params)),
        FieldCond::Lt(v) => Some(binary(path, "<", v, params)),
        FieldCond::Lte(v) => Some(binary(path, "<=", v, params)),
        FieldCond::In(values) => set_membership(path, "IN", values, params),
        FieldCond::Nin(values) => set_membership(path, "NOT IN", values, params),
        FieldCond::Exists(present) => {
            let suffix = if *present { "IS NOT NULL" } else { "IS NULL" };
            Some(format!("{} {}", field_ref(path, false), suffix))
        }
        FieldCond::Regex(pattern) => {
            params.push(SqlValue::Text(pattern.clone()));
            Some(format!("{} REGEXP ?", field_ref(path, true)))
        }
        FieldCond::Like(pattern) => {
            params.push(SqlValue::Text(pattern.clone()));
            Some(format!("{} LIKE ?", field_ref(path, true)))
        }
    }
}

fn binary(path: &DocPath, op: &str, value: &Value, params: &mut Vec<SqlValue>) -> String {
    params.push(SqlValue::from_document(value));
    format!("{} {} ?", field_ref(path, true), op)
}

// An empty set constrains nothing: no clause, rather than always-false.
fn set_membership(
    path: &DocPath,
    op: &str,
    values: &[Value],
    params: &mut Vec<SqlValue>,
) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    for value in values {
        params.push(SqlValue::from_document(value));
    }
    let holes = vec!["?"; values.len()].join(", ");
    Some(format!("{} {} ({})", field_ref(path, true), op, holes))
}

/// Compile a field path to its SQL reference
///
/// A path without dots is the column itself. A dotted path extracts from
/// the first segment's JSON column; `unquote` strips the JSON quoting so
/// scalar comparisons see the bare value.
pub(crate) fn field_ref(path: &DocPath, unquote: bool) -> String {
    let column = path.first_key().unwrap_or_default();
    if path.len() <= 1 {
        return column.to_string();
    }
    let extract = format!("JSON_EXTRACT({}, '{}')", column, path.sql_json_path());
    if unquote {
        format!("JSON_UNQUOTE({})", extract)
    } else {
        extract
    }
}

/// Parse a dotted path, falling back to a single key segment for strings
/// that do not parse (they can only match a literal column of that name)
pub(crate) fn parse_path(s: &str) -> DocPath {
    s.parse().unwrap_or_else(|_| DocPath::field(s))
}
