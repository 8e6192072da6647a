//! Bulk update vocabulary
//!
//! `UpdateDoc` is the typed `$set`/`$inc`/`$unset` payload for
//! `Model::update`, which writes rows directly without going through a
//! Document's pending buffer. Targets are top-level columns; the UPDATE
//! compiler does not address into JSON columns, so a dotted target is an
//! invalid operation here (single-document nested edits go through the
//! Document's navigator instead).

use crate::pool::SqlValue;
use veneer_core::{Error, Result, Value};

/// Typed update payload for bulk operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDoc {
    set: Vec<(String, Value)>,
    inc: Vec<(String, Value)>,
    unset: Vec<String>,
}

impl UpdateDoc {
    /// An empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column to a value
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Increment a column by a numeric delta
    pub fn inc(mut self, column: impl Into<String>, delta: impl Into<Value>) -> Self {
        self.inc.push((column.into(), delta.into()));
        self
    }

    /// Clear a column to NULL
    pub fn unset(mut self, column: impl Into<String>) -> Self {
        self.unset.push(column.into());
        self
    }

    /// True when no assignments were declared
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.unset.is_empty()
    }

    /// Compile to SET-clause fragments plus bound parameters
    pub fn compile(&self) -> Result<(Vec<String>, Vec<SqlValue>)> {
        let mut fragments = Vec::new();
        let mut params = Vec::new();

        for (column, value) in &self.set {
            check_column(column)?;
            params.push(SqlValue::from_document(value));
            fragments.push(format!("{column} = ?"));
        }
        for (column, delta) in &self.inc {
            check_column(column)?;
            if !delta.is_number() {
                return Err(Error::validation(
                    column.clone(),
                    "number",
                    format!("cannot increment by {}", delta.type_name()),
                ));
            }
            params.push(SqlValue::from_document(delta));
            fragments.push(format!("{column} = {column} + ?"));
        }
        for column in &self.unset {
            check_column(column)?;
            fragments.push(format!("{column} = NULL"));
        }

        Ok((fragments, params))
    }
}

fn check_column(column: &str) -> Result<()> {
    if column.contains('.') {
        return Err(Error::InvalidOperation(format!(
            "bulk updates target top-level columns only, got '{column}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_in_declaration_order() {
        let update = UpdateDoc::new()
            .set("name", "zed")
            .inc("balance", 5i64)
            .unset("note");
        let (frags, params) = update.compile().unwrap();
        assert_eq!(
            frags,
            vec!["name = ?", "balance = balance + ?", "note = NULL"]
        );
        assert_eq!(
            params,
            vec![SqlValue::Text("zed".into()), SqlValue::Int(5)]
        );
    }

    #[test]
    fn test_dotted_target_is_rejected() {
        let err = UpdateDoc::new().set("config.level", 1i64).compile();
        assert!(err.is_err());
    }

    #[test]
    fn test_non_numeric_increment_is_rejected() {
        let err = UpdateDoc::new().inc("balance", "ten").compile();
        assert!(err.is_err());
    }
}
