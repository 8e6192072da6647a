//! Collection schemas
//!
//! A Schema names a collection's top-level fields (each backed by one
//! relational column) and resolves dotted paths to the Definition that
//! governs them. Resolution is incremental: the path navigator holds a
//! [`SchemaCursor`] and shifts it one segment at a time, falling out of
//! schema tracking once it crosses into a Mixed field.

use crate::definition::{Definition, FieldKind};
use veneer_core::path::{DocPath, PathSegment};
use veneer_core::{Error, FieldMap, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A collection's schema: named top-level fields plus the identifier field
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Definition>,
    id_field: Option<String>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            fields: BTreeMap::new(),
            id_field: None,
        }
    }

    /// Look up a top-level field definition
    pub fn field(&self, name: &str) -> Option<&Definition> {
        self.fields.get(name)
    }

    /// Iterate over the named fields
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Definition)> {
        self.fields.iter()
    }

    /// The identifier field of documents built from this schema, if any
    ///
    /// Defaults to `_id` when the schema declares such a field. Elements
    /// pushed into typed arrays/maps are matched by this field.
    pub fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    /// Resolve a path to the Definition that governs it
    ///
    /// Returns None when the path leaves schema scope (unknown field, or
    /// anywhere beneath a Mixed field); no validation applies there.
    pub fn resolve(&self, path: &DocPath) -> Option<&Definition> {
        let mut cursor = SchemaCursor::root(self);
        for segment in path.segments() {
            cursor = cursor.step(segment);
        }
        cursor.definition()
    }

    /// Construct a document from raw fields
    ///
    /// Casts every schema-governed field, fills defaults for absent ones,
    /// and passes unknown fields through untouched.
    pub fn build(&self, mut raw: FieldMap) -> Result<FieldMap> {
        let mut built = FieldMap::new();
        for (name, def) in &self.fields {
            match raw.remove(name) {
                Some(value) => {
                    built.insert(name.clone(), def.cast(value, name)?);
                }
                None => {
                    if let Some(default) = def.default_value() {
                        built.insert(name.clone(), default.clone());
                    }
                }
            }
        }
        // schemaless extras ride along unchanged
        built.append(&mut raw);
        Ok(built)
    }

    /// Validate every schema-governed field present in `fields`
    pub fn validate_document(&self, fields: &FieldMap) -> Result<()> {
        for (name, def) in &self.fields {
            if let Some(value) = fields.get(name) {
                def.validate(value, name, true)?;
            }
        }
        Ok(())
    }
}

/// Builder for [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, Definition>,
    id_field: Option<String>,
}

impl SchemaBuilder {
    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, def: Definition) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Name the identifier field explicitly
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = Some(name.into());
        self
    }

    /// Finish building
    pub fn build(self) -> Schema {
        let id_field = self.id_field.or_else(|| {
            self.fields
                .contains_key("_id")
                .then(|| "_id".to_string())
        });
        Schema {
            fields: self.fields,
            id_field,
        }
    }

    /// Finish building behind an Arc, for nested-schema definitions
    pub fn build_shared(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}

/// Incremental schema-resolution state
///
/// Tracks which Definition governs the currently selected value while a
/// navigator descends a document. `Untracked` is absorbing: once a walk
/// crosses an unknown field or enters a Mixed field, every deeper step
/// stays untracked and validation is skipped.
#[derive(Debug, Clone, Copy)]
pub enum SchemaCursor<'a> {
    /// At the document root
    Root(&'a Schema),
    /// At a value governed by this definition
    At(&'a Definition),
    /// Out of schema scope
    Untracked,
}

impl<'a> SchemaCursor<'a> {
    /// Cursor at the root of a schema
    pub fn root(schema: &'a Schema) -> Self {
        SchemaCursor::Root(schema)
    }

    /// Shift one segment deeper
    pub fn step(self, segment: &PathSegment) -> SchemaCursor<'a> {
        match (self, segment) {
            (SchemaCursor::Root(schema), PathSegment::Key(k)) => match schema.field(k) {
                Some(def) => SchemaCursor::At(def),
                None => SchemaCursor::Untracked,
            },
            (SchemaCursor::Root(_), PathSegment::Index(_)) => SchemaCursor::Untracked,
            (SchemaCursor::At(def), segment) => match (def.kind(), segment) {
                (FieldKind::Array(el), PathSegment::Index(_)) => SchemaCursor::At(el),
                (FieldKind::Map(el), PathSegment::Key(_)) => SchemaCursor::At(el),
                (FieldKind::Nested(schema), PathSegment::Key(k)) => match schema.field(k) {
                    Some(def) => SchemaCursor::At(def),
                    None => SchemaCursor::Untracked,
                },
                _ => SchemaCursor::Untracked,
            },
            (SchemaCursor::Untracked, _) => SchemaCursor::Untracked,
        }
    }

    /// The definition at the cursor, if tracked
    pub fn definition(&self) -> Option<&'a Definition> {
        match self {
            SchemaCursor::At(def) => Some(def),
            _ => None,
        }
    }

    /// Validate a value at the cursor position
    ///
    /// Untracked positions accept anything; tracked positions delegate to
    /// the definition. `whole` has the same meaning as
    /// [`Definition::validate`].
    pub fn validate(&self, value: &veneer_core::Value, path: &str, whole: bool) -> Result<()> {
        match self.definition() {
            Some(def) => def.validate(value, path, whole),
            None => Ok(()),
        }
    }
}

/// Convenience: resolve a dotted path string against a schema
pub fn resolve_str<'a>(schema: &'a Schema, path: &str) -> Result<Option<&'a Definition>> {
    let path: DocPath = path.parse().map_err(Error::from)?;
    Ok(schema.resolve(&path))
}
