//! Veneer - a document-store API over a relational engine
//!
//! Veneer exposes MongoDB-like collections, documents, queries, atomic
//! update operators, a small aggregation subset, and cursors, while
//! persisting everything in a relational engine whose rows carry
//! JSON-typed columns. Callers manipulate documents as schemaless nested
//! objects; the layer compiles those manipulations into SQL.
//!
//! # Quick Start
//!
//! ```ignore
//! use veneer::{Definition, Filter, Model, Schema, Value};
//!
//! let schema = Schema::builder()
//!     .field("_id", Definition::string())
//!     .field("balance", Definition::number())
//!     .field("tags", Definition::array(Definition::string()))
//!     .build();
//! let accounts = Model::new("accounts", schema, pool);
//!
//! let mut doc = accounts.new_document(fields)?;
//! doc.save()?; // INSERT
//!
//! doc.query().prop("balance").inc(25)?;
//! doc.query().prop("tags").push("vip")?;
//! doc.save()?; // one UPDATE statement sequence
//! ```
//!
//! Internal layering (core types, schema, engine) is re-exported here;
//! collaborators depend on this crate alone.

// Re-export the public API
pub use veneer_core::{
    DocPath, Error, FieldMap, ObjectId, PathParseError, PathSegment, Result, Value,
};
pub use veneer_engine::{
    Accumulator, AggExpr, AtomicOp, Clause, Connection, ConnectionPool, Cursor, DeleteOptions,
    Document, DocumentCache, DocumentQuery, FieldCond, Filter, InsertOptions, Model, ModelOptions,
    NullCache, PendingOp, PendingOps, Pipeline, ProcessCache, Projection, SortOrder, SqlRow,
    SqlValue, Stage, UpdateDoc, UpdateOptions,
};
pub use veneer_schema::{CastRule, Definition, FieldKind, ScalarType, Schema, SchemaBuilder};

/// Test support (scripted recording pool)
pub use veneer_engine::testing;
