//! Veneer engine
//!
//! The document-store compatibility layer: a MongoDB-like data API
//! (collections, documents, typed filters, atomic update operators, an
//! aggregation subset, cursors) compiled onto a relational engine whose
//! rows carry JSON-typed columns.
//!
//! # Architecture
//!
//! - [`Model`]: collection façade; compiles filters and pipelines to SQL
//! - [`Cursor`]: deferred SELECT builder
//! - [`Document`]: one row plus a buffer of pending atomic operations
//! - [`navigator::DocumentQuery`]: schema-aware path navigation/mutation
//! - [`pool::ConnectionPool`]: the relational engine contract
//! - [`cache::DocumentCache`]: injectable process-local cache
//!
//! # Example
//!
//! ```ignore
//! use veneer_engine::{Filter, Model};
//!
//! let accounts = Model::new("accounts", schema, pool);
//! let mut doc = accounts.new_document(fields)?;
//! doc.save()?;
//! doc.query().prop("balance").inc(25)?;
//! doc.query().prop("tags").push("vip")?;
//! doc.save()?;
//! let found = accounts.find_one(Filter::id("a1"))?;
//! ```

#![warn(clippy::all)]

pub mod aggregate;
pub mod cache;
pub mod cursor;
pub mod document;
pub mod filter;
pub mod model;
pub mod navigator;
pub mod pool;
pub mod testing;
pub mod update;

pub use aggregate::{Accumulator, AggExpr, Pipeline, Projection, Stage};
pub use cache::{DocumentCache, NullCache, ProcessCache};
pub use cursor::{Cursor, SortOrder, MAX_ROWS_SENTINEL};
pub use document::{AtomicOp, Document, PendingOp, PendingOps};
pub use filter::{Clause, FieldCond, Filter};
pub use model::{DeleteOptions, InsertOptions, Model, ModelOptions, UpdateOptions};
pub use navigator::DocumentQuery;
pub use pool::{Connection, ConnectionPool, SqlRow, SqlValue};
pub use update::UpdateDoc;
