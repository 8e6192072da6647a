//! Test support: a scripted, recording connection pool
//!
//! `RecordingPool` captures every statement and its bound parameters, and
//! plays back scripted result sets for queries. Used by the engine's own
//! tests and available to downstream crates testing against the pool
//! contract without a live relational engine.

use crate::pool::{Connection, ConnectionPool, SqlRow, SqlValue};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use veneer_core::{Error, Result};

/// A captured statement: SQL text plus bound parameters
pub type Statement = (String, Vec<SqlValue>);

/// In-memory pool double that records statements and scripts results
#[derive(Debug, Default)]
pub struct RecordingPool {
    statements: Mutex<Vec<Statement>>,
    scripted_rows: Mutex<VecDeque<Vec<SqlRow>>>,
    fail_next: Mutex<Option<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl RecordingPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set for the next query
    pub fn script_rows(&self, rows: Vec<SqlRow>) {
        self.scripted_rows.lock().push_back(rows);
    }

    /// Make the next statement fail with a storage error
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Every captured statement, in execution order
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().clone()
    }

    /// Number of captured statements
    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    /// The most recent captured statement
    pub fn last_statement(&self) -> Option<Statement> {
        self.statements.lock().last().cloned()
    }

    /// Forget captured statements (scripted rows are kept)
    pub fn clear(&self) {
        self.statements.lock().clear();
    }

    /// Connections handed out so far
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Connections returned so far; equal to [`Self::acquired`] whenever
    /// no connection is currently held
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn record(&self, sql: &str, params: &[SqlValue]) -> Result<()> {
        self.statements
            .lock()
            .push((sql.to_string(), params.to_vec()));
        if let Some(message) = self.fail_next.lock().take() {
            return Err(Error::storage(message));
        }
        Ok(())
    }
}

struct RecordingConnection<'a> {
    pool: &'a RecordingPool,
}

impl Connection for RecordingConnection<'_> {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.pool.record(sql, params)?;
        Ok(1)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>> {
        self.pool.record(sql, params)?;
        Ok(self.pool.scripted_rows.lock().pop_front().unwrap_or_default())
    }
}

impl Drop for RecordingConnection<'_> {
    fn drop(&mut self) {
        self.pool.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl ConnectionPool for RecordingPool {
    fn acquire(&self) -> Result<Box<dyn Connection + '_>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingConnection { pool: self }))
    }
}
