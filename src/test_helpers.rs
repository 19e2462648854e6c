//! In-memory executor for unit tests.
//!
//! [`StubExecutor`] answers every `SELECT` with a canned set of records and
//! every count with a canned total, and records each statement it receives so
//! tests can assert on the rendered SQL.

use crate::executor::{ExecutionError, QueryExecutor, Record, TransactionalExecutor};
use std::sync::Mutex;

#[derive(Default)]
pub struct StubExecutor {
    records: Vec<Record>,
    count: i64,
    failure: Option<String>,
    statements: Mutex<Vec<String>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every `query_all`
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    /// Value returned by every `query_count`
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    /// Make every statement fail with `ExecutionError::Other(message)`
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Every statement received so far, in order, including `BEGIN`/`COMMIT`/`ROLLBACK`
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of `query_all` and `query_count` calls received so far
    pub fn query_calls(&self) -> usize {
        self.statements()
            .iter()
            .filter(|s| s.starts_with("SELECT"))
            .count()
    }

    fn record(&self, sql: &str) -> Result<(), ExecutionError> {
        if let Ok(mut statements) = self.statements.lock() {
            statements.push(sql.to_string());
        }
        match &self.failure {
            Some(message) => Err(ExecutionError::Other(message.clone())),
            None => Ok(()),
        }
    }
}

impl QueryExecutor for StubExecutor {
    fn execute(&self, sql: &str) -> Result<u64, ExecutionError> {
        self.record(sql)?;
        Ok(0)
    }

    fn query_all(&self, sql: &str) -> Result<Vec<Record>, ExecutionError> {
        self.record(sql)?;
        Ok(self.records.clone())
    }

    fn query_count(&self, sql: &str) -> Result<i64, ExecutionError> {
        self.record(sql)?;
        Ok(self.count)
    }
}

impl TransactionalExecutor for StubExecutor {
    fn transaction<T, F>(&self, work: F) -> Result<T, ExecutionError>
    where
        F: FnOnce(&dyn QueryExecutor) -> Result<T, ExecutionError>,
    {
        if let Ok(mut statements) = self.statements.lock() {
            statements.push("BEGIN".to_string());
        }
        let result = work(self);
        let end = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        if let Ok(mut statements) = self.statements.lock() {
            statements.push(end.to_string());
        }
        result
    }
}
