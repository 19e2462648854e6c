//! Query execution methods for SelectQuery.
//!
//! Rows come back from the executor as JSON objects and are decoded with
//! serde, so any `Deserialize` type whose field names match the columns can
//! receive the result.

use crate::executor::{ExecutionError, QueryExecutor, Record};
use crate::query::select::SelectQuery;
use serde::de::DeserializeOwned;

impl SelectQuery {
    /// Execute the query and return all results
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if the statement fails or a row does not decode into `M`.
    pub fn all<M, X>(&self, executor: &X) -> Result<Vec<M>, ExecutionError>
    where
        M: DeserializeOwned,
        X: QueryExecutor + ?Sized,
    {
        executor
            .query_all(&self.to_sql())?
            .into_iter()
            .map(decode_record)
            .collect()
    }

    /// Execute the query with `LIMIT 1` and return the first row.
    ///
    /// Any offset already on the handle is kept.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::RecordNotFound` when nothing matches, or any
    /// statement/decode failure.
    pub fn first<M, X>(&self, executor: &X) -> Result<M, ExecutionError>
    where
        M: DeserializeOwned,
        X: QueryExecutor + ?Sized,
    {
        let sql = self.clone().limit(1).to_sql();
        let record = executor
            .query_all(&sql)?
            .into_iter()
            .next()
            .ok_or(ExecutionError::RecordNotFound)?;
        decode_record(record)
    }

    /// Count rows matching the predicates, ignoring order and pagination
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if the statement fails or the count is negative.
    pub fn count<X>(&self, executor: &X) -> Result<u64, ExecutionError>
    where
        X: QueryExecutor + ?Sized,
    {
        let count = executor.query_count(&self.count_sql())?;
        u64::try_from(count)
            .map_err(|_| ExecutionError::Other(format!("Count cannot be negative: {count}")))
    }
}

pub(crate) fn decode_record<M: DeserializeOwned>(record: Record) -> Result<M, ExecutionError> {
    serde_json::from_value(record)
        .map_err(|e| ExecutionError::DecodeError(format!("Failed to decode row: {e}")))
}
