//! Transaction Module
//!
//! Wraps a `may_postgres::Client` in `BEGIN ... COMMIT` so the counting lookup
//! can read a page of rows and their total from the same snapshot.

use crate::executor::{
    query_all_on_client, query_count_on_client, run_on_client, ExecutionError, QueryExecutor,
    Record,
};
use may_postgres::{Client, Error as PostgresError};
use std::fmt;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read committed (default)
    #[default]
    ReadCommitted,
    /// Repeatable read; every statement sees the snapshot taken by the first one
    RepeatableRead,
    /// Serializable
    Serializable,
}

impl IsolationLevel {
    /// Convert to PostgreSQL SQL syntax
    fn to_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    fn begin_sql(self) -> String {
        format!("BEGIN ISOLATION LEVEL {}", self.to_sql())
    }
}

/// Transaction error type
#[derive(Debug)]
pub enum TransactionError {
    /// PostgreSQL error from may_postgres
    PostgresError(PostgresError),
    /// Transaction already committed or rolled back
    TransactionClosed,
    /// Other transaction errors
    Other(String),
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {}", e)
            }
            TransactionError::TransactionClosed => {
                write!(f, "Transaction has already been committed or rolled back")
            }
            TransactionError::Other(s) => {
                write!(f, "Transaction error: {}", s)
            }
        }
    }
}

impl std::error::Error for TransactionError {}

impl From<PostgresError> for TransactionError {
    fn from(err: PostgresError) -> Self {
        TransactionError::PostgresError(err)
    }
}

impl From<TransactionError> for ExecutionError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::PostgresError(e) => ExecutionError::PostgresError(e),
            TransactionError::TransactionClosed => {
                ExecutionError::TransactionError("Transaction closed".to_string())
            }
            TransactionError::Other(s) => ExecutionError::TransactionError(s),
        }
    }
}

/// A database transaction
///
/// Statements issued through the [`QueryExecutor`] impl run inside the
/// transaction. Dropping an open transaction leaves it to the server to roll
/// back when the session ends; call [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) explicitly.
pub struct Transaction {
    client: Client,
    closed: bool,
}

impl Transaction {
    /// Start a transaction with the default isolation level (`ReadCommitted`).
    pub(crate) fn new(client: Client) -> Result<Self, TransactionError> {
        Self::new_with_isolation(client, IsolationLevel::ReadCommitted)
    }

    /// Start a transaction with a specific isolation level
    pub(crate) fn new_with_isolation(
        client: Client,
        isolation_level: IsolationLevel,
    ) -> Result<Self, TransactionError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span().entered();

        let begin = isolation_level.begin_sql();
        client
            .execute(begin.as_str(), &[])
            .map_err(TransactionError::from)?;

        Ok(Self {
            client,
            closed: false,
        })
    }

    /// Commit the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has already been committed or rolled back.
    pub fn commit(mut self) -> Result<(), TransactionError> {
        self.finish("COMMIT")
    }

    /// Rollback the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has already been committed or rolled back.
    pub fn rollback(mut self) -> Result<(), TransactionError> {
        self.finish("ROLLBACK")
    }

    fn finish(&mut self, statement: &str) -> Result<(), TransactionError> {
        if self.closed {
            return Err(TransactionError::TransactionClosed);
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::finish_transaction_span(statement).entered();

        self.client
            .execute(statement, &[])
            .map_err(TransactionError::from)?;
        self.closed = true;
        Ok(())
    }

    /// Check if the transaction is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), ExecutionError> {
        if self.closed {
            return Err(TransactionError::TransactionClosed.into());
        }
        Ok(())
    }
}

impl QueryExecutor for Transaction {
    fn execute(&self, sql: &str) -> Result<u64, ExecutionError> {
        self.ensure_open()?;
        run_on_client(sql, || self.client.execute(sql, &[]))
    }

    fn query_all(&self, sql: &str) -> Result<Vec<Record>, ExecutionError> {
        self.ensure_open()?;
        query_all_on_client(&self.client, sql)
    }

    fn query_count(&self, sql: &str) -> Result<i64, ExecutionError> {
        self.ensure_open()?;
        query_count_on_client(&self.client, sql)
    }
}
