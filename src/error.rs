//! Errors surfaced by search lookups.
//!
//! Callers only ever see two families: validation errors raised while
//! translating parameters, and execution errors passed through from the
//! database. Cache failures never reach this type.

use crate::executor::ExecutionError;
use std::fmt;

/// Error returned by [`Lookup`](crate::Lookup) operations and the translator
#[derive(Debug)]
pub enum SearchError {
    /// `btwn__<column>` value did not split into exactly two comma-separated parts
    InvalidRange {
        /// Column named by the parameter key
        column: String,
        /// Value as received
        value: String,
    },
    /// Column rejected by the strict column policy
    UnknownColumn {
        /// Column named by the parameter key or `orderby`
        column: String,
    },
    /// Failure from the execution collaborator, passed through unmodified
    Execution(ExecutionError),
}

impl SearchError {
    /// True for errors raised before any statement reached the database
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidRange { .. } | SearchError::UnknownColumn { .. }
        )
    }

    /// True when a single-record lookup matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::Execution(ExecutionError::RecordNotFound))
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidRange { column, value } => {
                write!(
                    f,
                    "range search on {column} requires 2 values, received [{value}]"
                )
            }
            SearchError::UnknownColumn { column } => {
                write!(f, "unknown column: {column}")
            }
            SearchError::Execution(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Execution(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ExecutionError> for SearchError {
    fn from(err: ExecutionError) -> Self {
        SearchError::Execution(err)
    }
}
