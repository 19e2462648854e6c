//! # Lifeguard Search
//!
//! Query-string search over PostgreSQL for the `may` runtime.
//!
//! Request parameters such as `eq__lastname=two&orderby=id DESC&page=2&size=5`
//! are translated into a filtered, ordered, paginated `SELECT` and executed
//! through a [`QueryExecutor`]. Single-record lookups can go through a
//! read-through [`cache::CacheStore`].
//!
//! See [README on GitHub](https://github.com/microscaler/lifeguard) for the operator table.

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod lookup;
pub mod metrics;
pub mod query;
pub mod transaction;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cache::{CacheOptions, CacheStore};
pub use config::SearchConfig;
pub use connection::{connect, connect_with_config, ConnectionError};
pub use error::SearchError;
pub use executor::{ExecutionError, MayPostgresExecutor, QueryExecutor, Record, TransactionalExecutor};
pub use lookup::{Lookup, SearchPage};
pub use query::{ParameterSet, SearchEntity, SearchPolicy, SelectQuery, Table};
pub use transaction::{IsolationLevel, Transaction, TransactionError};
