//! Lookup service: `find_one`, `find_many` and the counting `find_many_with_count`.
//!
//! A [`Lookup`] borrows its collaborators for the duration of the calls made
//! through it. Nothing is held process-wide; build one wherever an executor
//! (and optionally a cache) is at hand.
//!
//! ```no_run
//! use lifeguard_search::cache::{CacheOptions, MemoryCache};
//! use lifeguard_search::query::{ParameterSet, Table};
//! use lifeguard_search::{connect, Lookup, MayPostgresExecutor};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     id: i64,
//!     username: String,
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! const USERS: Table = Table::new("users").with_primary_key("id");
//!
//! let executor = MayPostgresExecutor::new(connect("postgresql://localhost/app")?);
//! let cache = MemoryCache::new();
//! let lookup = Lookup::new(&executor).with_cache(&cache);
//!
//! let params: ParameterSet = [("eq__lastname", "two")].into_iter().collect();
//! let user: User = lookup.find_one(&USERS, &params, &CacheOptions::enabled(Duration::from_secs(60)))?;
//!
//! let params: ParameterSet = [("gte__id", "2"), ("page", "1"), ("size", "2")].into_iter().collect();
//! let page = lookup.find_many_with_count::<User, _>(&USERS, &params)?;
//! println!("{} of {}", page.items.len(), page.total);
//! # Ok(())
//! # }
//! ```

use crate::cache::{cache_key, CacheError, CacheOptions, CacheStore};
use crate::error::SearchError;
use crate::executor::{QueryExecutor, TransactionalExecutor};
use crate::query::{ParameterSet, SearchEntity, SearchPolicy, SelectQuery, Translator};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage<M> {
    pub items: Vec<M>,
    /// Rows matching the filters, ignoring pagination
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

/// Entry point for search lookups
pub struct Lookup<'a, X: QueryExecutor + ?Sized> {
    executor: &'a X,
    cache: Option<&'a dyn CacheStore>,
    policy: SearchPolicy,
}

impl<'a, X: QueryExecutor + ?Sized> Lookup<'a, X> {
    pub fn new(executor: &'a X) -> Self {
        Self {
            executor,
            cache: None,
            policy: SearchPolicy::default(),
        }
    }

    /// Cache consulted by `find_one` when the call's [`CacheOptions`] allow it
    pub fn with_cache(mut self, cache: &'a dyn CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn translate<E: SearchEntity + ?Sized>(
        &self,
        entity: &E,
        params: &ParameterSet,
    ) -> Result<SelectQuery, SearchError> {
        Translator::for_entity(self.policy, entity)
            .apply(SelectQuery::new(entity.table_name()), params)
    }

    /// Fetch the first row matching `params`.
    ///
    /// Rows are ordered by the caller's `orderby` and then by the entity's
    /// primary key, when it publishes one, so repeated calls pick the same row.
    ///
    /// With caching enabled in `opts` and a cache configured, a hit is returned
    /// without touching the database and a fetched row is written back with
    /// `opts.ttl`. Cache failures of any kind degrade to a miss.
    ///
    /// # Errors
    ///
    /// Returns a validation error from translation, or the executor's error
    /// unmodified. No match is `ExecutionError::RecordNotFound`.
    pub fn find_one<M, E>(
        &self,
        entity: &E,
        params: &ParameterSet,
        opts: &CacheOptions,
    ) -> Result<M, SearchError>
    where
        M: Serialize + DeserializeOwned,
        E: SearchEntity + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::find_one_span(entity.table_name()).entered();

        let cache = self.cache.filter(|_| opts.check_cache);
        let key = cache.map(|_| cache_key(entity.table_name(), params));

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            if let Some(hit) = read_cached(cache, key) {
                return Ok(hit);
            }
        }

        let mut query = self.translate(entity, params)?;
        if let Some(primary_key) = entity.primary_key() {
            query = query.then_order_by_column(primary_key);
        }
        let record: M = query.first(self.executor)?;

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            write_cached(cache, key, &record, opts);
        }
        Ok(record)
    }

    /// Fetch one page of rows matching `params` as a single statement.
    ///
    /// # Errors
    ///
    /// Returns a validation error from translation, or the executor's error
    /// unmodified.
    pub fn find_many<M, E>(&self, entity: &E, params: &ParameterSet) -> Result<Vec<M>, SearchError>
    where
        M: DeserializeOwned,
        E: SearchEntity + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::find_many_span(entity.table_name(), false).entered();

        Ok(self.translate(entity, params)?.all(self.executor)?)
    }
}

impl<'a, X: TransactionalExecutor + ?Sized> Lookup<'a, X> {
    /// Fetch one page and the total match count inside one transaction.
    ///
    /// Translation happens before the transaction opens, so a validation
    /// error never reaches the database.
    ///
    /// # Errors
    ///
    /// Returns a validation error from translation, or the first execution
    /// error from the fetch, the count or the transaction itself.
    pub fn find_many_with_count<M, E>(
        &self,
        entity: &E,
        params: &ParameterSet,
    ) -> Result<SearchPage<M>, SearchError>
    where
        M: DeserializeOwned,
        E: SearchEntity + ?Sized,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::find_many_span(entity.table_name(), true).entered();

        let translator = Translator::for_entity(self.policy, entity);
        let query = translator.apply(SelectQuery::new(entity.table_name()), params)?;
        let pages = translator.page_spec(params);

        let (items, total) = self.executor.transaction(|tx| {
            let items = query.all(tx)?;
            let total = query.count(tx)?;
            Ok((items, total))
        })?;

        Ok(SearchPage {
            items,
            total,
            page: pages.page,
            size: pages.size,
        })
    }
}

fn read_cached<M: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Option<M> {
    let result = cache
        .get(key)
        .and_then(|hit| hit.map(|json| serde_json::from_str::<M>(&json)).transpose().map_err(CacheError::from));
    match result {
        Ok(Some(value)) => {
            #[cfg(feature = "metrics")]
            METRICS.record_cache_hit();
            Some(value)
        }
        Ok(None) => {
            #[cfg(feature = "metrics")]
            METRICS.record_cache_miss();
            None
        }
        Err(e) => {
            #[cfg(feature = "metrics")]
            METRICS.record_cache_read_failure();
            log::warn!("cache read for {key} failed, falling back to database: {e}");
            None
        }
    }
}

fn write_cached<M: Serialize>(cache: &dyn CacheStore, key: &str, record: &M, opts: &CacheOptions) {
    let result = serde_json::to_string(record)
        .map_err(CacheError::from)
        .and_then(|json| cache.set(key, &json, opts.ttl));
    if let Err(e) = result {
        #[cfg(feature = "metrics")]
        METRICS.record_cache_write_failure();
        log::warn!("cache write for {key} failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::query::Table;
    use crate::test_helpers::StubExecutor;
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    const USERS: Table = Table::new("users").with_primary_key("id");

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: i64,
        firstname: String,
    }

    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Other("connection refused".to_string()))
        }

        fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Other("connection refused".to_string()))
        }
    }

    fn executor() -> StubExecutor {
        StubExecutor::new()
            .with_records(vec![json!({"id": 2, "firstname": "test"})])
            .with_count(4)
    }

    #[test]
    fn test_find_one_second_call_is_served_from_cache() {
        let executor = executor();
        let cache = MemoryCache::new();
        let lookup = Lookup::new(&executor).with_cache(&cache);
        let params: ParameterSet = [("eq__lastname", "two")].into_iter().collect();
        let opts = CacheOptions::enabled(Duration::from_secs(60));

        let first: User = lookup.find_one(&USERS, &params, &opts).unwrap();
        let second: User = lookup.find_one(&USERS, &params, &opts).unwrap();

        assert_eq!(first, second);
        assert_eq!(executor.query_calls(), 1);
        assert!(cache.get("users|eq__lastname,two").unwrap().is_some());
    }

    #[test]
    fn test_find_one_ignores_cache_when_disabled() {
        let executor = executor();
        let cache = MemoryCache::new();
        let lookup = Lookup::new(&executor).with_cache(&cache);
        let params: ParameterSet = [("eq__id", "2")].into_iter().collect();

        let _: User = lookup.find_one(&USERS, &params, &CacheOptions::disabled()).unwrap();
        let _: User = lookup.find_one(&USERS, &params, &CacheOptions::disabled()).unwrap();

        assert_eq!(executor.query_calls(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_find_one_cache_failure_degrades_to_miss() {
        let executor = executor();
        let lookup = Lookup::new(&executor).with_cache(&BrokenCache);
        let params: ParameterSet = [("eq__id", "2")].into_iter().collect();

        let user: User = lookup
            .find_one(&USERS, &params, &CacheOptions::enabled(Duration::from_secs(60)))
            .unwrap();
        assert_eq!(user.id, 2);
        assert_eq!(executor.query_calls(), 1);
    }

    #[test]
    fn test_find_one_undecodable_cache_entry_is_a_miss() {
        let executor = executor();
        let cache = MemoryCache::new();
        cache
            .set("users|eq__id,2", "not json", Duration::from_secs(60))
            .unwrap();
        let lookup = Lookup::new(&executor).with_cache(&cache);
        let params: ParameterSet = [("eq__id", "2")].into_iter().collect();

        let user: User = lookup
            .find_one(&USERS, &params, &CacheOptions::enabled(Duration::from_secs(60)))
            .unwrap();
        assert_eq!(user.firstname, "test");
        assert_eq!(executor.query_calls(), 1);
    }

    #[test]
    fn test_find_one_not_found_passes_through() {
        let executor = StubExecutor::new();
        let params: ParameterSet = [("eq__id", "99")].into_iter().collect();
        let err = Lookup::new(&executor)
            .find_one::<User, _>(&USERS, &params, &CacheOptions::disabled())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_one_orders_by_primary_key_last() {
        let executor = executor();
        let params: ParameterSet = [("gte__id", "2")].into_iter().collect();
        let _: User = Lookup::new(&executor)
            .find_one(&USERS, &params, &CacheOptions::disabled())
            .unwrap();

        let params: ParameterSet = [("gte__id", "2"), ("orderby", "firstname DESC")].into_iter().collect();
        let _: User = Lookup::new(&executor)
            .find_one(&USERS, &params, &CacheOptions::disabled())
            .unwrap();

        assert_eq!(
            executor.statements(),
            vec![
                r#"SELECT * FROM "users" WHERE "id" >= '2' ORDER BY "users"."id" LIMIT 1 OFFSET 0"#
                    .to_string(),
                r#"SELECT * FROM "users" WHERE "id" >= '2' ORDER BY firstname DESC, "users"."id" LIMIT 1 OFFSET 0"#
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_find_one_without_primary_key_adds_no_order() {
        let executor = executor();
        let params: ParameterSet = [("eq__id", "2")].into_iter().collect();
        let _: User = Lookup::new(&executor)
            .find_one(&Table::new("users"), &params, &CacheOptions::disabled())
            .unwrap();
        assert_eq!(
            executor.statements(),
            vec![r#"SELECT * FROM "users" WHERE "id" = '2' LIMIT 1 OFFSET 0"#.to_string()]
        );
    }

    #[test]
    fn test_find_many_invalid_range_never_reaches_database() {
        let executor = executor();
        let params: ParameterSet = [("btwn__createdat", "2024-03-01 07:00:00")].into_iter().collect();
        let err = Lookup::new(&executor)
            .find_many::<User, _>(&USERS, &params)
            .unwrap_err();
        assert!(err.is_validation());
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_find_many_is_a_single_statement() {
        let executor = executor();
        let params: ParameterSet = [("gt__id", "1")].into_iter().collect();
        let users: Vec<User> = Lookup::new(&executor).find_many(&USERS, &params).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(executor.statements().len(), 1);
    }

    #[test]
    fn test_find_many_with_count_runs_inside_one_transaction() {
        let executor = executor();
        let params: ParameterSet = [("gte__id", "2"), ("page", "2"), ("size", "1")].into_iter().collect();
        let page = Lookup::new(&executor)
            .find_many_with_count::<User, _>(&USERS, &params)
            .unwrap();

        assert_eq!(page.total, 4);
        assert_eq!((page.page, page.size), (2, 1));
        assert_eq!(
            executor.statements(),
            vec![
                "BEGIN".to_string(),
                r#"SELECT * FROM "users" WHERE "id" >= '2' LIMIT 1 OFFSET 1"#.to_string(),
                r#"SELECT COUNT(*) FROM (SELECT * FROM "users" WHERE "id" >= '2') AS count_subquery"#
                    .to_string(),
                "COMMIT".to_string(),
            ]
        );
    }

    #[test]
    fn test_find_many_with_count_rolls_back_on_failure() {
        let executor = StubExecutor::new().failing("connection reset");
        let err = Lookup::new(&executor)
            .find_many_with_count::<User, _>(&USERS, &ParameterSet::new())
            .unwrap_err();
        assert!(matches!(err, SearchError::Execution(_)));
        assert_eq!(executor.statements().last().map(String::as_str), Some("ROLLBACK"));
    }

    #[test]
    fn test_strict_policy_rejects_unknown_column() {
        const STRICT_USERS: Table = Table::new("users").with_columns(&["id", "firstname"]);
        let executor = executor();
        let params: ParameterSet = [("eq__password", "x")].into_iter().collect();
        let err = Lookup::new(&executor)
            .with_policy(SearchPolicy {
                strict_columns: true,
                max_page_size: None,
            })
            .find_many::<User, _>(&STRICT_USERS, &params)
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownColumn { .. }));
    }
}
