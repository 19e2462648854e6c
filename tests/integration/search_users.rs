//! Integration tests for query-string search against PostgreSQL
//!
//! Each test builds its own four-user table so tests can run in parallel.
//!
//! Note: These tests require a running PostgreSQL database. Set TEST_DATABASE_URL
//! to run them; set TEST_REDIS_URL as well to exercise the Redis cache. Without
//! the variables the tests return early.

use chrono::NaiveDateTime;
use lifeguard_search::cache::{CacheOptions, RedisCache};
use lifeguard_search::{
    connect, ExecutionError, Lookup, MayPostgresExecutor, ParameterSet, QueryExecutor, SearchError,
    Table,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: i64,
    username: String,
    firstname: String,
    lastname: String,
    createdat: NaiveDateTime,
}

fn executor() -> Option<MayPostgresExecutor> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let client = connect(&url).expect("Failed to connect to database");
    Some(MayPostgresExecutor::new(client))
}

// Four users one hour apart starting 2024-03-01 07:00
fn setup_users(executor: &MayPostgresExecutor, table: &str) -> Result<(), ExecutionError> {
    executor.execute(&format!("DROP TABLE IF EXISTS {table}"))?;
    executor.execute(&format!(
        "CREATE TABLE {table} (
            id BIGINT PRIMARY KEY,
            username TEXT NOT NULL,
            firstname TEXT NOT NULL,
            lastname TEXT NOT NULL,
            createdat TIMESTAMP NOT NULL
        )"
    ))?;
    executor.execute(&format!(
        "INSERT INTO {table} (id, username, firstname, lastname, createdat) VALUES
            (1, 'test1', 'test', 'one', '2024-03-01 07:00:00'),
            (2, 'test2', 'test', 'two', '2024-03-01 08:00:00'),
            (3, 'test3', 'test', 'Three', '2024-03-01 09:00:00'),
            (4, 'test4', 'test', 'four', '2024-03-01 10:00:00')"
    ))?;
    Ok(())
}

fn fixture(table: &'static str) -> Option<(MayPostgresExecutor, Table)> {
    let executor = executor()?;
    setup_users(&executor, table).expect("Failed to setup users");
    Some((executor, Table::new(table).with_primary_key("id")))
}

fn params(pairs: &[(&str, &str)]) -> ParameterSet {
    pairs.iter().copied().collect()
}

fn find_many(executor: &MayPostgresExecutor, table: &Table, pairs: &[(&str, &str)]) -> Vec<User> {
    Lookup::new(executor)
        .find_many(table, &params(pairs))
        .expect("find_many failed")
}

fn find_ids(executor: &MayPostgresExecutor, table: &Table, pairs: &[(&str, &str)]) -> Vec<i64> {
    find_many(executor, table, pairs).into_iter().map(|u| u.id).collect()
}

#[test]
fn test_find_one_by_lastname() {
    let Some((executor, users)) = fixture("search_users_find_one") else {
        return;
    };
    let user: User = Lookup::new(&executor)
        .find_one(&users, &params(&[("eq__lastname", "two")]), &CacheOptions::disabled())
        .expect("find_one failed");
    assert_eq!(user.firstname, "test");
    assert_eq!(user.id, 2);

    // several matches: the primary key picks the lowest id every time
    let user: User = Lookup::new(&executor)
        .find_one(&users, &params(&[("gte__id", "2")]), &CacheOptions::disabled())
        .expect("find_one failed");
    assert_eq!(user.id, 2);
}

#[test]
fn test_find_one_without_match_is_not_found() {
    let Some((executor, users)) = fixture("search_users_not_found") else {
        return;
    };
    let err = Lookup::new(&executor)
        .find_one::<User, _>(&users, &params(&[("eq__id", "99")]), &CacheOptions::disabled())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_like_is_case_sensitive_and_ilike_is_not() {
    let Some((executor, users)) = fixture("search_users_like") else {
        return;
    };
    // only "two" contains a lowercase t; "Three" needs ilike
    assert_eq!(find_many(&executor, &users, &[("like__lastname", "t")]).len(), 1);
    assert_eq!(find_many(&executor, &users, &[("ilike__lastname", "t")]).len(), 2);
}

#[test]
fn test_comparison_operators() {
    let Some((executor, users)) = fixture("search_users_compare") else {
        return;
    };
    assert_eq!(find_many(&executor, &users, &[("in__id", "1,2")]).len(), 2);
    assert_eq!(find_many(&executor, &users, &[("lt__id", "2")]).len(), 1);
    assert_eq!(find_many(&executor, &users, &[("lte__id", "2")]).len(), 2);
    assert_eq!(find_many(&executor, &users, &[("gt__id", "2")]).len(), 2);

    let ids: Vec<i64> = find_many(&executor, &users, &[("gte__id", "2"), ("orderby", "id")])
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(ids, vec![2, 3, 4]);
}

#[test]
fn test_between_is_half_open() {
    let Some((executor, users)) = fixture("search_users_between") else {
        return;
    };
    let found = find_many(
        &executor,
        &users,
        &[("btwn__createdat", "2024-03-01 07:00:00,2024-03-01 09:00:00")],
    );
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|u| u.id == 1 || u.id == 2));

    let err = Lookup::new(&executor)
        .find_many::<User, _>(&users, &params(&[("btwn__createdat", "2024-03-01 09:00:00")]))
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidRange { .. }));
}

#[test]
fn test_pagination_and_ordering() {
    let Some((executor, users)) = fixture("search_users_paging") else {
        return;
    };
    assert_eq!(find_many(&executor, &users, &[("page", "1"), ("size", "1")]).len(), 1);
    assert_eq!(find_many(&executor, &users, &[("page", "a"), ("size", "b")]).len(), 4);

    assert_eq!(find_ids(&executor, &users, &[("lte__id", "2"), ("orderby", "id")]), vec![1, 2]);
    assert_eq!(
        find_ids(&executor, &users, &[("lte__id", "2"), ("orderby", "id DESC")]),
        vec![2, 1]
    );
    assert_eq!(find_ids(&executor, &users, &[("lte__id", "2"), ("orderby", "")]).len(), 2);

    let second_page = find_many(
        &executor,
        &users,
        &[("orderby", "id"), ("page", "2"), ("size", "3")],
    );
    assert_eq!(second_page.iter().map(|u| u.id).collect::<Vec<_>>(), vec![4]);
}

#[test]
fn test_unknown_operator_is_ignored() {
    let Some((executor, users)) = fixture("search_users_unknown_op") else {
        return;
    };
    let found = find_many(&executor, &users, &[("nggn__createdat", "2024-03-01 09:00:00")]);
    assert_eq!(found.len(), 4);
}

#[test]
fn test_find_many_with_count() {
    let Some((executor, users)) = fixture("search_users_counted") else {
        return;
    };
    let page = Lookup::new(&executor)
        .find_many_with_count::<User, _>(
            &users,
            &params(&[("gte__id", "2"), ("orderby", "id"), ("page", "1"), ("size", "2")]),
        )
        .expect("find_many_with_count failed");
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, 2);
    assert_eq!((page.page, page.size), (1, 2));
}

#[test]
fn test_find_one_through_redis_cache() {
    let Ok(redis_url) = std::env::var("TEST_REDIS_URL") else {
        eprintln!("TEST_REDIS_URL not set, skipping");
        return;
    };
    let Some((executor, users)) = fixture("search_users_cached") else {
        return;
    };
    let cache = RedisCache::open(&redis_url, Duration::from_millis(500)).expect("Invalid redis url");
    let lookup = Lookup::new(&executor).with_cache(&cache);
    let opts = CacheOptions::enabled(Duration::from_secs(30));
    let query = params(&[("eq__lastname", "four")]);

    let fetched: User = lookup.find_one(&users, &query, &opts).expect("find_one failed");

    // the cached copy must survive the row disappearing
    executor
        .execute("DELETE FROM search_users_cached WHERE id = 4")
        .expect("Failed to delete row");
    let cached: User = lookup.find_one(&users, &query, &opts).expect("cached find_one failed");
    assert_eq!(fetched, cached);
}
