//! Read-through cache for single-record lookups.
//!
//! Entries map a key derived from the table and the request parameters to the
//! JSON of the fetched record. Nothing invalidates them on writes; staleness
//! is bounded by the TTL.

mod memory;
mod redis_store;

pub use self::memory::MemoryCache;
pub use self::redis_store::RedisCache;

use crate::query::ParameterSet;
use std::fmt;
use std::time::Duration;

/// Default entry lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache store error type
#[derive(Debug)]
pub enum CacheError {
    /// Error from the Redis client
    RedisError(redis::RedisError),
    /// Record could not be serialized or a cached entry could not be decoded
    SerializationError(String),
    /// Other cache errors
    Other(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::RedisError(e) => write!(f, "Redis error: {e}"),
            CacheError::SerializationError(s) => write!(f, "Cache serialization error: {s}"),
            CacheError::Other(s) => write!(f, "Cache error: {s}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::RedisError(err)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

/// String-keyed store with per-entry TTL
///
/// `get` returns `Ok(None)` for a missing key, distinct from a failed read.
pub trait CacheStore {
    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// # Errors
    ///
    /// Returns `CacheError` if the store cannot be written.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

impl<C: CacheStore + ?Sized> CacheStore for &C {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        (**self).set(key, value, ttl)
    }
}

/// Per-call cache behaviour for `find_one`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Consult and populate the cache
    pub check_cache: bool,
    /// Lifetime of entries written by this call
    pub ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::disabled()
    }
}

impl CacheOptions {
    pub fn disabled() -> Self {
        Self {
            check_cache: false,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn enabled(ttl: Duration) -> Self {
        Self {
            check_cache: true,
            ttl,
        }
    }
}

/// Cache key for a lookup: `table|key1,value1|key2,value2...`
///
/// Keys come from [`ParameterSet`] in sorted order and only first values are
/// used, so the same logical request always maps to the same entry. `|`, `,`
/// and `\` inside keys and values are backslash-escaped so distinct requests
/// never share an entry.
///
/// ```
/// use lifeguard_search::cache::cache_key;
/// use lifeguard_search::query::ParameterSet;
///
/// let params: ParameterSet = [("size", "1"), ("eq__lastname", "two")].into_iter().collect();
/// assert_eq!(cache_key("users", &params), "users|eq__lastname,two|size,1");
/// ```
pub fn cache_key(table: &str, params: &ParameterSet) -> String {
    let mut key = String::from(table);
    for (name, value) in params.iter_first() {
        key.push('|');
        push_escaped(&mut key, name);
        key.push(',');
        push_escaped(&mut key, value);
    }
    key
}

fn push_escaped(key: &mut String, segment: &str) {
    for c in segment.chars() {
        if matches!(c, '|' | ',' | '\\') {
            key.push('\\');
        }
        key.push(c);
    }
}
