use super::{CacheError, CacheStore};
use crate::config::CacheConfig;
use redis::{Client, Connection};
use std::time::Duration;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// [`CacheStore`] backed by Redis
///
/// Opens a connection per call with the configured timeout applied to connect,
/// read and write, so a slow cache degrades to a miss instead of stalling the
/// lookup.
pub struct RedisCache {
    client: Client,
    timeout: Duration,
}

impl RedisCache {
    /// # Errors
    ///
    /// Returns `CacheError::RedisError` if `url` is not a valid Redis URL.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        Ok(Self { client, timeout })
    }

    /// # Errors
    ///
    /// Returns `CacheError::RedisError` if the configured URL is invalid.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::open(&config.url, config.timeout())
    }

    fn connection(&self) -> Result<Connection, CacheError> {
        let con = self.client.get_connection_with_timeout(self.timeout)?;
        con.set_read_timeout(Some(self.timeout))?;
        con.set_write_timeout(Some(self.timeout))?;
        Ok(con)
    }
}

impl CacheStore for RedisCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::cache_span("get", key).entered();

        let mut con = self.connection()?;
        let value = redis::cmd("GET").arg(key).query::<Option<String>>(&mut con)?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::cache_span("set", key).entered();

        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut con = self.connection()?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query::<()>(&mut con)?;
        Ok(())
    }
}
