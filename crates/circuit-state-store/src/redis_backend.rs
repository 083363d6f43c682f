//! Redis backend
//!
//! Wraps an async Redis connection owned by the caller. The handle is cloned
//! per call, which is cheap for `ConnectionManager` and
//! `MultiplexedConnection`. Conditional writes use `SET ... NX|XX EX` so the
//! check and the write are one atomic command on the server.

use crate::backend::{KeyTtl, KvBackend};
use crate::error::Result;
use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::AsyncCommands;
use tracing::trace;

/// Redis-backed key-value primitives
#[derive(Clone)]
pub struct RedisBackend<C = ConnectionManager> {
    conn: C,
}

impl<C> RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Access the underlying connection handle
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// `SET key value [NX|XX] EX ttl`. Returns whether the server applied it.
    async fn set_with_condition(
        &self,
        key: &str,
        value: &str,
        condition: Option<&'static str>,
        ttl_secs: u64,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(condition) = condition {
            cmd.arg(condition);
        }
        cmd.arg("EX").arg(ttl_secs);

        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        trace!("SET {} {:?} EX {} -> {:?}", key, condition, ttl_secs, reply);
        Ok(reply.is_some())
    }
}

#[async_trait]
impl<C> KvBackend for RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.set_with_condition(key, value, None, ttl_secs).await?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        self.set_with_condition(key, value, Some("NX"), ttl_secs).await
    }

    async fn set_xx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        self.set_with_condition(key, value, Some("XX"), ttl_secs).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1i64).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.conn.clone();
        let ttl: i64 = conn.ttl(key).await?;
        // -2: no such key, -1: no expiry
        Ok(match ttl {
            -2 => KeyTtl::Missing,
            t if t < 0 => KeyTtl::Persistent,
            t => KeyTtl::Expires(t as u64),
        })
    }
}
