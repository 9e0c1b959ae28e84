/*!
    Redis-backed queue store.
*/

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use redis::{Client, Connection, IntoConnectionInfo};

use super::BlobQueue;
use crate::config::RedisConfig;
use crate::error::QueueError;

/// Idle connections older than this are pinged before reuse.
const TEST_ON_BORROW_AFTER: Duration = Duration::from_secs(60);

struct IdleConnection {
    conn: Connection,
    returned_at: Instant,
}

/**
    Queue store on Redis lists: `RPUSH` to append, `LRANGE 0 -1` to read.

    Keeps up to `max_idle` connections for reuse between calls, caps
    concurrently checked-out connections at `max_active` (0 = no cap) and
    closes connections that sat idle longer than `idle_timeout`.
*/
pub struct RedisQueue {
    client: Client,
    max_idle: usize,
    max_active: usize,
    idle_timeout: Option<Duration>,
    idle: Mutex<Vec<IdleConnection>>,
    active: AtomicUsize,
}

impl RedisQueue {
    /**
        Build the client. No connection is made until the first call.
    */
    pub fn new(config: &RedisConfig) -> Result<Self, QueueError> {
        let mut info = format!("redis://{}/", config.host).into_connection_info()?;
        info.redis.db = config.db;
        if !config.password.is_empty() {
            info.redis.password = Some(config.password.clone());
        }

        Ok(Self {
            client: Client::open(info)?,
            max_idle: config.max_idle,
            max_active: config.max_active,
            idle_timeout: config.idle_timeout(),
            idle: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn checkout(&self) -> Result<Connection, QueueError> {
        loop {
            let candidate = self.idle.lock().map_err(|_| QueueError::Poisoned)?.pop();
            let Some(mut idle) = candidate else { break };

            let age = idle.returned_at.elapsed();
            if self.idle_timeout.is_some_and(|limit| age > limit) {
                continue;
            }
            if age > TEST_ON_BORROW_AFTER
                && redis::cmd("PING").query::<String>(&mut idle.conn).is_err()
            {
                tracing::debug!("dropping stale redis connection");
                continue;
            }
            return Ok(idle.conn);
        }

        Ok(self.client.get_connection()?)
    }

    fn checkin(&self, conn: Connection) {
        let Ok(mut idle) = self.idle.lock() else {
            return;
        };
        if idle.len() < self.max_idle {
            idle.push(IdleConnection {
                conn,
                returned_at: Instant::now(),
            });
        }
    }

    /**
        Run `f` on a pooled connection. Connections that fail a command are
        closed instead of returned to the pool.
    */
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> Result<T, QueueError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _slot = ActiveSlot(&self.active);
        if self.max_active > 0 && active > self.max_active {
            return Err(QueueError::PoolExhausted(self.max_active));
        }

        let mut conn = self.checkout()?;
        let result = f(&mut conn)?;
        self.checkin(conn);
        Ok(result)
    }
}

/// Releases an active-connection slot when dropped.
struct ActiveSlot<'a>(&'a AtomicUsize);

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BlobQueue for RedisQueue {
    fn push(&self, key: &str, bytes: &[u8]) -> Result<(), QueueError> {
        self.with_connection(|conn| redis::cmd("RPUSH").arg(key).arg(bytes).query::<i64>(conn))?;
        Ok(())
    }

    fn get_all(&self, key: &str) -> Result<Vec<Vec<u8>>, QueueError> {
        self.with_connection(|conn| {
            redis::cmd("LRANGE")
                .arg(key)
                .arg(0)
                .arg(-1)
                .query::<Vec<Vec<u8>>>(conn)
        })
    }
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("addr", &self.client.get_connection_info().addr)
            .field("db", &self.client.get_connection_info().redis.db)
            .field("max_idle", &self.max_idle)
            .field("max_active", &self.max_active)
            .finish_non_exhaustive()
    }
}
