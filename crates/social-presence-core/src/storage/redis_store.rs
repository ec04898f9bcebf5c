//! Redis status store
//!
//! Each user has two keys:
//!
//! - `user:status:{id}` holds the JSON-encoded [`PresenceRecord`] with a
//!   `PX` TTL equal to the status TTL
//! - `user:last_status:{id}` holds the bare status name with `ttl + grace`
//!
//! Both keys are written in one `MULTI`/`EXEC` transaction. Refreshing a TTL
//! runs as a Lua script so that the primary check, its `PEXPIRE` and the
//! shadow extension cannot interleave with another client's write.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisError, Script};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::config::StoreConfig;
use crate::storage::StatusStore;
use crate::types::{PresenceRecord, Status, StoreError, UserId};

/// Prefix of the primary record key
pub const PRIMARY_KEY_PREFIX: &str = "user:status:";

/// Prefix of the shadow record key
pub const SHADOW_KEY_PREFIX: &str = "user:last_status:";

/// KEYS[1] primary, KEYS[2] shadow; ARGV[1] primary TTL ms, ARGV[2] shadow TTL ms
const REFRESH_SCRIPT: &str = r#"
if redis.call('PEXPIRE', KEYS[1], ARGV[1]) == 0 then
  return 0
end
local record = cjson.decode(redis.call('GET', KEYS[1]))
local shadow_ttl = tonumber(ARGV[2])
local remaining = redis.call('PTTL', KEYS[2])
if remaining > shadow_ttl then
  shadow_ttl = remaining
end
redis.call('SET', KEYS[2], record['status'], 'PX', shadow_ttl)
return 1
"#;

/// Primary record key for a user
pub fn primary_key(user_id: &UserId) -> String {
    format!("{}{}", PRIMARY_KEY_PREFIX, user_id)
}

/// Shadow record key for a user
pub fn shadow_key(user_id: &UserId) -> String {
    format!("{}{}", SHADOW_KEY_PREFIX, user_id)
}

/// Redis implementation of [`StatusStore`]
pub struct RedisStatusStore {
    /// Auto-reconnecting multiplexed connection
    conn: ConnectionManager,

    /// Extra lifetime of the shadow record over the primary
    grace: Duration,

    refresh: Script,
}

impl RedisStatusStore {
    /// Connect to the server at `url`
    pub async fn connect(url: &str, grace: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(redis_error)?;
        let conn = ConnectionManager::new(client).await.map_err(redis_error)?;
        info!("Connected to Redis status store");
        Ok(Self {
            conn,
            grace,
            refresh: Script::new(REFRESH_SCRIPT),
        })
    }

    /// Connect using the store section of the configuration
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::connect(&config.url, config.shadow_grace).await
    }

    /// Shadow grace window
    pub fn grace(&self) -> Duration {
        self.grace
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn write_pair(&self, user_id: &UserId, status: Status, ttl: Duration) -> Result<(), StoreError> {
        if !status.is_settable() {
            return Err(StoreError::rejected(format!(
                "refusing to persist status '{}'",
                status
            )));
        }

        let record = encode_record(&PresenceRecord::new(user_id.clone(), status))?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(primary_key(user_id))
            .arg(record)
            .arg("PX")
            .arg(millis(ttl))
            .ignore()
            .cmd("SET")
            .arg(shadow_key(user_id))
            .arg(status.as_str())
            .arg("PX")
            .arg(millis(ttl + self.grace))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn read_primary(&self, user_id: &UserId) -> Result<Option<PresenceRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(primary_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        raw.as_deref().map(decode_record).transpose()
    }

    async fn read_shadow(&self, user_id: &UserId) -> Result<Option<Status>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(shadow_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        raw.as_deref()
            .map(|s| {
                s.parse::<Status>()
                    .map_err(|e| StoreError::unavailable(format!("corrupt shadow record: {}", e)))
            })
            .transpose()
    }

    async fn read_primary_batch(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Option<Status>>, StoreError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = user_ids.iter().map(primary_key).collect();
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;

        // MGET answers positionally.
        let mut statuses = HashMap::with_capacity(user_ids.len());
        for (user_id, raw) in user_ids.iter().zip(values) {
            let status = raw
                .as_deref()
                .map(decode_record)
                .transpose()?
                .map(|record| record.status);
            statuses.insert(user_id.clone(), status);
        }
        Ok(statuses)
    }

    async fn refresh_ttl(&self, user_id: &UserId, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let refreshed: i64 = self
            .refresh
            .key(primary_key(user_id))
            .key(shadow_key(user_id))
            .arg(millis(ttl))
            .arg(millis(ttl + self.grace))
            .invoke_async(&mut conn)
            .await
            .map_err(redis_error)?;
        debug!(user_id = %user_id, refreshed, "Refreshed primary TTL");
        Ok(refreshed == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(())
    }
}

fn redis_error(err: RedisError) -> StoreError {
    StoreError::unavailable(format!("redis: {}", err))
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn encode_record(record: &PresenceRecord) -> Result<String, StoreError> {
    serde_json::to_string(record)
        .map_err(|e| StoreError::unavailable(format!("failed to encode record: {}", e)))
}

fn decode_record(raw: &str) -> Result<PresenceRecord, StoreError> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::unavailable(format!("corrupt primary record: {}", e)))
}
