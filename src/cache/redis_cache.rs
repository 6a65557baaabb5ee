use std::time::Duration;

use rand::Rng;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

const TTL_JITTER_RATIO: f64 = 0.1;

fn tag_set_key(tag: &str) -> String {
    format!("tag:{}", tag)
}

/// Redis-backed cache. Tag membership lives in `tag:<name>` sets so a tag
/// can be revalidated from any process sharing the instance.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { connection })
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.connection.clone();
        conn.get(key).await
    }

    pub async fn set_raw(
        &self,
        key: &str,
        payload: String,
        ttl: Duration,
        tags: &[String],
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.connection.clone();
        let ttl_secs = apply_ttl_jitter(ttl).as_secs().max(1);
        let _: () = conn.set_ex(key, payload, ttl_secs).await?;

        for tag in tags {
            let set_key = tag_set_key(tag);
            let _: () = conn.sadd(&set_key, key).await?;
            // Tag sets outlive their members.
            let _: () = conn.expire(&set_key, (ttl_secs * 2) as i64).await?;
        }
        Ok(())
    }

    pub async fn invalidate_tag(&self, tag: &str) -> Result<usize, redis::RedisError> {
        let mut conn = self.connection.clone();
        let set_key = tag_set_key(tag);
        let members: Vec<String> = conn.smembers(&set_key).await?;
        if !members.is_empty() {
            let _: () = conn.del(&members).await?;
        }
        let _: () = conn.del(&set_key).await?;
        Ok(members.len())
    }

    pub async fn is_connected(&self) -> bool {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

fn apply_ttl_jitter(ttl: Duration) -> Duration {
    let base_ms = ttl.as_millis() as f64;
    let mut rng = rand::rng();
    let factor = rng.random_range(1.0 - TTL_JITTER_RATIO..=1.0 + TTL_JITTER_RATIO);
    let jittered_ms = (base_ms * factor).round().max(1.0);
    Duration::from_millis(jittered_ms as u64)
}
