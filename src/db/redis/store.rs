use redis::AsyncCommands;
use redis::Client;

use crate::db::store::KeyValueStore;
use crate::error::AppResult;

/// Redis-backed durable store. Keys are stored verbatim and never expire.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client for a reachable local redis, if any
    async fn local_redis() -> Option<Client> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = Client::open(url).ok()?;
        client.get_multiplexed_async_connection().await.ok()?;
        Some(client)
    }

    #[tokio::test]
    async fn test_keys_are_stored_verbatim() {
        let Some(client) = local_redis().await else {
            return;
        };
        let store = RedisStore::new(client.clone());
        let key = "bookmarkMovieList_00000000-0000-0000-0000-00000000beef";

        store.set(key, "[1,2,3]".to_string()).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), Some("[1,2,3]".to_string()));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let raw: Option<String> = conn.get(key).await.unwrap();
        assert_eq!(raw, Some("[1,2,3]".to_string()));
        let _: () = conn.del(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_a_cache_error() {
        // Nothing listens on port 1
        let store = RedisStore::new(Client::open("redis://127.0.0.1:1").unwrap());
        assert!(matches!(
            store.get("bookmarkMovieList_x").await,
            Err(crate::error::AppError::Cache(_))
        ));
    }
}
