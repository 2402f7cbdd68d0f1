use std::fmt::Display;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{Category, MovieId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    MoviePage {
        category: Category,
        page: u32,
        language: String,
    },
    Search {
        query: String,
        language: String,
    },
    Detail(MovieId, String),
    Credits(MovieId, String),
    Recommendations(MovieId, String),
    Videos(MovieId, String),
    WatchProviders(MovieId),
    ReleaseDates(MovieId),
    Images(MovieId),
    Collection(u64, String),
    Genres(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MoviePage {
                category,
                page,
                language,
            } => write!(f, "page:{}:{}:{}", category, page, language),
            CacheKey::Search { query, language } => {
                write!(f, "search:{}:{}", language, query.trim().to_lowercase())
            }
            CacheKey::Detail(id, language) => write!(f, "detail:{}:{}", id, language),
            CacheKey::Credits(id, language) => write!(f, "credits:{}:{}", id, language),
            CacheKey::Recommendations(id, language) => write!(f, "recs:{}:{}", id, language),
            CacheKey::Videos(id, language) => write!(f, "videos:{}:{}", id, language),
            CacheKey::WatchProviders(id) => write!(f, "providers:{}", id),
            CacheKey::ReleaseDates(id) => write!(f, "releases:{}", id),
            CacheKey::Images(id) => write!(f, "images:{}", id),
            CacheKey::Collection(id, language) => write!(f, "collection:{}:{}", id, language),
            CacheKey::Genres(language) => write!(f, "genres:{}", language),
        }
    }
}

/// Opens a Redis client. Connections are made on first use, so this only
/// validates the URL.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

/// A serialized value waiting for the writer task
struct PendingWrite {
    key: String,
    json: String,
    ttl_secs: u64,
}

/// Read-through cache of provider responses.
///
/// Reads go straight to Redis. Writes are queued to a single writer task so a
/// response never waits on a cache store.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the writer task after flushing queued writes
pub struct CacheWriterHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Spawns the writer task; call from inside a tokio runtime
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (writes, queue) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_writer(redis_client.clone(), queue, shutdown_rx));

        (
            Self {
                redis_client,
                writes,
            },
            CacheWriterHandle { shutdown, task },
        )
    }

    /// Cached value for `key`, `None` on a miss
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key.to_string()).await?;
        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::Internal(format!("cached value for {} is unreadable: {}", key, e)))
        })
        .transpose()
    }

    /// [`Cache::get`] with every failure reported as a miss
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.get(key).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, key = %key, "Cache unavailable, treating as miss");
            None
        })
    }

    /// Queues `value` for storage with a TTL in seconds
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Value not cacheable");
                return;
            }
        };
        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl_secs,
        };
        if self.writes.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, write dropped");
        }
    }
}

/// Owns one managed connection, opened on the first write and reused after
struct Writer {
    client: Client,
    conn: Option<ConnectionManager>,
}

impl Writer {
    async fn store(&mut self, write: PendingWrite) -> AppResult<()> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => ConnectionManager::new(self.client.clone()).await?,
        };
        let conn = self.conn.insert(conn);
        let _: () = conn.set_ex(write.key, write.json, write.ttl_secs).await?;
        Ok(())
    }
}

async fn run_writer(
    client: Client,
    mut queue: mpsc::UnboundedReceiver<PendingWrite>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut writer = Writer { client, conn: None };
    // A dropped handle only disarms shutdown; the task then ends with the last Cache
    let mut shutdown_armed = true;

    loop {
        tokio::select! {
            write = queue.recv() => match write {
                Some(write) => {
                    if let Err(e) = writer.store(write).await {
                        tracing::error!(error = %e, "Cache write failed");
                    }
                }
                None => break,
            },
            signal = &mut shutdown, if shutdown_armed => {
                if signal.is_err() {
                    shutdown_armed = false;
                    continue;
                }
                queue.close();
                let mut flushed = 0usize;
                while let Some(write) = queue.recv().await {
                    match writer.store(write).await {
                        Ok(()) => flushed += 1,
                        Err(e) => tracing::error!(error = %e, "Cache flush failed"),
                    }
                }
                tracing::info!(flushed, "Cache writer drained");
                break;
            }
        }
    }

    tracing::debug!("Cache writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client for a reachable local redis, if any
    async fn local_redis() -> Option<Client> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&url).ok()?;
        client.get_multiplexed_async_connection().await.ok()?;
        Some(client)
    }

    async fn delete(client: &Client, key: &CacheKey) {
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[test]
    fn test_page_key_includes_category_page_and_language() {
        let key = CacheKey::MoviePage {
            category: Category::Week,
            page: 3,
            language: "ko-KR".to_string(),
        };
        assert_eq!(key.to_string(), "page:week:3:ko-KR");
    }

    #[test]
    fn test_search_key_normalizes_query() {
        let key = CacheKey::Search {
            query: "  THE MATRIX ".to_string(),
            language: "ko-KR".to_string(),
        };
        assert_eq!(key.to_string(), "search:ko-KR:the matrix");
    }

    #[test]
    fn test_per_movie_keys() {
        assert_eq!(CacheKey::Detail(603, "ko-KR".to_string()).to_string(), "detail:603:ko-KR");
        assert_eq!(CacheKey::WatchProviders(603).to_string(), "providers:603");
        assert_eq!(
            CacheKey::Collection(2344, "ko-KR".to_string()).to_string(),
            "collection:2344:ko-KR"
        );
    }

    #[test]
    fn test_bad_url_is_rejected() {
        assert!(create_redis_client("not a url").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_redis_reads_as_miss() {
        // Nothing listens on port 1
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        let key = CacheKey::Genres("ko-KR".to_string());
        let hit: Option<Vec<String>> = cache.lookup(&key).await;
        assert_eq!(hit, None);
        assert!(cache.get::<Vec<String>>(&key).await.is_err());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_write_is_readable() {
        let Some(client) = local_redis().await else {
            return;
        };
        let (cache, _handle) = Cache::new(client.clone());
        let key = CacheKey::Search {
            query: "cache write probe".to_string(),
            language: "ko-KR".to_string(),
        };
        let value = vec!["a".to_string(), "b".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(cache.get::<Vec<String>>(&key).await.unwrap(), Some(value));
        delete(&client, &key).await;
    }

    #[tokio::test]
    async fn test_shutdown_flushes_queue() {
        let Some(client) = local_redis().await else {
            return;
        };
        let (cache, handle) = Cache::new(client.clone());
        let key = CacheKey::Genres("shutdown-probe".to_string());
        let value = vec!["flushed".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;

        assert_eq!(cache.get::<Vec<String>>(&key).await.unwrap(), Some(value));
        delete(&client, &key).await;
    }
}
