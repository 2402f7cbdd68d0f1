use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::KeyValueStore,
    error::{AppError, AppResult},
    models::{Movie, MovieId, User},
};

/// Storage key of one user's bookmark list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkKey(pub Uuid);

impl Display for BookmarkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bookmarkMovieList_{}", self.0)
    }
}

/// Membership after a toggle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BookmarkState {
    pub movie_id: MovieId,
    pub bookmarked: bool,
}

/// Per-user saved movies ("wishlist").
///
/// Each user's list is a JSON array of movie snapshots under its own key and
/// is never read or written through another user's key. Every toggle is a
/// full read-modify-write, serialized per user so concurrent toggles from
/// the same account never overwrite each other.
#[derive(Clone)]
pub struct BookmarkRepository {
    store: Arc<dyn KeyValueStore>,
    writers: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl BookmarkRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            writers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock guarding one user's list
    async fn writer_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        self.writers
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .clone()
    }

    /// The user's bookmarks in insertion order; empty if never written
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Movie>> {
        let key = BookmarkKey(user_id).to_string();
        match self.store.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                tracing::error!(error = %e, user_id = %user_id, "Stored bookmarks are unreadable");
                AppError::Storage(format!("bookmark list for {} is unreadable: {}", user_id, e))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, user_id: Uuid, movies: &[Movie]) -> AppResult<()> {
        let raw = serde_json::to_string(movies)
            .map_err(|e| AppError::Internal(format!("bookmark serialization error: {}", e)))?;
        self.store.set(&BookmarkKey(user_id).to_string(), raw).await
    }

    /// Membership test without mutation; anonymous users have no bookmarks
    pub async fn is_bookmarked(&self, user: Option<&User>, movie_id: MovieId) -> AppResult<bool> {
        match user {
            Some(user) => Ok(self.list(user.id).await?.iter().any(|m| m.id == movie_id)),
            None => Ok(false),
        }
    }

    /// Adds the snapshot if absent, removes it if present.
    ///
    /// Fails with `Unauthenticated` and touches no storage when there is no user.
    pub async fn toggle(&self, movie: Movie, user: Option<&User>) -> AppResult<BookmarkState> {
        let user = user.ok_or(AppError::Unauthenticated)?;

        let lock = self.writer_lock(user.id).await;
        let _guard = lock.lock().await;

        let mut movies = self.list(user.id).await?;
        let movie_id = movie.id;
        let bookmarked = if movies.iter().any(|m| m.id == movie_id) {
            movies.retain(|m| m.id != movie_id);
            false
        } else {
            movies.push(movie);
            true
        };
        self.save(user.id, &movies).await?;

        tracing::info!(
            user_id = %user.id,
            movie_id,
            bookmarked,
            store = self.store.name(),
            "Bookmark toggled"
        );

        Ok(BookmarkState {
            movie_id,
            bookmarked,
        })
    }
}
