use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::{CurrentUser, RequestId},
    models::{Movie, MovieId},
    routes::AppState,
    services::BookmarkState,
};

/// The caller's saved movies
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Movie>>> {
    let user = current.require()?;
    Ok(Json(state.bookmarks.list(user.id).await?))
}

/// Membership check; always false for anonymous callers
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<BookmarkState>> {
    let bookmarked = state.bookmarks.is_bookmarked(current.user(), movie_id).await?;
    Ok(Json(BookmarkState {
        movie_id,
        bookmarked,
    }))
}

/// Adds or removes the posted movie snapshot
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(current): Extension<CurrentUser>,
    Json(movie): Json<Movie>,
) -> AppResult<Json<BookmarkState>> {
    tracing::info!(request_id = %request_id, movie_id = movie.id, "Toggling bookmark");
    Ok(Json(state.bookmarks.toggle(movie, current.user()).await?))
}
