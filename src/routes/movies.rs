use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::{CurrentUser, RequestId},
    models::{Category, GenreList, MovieId, MovieOverview, MoviePage},
    routes::AppState,
    services::FeaturedMovie,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    category: Category,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    #[serde(flatten)]
    overview: MovieOverview,
    bookmarked: bool,
}

/// One page of a category listing
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = state
        .discovery
        .page(params.category, params.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

pub async fn featured(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<FeaturedMovie>>> {
    Ok(Json(state.discovery.featured().await?))
}

pub async fn genres(State(state): State<Arc<AppState>>) -> AppResult<Json<GenreList>> {
    Ok(Json(state.discovery.genres().await?))
}

/// Handler for title search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<MoviePage>> {
    Ok(Json(state.discovery.search(&params.q).await?))
}

/// Detail view, with the caller's bookmark state
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<OverviewResponse>> {
    tracing::info!(request_id = %request_id, movie_id = id, "Loading movie overview");

    let overview = state.discovery.overview(id).await?;
    let bookmarked = state.bookmarks.is_bookmarked(current.user(), id).await?;
    Ok(Json(OverviewResponse {
        overview,
        bookmarked,
    }))
}
