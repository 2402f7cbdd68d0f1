use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::Category,
    routes::AppState,
    services::{advance, FeedOutcome, FeedSession, FeedTrigger, FeedView},
};

#[derive(Debug, Default, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Deserialize)]
pub struct ViewportSignal {
    pub visible: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenreFilter {
    pub genre: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub id: Uuid,
    /// False when the trigger was ignored because a page was already loading
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub view: FeedView,
}

impl FeedResponse {
    async fn build(
        id: Uuid,
        session: &Mutex<FeedSession>,
        outcome: Option<FeedOutcome>,
        genre: Option<u32>,
    ) -> Self {
        let (accepted, error) = match outcome {
            Some(FeedOutcome::Failed { error, .. }) => (true, Some(error.to_string())),
            Some(outcome) => (outcome.accepted(), None),
            None => (true, None),
        };
        Self {
            id,
            accepted,
            error,
            view: session.lock().await.view(genre),
        }
    }
}

async fn find(state: &AppState, id: Uuid) -> AppResult<Arc<Mutex<FeedSession>>> {
    state
        .feeds
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("feed {}", id)))
}

/// Opens a feed and loads its first page
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    request: Option<Json<CategoryRequest>>,
) -> AppResult<(StatusCode, Json<FeedResponse>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let id = Uuid::new_v4();
    let session = Arc::new(Mutex::new(FeedSession::new(
        request.category,
        state.discovery.language(),
    )));
    state.feeds.write().await.insert(id, session.clone());

    tracing::info!(request_id = %request_id, feed_id = %id, category = %request.category, "Feed opened");

    let outcome = advance(&session, state.discovery.provider().as_ref(), FeedTrigger::Current).await;
    let response = FeedResponse::build(id, &session, Some(outcome), None).await;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(filter): Query<GenreFilter>,
) -> AppResult<Json<FeedResponse>> {
    let session = find(&state, id).await?;
    Ok(Json(FeedResponse::build(id, &session, None, filter.genre).await))
}

/// Sentinel visibility report
pub async fn next(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(filter): Query<GenreFilter>,
    Json(signal): Json<ViewportSignal>,
) -> AppResult<Json<FeedResponse>> {
    let session = find(&state, id).await?;
    let outcome = advance(
        &session,
        state.discovery.provider().as_ref(),
        FeedTrigger::Viewport(signal.visible),
    )
    .await;
    Ok(Json(
        FeedResponse::build(id, &session, Some(outcome), filter.genre).await,
    ))
}

/// Category change: starts over from page 1
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> AppResult<Json<FeedResponse>> {
    let session = find(&state, id).await?;
    session.lock().await.reset(request.category);
    let outcome = advance(&session, state.discovery.provider().as_ref(), FeedTrigger::Current).await;
    Ok(Json(FeedResponse::build(id, &session, Some(outcome), None).await))
}

/// Tears the feed down when its view goes away
pub async fn close(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .feeds
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("feed {}", id)))?;
    tracing::info!(request_id = %request_id, feed_id = %id, "Feed closed");
    Ok(StatusCode::NO_CONTENT)
}
