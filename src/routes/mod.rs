use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    config::Config,
    db::KeyValueStore,
    middleware::{make_span_with_request_id, request_id_middleware, resolve_session},
    services::{AuthProvider, BookmarkRepository, DiscoveryService, FeedSession, MetadataProvider},
};

pub mod auth;
pub mod bookmarks;
pub mod feeds;
pub mod movies;

/// Shared handler state
pub struct AppState {
    pub discovery: DiscoveryService,
    pub auth: Arc<dyn AuthProvider>,
    pub bookmarks: BookmarkRepository,
    pub feeds: RwLock<HashMap<Uuid, Arc<Mutex<FeedSession>>>>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn KeyValueStore>,
        config: &Config,
    ) -> Self {
        Self {
            discovery: DiscoveryService::new(provider, config),
            auth,
            bookmarks: BookmarkRepository::new(store),
            feeds: RwLock::new(HashMap::new()),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(movies::list))
        .route("/movies/featured", get(movies::featured))
        .route("/movies/:id", get(movies::overview))
        .route("/genres", get(movies::genres))
        .route("/search", get(movies::search))
        .route("/feeds", post(feeds::create))
        .route("/feeds/:id", get(feeds::show).delete(feeds::close))
        .route("/feeds/:id/next", post(feeds::next))
        .route("/feeds/:id/reset", post(feeds::reset))
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/login", post(auth::sign_in))
        .route("/auth/logout", post(auth::sign_out))
        .route("/me", get(auth::me))
        .route("/bookmarks", get(bookmarks::list))
        .route("/bookmarks/toggle", post(bookmarks::toggle))
        .route("/bookmarks/:movie_id", get(bookmarks::status))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            resolve_session,
        ))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
