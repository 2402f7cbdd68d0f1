use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Credentials, Session, SignUpForm, User},
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub username: String,
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SignUpForm>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.auth.sign_up(form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<Session>> {
    Ok(Json(state.auth.sign_in(credentials).await?))
}

/// Ends the caller's session; anonymous callers get 401
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<StatusCode> {
    current.require()?;
    if let Some(token) = current.token {
        state.auth.sign_out(token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> AppResult<Json<ProfileResponse>> {
    let user = current.require()?;
    Ok(Json(ProfileResponse {
        username: user.username().to_string(),
        user: user.clone(),
    }))
}
