use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::User,
    services::AuthProvider,
};

/// Who is calling, resolved once per request from the bearer token
#[derive(Clone, Debug, Default)]
pub struct CurrentUser {
    pub token: Option<Uuid>,
    pub user: Option<User>,
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The signed-in user, or `Unauthenticated`
    pub fn require(&self) -> AppResult<&User> {
        self.user.as_ref().ok_or(AppError::Unauthenticated)
    }
}

fn bearer_token(request: &Request) -> Option<Uuid> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

/// Inserts a [`CurrentUser`] into request extensions.
///
/// Missing, malformed and expired tokens all resolve to an anonymous caller;
/// handlers that need a user reject with 401 themselves.
pub async fn resolve_session(
    State(auth): State<Arc<dyn AuthProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&request);
    let user = match token {
        Some(token) => auth.current_user(token).await,
        None => None,
    };
    request.extensions_mut().insert(CurrentUser { token, user });
    next.run(request).await
}
