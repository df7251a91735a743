use crate::{auth::authenticate, error::AppError, state::AppState};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    let user_id = authenticate(auth_header, &state.config.jwt_secret)?;

    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

/// Caller identity. Taken from the middleware when it ran, otherwise the
/// bearer token is verified on the spot so public routers can carry
/// individual protected handlers.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user_id) = parts.extensions.get::<Uuid>().copied() {
            return Ok(AuthUser(user_id));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        authenticate(auth_header, &state.config.jwt_secret).map(AuthUser)
    }
}
