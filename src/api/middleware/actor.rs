//! Actor resolution middleware.
//!
//! Session issuance lives outside this service; callers identify
//! themselves with an `X-Actor-Id` header carrying their directory UUID.
//! The middleware resolves it to an `Actor` (identity + role) through the
//! identity directory and injects it into request extensions, so every
//! handler works with an explicit actor rather than ambient state.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::Actor;

pub const ACTOR_HEADER: &str = "X-Actor-Id";

pub async fn resolve_actor(
    Extension(ctx): Extension<ApiContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    let id = Uuid::parse_str(header).map_err(|_| ApiError::Unauthorized)?;
    let profile = ctx
        .identity
        .resolve_actor(id)
        .ok_or(ApiError::Unauthorized)?;

    request
        .extensions_mut()
        .insert(Actor::new(profile.id, profile.role));
    Ok(next.run(request).await)
}
