//! HTTP router for the coordination API.
//!
//! Emergency routes sit behind the actor-resolution middleware; the
//! health check and the WebSocket feeds are open (subscribing to events
//! requires no role, matching the operations' own authorization model).

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::api::websocket;

/// Build the coordination API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost
/// layer); endpoint handlers use `State<ApiContext>`.
pub fn api_router(ctx: ApiContext) -> Router {
    // Protected routes: require a resolvable X-Actor-Id.
    let protected = Router::new()
        .route("/emergency", post(endpoints::emergency::create))
        .route("/emergency/active", get(endpoints::emergency::active))
        .route(
            "/emergency/patient/:patient_id",
            get(endpoints::emergency::patient_history),
        )
        .route(
            "/emergency/:id",
            get(endpoints::emergency::detail).delete(endpoints::emergency::cancel),
        )
        .route(
            "/emergency/:id/status",
            put(endpoints::emergency::update_status),
        )
        .route(
            "/emergency/:id/assign-ambulance",
            put(endpoints::emergency::assign_ambulance),
        )
        .route(
            "/emergency/:id/assign-hospital",
            put(endpoints::emergency::assign_hospital),
        )
        .route(
            "/emergency/:id/location",
            put(endpoints::emergency::update_location),
        )
        .route(
            "/emergency/:id/chat",
            post(endpoints::emergency::post_chat).get(endpoints::emergency::chat_history),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::actor::resolve_actor))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected: liveness only.
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone());

    // WebSocket subscriptions.
    let ws_routes = Router::new()
        .route("/ws/feed", get(websocket::feed_upgrade))
        .route("/ws/emergency/:id", get(websocket::scope_upgrade))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}
