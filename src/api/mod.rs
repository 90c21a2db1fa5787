//! HTTP + WebSocket surface for the coordination engine.
//!
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server. Emergency routes require an
//! `X-Actor-Id` header resolved through the identity directory; the
//! WebSocket feeds mirror the fan-out broker's global and per-emergency
//! scopes.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;
pub mod websocket;

pub use router::api_router;
pub use types::ApiContext;
