//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::CoordinationError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<String>>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Actor identity required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, violations) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "ACTOR_REQUIRED",
                "A resolvable X-Actor-Id header is required".to_string(),
                None,
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail, None),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION",
                violations.join("; "),
                Some(violations),
            ),
            ApiError::InvalidTransition(detail) => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION", detail, None)
            }
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail, None),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                violations,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoordinationError> for ApiError {
    fn from(err: CoordinationError) -> Self {
        match err {
            CoordinationError::Validation(violations) => ApiError::Validation(violations),
            CoordinationError::NotFound(detail) => ApiError::NotFound(detail),
            CoordinationError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            CoordinationError::InvalidTransition { .. } => {
                ApiError::InvalidTransition(err.to_string())
            }
            CoordinationError::Conflict(id) => ApiError::Conflict(format!(
                "emergency {id} was modified concurrently, retry the request"
            )),
            CoordinationError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{ActorRole, EmergencyStatus};
    use axum::body::to_bytes;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "ACTOR_REQUIRED");
    }

    #[tokio::test]
    async fn validation_returns_400_with_all_violations() {
        let response = ApiError::Validation(vec![
            "description is required".into(),
            "latitude must be between -90 and 90".into(),
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION");
        assert_eq!(json["error"]["violations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_transition_returns_409() {
        let err: ApiError = CoordinationError::InvalidTransition {
            from: EmergencyStatus::Completed,
            to: EmergencyStatus::EnRoute,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INVALID_TRANSITION");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("completed"));
    }

    #[tokio::test]
    async fn conflict_returns_409_with_conflict_code() {
        let err: ApiError = CoordinationError::Conflict("EMG-1-AAAAA".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn forbidden_maps_from_domain_error() {
        let actor = crate::models::Actor::new(Uuid::nil(), ActorRole::Patient);
        let err: ApiError =
            CoordinationError::forbidden(&actor, "assign an ambulance").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("emergency EMG-1-AAAAA".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("lock poisoned".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }
}
