mod routes;

pub use routes::create_router;

use crate::session::Session;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use drafter_core::DraftError;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    /// Held for the whole of every write so model-driven runs and edits never
    /// interleave.
    pub write_lock: Arc<Mutex<()>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            write_lock: Arc::new(Mutex::new(())),
            start_time: std::time::Instant::now(),
        }
    }
}

/// JSON response wrapper
#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Error type for HTTP handlers. Drafting errors map to client or upstream
/// status codes; everything else is a 500.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!(msg.into()),
        }
    }
}

fn status_for(error: &anyhow::Error) -> StatusCode {
    let Some(draft) = error.downcast_ref::<DraftError>() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    match draft {
        DraftError::UnknownKey(_) => StatusCode::NOT_FOUND,
        DraftError::InvalidVersionIndex { .. }
        | DraftError::Validation(_)
        | DraftError::MissingBinding(_) => StatusCode::BAD_REQUEST,
        DraftError::UnresolvedDependency { .. } => StatusCode::CONFLICT,
        DraftError::EmptyAssembledSection(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DraftError::MalformedStructuredOutput { .. }
        | DraftError::UnrecognizedShape { .. }
        | DraftError::ModelInvocation { .. } => StatusCode::BAD_GATEWAY,
        DraftError::ModelTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{:#}", self.error);
        }
        (
            self.status,
            Json(JsonResponse::<()>::err(format!("{:#}", self.error))),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        Self {
            status: status_for(&error),
            error,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unknown: AppError = DraftError::UnknownKey("nope".into()).into();
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);

        let timeout: AppError = DraftError::ModelTimeout {
            key: "tech_field".into(),
            seconds: 1,
        }
        .into();
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);

        let other: AppError = anyhow::anyhow!("disk full").into();
        assert_eq!(other.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::bad_request("x").status, StatusCode::BAD_REQUEST);
    }
}
