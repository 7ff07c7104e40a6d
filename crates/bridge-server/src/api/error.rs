//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge_core::{BridgeError, ErrorKind};
use serde::Serialize;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorKind,
    pub message: String,
}

/// Wrapper that renders a [`BridgeError`] as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        ApiError(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NotReady
        | ErrorKind::NotConnected
        | ErrorKind::UnsupportedPlatform
        | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::CollaboratorTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::LaunchFailure | ErrorKind::Driver | ErrorKind::Io | ErrorKind::Other => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            success: false,
            error: kind,
            message: self.0.to_string(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::NotReady), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotConnected), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorKind::LaunchFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::CollaboratorTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn response_carries_kind() {
        let response = ApiError(BridgeError::NotFound("tg-1".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
