//! Uniform JSON error envelope for every failing API response.
//!
//! Handlers return `Result<_, ApiError>`. The response carries the
//! envelope without the request path; the outermost `error_envelope`
//! middleware rewrites the body with the path filled in.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

/// Machine-readable error parts, stashed in response extensions so the
/// envelope middleware can rebuild the body with the request path.
#[derive(Debug, Clone)]
pub struct ErrorParts {
    pub code: String,
    pub message: String,
}

/// An API failure with its HTTP status and machine-readable code.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request".into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthorized".into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found".into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code: "conflict".into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "rate_limited".into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".into(),
            message: message.into(),
        }
    }

    /// Override the machine-readable code.
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = code.to_string();
        self
    }
}

/// Build the envelope body for a status + parts + path.
pub fn envelope(status: StatusCode, parts: &ErrorParts, path: &str) -> serde_json::Value {
    serde_json::json!({
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": parts.message,
        "code": parts.code,
        "timestamp": Utc::now().to_rfc3339(),
        "path": path,
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let parts = ErrorParts {
            code: self.code,
            message: self.message,
        };
        let body = envelope(self.status, &parts, "");
        let mut resp = (self.status, Json(body)).into_response();
        resp.extensions_mut().insert(parts);
        resp
    }
}

impl From<String> for ApiError {
    fn from(e: String) -> Self {
        ApiError::internal(e)
    }
}

impl From<stillontime_core::StillOnTimeError> for ApiError {
    fn from(e: stillontime_core::StillOnTimeError) -> Self {
        use stillontime_core::StillOnTimeError as E;
        match &e {
            E::Validation(m) => ApiError::bad_request(m.clone()).with_code("validation"),
            E::NotFound(m) => ApiError::not_found(m.clone()),
            E::Weather(m) => ApiError::internal(m.clone()).with_code("weather"),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let parts = ErrorParts {
            code: "not_found".into(),
            message: "Schedule s1 not found".into(),
        };
        let body = envelope(StatusCode::NOT_FOUND, &parts, "/api/v1/schedules/s1");
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["code"], "not_found");
        assert_eq!(body["path"], "/api/v1/schedules/s1");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_error_mapping() {
        let e: ApiError =
            stillontime_core::StillOnTimeError::Validation("bad call time".into()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.code, "validation");

        let e: ApiError = String::from("DB open: boom").into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
