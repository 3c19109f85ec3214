//! Error types.
//!
//! Two families live here:
//!
//! - [`RouteError`]: registration-time failures (name parsing, config loading,
//!   route file generation). These never reach an HTTP client.
//! - [`ApiError`]: request-time failures returned by handlers and middleware.
//!   The dispatcher renders them as `{"message", "status", "code"?, "details"?}`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::context::{HandlerResponse, ResponseBody};

/// Failures raised while building the routing surface.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("`{identifier}` is not a handler: identifiers must start with `Handle`")]
    NotAHandler { identifier: String },

    #[error("unsupported HTTP method `{method}`")]
    UnsupportedMethod { method: String },

    #[error("invalid route path `{path}`")]
    InvalidPath { path: String },

    #[error("failed to load config from {path}: {message}")]
    Config { path: String, message: String },

    #[error("failed to render route listing: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Category of a request-time error. Each maps to exactly one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Timeout,
    Conflict,
    ValidationFailure,
    TooManyRequests,
    HandlerFault,
    Unavailable,
    Custom(u16),
}

impl ErrorKind {
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::Timeout => 408,
            ErrorKind::Conflict => 409,
            ErrorKind::ValidationFailure => 422,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::HandlerFault => 500,
            ErrorKind::Unavailable => 503,
            ErrorKind::Custom(status) => status,
        }
    }

    /// Machine-readable code carried in the `code` field of the error body.
    pub fn code(self) -> Option<&'static str> {
        match self {
            ErrorKind::BadRequest => Some("BAD_REQUEST"),
            ErrorKind::Unauthorized => Some("UNAUTHORIZED"),
            ErrorKind::Forbidden => Some("FORBIDDEN"),
            ErrorKind::NotFound => Some("NOT_FOUND"),
            ErrorKind::MethodNotAllowed => Some("METHOD_NOT_ALLOWED"),
            ErrorKind::Timeout => Some("REQUEST_TIMEOUT"),
            ErrorKind::Conflict => Some("CONFLICT"),
            ErrorKind::ValidationFailure => Some("VALIDATION_ERROR"),
            ErrorKind::TooManyRequests => Some("RATE_LIMITED"),
            ErrorKind::HandlerFault => Some("INTERNAL_ERROR"),
            ErrorKind::Unavailable => Some("SERVICE_UNAVAILABLE"),
            ErrorKind::Custom(_) => None,
        }
    }
}

/// One failing field of a validated input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A request-time error with a status, message and optional field details.
#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    details: BTreeMap<String, String>,
    headers: Vec<(String, String)>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    details: &'a BTreeMap<String, String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: kind.code().map(str::to_string),
            details: BTreeMap::new(),
            headers: Vec::new(),
            source: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailure, message)
    }

    /// 422 carrying one detail entry per failing field.
    pub fn validation_failed(fields: impl IntoIterator<Item = FieldError>) -> Self {
        Self::validation("Validation failed")
            .with_details(fields.into_iter().map(|f| (f.field, f.message)))
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerFault, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Error with an arbitrary status code. Codes outside 400..=599 fall back to 500.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        let status = if (400..=599).contains(&status) {
            status
        } else {
            500
        };
        Self::new(ErrorKind::Custom(status), message)
    }

    /// Fallback for anything that is not already an [`ApiError`]: a 500
    /// carrying the error's message and keeping it as the source.
    pub fn from_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::internal(err.to_string()).with_source(err)
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.details.insert(field.into(), message.into());
        self
    }

    pub fn with_details<I, K, V>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.details
            .extend(details.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Extra response header sent with the rendered error (e.g. `Retry-After`).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(ErrorBody {
            message: &self.message,
            status: self.status(),
            code: self.code.as_deref(),
            details: &self.details,
        })
        .unwrap_or_else(|_| json!({ "message": self.message, "status": self.status() }))
    }

    /// Render into a JSON response.
    pub fn into_response(self) -> HandlerResponse {
        let mut response = HandlerResponse::new(self.status());
        for (name, value) in &self.headers {
            response.set_header(name, value.clone());
        }
        response.body = ResponseBody::Json(self.to_json());
        response
    }

    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status())
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Error")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for ApiError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.message == other.message
            && self.code == other.code
            && self.details == other.details
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request("Invalid request body")
            .with_detail("body", err.to_string())
            .with_source(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => ApiError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::not_found("x").status(), 404);
        assert_eq!(ApiError::timeout("x").status(), 408);
        assert_eq!(ApiError::validation("x").status(), 422);
        assert_eq!(ApiError::with_status(418, "teapot").status(), 418);
        assert_eq!(ApiError::with_status(200, "not an error").status(), 500);
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::validation("Validation failed")
            .with_detail("email", "The email must be a valid email address");
        let body = err.to_json();
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["status"], 422);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["email"], "The email must be a valid email address");
    }

    #[test]
    fn test_custom_error_omits_code_and_details() {
        let body = ApiError::with_status(418, "teapot").to_json();
        assert!(body.get("code").is_none());
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_from_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = ApiError::from_error(io);
        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "disk on fire");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_failed_collects_fields() {
        let err = ApiError::validation_failed(vec![
            FieldError::new("email", "The email must be a valid email address"),
            FieldError::new("name", "The name field is required"),
        ]);
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        assert_eq!(err.details().len(), 2);
    }

    #[test]
    fn test_anyhow_downcast_keeps_api_error() {
        let err: anyhow::Error = ApiError::forbidden("nope").into();
        assert_eq!(ApiError::from(err).status(), 403);

        let other = anyhow::anyhow!("boom");
        let api = ApiError::from(other);
        assert_eq!(api.status(), 500);
        assert_eq!(api.message(), "boom");
    }
}
