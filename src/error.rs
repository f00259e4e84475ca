use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::alerts::{iso_timestamp, ErrorData, Level};

/// Why an upstream call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamReason {
    /// The ticker service answered with a non-success status.
    Upstream,
    /// The request never produced a response.
    Network,
    Timeout,
}

impl UpstreamReason {
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamReason::Upstream => "upstream",
            UpstreamReason::Network => "network",
            UpstreamReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for UpstreamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Upstream { reason: UpstreamReason, message: String },

    #[error("{0}")]
    Arithmetic(String),

    #[error("{0}")]
    Startup(String),

    #[error("{0}")]
    Internal(String),
}

pub type AlertResult<T> = Result<T, AlertError>;

impl AlertError {
    pub fn upstream(message: impl Into<String>) -> Self {
        AlertError::Upstream { reason: UpstreamReason::Upstream, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        AlertError::Upstream { reason: UpstreamReason::Network, message: message.into() }
    }

    /// Reason tag carried in the `data.reason` field of error bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            AlertError::InvalidRequest(_) => "invalidRequest",
            AlertError::Upstream { reason, .. } => reason.label(),
            AlertError::Arithmetic(_) => "arithmeticError",
            AlertError::Startup(_) => "startupError",
            AlertError::Internal(_) => "unknownErrorReason",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AlertError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_data(&self) -> ErrorData {
        ErrorData::new(self.reason(), self.to_string())
    }
}

impl From<reqwest::Error> for AlertError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AlertError::Upstream { reason: UpstreamReason::Timeout, message: e.to_string() }
        } else if e.is_decode() {
            AlertError::upstream(format!("malformed upstream payload: {e}"))
        } else {
            AlertError::network(e.to_string())
        }
    }
}

/// Request-level error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub timestamp: String,
    pub level: Level,
    pub data: ErrorData,
}

impl From<&AlertError> for ErrorBody {
    fn from(e: &AlertError) -> Self {
        Self { timestamp: iso_timestamp(), level: Level::Error, data: e.to_data() }
    }
}

impl IntoResponse for AlertError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_maps_to_400() {
        let e = AlertError::InvalidRequest("Request method must be GET".into());
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.reason(), "invalidRequest");
    }

    #[test]
    fn other_kinds_default_to_500() {
        for e in [
            AlertError::upstream("InvalidSymbol"),
            AlertError::Arithmetic("nan".into()),
            AlertError::Startup("no symbols".into()),
            AlertError::Internal("boom".into()),
        ] {
            assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{e:?}");
        }
    }

    #[test]
    fn upstream_reason_labels() {
        assert_eq!(AlertError::upstream("x").reason(), "upstream");
        assert_eq!(AlertError::network("x").reason(), "network");
        let timeout = AlertError::Upstream { reason: UpstreamReason::Timeout, message: "slow".into() };
        assert_eq!(timeout.reason(), "timeout");
        assert_eq!(timeout.to_string(), "slow");
    }

    #[test]
    fn error_body_shape() {
        let body = ErrorBody::from(&AlertError::InvalidRequest("bad".into()));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["level"], "ERROR");
        assert_eq!(json["data"]["result"], "error");
        assert_eq!(json["data"]["reason"], "invalidRequest");
        assert_eq!(json["data"]["message"], "bad");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
