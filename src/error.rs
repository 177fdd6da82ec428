//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid range: from 1700000000000 is after to 1600000000000",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status               |
/// |-----------|-----------------------|---------------------------|
/// | 1000–1999 | Caller input          | 400 Bad Request           |
/// | 2000–2999 | Upstream collaborator | 503 Service Unavailable   |
/// | 3000–3999 | Server                | 500 Internal Server Error |
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Request body or shape is unusable (e.g. empty chat message).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A single parameter could not be parsed or is out of its domain.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Time range bounds are inverted.
    #[error("invalid range: from {from} is after to {to}")]
    InvalidRange {
        /// Lower bound in epoch milliseconds.
        from: i64,
        /// Upper bound in epoch milliseconds.
        to: i64,
    },

    /// Geo point or radius is malformed or out of range.
    #[error("invalid geo constraint: {0}")]
    InvalidGeo(String),

    /// Page size must be strictly positive.
    #[error("invalid page size: {0} (must be > 0)")]
    InvalidPageSize(i64),

    /// Histogram grouping requested on a field that cannot be grouped.
    #[error("unsupported group field: {0}")]
    UnsupportedGroupField(String),

    /// A bucket or result limit is not strictly positive.
    #[error("invalid limit `{field}`: {value} (must be > 0)")]
    InvalidLimit {
        /// Name of the limit parameter.
        field: String,
        /// Value supplied by the caller.
        value: i64,
    },

    /// Date-histogram interval is not one of the supported units.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Timezone name is not a known IANA zone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Date-histogram range would exceed the bucket cap.
    #[error("too many buckets: range needs {required}, limit is {max}")]
    TooManyBuckets {
        /// Buckets required to cover the full range.
        required: u64,
        /// Caller-supplied cap.
        max: u64,
    },

    /// The event inventory or LLM collaborator failed.
    #[error("upstream fetch failed: {message}")]
    UpstreamFetch {
        /// HTTP status returned by the collaborator, if any.
        status: Option<u16>,
        /// Failure description.
        message: String,
    },

    /// The collaborator did not answer within the caller's timeout.
    #[error("upstream timed out after {timeout_ms} ms")]
    UpstreamTimeout {
        /// Per-attempt timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Trend analysis could not run because its input fetch failed.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for [`GatewayError::InvalidParameter`].
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1000,
            Self::InvalidParameter { .. } => 1001,
            Self::InvalidRange { .. } => 1002,
            Self::InvalidGeo(_) => 1003,
            Self::InvalidPageSize(_) => 1004,
            Self::UnsupportedGroupField(_) => 1005,
            Self::InvalidLimit { .. } => 1006,
            Self::InvalidInterval(_) => 1007,
            Self::InvalidTimezone(_) => 1008,
            Self::TooManyBuckets { .. } => 1009,
            Self::UpstreamFetch { .. } => 2001,
            Self::UpstreamTimeout { .. } => 2002,
            Self::InsufficientData(_) => 2003,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidParameter { .. }
            | Self::InvalidRange { .. }
            | Self::InvalidGeo(_)
            | Self::InvalidPageSize(_)
            | Self::UnsupportedGroupField(_)
            | Self::InvalidLimit { .. }
            | Self::InvalidInterval(_)
            | Self::InvalidTimezone(_)
            | Self::TooManyBuckets { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamFetch { .. } | Self::UpstreamTimeout { .. } | Self::InsufficientData(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a collaborator call that failed with this error may be retried.
    ///
    /// Network failures, timeouts and 5xx responses are transient; 4xx
    /// responses and every caller-input error are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamTimeout { .. } => true,
            Self::UpstreamFetch { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_bad_request() {
        let errors = [
            GatewayError::invalid_parameter("from", "not a number"),
            GatewayError::InvalidRange { from: 2, to: 1 },
            GatewayError::InvalidGeo("lat".to_string()),
            GatewayError::InvalidPageSize(0),
            GatewayError::UnsupportedGroupField("venue".to_string()),
            GatewayError::InvalidInterval("3y".to_string()),
            GatewayError::InvalidTimezone("Mars/Base".to_string()),
            GatewayError::TooManyBuckets {
                required: 10,
                max: 5,
            },
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err}");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn upstream_errors_map_to_service_unavailable() {
        let err = GatewayError::UpstreamTimeout { timeout_ms: 100 };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), 2002);
    }

    #[test]
    fn retry_only_transient_upstream_failures() {
        let network = GatewayError::UpstreamFetch {
            status: None,
            message: "connection refused".to_string(),
        };
        let server = GatewayError::UpstreamFetch {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        let client = GatewayError::UpstreamFetch {
            status: Some(404),
            message: "not found".to_string(),
        };
        assert!(network.is_retryable());
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(GatewayError::UpstreamTimeout { timeout_ms: 5 }.is_retryable());
    }

    #[test]
    fn message_names_the_field() {
        let err = GatewayError::invalid_parameter("radius", "expected a number");
        assert_eq!(err.to_string(), "invalid parameter `radius`: expected a number");
    }
}
