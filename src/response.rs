//! Client-facing translation of errors.
//!
//! A request dispatcher turns any [`Error`] into a status code and a JSON body
//! with [`ErrorResponse::from_error`]. The breaker's fallback payload is not an
//! error and is sent as-is with a success status.

use crate::error_code::ErrorKind;
use crate::Error;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// Cause chain, outermost first; only present when details are exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// `{"success": false, "error": {"message": ...}}` plus the status to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: u16,
    #[serde(skip)]
    pub kind: ErrorKind,
    pub success: bool,
    pub error: ErrorBody,
}

impl ErrorResponse {
    /// Validation and not-found errors keep their message; unauthorized and
    /// internal errors are replaced by a fixed message. `expose_details` adds
    /// the full cause chain (development mode).
    pub fn from_error(err: &Error, expose_details: bool) -> Self {
        let kind = err.kind();
        let message = if kind.exposes_message() {
            err.to_string()
        } else {
            kind.generic_message().to_string()
        };
        Self {
            status: kind.status_code(),
            kind,
            success: false,
            error: ErrorBody {
                message,
                details: expose_details.then(|| err.chain()),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": self.success,
            "error": &self.error,
        })
    }
}
