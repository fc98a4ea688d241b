//! # API Error Types
//!
//! Maps [`BridgeError`] onto HTTP status codes and a JSON body that carries
//! the failure category and, for structured failures, the tagged detail so
//! the client can rebuild the original error.
//!
//! | Category | Status |
//! |---|---|
//! | validation | 422 |
//! | not_ready | 409 |
//! | transport, on_chain_rejection | 502 |
//! | protocol: duplicate submission | 409 |
//! | protocol: timeout, cancellation | 503 |
//! | protocol: local crypto failure | 500 |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nftb_core::{BridgeError, ErrorCategory};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `VALIDATION_ERROR`.
    pub code: String,
    /// Failure category; absent for malformed requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub message: String,
    /// Tagged `ValidationFailure`, `NotReady` or `LedgerError`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// A protocol error from the validator.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        let err = match self {
            Self::BadRequest(_) => return (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Bridge(err) => err,
        };
        match err {
            BridgeError::DuplicateSubmission { .. } => {
                (StatusCode::CONFLICT, "DUPLICATE_SUBMISSION")
            }
            BridgeError::Timeout { .. } | BridgeError::Cancelled { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
            }
            BridgeError::Crypto { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            other => match other.category() {
                ErrorCategory::Validation => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
                }
                ErrorCategory::NotReady => (StatusCode::CONFLICT, "NOT_READY"),
                ErrorCategory::Transport => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
                ErrorCategory::OnChainRejection => (StatusCode::BAD_GATEWAY, "LEDGER_REVERTED"),
                ErrorCategory::Protocol => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            },
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let value = match self {
            Self::Bridge(BridgeError::Rejected(f)) => serde_json::to_value(f),
            Self::Bridge(BridgeError::NotReady(n)) => serde_json::to_value(n),
            Self::Bridge(BridgeError::Ledger(l)) => serde_json::to_value(l),
            _ => return None,
        };
        value.ok()
    }

    /// The response body for this error.
    pub fn body(&self) -> ErrorBody {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                category: match self {
                    Self::Bridge(err) => Some(err.category()),
                    Self::BadRequest(_) => None,
                },
                message,
                details: self.details(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "validator request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

impl ErrorBody {
    /// Rebuild the error a server reported.
    ///
    /// Validation, not-ready and ledger failures come back structured;
    /// everything else becomes [`BridgeError::Remote`] with the reported
    /// category.
    pub fn into_bridge_error(self, status: u16) -> BridgeError {
        let ErrorDetail {
            category,
            message,
            details,
            ..
        } = self.error;
        let category = category.unwrap_or(if status < 500 {
            ErrorCategory::Validation
        } else {
            ErrorCategory::Transport
        });

        if let Some(details) = details {
            let restored = match category {
                ErrorCategory::Validation => serde_json::from_value(details)
                    .ok()
                    .map(BridgeError::Rejected),
                ErrorCategory::NotReady => serde_json::from_value(details)
                    .ok()
                    .map(BridgeError::NotReady),
                ErrorCategory::Transport | ErrorCategory::OnChainRejection => {
                    serde_json::from_value(details).ok().map(BridgeError::Ledger)
                }
                ErrorCategory::Protocol => None,
            };
            if let Some(err) = restored {
                return err;
            }
        }
        BridgeError::Remote { category, message }
    }
}
