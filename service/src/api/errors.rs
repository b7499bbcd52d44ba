//! Input/capacity/session error shape shared by every REST handler
//! (spec.md §7). Cryptographic verdicts never go through this type — they
//! are always a 200 carrying a [`crate::verify::VerificationResult`].

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// The `{ error, code }` body returned for every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { message: String, code: &'static str },
    PayloadTooLarge { message: String, code: &'static str },
    Unprocessable { message: String, code: &'static str },
    NotFound { message: String, code: &'static str },
    Gone { message: String, code: &'static str },
    Conflict { message: String, code: &'static str },
    /// The codec worker pool's bounded queue is full (spec.md §5:
    /// `ServerBusy`).
    ServerBusy { message: String, code: &'static str },
    Internal { request_id: uuid::Uuid },
}

impl ApiError {
    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn payload_too_large(code: &'static str, message: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unprocessable {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn gone(code: &'static str, message: impl Into<String>) -> Self {
        Self::Gone {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn server_busy(code: &'static str, message: impl Into<String>) -> Self {
        Self::ServerBusy {
            message: message.into(),
            code,
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal {
            request_id: uuid::Uuid::new_v4(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            Self::BadRequest { message, code } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::PayloadTooLarge { message, code } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::Unprocessable { message, code } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::NotFound { message, code } => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::Gone { message, code } => (
                StatusCode::GONE,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::Conflict { message, code } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::ServerBusy { message, code } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    error: message,
                    code: code.to_string(),
                },
            ),
            Self::Internal { request_id } => {
                tracing::error!(%request_id, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: format!("internal error (request id {request_id})"),
                        code: "internal_error".to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<crate::codec_pool::PoolFull> for ApiError {
    fn from(error: crate::codec_pool::PoolFull) -> Self {
        Self::server_busy("server_busy", error.to_string())
    }
}

impl From<crate::session::SessionError> for ApiError {
    fn from(error: crate::session::SessionError) -> Self {
        use crate::session::SessionError;
        match error {
            SessionError::ImageDecodeFailed => {
                Self::bad_request("image_decode_failed", error.to_string())
            }
            SessionError::DimensionsTooSmall => {
                Self::bad_request("dimensions_too_small", error.to_string())
            }
            SessionError::MalformedPublicKey => {
                Self::bad_request("malformed_public_key", error.to_string())
            }
            SessionError::MalformedSignature => {
                Self::bad_request("malformed_signature", error.to_string())
            }
            SessionError::PayloadTooLarge => {
                Self::payload_too_large("payload_too_large", error.to_string())
            }
            SessionError::UnknownSession => Self::not_found("unknown_session", error.to_string()),
            SessionError::SessionExpired => Self::gone("session_expired", error.to_string()),
            SessionError::SignatureVerificationFailed => {
                Self::unprocessable("signature_verification_failed", error.to_string())
            }
            SessionError::Codec(geocam_codec::CodecError::DimensionsTooLarge) => {
                Self::payload_too_large("dimensions_too_large", error.to_string())
            }
            SessionError::Codec(_) | SessionError::Stego(_) => Self::internal(),
        }
    }
}

impl From<crate::registry::RegistryError> for ApiError {
    fn from(error: crate::registry::RegistryError) -> Self {
        use crate::registry::RegistryError;
        match error {
            RegistryError::InstallationKeyConflict => {
                Self::conflict("installation_key_conflict", error.to_string())
            }
            RegistryError::UnsupportedAlgorithm(_) => {
                Self::bad_request("unsupported_algorithm", error.to_string())
            }
            RegistryError::NotFound => Self::not_found("device_not_found", error.to_string()),
            RegistryError::Database(_) => Self::internal(),
        }
    }
}
