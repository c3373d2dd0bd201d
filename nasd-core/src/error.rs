use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

/// The nine error kinds of the management daemon's external contract.
///
/// Each variant carries the human-readable message; `Validation` and
/// `RateLimited` carry the extra fields their wire format needs.
pub enum AppError {
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    RateLimited {
        message: String,
        class: &'static str,
        retry_after_seconds: u64,
    },
    ProviderUnavailable(String),
    Timeout(String),
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not-found",
            AppError::Conflict(_) => "conflict",
            AppError::RateLimited { .. } => "rate-limited",
            AppError::ProviderUnavailable(_) => "provider-unavailable",
            AppError::Timeout(_) => "timeout",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. } => message,
            AppError::Unauthenticated(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::ProviderUnavailable(m)
            | AppError::Timeout(m)
            | AppError::Internal(m) => m,
            AppError::RateLimited { message, .. } => message,
        }
    }

    pub fn rate_limited(class: &'static str, retry_after_seconds: u64) -> Self {
        AppError::RateLimited {
            message: "rate limit exceeded".to_string(),
            class,
            retry_after_seconds,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(kind, message = self.message(), "internal error");
        }

        let mut body = serde_json::json!({
            "error": kind,
            "message": self.message(),
        });

        match &self {
            AppError::Validation { fields, .. } => {
                body["fields"] = serde_json::to_value(fields).unwrap_or_default();
            }
            AppError::RateLimited {
                class,
                retry_after_seconds,
                ..
            } => {
                body["class"] = serde_json::Value::String(class.to_string());
                body["retry_after_seconds"] = serde_json::Value::from(*retry_after_seconds);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::ProviderUnavailable(err.to_string())
    }
}

/// Generate `From<E> for AppError` implementations that map an error type to
/// a specific `AppError` variant constructor taking `.to_string()`.
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::error::AppError {
                fn from(err: $err_ty) -> Self {
                    $crate::error::AppError::$variant(err.to_string())
                }
            }
        )*
    };
}
