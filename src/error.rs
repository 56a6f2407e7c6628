use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StorefrontError {
    #[error("session manager is not initialized")]
    NotInitialized,

    #[error("session manager is already initialized; close it first")]
    AlreadyInitialized,

    #[error("session is closed")]
    SessionClosed,

    #[error("no pooled connection became available in time")]
    PoolExhausted,

    #[error("transaction failure: {0}")]
    Transaction(#[source] SqlxError),

    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("secret must not be empty")]
    EmptySecret,

    #[error("secret exceeds {max} bytes")]
    SecretTooLong { max: usize },

    #[error("credential hashing failed: {0}")]
    Hashing(String),

    #[error("authentication denied")]
    AuthenticationDenied,

    #[error("database_url must be provided")]
    MissingDatabaseUrl,

    #[error("Config error: {0}")]
    Config(#[from] figment::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorefrontError {
    /// Failures a caller may reasonably retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorefrontError::PoolExhausted | StorefrontError::Transaction(_)
        )
    }
}

impl From<SqlxError> for StorefrontError {
    fn from(e: SqlxError) -> Self {
        match e {
            SqlxError::PoolTimedOut => StorefrontError::PoolExhausted,
            SqlxError::PoolClosed => StorefrontError::NotInitialized,
            SqlxError::RowNotFound => StorefrontError::NotFound,
            SqlxError::Database(db_err) if db_err.is_unique_violation() => {
                StorefrontError::Conflict(db_err.message().to_string())
            }
            other => StorefrontError::Database(other),
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            StorefrontError::PoolExhausted => {
                let status = StatusCode::SERVICE_UNAVAILABLE; // 503
                let body = ApiErrorBody {
                    code: "UNAVAILABLE".to_string(),
                    message: "The service is busy, please retry.".to_string(),
                };
                (status, body)
            }
            StorefrontError::AuthenticationDenied => {
                let status = StatusCode::UNAUTHORIZED;
                let body = ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Authentication error.".to_string(),
                };
                (status, body)
            }
            StorefrontError::Validation(reason) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "INVALID_REQUEST".to_string(),
                    message: reason,
                };
                (status, body)
            }
            StorefrontError::EmptySecret | StorefrontError::SecretTooLong { .. } => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "INVALID_REQUEST".to_string(),
                    message: "Password does not meet requirements.".to_string(),
                };
                (status, body)
            }
            StorefrontError::Conflict(_) => {
                let status = StatusCode::CONFLICT;
                let body = ApiErrorBody {
                    code: "CONFLICT".to_string(),
                    message: "Resource already exists.".to_string(),
                };
                (status, body)
            }
            StorefrontError::NotFound => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: "Resource not found.".to_string(),
                };
                (status, body)
            }
            StorefrontError::NotInitialized
            | StorefrontError::AlreadyInitialized
            | StorefrontError::SessionClosed
            | StorefrontError::Transaction(_)
            | StorefrontError::Database(_)
            | StorefrontError::Hashing(_)
            | StorefrontError::MissingDatabaseUrl
            | StorefrontError::Config(_)
            | StorefrontError::Io(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_failures_map_to_generic_server_error() {
        for err in [
            StorefrontError::NotInitialized,
            StorefrontError::Transaction(SqlxError::WorkerCrashed),
            StorefrontError::Database(SqlxError::WorkerCrashed),
        ] {
            let resp = err.into_response();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn pool_exhaustion_is_retryable_503() {
        let err = StorefrontError::from(SqlxError::PoolTimedOut);
        assert!(matches!(err, StorefrontError::PoolExhausted));
        assert!(err.is_retryable());
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn closed_pool_reads_as_uninitialized() {
        let err = StorefrontError::from(SqlxError::PoolClosed);
        assert!(matches!(err, StorefrontError::NotInitialized));
    }

    #[test]
    fn denied_authentication_is_401() {
        let resp = StorefrontError::AuthenticationDenied.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
