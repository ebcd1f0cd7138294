use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;

use crate::auth_token::TokenError;
use crate::ledger::IntegrityError;

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{op}: persistence rejected: {detail}")]
    PersistenceRejected { op: &'static str, detail: String },

    #[error("{op}: storage error: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{op}: storage deadline exceeded")]
    Timeout { op: &'static str },

    #[error("Data integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authorization header is missing")]
    MissingCredential,

    #[error("Invalid authorization header")]
    MalformedCredential,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<common::DomainError> for ExchangeError {
    fn from(err: common::DomainError) -> Self {
        ExchangeError::Validation(err.to_string())
    }
}

impl ExchangeError {
    /// Classifies a sqlx failure raised while running `op`.
    ///
    /// Constraint violations become `PersistenceRejected`; everything else is
    /// a plain storage failure. Both carry the operation name.
    pub fn storage(op: &'static str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            use sqlx::error::ErrorKind;
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    log::warn!("{}: constraint violation: {}", op, db_err.message());
                    return ExchangeError::PersistenceRejected {
                        op,
                        detail: db_err.message().to_string(),
                    };
                }
                _ => {}
            }
        }

        log::error!("{}: {}", op, err);
        ExchangeError::Storage { op, source: err }
    }

    /// Adapter for `map_err`: `.map_err(ExchangeError::during("trade.create"))`.
    pub fn during(op: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |err| ExchangeError::storage(op, err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ResponseError for ExchangeError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExchangeError::Validation(_) => StatusCode::BAD_REQUEST,
            ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
            ExchangeError::PersistenceRejected { .. } => StatusCode::CONFLICT,
            ExchangeError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ExchangeError::MissingCredential => StatusCode::UNAUTHORIZED,
            ExchangeError::MalformedCredential => StatusCode::UNAUTHORIZED,
            ExchangeError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ExchangeError::Forbidden(_) => StatusCode::FORBIDDEN,
            ExchangeError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ExchangeError::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ExchangeError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExchangeError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExchangeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExchangeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // storage internals stay in the log
        let message = match self {
            ExchangeError::Storage { op, .. } => format!("{op}: storage error"),
            other => other.to_string(),
        };
        let error_response = ErrorResponse {
            success: false,
            error: message,
        };

        HttpResponse::build(status).json(error_response)
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
