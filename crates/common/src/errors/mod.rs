//! Error types for Shelfwise services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Query/filter errors (1xxx)
    ValidationError,
    UnknownColumn,
    InvalidFilter,
    InvalidSorter,

    // Resource errors (4xxx)
    NotFound,
    OrderNotFound,
    VendorNotFound,
    NoteNotFound,
    CdlOrderNotFound,

    // Business-rule errors (5xxx)
    BarcodeNotFinalized,
    PreconditionFailed,
    AlreadyCdl,

    // Data errors (6xxx)
    MalformedTags,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Query/filter (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::UnknownColumn => 1002,
            ErrorCode::InvalidFilter => 1003,
            ErrorCode::InvalidSorter => 1004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::OrderNotFound => 4002,
            ErrorCode::VendorNotFound => 4003,
            ErrorCode::NoteNotFound => 4004,
            ErrorCode::CdlOrderNotFound => 4005,

            // Business rules (5xxx)
            ErrorCode::BarcodeNotFinalized => 5001,
            ErrorCode::PreconditionFailed => 5002,
            ErrorCode::AlreadyCdl => 5003,

            // Data (6xxx)
            ErrorCode::MalformedTags => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Query compilation errors: always client input, never retried
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Unknown filter column: {name}")]
    UnknownColumn { name: String },

    #[error("Invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("Invalid sorter: {message}")]
    InvalidSorter { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Order not found: {id}")]
    OrderNotFound { id: i32 },

    #[error("Vendor not found: {code}")]
    VendorNotFound { code: String },

    #[error("CDL record not found for order {id}")]
    CdlOrderNotFound { id: i32 },

    // Business-rule preconditions, rejected synchronously
    #[error("Barcode {barcode} is not finalized; refusing to mark sensitivity")]
    BarcodeNotFinalized { barcode: String },

    #[error("Precondition failed: {message}")]
    PreconditionFailed { message: String },

    #[error("Order {id} is already under CDL workflow")]
    AlreadyCdl { id: i32 },

    // Recoverable data errors
    #[error("Malformed tag string: {raw}")]
    MalformedTags { raw: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::UnknownColumn { .. } => ErrorCode::UnknownColumn,
            AppError::InvalidFilter { .. } => ErrorCode::InvalidFilter,
            AppError::InvalidSorter { .. } => ErrorCode::InvalidSorter,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::OrderNotFound { .. } => ErrorCode::OrderNotFound,
            AppError::VendorNotFound { .. } => ErrorCode::VendorNotFound,
            AppError::CdlOrderNotFound { .. } => ErrorCode::CdlOrderNotFound,
            AppError::BarcodeNotFinalized { .. } => ErrorCode::BarcodeNotFinalized,
            AppError::PreconditionFailed { .. } => ErrorCode::PreconditionFailed,
            AppError::AlreadyCdl { .. } => ErrorCode::AlreadyCdl,
            AppError::MalformedTags { .. } => ErrorCode::MalformedTags,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::UnknownColumn { .. }
            | AppError::InvalidFilter { .. }
            | AppError::InvalidSorter { .. }
            | AppError::BarcodeNotFinalized { .. }
            | AppError::PreconditionFailed { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::OrderNotFound { .. }
            | AppError::VendorNotFound { .. }
            | AppError::CdlOrderNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::AlreadyCdl { .. } => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::MalformedTags { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::OrderNotFound { id: 42 };
        assert_eq!(err.code(), ErrorCode::OrderNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unknown_column_is_client_error() {
        let err = AppError::UnknownColumn {
            name: "frobnicate".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_barcode_precondition() {
        let err = AppError::BarcodeNotFinalized {
            barcode: "9000-".into(),
        };
        assert_eq!(err.code(), ErrorCode::BarcodeNotFinalized);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
