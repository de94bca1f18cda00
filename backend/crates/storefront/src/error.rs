//! Storefront Error Types
//!
//! Storefront-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::validation::ValidationErrors;
use crate::domain::identity::ProviderError;
use crate::domain::image_host::ImageHostError;
use crate::domain::value_object::collection::Collection;

/// Storefront result type alias
pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// Classified identity-provider failure, safe to show to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    NoSuchAccount,
    WrongCredentials,
    MalformedEmail,
    EmailAlreadyInUse,
    WeakPassword,
    RateLimited,
    NetworkFailure,
    CancelledByUser,
    Unknown,
}

impl AuthFailure {
    /// Classify a raw provider failure.
    ///
    /// Accepts both the REST error codes (`EMAIL_NOT_FOUND`) and the SDK
    /// style codes (`auth/user-not-found`).
    pub fn classify(err: &ProviderError) -> Self {
        match err {
            ProviderError::Rejected { code, .. } => Self::from_code(code),
            ProviderError::Transport(_) => AuthFailure::NetworkFailure,
            ProviderError::Cancelled => AuthFailure::CancelledByUser,
            ProviderError::Unexpected(_) => AuthFailure::Unknown,
        }
    }

    fn from_code(code: &str) -> Self {
        // WEAK_PASSWORD arrives as "WEAK_PASSWORD : Password should be ..."
        let code = code.split(':').next().unwrap_or(code).trim();
        match code {
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" | "auth/user-not-found" => {
                AuthFailure::NoSuchAccount
            }
            "INVALID_PASSWORD"
            | "INVALID_LOGIN_CREDENTIALS"
            | "auth/wrong-password"
            | "auth/invalid-credential" => AuthFailure::WrongCredentials,
            "INVALID_EMAIL" | "auth/invalid-email" => AuthFailure::MalformedEmail,
            "EMAIL_EXISTS" | "auth/email-already-in-use" => AuthFailure::EmailAlreadyInUse,
            "WEAK_PASSWORD" | "auth/weak-password" => AuthFailure::WeakPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "auth/too-many-requests" => AuthFailure::RateLimited,
            "auth/network-request-failed" => AuthFailure::NetworkFailure,
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => {
                AuthFailure::CancelledByUser
            }
            _ => AuthFailure::Unknown,
        }
    }

    /// Stable machine code
    pub const fn code(&self) -> &'static str {
        use AuthFailure::*;
        match self {
            NoSuchAccount => "no-such-account",
            WrongCredentials => "wrong-credentials",
            MalformedEmail => "malformed-email",
            EmailAlreadyInUse => "email-already-in-use",
            WeakPassword => "weak-password",
            RateLimited => "rate-limited",
            NetworkFailure => "network-failure",
            CancelledByUser => "cancelled-by-user",
            Unknown => "unknown",
        }
    }

    /// User-facing message
    pub const fn message(&self) -> &'static str {
        use AuthFailure::*;
        match self {
            NoSuchAccount => "No account found with this email address.",
            WrongCredentials => "Incorrect email or password.",
            MalformedEmail => "Please enter a valid email address.",
            EmailAlreadyInUse => "An account with this email already exists.",
            WeakPassword => "Password is too weak. Please choose a stronger password.",
            RateLimited => "Too many attempts. Please try again later.",
            NetworkFailure => "Network error. Please check your connection and try again.",
            CancelledByUser => "Sign-in was cancelled.",
            Unknown => "Something went wrong. Please try again.",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use AuthFailure::*;
        match self {
            NoSuchAccount | WrongCredentials => ErrorKind::Unauthorized,
            MalformedEmail | WeakPassword | CancelledByUser => ErrorKind::BadRequest,
            EmailAlreadyInUse => ErrorKind::Conflict,
            RateLimited => ErrorKind::TooManyRequests,
            NetworkFailure => ErrorKind::BadGateway,
            Unknown => ErrorKind::InternalServerError,
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Snapshot of the most recent session error, as observers see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Malformed or foreign pagination cursor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor is not valid base64url")]
    Encoding,
    #[error("cursor payload is not valid")]
    Payload,
    #[error("cursor was issued for {issued_for}, not {expected}")]
    WrongCollection {
        issued_for: Collection,
        expected: Collection,
    },
}

/// Storefront-specific error variants
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Identity provider refused or failed the operation
    #[error("{0}")]
    Auth(AuthFailure),

    /// The signed-in user is blocked
    #[error("This account has been blocked. Please contact support.")]
    AccountBlocked,

    /// No signed-in user for this browser session
    #[error("Authentication required")]
    NotAuthenticated,

    /// Pre-flight form validation failed
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Update/delete of a record that does not exist
    #[error("{} {id} does not exist", .collection.singular())]
    NotFound { collection: Collection, id: String },

    /// Update with nothing to change
    #[error("No fields to update")]
    EmptyUpdate,

    /// Cursor could not be decoded for this collection
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    /// Page size must be a positive integer
    #[error("Page size must be positive")]
    InvalidPageSize,

    /// Image host failure
    #[error("Image host error: {0}")]
    ImageHost(#[from] ImageHostError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be decoded
    #[error("Corrupt {collection} document {id}: {reason}")]
    CorruptDocument {
        collection: Collection,
        id: String,
        reason: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        StorefrontError::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorefrontError::Auth(failure) => failure.kind(),
            StorefrontError::AccountBlocked => ErrorKind::Forbidden,
            StorefrontError::NotAuthenticated => ErrorKind::Unauthorized,
            StorefrontError::Validation(_) => ErrorKind::UnprocessableEntity,
            StorefrontError::NotFound { .. } => ErrorKind::NotFound,
            StorefrontError::EmptyUpdate
            | StorefrontError::InvalidCursor(_)
            | StorefrontError::InvalidPageSize => ErrorKind::BadRequest,
            StorefrontError::ImageHost(_) => ErrorKind::BadGateway,
            StorefrontError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => ErrorKind::ServiceUnavailable,
            StorefrontError::Database(_) => ErrorKind::InternalServerError,
            StorefrontError::CorruptDocument { .. } | StorefrontError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Stable machine code
    pub fn code(&self) -> &'static str {
        match self {
            StorefrontError::Auth(failure) => failure.code(),
            StorefrontError::AccountBlocked => "account-blocked",
            StorefrontError::NotAuthenticated => "not-authenticated",
            StorefrontError::Validation(_) => "validation-failed",
            StorefrontError::NotFound { .. } => "not-found",
            StorefrontError::EmptyUpdate => "empty-update",
            StorefrontError::InvalidCursor(_) => "invalid-cursor",
            StorefrontError::InvalidPageSize => "invalid-page-size",
            StorefrontError::ImageHost(_) => "image-host-failure",
            StorefrontError::Database(_) | StorefrontError::CorruptDocument { .. } => {
                "store-failure"
            }
            StorefrontError::Internal(_) => "internal",
        }
    }

    /// Message that is safe to show outside the process
    pub fn public_message(&self) -> String {
        match self {
            StorefrontError::Database(_) | StorefrontError::CorruptDocument { .. } => {
                "The store is currently unavailable. Please try again.".to_string()
            }
            StorefrontError::ImageHost(_) => "Image service request failed.".to_string(),
            StorefrontError::Internal(_) => AuthFailure::Unknown.message().to_string(),
            other => other.to_string(),
        }
    }

    /// Snapshot for `AuthState::last_error`
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo::new(self.code(), self.public_message())
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.public_message()).with_code(self.code());
        match self {
            StorefrontError::Auth(AuthFailure::RateLimited) => {
                err.with_action("Wait a few minutes before trying again")
            }
            StorefrontError::AccountBlocked => err.with_action("Contact support"),
            _ => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            StorefrontError::Database(e) => {
                tracing::error!(error = %e, "Storefront database error");
            }
            StorefrontError::CorruptDocument { .. } | StorefrontError::Internal(_) => {
                tracing::error!(error = %self, "Storefront internal error");
            }
            StorefrontError::ImageHost(e) => {
                tracing::error!(error = %e, "Image host request failed");
            }
            StorefrontError::AccountBlocked => {
                tracing::warn!("Request from blocked account");
            }
            _ => {
                tracing::debug!(error = %self, "Storefront error");
            }
        }
    }
}

impl From<ProviderError> for StorefrontError {
    fn from(err: ProviderError) -> Self {
        let failure = AuthFailure::classify(&err);
        if failure == AuthFailure::Unknown {
            tracing::warn!(error = %err, "Unclassified identity provider failure");
        } else {
            tracing::debug!(error = %err, failure = failure.code(), "Identity provider failure");
        }
        StorefrontError::Auth(failure)
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        self.log();
        let mut response = self.to_app_error().into_response();
        if let StorefrontError::NotAuthenticated = self {
            response
                .headers_mut()
                .insert("X-Auth-Required", axum::http::HeaderValue::from_static("true"));
        }
        response
    }
}

impl From<AppError> for StorefrontError {
    fn from(err: AppError) -> Self {
        StorefrontError::Internal(err.to_string())
    }
}
