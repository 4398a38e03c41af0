//! Error types for the ledger service.

use rust_decimal::Decimal;

use crate::domain::{Currency, TransactionId, UserId};

/// Domain-level errors (business rule violations).
///
/// A closed taxonomy carrying structured fields; turning these into
/// user-visible text is the inbound layer's job.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("User with id '{0}' not found")]
    UserNotFound(UserId),

    #[error("Cannot perform '{operation}' for blocked user with id '{user_id}'")]
    UserBlocked { user_id: UserId, operation: String },

    #[error("User with email '{email}' already exists")]
    UserAlreadyExists { email: String },

    #[error("User with id '{0}' is already blocked")]
    UserAlreadyBlocked(UserId),

    #[error("User with id '{0}' is already active")]
    UserAlreadyActive(UserId),

    /// Consistency fault: every user owns a balance row per currency, so a
    /// missing row means the invariant was broken, not that the caller erred.
    #[error("Balance not found for user '{user_id}' and currency {currency}")]
    BalanceNotFound { user_id: UserId, currency: Currency },

    #[error("Insufficient balance in {currency}: current {current}, requested {requested}")]
    InsufficientBalance {
        currency: Currency,
        current: Decimal,
        requested: Decimal,
    },

    #[error("Transaction with id '{0}' not found")]
    TransactionNotFound(TransactionId),

    #[error("Transaction with id '{transaction_id}' does not belong to user with id '{user_id}'")]
    TransactionOwnershipMismatch {
        transaction_id: TransactionId,
        user_id: UserId,
    },

    #[error("Transaction with id '{0}' is already reversed")]
    TransactionAlreadyReversed(TransactionId),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient balance in {currency}: current {current}, requested {requested}")]
    InsufficientBalance {
        currency: Currency,
        current: Decimal,
        requested: Decimal,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UserNotFound(_) | DomainError::TransactionNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            DomainError::UserBlocked { .. } | DomainError::TransactionOwnershipMismatch { .. } => {
                AppError::Forbidden(err.to_string())
            }
            DomainError::UserAlreadyExists { .. } => AppError::Conflict(err.to_string()),
            DomainError::InsufficientBalance {
                currency,
                current,
                requested,
            } => AppError::InsufficientBalance {
                currency,
                current,
                requested,
            },
            // Invariant violation, not user error
            DomainError::BalanceNotFound { .. } => AppError::Internal(err.to_string()),
            DomainError::UserAlreadyBlocked(_)
            | DomainError::UserAlreadyActive(_)
            | DomainError::TransactionAlreadyReversed(_)
            | DomainError::ValidationError(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
        }
    }
}
