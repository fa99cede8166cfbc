//! Repository error type.

use corebank_core::account::AccountError;
use corebank_core::ledger::LedgerError;
use corebank_core::loan::LoanError;
use corebank_shared::AppError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Errors returned by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Row not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Identifier searched for.
        id: String,
    },

    /// Unique constraint or state conflict.
    #[error("{0}")]
    Conflict(String),

    /// Account rule violation.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Ledger rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Loan rule violation.
    #[error(transparent)]
    Loan(#[from] LoanError),

    /// Access check or other application error raised inside a repository.
    #[error(transparent)]
    App(#[from] AppError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Builds a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict(detail),
            _ => Self::Database(err),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => Self::not_found(entity, id),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Account(e) => e.into(),
            RepositoryError::Ledger(e) => e.into(),
            RepositoryError::Loan(e) => e.into(),
            RepositoryError::App(e) => e,
            RepositoryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_maps_to_app_error() {
        let err: AppError = RepositoryError::not_found("Account", "abc").into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Not found: Account abc");

        let err: AppError = RepositoryError::from(LedgerError::InsufficientBalance {
            available: dec!(5),
            requested: dec!(10),
        })
        .into();
        assert_eq!(err.status_code(), 422);

        let err: AppError = RepositoryError::from(DbErr::Custom("boom".into())).into();
        assert_eq!(err.status_code(), 500);
    }
}
