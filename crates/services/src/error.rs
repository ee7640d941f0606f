//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::generator::GeneratorError;
use quiz_core::model::{SessionSummaryError, SettingsError, UserError, UserId};
use storage::repository::StorageError;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,
    #[error("session was cancelled")]
    Cancelled,
    #[error("no question is waiting for an answer")]
    NoPendingQuestion,
    #[error("selected option {0} is out of range")]
    InvalidSelection(usize),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("no profile with id {0}")]
    UnknownProfile(UserId),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
