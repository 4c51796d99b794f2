//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::model::{AccessError, CompletionKey, QuestionId, Subject};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("{key} is not part of the {subject} catalog")]
    UnknownNode { subject: Subject, key: CompletionKey },
    #[error("{0} is not available yet")]
    Locked(CompletionKey),
    #[error("topic {0:?} is not ready for its quiz")]
    TopicNotReady(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StreakService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreakServiceError {
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("question {0} is not published")]
    Unpublished(QuestionId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
