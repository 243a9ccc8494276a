//! Shared error types for the services crate.

use thiserror::Error;

use drivetrack_core::model::{ContentId, CourseId, ProgressError, QuizId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressTracker` (the ledger write path).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackingError {
    /// The event failed input validation (out-of-range percent).
    #[error(transparent)]
    InvalidProgress(#[from] ProgressError),

    /// The content id does not resolve to a unit of the given course.
    #[error("content unit {0} not found in course")]
    ContentNotFound(ContentId),

    /// The referenced course is unknown to the catalog.
    #[error("course {0} not found")]
    CourseNotFound(CourseId),

    /// The referenced quiz is unknown to the catalog.
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),

    /// The quiz exists but has no owning course; its score cannot be
    /// attributed to a ledger tuple.
    #[error("quiz {0} has no owning course")]
    QuizNotLinked(QuizId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressReports` (the read-side façade).
///
/// A missing course is an error; a known course with no activity is a valid
/// zero-progress result and never surfaces here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
