use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::reports::ProgressReports;
use crate::tracker::ProgressTracker;

/// Assembles the progress services over a chosen storage backend.
#[derive(Clone)]
pub struct AppServices {
    tracker: Arc<ProgressTracker>,
    reports: Arc<ProgressReports>,
}

impl AppServices {
    /// Build services over the given storage handles.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let tracker = Arc::new(ProgressTracker::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.content),
            Arc::clone(&storage.quizzes),
        ));
        let reports = Arc::new(ProgressReports::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.content),
            Arc::clone(&storage.quizzes),
        ));
        Self { tracker, reports }
    }

    /// Build services backed by in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ProgressReports> {
        Arc::clone(&self.reports)
    }
}
