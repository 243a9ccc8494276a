use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drivetrack_core::model::{
    ContentId, ContentUnit, Course, CourseId, ProgressEvent, ProgressRecord, Quiz, QuizId,
    StudentId,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The progress ledger store: one row per `(student, course, content)` tuple.
#[async_trait]
pub trait ProgressLedger: Send + Sync {
    /// Atomically creates or mutates the tuple addressed by the event and
    /// returns the post-event row.
    ///
    /// Backends must apply the whole mutation as one unit: concurrent time
    /// deltas on the same tuple accumulate without loss, the completion
    /// flag never reverts, and `completed_at`/`first_viewed_at` are never
    /// rewritten once set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read or written.
    async fn apply_event(&self, event: &ProgressEvent) -> Result<ProgressRecord, StorageError>;

    /// Fetch a single ledger row, if the tuple has ever been written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// All rows for one student in one course, ascending by last access.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_for_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// One student's rows across all courses with `last_accessed_at` in
    /// `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_student_between(
        &self,
        student_id: StudentId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// All students' rows for one course with `last_accessed_at` in
    /// `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_course_between(
        &self,
        course_id: CourseId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StorageError>;
}

/// Read/seed access to the course catalog boundary.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Persist or update a course boundary record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;
}

/// Read/seed access to content units.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch a content unit by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_content_unit(&self, id: ContentId) -> Result<Option<ContentUnit>, StorageError>;

    /// All units belonging to a course, ascending by content id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_units_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ContentUnit>, StorageError>;

    /// Persist or update a content unit boundary record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the unit cannot be stored.
    async fn upsert_content_unit(&self, unit: &ContentUnit) -> Result<(), StorageError>;
}

/// Read/seed access to quizzes and their course linkage.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// All quizzes linked to a course, ascending by quiz id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Quiz>, StorageError>;

    /// Persist or update a quiz boundary record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<(StudentId, CourseId, ContentId), ProgressRecord>>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    units: Arc<Mutex<HashMap<ContentId, ContentUnit>>>,
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_by_access(mut rows: Vec<ProgressRecord>) -> Vec<ProgressRecord> {
    rows.sort_by_key(|r| (r.last_accessed_at(), r.content_id()));
    rows
}

#[async_trait]
impl ProgressLedger for InMemoryRepository {
    async fn apply_event(&self, event: &ProgressEvent) -> Result<ProgressRecord, StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let key = (event.student_id(), event.course_id(), event.content_id());
        let record = match guard.entry(key) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if !record.matches_event(event) {
                    return Err(StorageError::Conflict);
                }
                record.apply(event);
                record.clone()
            }
            Entry::Vacant(vacant) => vacant.insert(ProgressRecord::from_event(event)).clone(),
        };
        Ok(record)
    }

    async fn get(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(student_id, course_id, content_id)).cloned())
    }

    async fn list_for_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows = guard
            .values()
            .filter(|r| r.student_id() == student_id && r.course_id() == course_id)
            .cloned()
            .collect();
        Ok(sort_by_access(rows))
    }

    async fn list_student_between(
        &self,
        student_id: StudentId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let rows = guard
            .values()
            .filter(|r| {
                r.student_id() == student_id && r.last_accessed_at() >= from && r.last_accessed_at() < to
            })
            .cloned()
            .collect();
        Ok(sort_by_access(rows))
    }

    async fn list_course_between(
        &self,
        course_id: CourseId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<ProgressRecord> = guard
            .values()
            .filter(|r| {
                r.course_id() == course_id && r.last_accessed_at() >= from && r.last_accessed_at() < to
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.student_id(), r.content_id()));
        Ok(rows)
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn get_content_unit(&self, id: ContentId) -> Result<Option<ContentUnit>, StorageError> {
        let guard = self
            .units
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_units_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ContentUnit>, StorageError> {
        let guard = self
            .units
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut units: Vec<ContentUnit> = guard
            .values()
            .filter(|u| u.course_id() == course_id)
            .cloned()
            .collect();
        units.sort_by_key(ContentUnit::id);
        Ok(units)
    }

    async fn upsert_content_unit(&self, unit: &ContentUnit) -> Result<(), StorageError> {
        let mut guard = self
            .units
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(unit.id(), unit.clone());
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_quizzes_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut quizzes: Vec<Quiz> = guard
            .values()
            .filter(|q| q.course_id() == Some(course_id))
            .cloned()
            .collect();
        quizzes.sort_by_key(Quiz::id);
        Ok(quizzes)
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }
}

/// Aggregates the ledger and catalog repositories behind trait objects for
/// easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressLedger>,
    pub courses: Arc<dyn CourseRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressLedger> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let content: Arc<dyn ContentRepository> = Arc::new(repo.clone());
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo);
        Self {
            progress,
            courses,
            content,
            quizzes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use drivetrack_core::time::fixed_now;

    fn progress_event(content: u64, percent: u8, delta: u32) -> ProgressEvent {
        ProgressEvent::progress(
            StudentId::new(1),
            CourseId::new(1),
            ContentId::new(content),
            percent,
            delta,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn apply_event_creates_then_mutates_one_row() {
        let repo = InMemoryRepository::new();

        let created = repo.apply_event(&progress_event(10, 40, 120)).await.unwrap();
        assert_eq!(created.percent_complete(), 40);
        assert_eq!(created.attempts(), 1);

        let updated = repo.apply_event(&progress_event(10, 75, 60)).await.unwrap();
        assert_eq!(updated.percent_complete(), 75);
        assert_eq!(updated.time_spent_seconds(), 180);
        assert_eq!(updated.attempts(), 2);

        let rows = repo
            .list_for_course(StudentId::new(1), CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn completion_survives_lower_percent_rewrites() {
        let repo = InMemoryRepository::new();

        repo.apply_event(&progress_event(10, 100, 0)).await.unwrap();
        let after = repo.apply_event(&progress_event(10, 30, 0)).await.unwrap();

        assert!(after.is_completed());
        assert_eq!(after.completed_at(), Some(fixed_now()));
        assert_eq!(after.percent_complete(), 30);
    }

    #[tokio::test]
    async fn windowed_listings_use_half_open_intervals() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        repo.apply_event(&progress_event(10, 50, 60)).await.unwrap();
        repo.apply_event(
            &ProgressEvent::progress(
                StudentId::new(1),
                CourseId::new(1),
                ContentId::new(11),
                20,
                30,
                now + Duration::days(1),
            )
            .unwrap(),
        )
        .await
        .unwrap();

        let today = repo
            .list_student_between(StudentId::new(1), now, now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].content_id(), ContentId::new(10));

        let class = repo
            .list_course_between(CourseId::new(1), now, now + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(class.len(), 2);
    }

    #[tokio::test]
    async fn catalog_round_trips() {
        let repo = InMemoryRepository::new();

        let course = Course::new(CourseId::new(1), "Highway Code", vec![ContentId::new(10)])
            .unwrap();
        repo.upsert_course(&course).await.unwrap();
        assert_eq!(repo.get_course(CourseId::new(1)).await.unwrap(), Some(course));

        let unit = ContentUnit::new(ContentId::new(10), CourseId::new(1), "Mirrors").unwrap();
        repo.upsert_content_unit(&unit).await.unwrap();
        assert_eq!(
            repo.list_units_for_course(CourseId::new(1)).await.unwrap(),
            vec![unit]
        );

        let quiz = Quiz::new(QuizId::new(20), Some(CourseId::new(1)), "Signs").unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();
        assert_eq!(
            repo.list_quizzes_for_course(CourseId::new(1)).await.unwrap(),
            vec![quiz]
        );
    }
}
