use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ContentId, CourseId, QuizId, StudentId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Validation errors for progress events and persisted ledger rows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("percent must be between 0 and 100, got {0}")]
    PercentOutOfRange(u8),

    #[error("completion flag and completion timestamp disagree")]
    InconsistentCompletion,
}

//
// ─── CONTENT KIND ─────────────────────────────────────────────────────────────
//

/// Discriminates which event family wrote a ledger row.
///
/// Lessons and quizzes share the ledger's content-id space; the kind tag
/// makes "count lessons, not quizzes" filters explicit instead of relying
/// on the two id spaces never colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Lesson,
    Quiz,
}

impl ContentKind {
    /// Storage representation of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Lesson => "lesson",
            ContentKind::Quiz => "quiz",
        }
    }
}

//
// ─── PROGRESS EVENT ───────────────────────────────────────────────────────────
//

/// One validated ledger mutation in delta form.
///
/// Events are only built through the constructors below, so a constructed
/// event always carries an in-range percent. Time deltas are `u32`: a
/// negative delta is unrepresentable by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    student_id: StudentId,
    course_id: CourseId,
    content_id: ContentId,
    kind: ContentKind,
    percent: u8,
    time_delta_seconds: u32,
    attempt_increment: u32,
    quiz_score: Option<u32>,
    occurred_at: DateTime<Utc>,
}

impl ProgressEvent {
    /// A lesson progress report: overwrite percent, accumulate time, one attempt.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PercentOutOfRange` if `percent > 100`.
    pub fn progress(
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
        percent: u8,
        time_delta_seconds: u32,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if percent > 100 {
            return Err(ProgressError::PercentOutOfRange(percent));
        }
        Ok(Self {
            student_id,
            course_id,
            content_id,
            kind: ContentKind::Lesson,
            percent,
            time_delta_seconds,
            attempt_increment: 1,
            quiz_score: None,
            occurred_at,
        })
    }

    /// A bare "done" report: percent 100, no time, no attempt increment.
    #[must_use]
    pub fn completion(
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            course_id,
            content_id,
            kind: ContentKind::Lesson,
            percent: 100,
            time_delta_seconds: 0,
            attempt_increment: 0,
            quiz_score: None,
            occurred_at,
        }
    }

    /// A scored quiz submission: definitionally complete, one attempt.
    #[must_use]
    pub fn quiz_score(
        student_id: StudentId,
        course_id: CourseId,
        quiz_id: QuizId,
        score: u32,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            course_id,
            content_id: quiz_id.as_content(),
            kind: ContentKind::Quiz,
            percent: 100,
            time_delta_seconds: 0,
            attempt_increment: 1,
            quiz_score: Some(score),
            occurred_at,
        }
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn content_id(&self) -> ContentId {
        self.content_id
    }

    #[must_use]
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn time_delta_seconds(&self) -> u32 {
        self.time_delta_seconds
    }

    #[must_use]
    pub fn attempt_increment(&self) -> u32 {
        self.attempt_increment
    }

    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// True if applying this event drives a record to completion.
    #[must_use]
    pub fn completes(&self) -> bool {
        self.percent >= 100
    }
}

//
// ─── PROGRESS RECORD ──────────────────────────────────────────────────────────
//

/// One student's cumulative interaction with one content unit in one course.
///
/// Exactly one record exists per `(student, course, content)` tuple. The
/// record is created by the first event for its tuple and mutated by every
/// later one; the core never deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    student_id: StudentId,
    course_id: CourseId,
    content_id: ContentId,
    kind: ContentKind,
    percent_complete: u8,
    time_spent_seconds: u64,
    attempts: u32,
    is_completed: bool,
    quiz_score: Option<u32>,
    first_viewed_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    last_accessed_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Creates the ledger row for a tuple's first event and applies it.
    #[must_use]
    pub fn from_event(event: &ProgressEvent) -> Self {
        let mut record = Self {
            student_id: event.student_id(),
            course_id: event.course_id(),
            content_id: event.content_id(),
            kind: event.kind(),
            percent_complete: 0,
            time_spent_seconds: 0,
            attempts: 0,
            is_completed: false,
            quiz_score: None,
            first_viewed_at: event.occurred_at(),
            completed_at: None,
            last_accessed_at: event.occurred_at(),
        };
        record.apply(event);
        record
    }

    /// Rehydrates a ledger row from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PercentOutOfRange` for a percent above 100 and
    /// `ProgressError::InconsistentCompletion` when the completion flag and
    /// timestamp disagree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
        kind: ContentKind,
        percent_complete: u8,
        time_spent_seconds: u64,
        attempts: u32,
        is_completed: bool,
        quiz_score: Option<u32>,
        first_viewed_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        last_accessed_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if percent_complete > 100 {
            return Err(ProgressError::PercentOutOfRange(percent_complete));
        }
        if is_completed != completed_at.is_some() {
            return Err(ProgressError::InconsistentCompletion);
        }

        Ok(Self {
            student_id,
            course_id,
            content_id,
            kind,
            percent_complete,
            time_spent_seconds,
            attempts,
            is_completed,
            quiz_score,
            first_viewed_at,
            completed_at,
            last_accessed_at,
        })
    }

    /// Applies one event to the row. This is the single write rule:
    ///
    /// - percent is overwritten (last write wins);
    /// - time accumulates;
    /// - attempts grow by the event's increment;
    /// - a quiz score overwrites only when the event carries one;
    /// - completion is monotonic and `completed_at` is set exactly once, on
    ///   the first event that reaches 100 percent.
    ///
    /// The caller is responsible for routing the event to the record of its
    /// own `(student, course, content)` tuple.
    pub fn apply(&mut self, event: &ProgressEvent) {
        self.percent_complete = event.percent();
        self.time_spent_seconds += u64::from(event.time_delta_seconds());
        self.attempts += event.attempt_increment();
        self.last_accessed_at = event.occurred_at();

        if let Some(score) = event.quiz_score {
            self.quiz_score = Some(score);
        }

        if event.completes() && !self.is_completed {
            self.is_completed = true;
            self.completed_at = Some(event.occurred_at());
        }
    }

    /// True if the event addresses this record's tuple.
    #[must_use]
    pub fn matches_event(&self, event: &ProgressEvent) -> bool {
        self.student_id == event.student_id()
            && self.course_id == event.course_id()
            && self.content_id == event.content_id()
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn content_id(&self) -> ContentId {
        self.content_id
    }

    #[must_use]
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    #[must_use]
    pub fn percent_complete(&self) -> u8 {
        self.percent_complete
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> u64 {
        self.time_spent_seconds
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn quiz_score(&self) -> Option<u32> {
        self.quiz_score
    }

    #[must_use]
    pub fn first_viewed_at(&self) -> DateTime<Utc> {
        self.first_viewed_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
