use std::sync::Arc;

use chrono::{DateTime, Utc};

use drivetrack_core::{
    model::{ContentId, CourseId, ProgressEvent, ProgressRecord, QuizId, StudentId},
    time::Clock,
};
use storage::repository::{ContentRepository, CourseRepository, ProgressLedger, QuizRepository};

use crate::error::TrackingError;

/// The ledger write path: turns incoming progress, completion and quiz-score
/// events into atomic ledger mutations.
///
/// Calls are treated as one real interaction each; there is no idempotency
/// key. A replayed call may re-add its time delta and attempt, but can never
/// corrupt the completion flag, `completed_at` or `first_viewed_at`.
pub struct ProgressTracker {
    clock: Clock,
    progress: Arc<dyn ProgressLedger>,
    courses: Arc<dyn CourseRepository>,
    content: Arc<dyn ContentRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressLedger>,
        courses: Arc<dyn CourseRepository>,
        content: Arc<dyn ContentRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            courses,
            content,
            quizzes,
        }
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records a lesson progress report: percent is overwritten, the time
    /// delta accumulates, and one attempt is counted.
    ///
    /// The first event reaching 100 percent completes the tuple and stamps
    /// `completed_at`; later events never undo either.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::InvalidProgress` for a percent above 100 and
    /// storage errors if the mutation cannot be applied.
    pub async fn record_progress(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
        percent: u8,
        time_delta_seconds: u32,
    ) -> Result<ProgressRecord, TrackingError> {
        let event = ProgressEvent::progress(
            student_id,
            course_id,
            content_id,
            percent,
            time_delta_seconds,
            self.now(),
        )?;

        let record = self.progress.apply_event(&event).await?;
        tracing::debug!(
            student = %student_id,
            course = %course_id,
            content = %content_id,
            percent,
            time_delta_seconds,
            "recorded lesson progress"
        );
        Ok(record)
    }

    /// Records a bare "done" report for a content unit, without a numeric
    /// percent and without counting an attempt.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::ContentNotFound` if the content id does not
    /// resolve to a unit of the supplied course, and
    /// `TrackingError::CourseNotFound` if that course is unknown to the
    /// catalog. Storage errors propagate.
    pub async fn record_completion(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
    ) -> Result<ProgressRecord, TrackingError> {
        let unit = self
            .content
            .get_content_unit(content_id)
            .await?
            .ok_or(TrackingError::ContentNotFound(content_id))?;
        if unit.course_id() != course_id {
            return Err(TrackingError::ContentNotFound(content_id));
        }
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(TrackingError::CourseNotFound(course_id))?;

        let event = ProgressEvent::completion(student_id, course_id, content_id, self.now());
        let record = self.progress.apply_event(&event).await?;
        tracing::debug!(
            student = %student_id,
            course = %course_id,
            content = %content_id,
            "recorded completion"
        );
        Ok(record)
    }

    /// Records a scored quiz submission against the quiz's owning course.
    ///
    /// A scored quiz is definitionally complete: the tuple is written with
    /// percent 100 and the completion timestamp, and the score overwrites
    /// any previous one.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::QuizNotFound` for an unknown quiz and
    /// `TrackingError::QuizNotLinked` for a quiz without an owning course;
    /// in both cases no ledger row is touched. Storage errors propagate.
    pub async fn record_quiz_score(
        &self,
        student_id: StudentId,
        quiz_id: QuizId,
        score: u32,
    ) -> Result<ProgressRecord, TrackingError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(TrackingError::QuizNotFound(quiz_id))?;
        let course_id = quiz
            .course_id()
            .ok_or(TrackingError::QuizNotLinked(quiz_id))?;

        let event = ProgressEvent::quiz_score(student_id, course_id, quiz_id, score, self.now());
        let record = self.progress.apply_event(&event).await?;
        tracing::debug!(
            student = %student_id,
            course = %course_id,
            quiz = %quiz_id,
            score,
            "recorded quiz score"
        );
        Ok(record)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
