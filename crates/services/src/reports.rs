use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use drivetrack_core::{
    model::{
        ContentKind, CourseId, CourseSummary, DailyProgress, LessonProgress, ProgressRecord,
        StudentDailyAnalytics, StudentId, daily_buckets, lesson_progress, overall_progress,
    },
    time::{Clock, utc_date, utc_day_bounds},
};
use storage::repository::{ContentRepository, CourseRepository, ProgressLedger, QuizRepository};

use crate::error::ReportError;

/// The read-side façade: validates caller-supplied ids against the catalog,
/// fetches ledger slices, and delegates to the pure rollup math.
///
/// All operations are read-only and side-effect-free. An unknown course is
/// `ReportError::CourseNotFound`; a known course with no activity renders as
/// zero progress and empty or zero-filled lists, never as an error.
pub struct ProgressReports {
    clock: Clock,
    progress: Arc<dyn ProgressLedger>,
    courses: Arc<dyn CourseRepository>,
    content: Arc<dyn ContentRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl ProgressReports {
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

    /// Per-course rollup for one student: lesson and quiz completion counts,
    /// average quiz score, cumulative time, overall percentage and the last
    /// seven days of activity.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::CourseNotFound` for an unknown course id, or
    /// storage errors from the ledger.
    pub async fn course_summary(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<CourseSummary, ReportError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(ReportError::CourseNotFound(course_id))?;
        let quizzes = self.quizzes.list_quizzes_for_course(course_id).await?;
        let records = self.progress.list_for_course(student_id, course_id).await?;

        Ok(CourseSummary::compute(
            &course,
            &quizzes,
            &records,
            self.now(),
        ))
    }

    /// Every content unit of the course left-joined against the student's
    /// ledger, ascending by last access. Untouched units come back with zero
    /// progress.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::CourseNotFound` for an unknown course id, or
    /// storage errors from the ledger.
    pub async fn lesson_progress(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, ReportError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(ReportError::CourseNotFound(course_id))?;
        let units = self.content.list_units_for_course(course_id).await?;
        let records = self.progress.list_for_course(student_id, course_id).await?;

        Ok(lesson_progress(&units, &records, self.now()))
    }

    /// Per-day activity for the window `[today - window_days, today]`,
    /// ascending and zero-filled: always `window_days + 1` entries.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::CourseNotFound` for an unknown course id, or
    /// storage errors from the ledger.
    pub async fn daily_progress(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        window_days: u32,
    ) -> Result<Vec<DailyProgress>, ReportError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(ReportError::CourseNotFound(course_id))?;
        let records = self.progress.list_for_course(student_id, course_id).await?;

        Ok(daily_buckets(&records, utc_date(self.now()), window_days))
    }

    /// Single-day, cross-course aggregate for one student.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the ledger.
    pub async fn student_daily_analytics(
        &self,
        student_id: StudentId,
        date: NaiveDate,
    ) -> Result<StudentDailyAnalytics, ReportError> {
        let (from, to) = utc_day_bounds(date);
        let records = self
            .progress
            .list_student_between(student_id, from, to)
            .await?;

        Ok(StudentDailyAnalytics::for_day(student_id, date, &records))
    }

    /// One aggregate per distinct student with any record touched on `date`
    /// in the course, ascending by student id.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::CourseNotFound` for an unknown course id, or
    /// storage errors from the ledger.
    pub async fn class_daily_analytics(
        &self,
        course_id: CourseId,
        date: NaiveDate,
    ) -> Result<Vec<StudentDailyAnalytics>, ReportError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(ReportError::CourseNotFound(course_id))?;

        let (from, to) = utc_day_bounds(date);
        let records = self.progress.list_course_between(course_id, from, to).await?;

        let mut by_student: BTreeMap<StudentId, Vec<ProgressRecord>> = BTreeMap::new();
        for record in records {
            by_student.entry(record.student_id()).or_default().push(record);
        }

        Ok(by_student
            .into_iter()
            .map(|(student_id, records)| StudentDailyAnalytics::for_day(student_id, date, &records))
            .collect())
    }

    /// The standalone course completion percentage; 0 for a course with no
    /// content units.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::CourseNotFound` for an unknown course id, or
    /// storage errors from the ledger.
    pub async fn overall_progress_percent(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<f64, ReportError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(ReportError::CourseNotFound(course_id))?;
        let records = self.progress.list_for_course(student_id, course_id).await?;

        let completed = records
            .iter()
            .filter(|r| r.kind() == ContentKind::Lesson && r.is_completed())
            .count();
        Ok(overall_progress(completed, course.content_unit_count()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use drivetrack_core::model::{ContentId, ContentUnit, Course, Quiz, QuizId};
    use drivetrack_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn reports_with(repo: &InMemoryRepository) -> ProgressReports {
        ProgressReports::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn seed_course(repo: &InMemoryRepository, unit_ids: &[u64]) {
        let ids: Vec<ContentId> = unit_ids.iter().map(|id| ContentId::new(*id)).collect();
        let course = Course::new(CourseId::new(1), "Highway Code", ids).unwrap();
        repo.upsert_course(&course).await.unwrap();
        for id in unit_ids {
            repo.upsert_content_unit(
                &ContentUnit::new(ContentId::new(*id), CourseId::new(1), format!("Unit {id}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn unknown_course_is_an_error_not_a_zero_summary() {
        let repo = InMemoryRepository::new();
        let reports = reports_with(&repo);

        let err = reports
            .course_summary(StudentId::new(1), CourseId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn contentless_course_reports_zero_percent() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[]).await;
        let reports = reports_with(&repo);

        let summary = reports
            .course_summary(StudentId::new(1), CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(summary.overall_progress_percent, 0.0);
        assert_eq!(summary.total_lessons, 0);

        let percent = reports
            .overall_progress_percent(StudentId::new(1), CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(percent, 0.0);
    }

    #[tokio::test]
    async fn daily_progress_window_is_always_full() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[10]).await;
        let reports = reports_with(&repo);

        let days = reports
            .daily_progress(StudentId::new(1), CourseId::new(1), 7)
            .await
            .unwrap();

        assert_eq!(days.len(), 8);
        assert!(days.windows(2).all(|pair| pair[0].date < pair[1].date));
        assert!(days.iter().all(|d| d.time_spent_seconds == 0));
    }

    #[tokio::test]
    async fn class_analytics_lists_distinct_students_for_the_day() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[10]).await;
        let reports = reports_with(&repo);
        let quiz = Quiz::new(QuizId::new(20), Some(CourseId::new(1)), "Signs").unwrap();
        repo.upsert_quiz(&quiz).await.unwrap();

        let now = fixed_now();
        for (student, percent) in [(1_u64, 100_u8), (2, 40)] {
            repo.apply_event(
                &drivetrack_core::model::ProgressEvent::progress(
                    StudentId::new(student),
                    CourseId::new(1),
                    ContentId::new(10),
                    percent,
                    60,
                    now,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        }

        let entries = reports
            .class_daily_analytics(CourseId::new(1), utc_date(now))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].student_id, StudentId::new(1));
        assert_eq!(entries[0].lessons_completed, 1);
        assert_eq!(entries[1].student_id, StudentId::new(2));
        assert_eq!(entries[1].average_progress, 40.0);

        let empty_day = reports
            .class_daily_analytics(CourseId::new(1), utc_date(now).pred_opt().unwrap())
            .await
            .unwrap();
        assert!(empty_day.is_empty());
    }
}
