use chrono::{DateTime, Utc};
use drivetrack_core::model::{ContentId, CourseId, ProgressEvent, ProgressRecord, StudentId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_progress_row},
};
use crate::repository::{ProgressLedger, StorageError};

const RECORD_COLUMNS: &str = r"
    student_id, course_id, content_id, kind, percent_complete,
    time_spent_seconds, attempts, is_completed, quiz_score,
    first_viewed_at, completed_at, last_accessed_at
";

#[async_trait::async_trait]
impl ProgressLedger for SqliteRepository {
    async fn apply_event(&self, event: &ProgressEvent) -> Result<ProgressRecord, StorageError> {
        let student_id = id_i64("student_id", event.student_id().value())?;
        let course_id = id_i64("course_id", event.course_id().value())?;
        let content_id = id_i64("content_id", event.content_id().value())?;

        // The inserted values are the event applied to a fresh row, so the
        // conflict arm can treat `excluded.*` as the event's deltas. One
        // statement keeps concurrent accumulation lossless and the
        // completion timestamp set-once.
        let fresh = ProgressRecord::from_event(event);

        let row = sqlx::query(&format!(
            r"
            INSERT INTO progress_records (
                student_id, course_id, content_id, kind, percent_complete,
                time_spent_seconds, attempts, is_completed, quiz_score,
                first_viewed_at, completed_at, last_accessed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(student_id, course_id, content_id) DO UPDATE SET
                -- keep kind and first_viewed_at from the original insert
                percent_complete = excluded.percent_complete,
                time_spent_seconds = progress_records.time_spent_seconds
                    + excluded.time_spent_seconds,
                attempts = progress_records.attempts + excluded.attempts,
                is_completed = MAX(progress_records.is_completed, excluded.is_completed),
                completed_at = COALESCE(progress_records.completed_at, excluded.completed_at),
                quiz_score = COALESCE(excluded.quiz_score, progress_records.quiz_score),
                last_accessed_at = excluded.last_accessed_at
            RETURNING {RECORD_COLUMNS}
            ",
        ))
        .bind(student_id)
        .bind(course_id)
        .bind(content_id)
        .bind(fresh.kind().as_str())
        .bind(i64::from(fresh.percent_complete()))
        .bind(id_i64("time_spent_seconds", fresh.time_spent_seconds())?)
        .bind(i64::from(fresh.attempts()))
        .bind(i64::from(fresh.is_completed()))
        .bind(fresh.quiz_score().map(i64::from))
        .bind(fresh.first_viewed_at())
        .bind(fresh.completed_at())
        .bind(fresh.last_accessed_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        map_progress_row(&row)
    }

    async fn get(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        content_id: ContentId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let student = id_i64("student_id", student_id.value())?;
        let course = id_i64("course_id", course_id.value())?;
        let content = id_i64("content_id", content_id.value())?;

        let row = sqlx::query(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM progress_records
            WHERE student_id = ?1 AND course_id = ?2 AND content_id = ?3
            ",
        ))
        .bind(student)
        .bind(course)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_for_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let student = id_i64("student_id", student_id.value())?;
        let course = id_i64("course_id", course_id.value())?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM progress_records
            WHERE student_id = ?1 AND course_id = ?2
            ORDER BY last_accessed_at ASC, content_id ASC
            ",
        ))
        .bind(student)
        .bind(course)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn list_student_between(
        &self,
        student_id: StudentId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let student = id_i64("student_id", student_id.value())?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM progress_records
            WHERE student_id = ?1 AND last_accessed_at >= ?2 AND last_accessed_at < ?3
            ORDER BY last_accessed_at ASC, content_id ASC
            ",
        ))
        .bind(student)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn list_course_between(
        &self,
        course_id: CourseId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let course = id_i64("course_id", course_id.value())?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM progress_records
            WHERE course_id = ?1 AND last_accessed_at >= ?2 AND last_accessed_at < ?3
            ORDER BY student_id ASC, content_id ASC
            ",
        ))
        .bind(course)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }
}
