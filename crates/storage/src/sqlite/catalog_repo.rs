use drivetrack_core::model::{ContentId, ContentUnit, Course, CourseId, Quiz, QuizId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{content_id_from_i64, id_i64, map_quiz_row, map_unit_row, ser},
};
use crate::repository::{ContentRepository, CourseRepository, QuizRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let course_id = id_i64("course_id", id.value())?;

        let row = sqlx::query("SELECT id, title FROM courses WHERE id = ?1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let title: String = row.try_get("title").map_err(ser)?;

        let unit_rows = sqlx::query("SELECT id FROM content_units WHERE course_id = ?1 ORDER BY id")
            .bind(course_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut unit_ids: Vec<ContentId> = Vec::with_capacity(unit_rows.len());
        for unit_row in &unit_rows {
            unit_ids.push(content_id_from_i64(
                unit_row.try_get::<i64, _>("id").map_err(ser)?,
            )?);
        }

        Ok(Some(Course::new(id, title, unit_ids).map_err(ser)?))
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        // Only the title row is written; the unit list a course reports is
        // derived from `content_units` at read time.
        sqlx::query(
            r"
            INSERT INTO courses (id, title)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(id_i64("course_id", course.id().value())?)
        .bind(course.title())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn get_content_unit(&self, id: ContentId) -> Result<Option<ContentUnit>, StorageError> {
        let row = sqlx::query("SELECT id, course_id, title FROM content_units WHERE id = ?1")
            .bind(id_i64("content_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_unit_row).transpose()
    }

    async fn list_units_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ContentUnit>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, course_id, title FROM content_units WHERE course_id = ?1 ORDER BY id",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_unit_row).collect()
    }

    async fn upsert_content_unit(&self, unit: &ContentUnit) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO content_units (id, course_id, title)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title
            ",
        )
        .bind(id_i64("content_id", unit.id().value())?)
        .bind(id_i64("course_id", unit.course_id().value())?)
        .bind(unit.title())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query("SELECT id, course_id, title FROM quizzes WHERE id = ?1")
            .bind(id_i64("quiz_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, course_id, title FROM quizzes WHERE course_id = ?1 ORDER BY id",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let course_id = quiz
            .course_id()
            .map(|c| id_i64("course_id", c.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO quizzes (id, course_id, title)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title
            ",
        )
        .bind(id_i64("quiz_id", quiz.id().value())?)
        .bind(course_id)
        .bind(quiz.title())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
