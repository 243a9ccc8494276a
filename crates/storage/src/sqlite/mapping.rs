use drivetrack_core::model::{
    ContentId, ContentKind, ContentUnit, CourseId, ProgressRecord, Quiz, QuizId, StudentId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn content_id_from_i64(v: i64) -> Result<ContentId, StorageError> {
    Ok(ContentId::new(i64_to_u64("content_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

/// Converts a stored kind tag back into `ContentKind`.
/// This must stay consistent with `ContentKind::as_str`.
pub(crate) fn parse_content_kind(s: &str) -> Result<ContentKind, StorageError> {
    match s {
        "lesson" => Ok(ContentKind::Lesson),
        "quiz" => Ok(ContentKind::Quiz),
        _ => Err(StorageError::Serialization(format!("invalid kind: {s}"))),
    }
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = parse_content_kind(kind_str.as_str())?;

    let percent_i64: i64 = row.try_get("percent_complete").map_err(ser)?;
    let percent = u8::try_from(percent_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid percent: {percent_i64}")))?;

    let time_i64: i64 = row.try_get("time_spent_seconds").map_err(ser)?;
    let time_spent = i64_to_u64("time_spent_seconds", time_i64)?;

    let attempts_i64: i64 = row.try_get("attempts").map_err(ser)?;
    let attempts = u32::try_from(attempts_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid attempts: {attempts_i64}")))?;

    let quiz_score = row
        .try_get::<Option<i64>, _>("quiz_score")
        .map_err(ser)?
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| StorageError::Serialization(format!("invalid quiz score: {v}")))
        })
        .transpose()?;

    let is_completed_i64: i64 = row.try_get("is_completed").map_err(ser)?;

    ProgressRecord::from_persisted(
        student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        content_id_from_i64(row.try_get::<i64, _>("content_id").map_err(ser)?)?,
        kind,
        percent,
        time_spent,
        attempts,
        is_completed_i64 != 0,
        quiz_score,
        row.try_get("first_viewed_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("last_accessed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_unit_row(row: &sqlx::sqlite::SqliteRow) -> Result<ContentUnit, StorageError> {
    ContentUnit::new(
        content_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<Quiz, StorageError> {
    let course_id = row
        .try_get::<Option<i64>, _>("course_id")
        .map_err(ser)?
        .map(course_id_from_i64)
        .transpose()?;
    Quiz::new(
        quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id,
        row.try_get::<String, _>("title").map_err(ser)?,
    )
    .map_err(ser)
}
