use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::catalog::{ContentUnit, Course, Quiz};
use crate::model::ids::{ContentId, StudentId};
use crate::model::progress::{ContentKind, ProgressRecord};
use crate::time::utc_date;

//
// ─── SHARED MATH ──────────────────────────────────────────────────────────────
//

/// Course completion as a percentage; 0 when the course has no content units.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overall_progress(completed_lessons: usize, total_lessons: usize) -> f64 {
    if total_lessons == 0 {
        return 0.0;
    }
    completed_lessons as f64 / total_lessons as f64 * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn mean_percent(records: &[&ProgressRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records
        .iter()
        .map(|r| f64::from(r.percent_complete()))
        .sum();
    sum / records.len() as f64
}

//
// ─── DAILY BUCKETS ────────────────────────────────────────────────────────────
//

/// One calendar day's slice of activity, derived from the ledger.
///
/// Records bucket by `last_accessed_at` truncated to UTC date, so a record
/// touched again later moves to the newer bucket. `time_spent_seconds` is
/// the cumulative time of the records in the bucket, not time spent that
/// day in isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub lessons_completed: u32,
    pub time_spent_seconds: u64,
    pub average_percent: f64,
}

/// Buckets records into `window_days + 1` calendar days ending at `today`,
/// ascending and zero-filled: a day without activity still gets an entry.
#[must_use]
pub fn daily_buckets(
    records: &[ProgressRecord],
    today: NaiveDate,
    window_days: u32,
) -> Vec<DailyProgress> {
    let start = today - Duration::days(i64::from(window_days));

    let mut by_day: HashMap<NaiveDate, Vec<&ProgressRecord>> = HashMap::new();
    for record in records {
        by_day
            .entry(utc_date(record.last_accessed_at()))
            .or_default()
            .push(record);
    }

    start
        .iter_days()
        .take(window_days as usize + 1)
        .map(|date| {
            let day_records = by_day.get(&date).map_or(&[][..], Vec::as_slice);
            DailyProgress {
                date,
                lessons_completed: count_completed_lessons(day_records),
                time_spent_seconds: day_records
                    .iter()
                    .map(|r| r.time_spent_seconds())
                    .sum(),
                average_percent: mean_percent(day_records),
            }
        })
        .collect()
}

fn count_completed_lessons(records: &[&ProgressRecord]) -> u32 {
    u32::try_from(
        records
            .iter()
            .filter(|r| r.kind() == ContentKind::Lesson && r.is_completed())
            .count(),
    )
    .unwrap_or(u32::MAX)
}

//
// ─── COURSE SUMMARY ───────────────────────────────────────────────────────────
//

/// Per-course rollup for one student, computed on demand from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub total_quizzes: u32,
    pub completed_quizzes: u32,
    /// `None` until at least one quiz has been scored, so "no score yet"
    /// stays distinguishable from "scored zero".
    pub average_quiz_score: Option<f64>,
    pub total_time_spent_seconds: u64,
    pub overall_progress_percent: f64,
    pub last_activity_at: DateTime<Utc>,
    /// Seven calendar days ending today, ascending, zero-filled.
    pub daily_progress: Vec<DailyProgress>,
}

impl CourseSummary {
    /// Computes the summary from the course's catalog shape and the
    /// student's ledger slice for that course.
    ///
    /// `last_activity_at` falls back to `now` when the student has no
    /// records at all, keeping the field non-null for rendering.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(
        course: &Course,
        quizzes: &[Quiz],
        records: &[ProgressRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let completed_lessons = records
            .iter()
            .filter(|r| r.kind() == ContentKind::Lesson && r.is_completed())
            .count();
        let completed_quizzes = records
            .iter()
            .filter(|r| r.kind() == ContentKind::Quiz && r.is_completed())
            .count();

        let scores: Vec<f64> = records
            .iter()
            .filter(|r| r.kind() == ContentKind::Quiz)
            .filter_map(|r| r.quiz_score().map(f64::from))
            .collect();
        let average_quiz_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        Self {
            total_lessons: u32::try_from(course.content_unit_count()).unwrap_or(u32::MAX),
            completed_lessons: u32::try_from(completed_lessons).unwrap_or(u32::MAX),
            total_quizzes: u32::try_from(quizzes.len()).unwrap_or(u32::MAX),
            completed_quizzes: u32::try_from(completed_quizzes).unwrap_or(u32::MAX),
            average_quiz_score,
            total_time_spent_seconds: records.iter().map(ProgressRecord::time_spent_seconds).sum(),
            overall_progress_percent: overall_progress(
                completed_lessons,
                course.content_unit_count(),
            ),
            last_activity_at: records
                .iter()
                .map(ProgressRecord::last_accessed_at)
                .max()
                .unwrap_or(now),
            daily_progress: daily_buckets(records, utc_date(now), 6),
        }
    }
}

//
// ─── LESSON PROGRESS ──────────────────────────────────────────────────────────
//

/// One content unit joined against the student's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub content_id: ContentId,
    pub title: String,
    pub percent_complete: u8,
    pub time_spent_seconds: u64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub quiz_score: Option<u32>,
    pub attempts: u32,
    pub last_accessed_at: DateTime<Utc>,
}

impl LessonProgress {
    fn untouched(unit: &ContentUnit, now: DateTime<Utc>) -> Self {
        Self {
            content_id: unit.id(),
            title: unit.title().to_owned(),
            percent_complete: 0,
            time_spent_seconds: 0,
            is_completed: false,
            completed_at: None,
            quiz_score: None,
            attempts: 0,
            last_accessed_at: now,
        }
    }

    fn from_record(unit: &ContentUnit, record: &ProgressRecord) -> Self {
        Self {
            content_id: unit.id(),
            title: unit.title().to_owned(),
            percent_complete: record.percent_complete(),
            time_spent_seconds: record.time_spent_seconds(),
            is_completed: record.is_completed(),
            completed_at: record.completed_at(),
            quiz_score: record.quiz_score(),
            attempts: record.attempts(),
            last_accessed_at: record.last_accessed_at(),
        }
    }
}

/// Left-joins every content unit of a course against the student's ledger.
///
/// Units never touched default to zero progress with `last_accessed_at =
/// now`. Rows come back ascending by `last_accessed_at` (content id breaks
/// ties so the order is stable).
#[must_use]
pub fn lesson_progress(
    units: &[ContentUnit],
    records: &[ProgressRecord],
    now: DateTime<Utc>,
) -> Vec<LessonProgress> {
    let by_content: HashMap<ContentId, &ProgressRecord> =
        records.iter().map(|r| (r.content_id(), r)).collect();

    let mut rows: Vec<LessonProgress> = units
        .iter()
        .map(|unit| match by_content.get(&unit.id()) {
            Some(record) => LessonProgress::from_record(unit, record),
            None => LessonProgress::untouched(unit, now),
        })
        .collect();

    rows.sort_by_key(|row| (row.last_accessed_at, row.content_id));
    rows
}

//
// ─── DAILY ANALYTICS ──────────────────────────────────────────────────────────
//

/// Single-day, cross-course aggregate for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDailyAnalytics {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub total_time_spent_seconds: u64,
    pub lessons_completed: u32,
    pub average_progress: f64,
    pub total_attempts: u32,
}

impl StudentDailyAnalytics {
    /// Aggregates the records whose `last_accessed_at` falls on `date`.
    #[must_use]
    pub fn for_day(student_id: StudentId, date: NaiveDate, records: &[ProgressRecord]) -> Self {
        let day_records: Vec<&ProgressRecord> = records
            .iter()
            .filter(|r| utc_date(r.last_accessed_at()) == date)
            .collect();

        Self {
            student_id,
            date,
            total_time_spent_seconds: day_records
                .iter()
                .map(|r| r.time_spent_seconds())
                .sum(),
            lessons_completed: count_completed_lessons(&day_records),
            average_progress: mean_percent(&day_records),
            total_attempts: day_records.iter().map(|r| r.attempts()).sum(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
