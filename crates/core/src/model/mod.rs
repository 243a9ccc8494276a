mod catalog;
mod ids;
mod progress;
mod rollup;

pub use catalog::{CatalogError, ContentUnit, Course, Quiz};
pub use ids::{ContentId, CourseId, ParseIdError, QuizId, StudentId};
pub use progress::{ContentKind, ProgressError, ProgressEvent, ProgressRecord};
pub use rollup::{
    CourseSummary, DailyProgress, LessonProgress, StudentDailyAnalytics, daily_buckets,
    lesson_progress, overall_progress,
};
