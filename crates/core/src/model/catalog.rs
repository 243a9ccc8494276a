use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ContentId, CourseId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course title cannot be empty")]
    EmptyCourseTitle,

    #[error("content unit title cannot be empty")]
    EmptyContentTitle,

    #[error("quiz title cannot be empty")]
    EmptyQuizTitle,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course as seen from the progress core: a title and the ordered list of
/// its content units. Course authoring lives elsewhere; this is only the
/// collaborator boundary shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    title: String,
    content_unit_ids: Vec<ContentId>,
}

impl Course {
    /// Creates a course boundary record.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyCourseTitle` if the title is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        content_unit_ids: Vec<ContentId>,
    ) -> Result<Self, CatalogError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyCourseTitle);
        }
        Ok(Self {
            id,
            title,
            content_unit_ids,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content_unit_ids(&self) -> &[ContentId] {
        &self.content_unit_ids
    }

    /// Number of content units (the denominator of course completion).
    #[must_use]
    pub fn content_unit_count(&self) -> usize {
        self.content_unit_ids.len()
    }

    #[must_use]
    pub fn contains_unit(&self, id: ContentId) -> bool {
        self.content_unit_ids.contains(&id)
    }
}

//
// ─── CONTENT UNIT ──────────────────────────────────────────────────────────────
//

/// One lesson-sized unit of course content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    id: ContentId,
    course_id: CourseId,
    title: String,
}

impl ContentUnit {
    /// Creates a content unit boundary record.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyContentTitle` if the title is blank.
    pub fn new(
        id: ContentId,
        course_id: CourseId,
        title: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyContentTitle);
        }
        Ok(Self {
            id,
            course_id,
            title,
        })
    }

    #[must_use]
    pub fn id(&self) -> ContentId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A quiz and its owning course, if any.
///
/// `course_id` is `None` for a quiz that was authored but never attached to
/// a course; scoring such a quiz is an invalid-state error in the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    id: QuizId,
    course_id: Option<CourseId>,
    title: String,
}

impl Quiz {
    /// Creates a quiz boundary record.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyQuizTitle` if the title is blank.
    pub fn new(
        id: QuizId,
        course_id: Option<CourseId>,
        title: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyQuizTitle);
        }
        Ok(Self {
            id,
            course_id,
            title,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> Option<CourseId> {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_requires_a_title() {
        let err = Course::new(CourseId::new(1), "  ", vec![]).unwrap_err();
        assert_eq!(err, CatalogError::EmptyCourseTitle);
    }

    #[test]
    fn course_counts_and_finds_units() {
        let course = Course::new(
            CourseId::new(1),
            "Road Signs",
            vec![ContentId::new(1), ContentId::new(2)],
        )
        .unwrap();

        assert_eq!(course.content_unit_count(), 2);
        assert!(course.contains_unit(ContentId::new(2)));
        assert!(!course.contains_unit(ContentId::new(9)));
    }

    #[test]
    fn quiz_may_be_unlinked() {
        let quiz = Quiz::new(QuizId::new(4), None, "Final Exam").unwrap();
        assert_eq!(quiz.course_id(), None);
    }
}
