//! Read-only course catalog boundary.
//!
//! Courses, quizzes, questions, and enrollment are facts owned by other
//! services; the engine only reads them. [`CourseCatalog`] is the consuming
//! interface and [`InMemoryCatalog`] the implementation used by tests and
//! local runs, optionally seeded from a JSON file.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;

use super::quiz::Quiz;
use super::{CourseId, QuizId, UserId};
use crate::error::EngineError;

/// Read-only view of courses, quizzes, and enrollment.
///
/// Implementations must be cheap to call: the engine consults the catalog
/// on every quiz submission and every leaderboard refresh.
pub trait CourseCatalog: Send + Sync + std::fmt::Debug {
    /// Looks up a quiz with its questions.
    fn quiz(&self, quiz_id: QuizId) -> Option<Quiz>;

    /// Returns all quizzes of a course.
    fn quizzes_for_course(&self, course_id: CourseId) -> Vec<Quiz>;

    /// Returns a course's display name.
    fn course_name(&self, course_id: CourseId) -> Option<String>;

    /// Returns `true` if the user is enrolled in the course.
    fn is_enrolled(&self, user_id: UserId, course_id: CourseId) -> bool;

    /// Returns the courses the user is enrolled in.
    fn enrolled_courses(&self, user_id: UserId) -> Vec<CourseId>;
}

#[derive(Debug, Default)]
struct CatalogInner {
    courses: HashMap<CourseId, String>,
    quizzes: HashMap<QuizId, Quiz>,
    enrollments: HashMap<UserId, HashSet<CourseId>>,
}

/// In-memory [`CourseCatalog`] for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogInner>,
}

/// One course in a catalog seed file.
#[derive(Debug, Deserialize)]
pub struct CourseSeed {
    /// Course identifier.
    pub id: CourseId,
    /// Display name.
    pub name: String,
    /// Quizzes belonging to the course. Their `course_id` is overwritten
    /// with the seed course's id.
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    /// Users enrolled in the course.
    #[serde(default)]
    pub enrolled: Vec<UserId>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a JSON array of [`CourseSeed`]s.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] when the document is
    /// malformed.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let seeds: Vec<CourseSeed> =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
        let catalog = Self::new();
        for seed in seeds {
            catalog.add_course(seed.id, seed.name);
            for mut quiz in seed.quizzes {
                quiz.course_id = seed.id;
                catalog.add_quiz(quiz);
            }
            for user in seed.enrolled {
                catalog.enroll(user, seed.id);
            }
        }
        Ok(catalog)
    }

    /// Registers a course.
    pub fn add_course(&self, course_id: CourseId, name: impl Into<String>) {
        let mut inner = self.write();
        inner.courses.insert(course_id, name.into());
    }

    /// Registers a quiz under its course.
    pub fn add_quiz(&self, quiz: Quiz) {
        let mut inner = self.write();
        inner.quizzes.insert(quiz.id, quiz);
    }

    /// Enrolls a user in a course.
    pub fn enroll(&self, user_id: UserId, course_id: CourseId) {
        let mut inner = self.write();
        inner.enrollments.entry(user_id).or_default().insert(course_id);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CatalogInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CatalogInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CourseCatalog for InMemoryCatalog {
    fn quiz(&self, quiz_id: QuizId) -> Option<Quiz> {
        self.read().quizzes.get(&quiz_id).cloned()
    }

    fn quizzes_for_course(&self, course_id: CourseId) -> Vec<Quiz> {
        self.read()
            .quizzes
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect()
    }

    fn course_name(&self, course_id: CourseId) -> Option<String> {
        self.read().courses.get(&course_id).cloned()
    }

    fn is_enrolled(&self, user_id: UserId, course_id: CourseId) -> bool {
        self.read()
            .enrollments
            .get(&user_id)
            .is_some_and(|courses| courses.contains(&course_id))
    }

    fn enrolled_courses(&self, user_id: UserId) -> Vec<CourseId> {
        self.read()
            .enrollments
            .get(&user_id)
            .map(|courses| courses.iter().copied().collect())
            .unwrap_or_default()
    }
}
