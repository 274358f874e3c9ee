//! Quiz definitions (catalog side) and recorded attempts (engine side).

use std::collections::HashMap;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{AttemptId, CourseId, QuizId, UserId};

/// Minimum percentage for a quiz attempt to count as passed. Inclusive.
pub const PASS_THRESHOLD: f64 = 75.0;

/// Point value assumed per question when a quiz defines no explicit points.
pub const DEFAULT_QUESTION_POINTS: u32 = 10;

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question text shown to the learner.
    pub text: String,
    /// Answer options, indexed from zero.
    pub options: Vec<String>,
    /// Accepted answer indices. Empty means the legacy single-answer field
    /// decides instead.
    #[serde(default)]
    pub correct_answers: Vec<usize>,
    /// Legacy single correct answer index, used when `correct_answers` is
    /// empty.
    #[serde(default)]
    pub correct_answer: usize,
    /// Point value. Zero counts as "unscored"; when every question of a
    /// quiz is unscored, scoring falls back to a uniform
    /// [`DEFAULT_QUESTION_POINTS`] per question.
    #[serde(default)]
    pub points: u32,
}

impl QuizQuestion {
    /// Returns `true` if the submitted answer index is correct.
    ///
    /// A non-empty multi-answer list is checked by membership; otherwise the
    /// legacy single index decides.
    #[must_use]
    pub fn is_correct(&self, answer: usize) -> bool {
        if self.correct_answers.is_empty() {
            self.correct_answer == answer
        } else {
            self.correct_answers.contains(&answer)
        }
    }

    /// The answer index reported back to the learner as "the" correct one:
    /// the first accepted index, or the legacy field.
    #[must_use]
    pub fn display_answer(&self) -> usize {
        self.correct_answers
            .first()
            .copied()
            .unwrap_or(self.correct_answer)
    }
}

/// A quiz as read from the course catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    /// Quiz identifier.
    #[serde(default)]
    pub id: QuizId,
    /// Course this quiz belongs to.
    pub course_id: CourseId,
    /// Display title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Questions in presentation order.
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Sum of the declared question point values. Zero means the quiz uses
    /// the uniform default scoring.
    #[must_use]
    pub fn declared_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// An immutable record of one scored submission.
///
/// `max_points` is captured at scoring time so the attempt's percentage is
/// self-contained even if the quiz definition changes later.
#[derive(Debug, Clone, Serialize)]
pub struct QuizAttempt {
    /// Attempt identifier.
    pub id: AttemptId,
    /// The quiz that was attempted.
    pub quiz_id: QuizId,
    /// The submitting user.
    pub user_id: UserId,
    /// Submitted answer indices, in question order.
    pub answers: Vec<usize>,
    /// Points earned.
    pub score: u32,
    /// Number of questions in the quiz at scoring time.
    pub total_questions: u32,
    /// Total points achievable at scoring time.
    pub max_points: u32,
    /// Submission timestamp.
    pub attempted_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// The attempt's score as a percentage of the achievable points.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.max_points == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.max_points) * 100.0
        }
    }

    /// Whether the attempt met the pass threshold.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.percentage() >= PASS_THRESHOLD
    }

    /// Whether the attempt scored 100%.
    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.max_points > 0 && self.score == self.max_points
    }
}

/// Write-once store of quiz attempts, bucketed per user.
#[derive(Debug, Default)]
pub struct AttemptStore {
    attempts: RwLock<HashMap<UserId, Vec<QuizAttempt>>>,
}

impl AttemptStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished attempt.
    pub async fn record(&self, attempt: QuizAttempt) {
        let mut map = self.attempts.write().await;
        map.entry(attempt.user_id).or_default().push(attempt);
    }

    /// Returns the user's most recent attempt at a quiz, if any.
    pub async fn latest(&self, user_id: UserId, quiz_id: QuizId) -> Option<QuizAttempt> {
        let map = self.attempts.read().await;
        map.get(&user_id).and_then(|attempts| {
            attempts
                .iter()
                .filter(|a| a.quiz_id == quiz_id)
                .max_by_key(|a| a.attempted_at)
                .cloned()
        })
    }

    /// Returns all of a user's attempts, newest first.
    pub async fn for_user(&self, user_id: UserId) -> Vec<QuizAttempt> {
        let map = self.attempts.read().await;
        let mut attempts = map.get(&user_id).cloned().unwrap_or_default();
        attempts.sort_by_key(|a| std::cmp::Reverse(a.attempted_at));
        attempts
    }

    /// Counts the distinct quizzes for which the user has at least one
    /// passing attempt.
    pub async fn distinct_passed(&self, user_id: UserId) -> usize {
        let map = self.attempts.read().await;
        let Some(attempts) = map.get(&user_id) else {
            return 0;
        };
        let passed: HashSet<QuizId> = attempts
            .iter()
            .filter(|a| a.passed())
            .map(|a| a.quiz_id)
            .collect();
        passed.len()
    }

    /// Counts the user's attempts scored at 100%.
    pub async fn perfect_count(&self, user_id: UserId) -> usize {
        let map = self.attempts.read().await;
        map.get(&user_id)
            .map(|attempts| attempts.iter().filter(|a| a.is_perfect()).count())
            .unwrap_or(0)
    }
}
