//! Quiz submission and attempt DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::QuizAttempt;
use crate::service::ScoreResult;
use crate::service::quiz::QuestionResult;

/// Request body for `POST /quizzes/{id}/submit`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitQuizRequest {
    /// The submitting user.
    pub user_id: Uuid,
    /// Answer indices in question order.
    pub answers: Vec<usize>,
}

/// Per-question correctness breakdown.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResultDto {
    /// Question position within the quiz.
    pub index: usize,
    /// Whether the submitted answer was accepted.
    pub correct: bool,
    /// The submitted answer index.
    pub submitted: usize,
    /// The answer index reported as correct.
    pub expected: usize,
    /// Points earned on this question.
    pub points_earned: u32,
    /// Points achievable on this question.
    pub max_points: u32,
}

impl From<&QuestionResult> for QuestionResultDto {
    fn from(result: &QuestionResult) -> Self {
        Self {
            index: result.index,
            correct: result.correct,
            submitted: result.submitted,
            expected: result.expected,
            points_earned: result.points_earned,
            max_points: result.max_points,
        }
    }
}

/// Response body for `POST /quizzes/{id}/submit`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreResultResponse {
    /// The recorded attempt.
    pub attempt_id: Uuid,
    /// Points earned.
    pub score: u32,
    /// Number of questions in the quiz.
    pub total_questions: u32,
    /// Total points achievable.
    pub total_points: u32,
    /// Score as a percentage of `total_points`.
    pub percentage: f64,
    /// Whether the pass threshold was met.
    pub passed: bool,
    /// Certificate reference when the owning course is complete.
    pub certificate: Option<String>,
    /// When a retry becomes allowed. Set only on failure.
    pub next_attempt_allowed_at: Option<DateTime<Utc>>,
    /// Per-question breakdown in submission order.
    pub questions: Vec<QuestionResultDto>,
}

impl From<ScoreResult> for ScoreResultResponse {
    fn from(result: ScoreResult) -> Self {
        Self {
            attempt_id: *result.attempt_id.as_uuid(),
            score: result.score,
            total_questions: result.total_questions,
            total_points: result.total_points,
            percentage: result.percentage,
            passed: result.passed,
            certificate: result.certificate,
            next_attempt_allowed_at: result.next_attempt_allowed_at,
            questions: result.questions.iter().map(QuestionResultDto::from).collect(),
        }
    }
}

/// One attempt in an attempt history response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttemptDto {
    /// Attempt identifier.
    pub attempt_id: Uuid,
    /// The attempted quiz.
    pub quiz_id: Uuid,
    /// Points earned.
    pub score: u32,
    /// Number of questions at scoring time.
    pub total_questions: u32,
    /// Points achievable at scoring time.
    pub max_points: u32,
    /// Score percentage.
    pub percentage: f64,
    /// Whether the attempt passed.
    pub passed: bool,
    /// Submission timestamp.
    pub attempted_at: DateTime<Utc>,
}

impl From<&QuizAttempt> for AttemptDto {
    fn from(attempt: &QuizAttempt) -> Self {
        Self {
            attempt_id: *attempt.id.as_uuid(),
            quiz_id: *attempt.quiz_id.as_uuid(),
            score: attempt.score,
            total_questions: attempt.total_questions,
            max_points: attempt.max_points,
            percentage: attempt.percentage(),
            passed: attempt.passed(),
            attempted_at: attempt.attempted_at,
        }
    }
}
