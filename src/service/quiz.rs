//! Quiz submission pipeline: authorization, cooldown, scoring, progress.
//!
//! The per-(user, quiz) flow is: eligible → submitted → passed or
//! failed-cooling-down → eligible again. A failed attempt starts a
//! 30-minute cooldown during which resubmissions are rejected without
//! creating an attempt record.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::quiz::{DEFAULT_QUESTION_POINTS, PASS_THRESHOLD};
use crate::domain::{AttemptId, CourseId, CourseProgress, QuizAttempt, QuizId, UserId};
use crate::error::EngineError;
use crate::service::GamificationService;

/// Minutes a user must wait after a failed attempt before retrying.
pub const COOLDOWN_MINUTES: i64 = 30;

/// Per-question correctness breakdown returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
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

/// Outcome of a scored quiz submission.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// The recorded attempt.
    pub attempt_id: AttemptId,
    /// Points earned.
    pub score: u32,
    /// Number of questions in the quiz.
    pub total_questions: u32,
    /// Total points achievable.
    pub total_points: u32,
    /// Score as a percentage of `total_points`.
    pub percentage: f64,
    /// Whether the pass threshold was met (inclusive).
    pub passed: bool,
    /// Certificate reference when the owning course is complete.
    pub certificate: Option<String>,
    /// When a retry becomes allowed. Set only on failure.
    pub next_attempt_allowed_at: Option<DateTime<Utc>>,
    /// Per-question breakdown in submission order.
    pub questions: Vec<QuestionResult>,
}

/// Orchestrates quiz submissions and their downstream effects.
///
/// Scoring itself is pure; everything stateful (attempt records, streaks,
/// points, course progress) is delegated to the gamification service and
/// the stores it owns.
#[derive(Debug, Clone)]
pub struct QuizService {
    gamification: Arc<GamificationService>,
}

impl QuizService {
    /// Creates a new quiz service on top of the gamification engine.
    #[must_use]
    pub fn new(gamification: Arc<GamificationService>) -> Self {
        Self { gamification }
    }

    /// Scores a quiz submission for the current instant.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_at`].
    pub async fn submit(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
        answers: &[usize],
    ) -> Result<ScoreResult, EngineError> {
        self.submit_at(quiz_id, user_id, answers, Utc::now()).await
    }

    /// Scores a quiz submission as of an explicit instant.
    ///
    /// Answers are paired with questions in submission order, up to the
    /// shorter of the two lists. When no question declares explicit points
    /// the quiz is scored uniformly at [`DEFAULT_QUESTION_POINTS`] per
    /// question. The attempt is persisted once scoring completes, pass or
    /// fail; a submission rejected for cooldown leaves no record.
    ///
    /// # Errors
    ///
    /// - [`EngineError::QuizNotFound`] when the quiz is not in the catalog.
    /// - [`EngineError::NotEnrolled`] when the user is not enrolled in the
    ///   quiz's course.
    /// - [`EngineError::CooldownActive`] when the most recent attempt
    ///   failed less than [`COOLDOWN_MINUTES`] ago.
    pub async fn submit_at(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
        answers: &[usize],
        now: DateTime<Utc>,
    ) -> Result<ScoreResult, EngineError> {
        let quiz = self
            .gamification
            .catalog()
            .quiz(quiz_id)
            .ok_or(EngineError::QuizNotFound(quiz_id))?;

        if !self
            .gamification
            .catalog()
            .is_enrolled(user_id, quiz.course_id)
        {
            return Err(EngineError::NotEnrolled {
                user_id,
                course_id: quiz.course_id,
            });
        }

        if let Some(last) = self.gamification.attempts().latest(user_id, quiz_id).await {
            let retry_at = last.attempted_at + Duration::minutes(COOLDOWN_MINUTES);
            if last.percentage() < PASS_THRESHOLD && now < retry_at {
                return Err(EngineError::CooldownActive { retry_at });
            }
        }

        // Score answers against questions, paired in order.
        let uniform = quiz.declared_points() == 0;
        let mut score: u32 = 0;
        let mut total_points: u32 = if uniform {
            u32::try_from(quiz.questions.len()).unwrap_or(u32::MAX) * DEFAULT_QUESTION_POINTS
        } else {
            0
        };
        let mut questions = Vec::with_capacity(quiz.questions.len().min(answers.len()));
        for (index, (question, &answer)) in quiz.questions.iter().zip(answers.iter()).enumerate() {
            let max_points = if uniform {
                DEFAULT_QUESTION_POINTS
            } else {
                question.points
            };
            if !uniform {
                total_points += max_points;
            }
            let correct = question.is_correct(answer);
            let points_earned = if correct { max_points } else { 0 };
            score += points_earned;
            questions.push(QuestionResult {
                index,
                correct,
                submitted: answer,
                expected: question.display_answer(),
                points_earned,
                max_points,
            });
        }

        let attempt = QuizAttempt {
            id: AttemptId::new(),
            quiz_id,
            user_id,
            answers: answers.to_vec(),
            score,
            total_questions: u32::try_from(quiz.questions.len()).unwrap_or(u32::MAX),
            max_points: total_points,
            attempted_at: now,
        };
        let attempt_id = attempt.id;
        self.gamification.attempts().record(attempt).await;

        let percentage = if total_points > 0 {
            f64::from(score) / f64::from(total_points) * 100.0
        } else {
            0.0
        };
        let passed = percentage >= PASS_THRESHOLD;

        let mut certificate = None;
        let mut next_attempt_allowed_at = None;

        if passed {
            self.gamification
                .handle_quiz_result(user_id, quiz_id, percentage, true)
                .await?;

            match self.update_course_progress(user_id, quiz.course_id).await {
                Ok(cert) => certificate = cert,
                Err(e) => {
                    tracing::warn!(%user_id, course_id = %quiz.course_id, error = %e,
                        "progress update failed after quiz pass");
                }
            }
        } else {
            self.gamification
                .handle_quiz_result(user_id, quiz_id, percentage, false)
                .await?;
            next_attempt_allowed_at = Some(now + Duration::minutes(COOLDOWN_MINUTES));
        }

        Ok(ScoreResult {
            attempt_id,
            score,
            total_questions: u32::try_from(quiz.questions.len()).unwrap_or(u32::MAX),
            total_points,
            percentage,
            passed,
            certificate,
            next_attempt_allowed_at,
            questions,
        })
    }

    /// Returns a user's attempt history, newest first.
    pub async fn attempts_for(&self, user_id: UserId) -> Vec<QuizAttempt> {
        self.gamification.attempts().for_user(user_id).await
    }

    /// Recomputes a course's progress as passed quizzes over total quizzes
    /// (most recent attempt per quiz decides). At 100% the course is marked
    /// complete, a certificate reference is issued once, and the
    /// course-completion rewards fire.
    ///
    /// Returns the certificate reference when the course is complete.
    /// Courses without quizzes are left untouched by this path.
    async fn update_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<String>, EngineError> {
        let quizzes = self.gamification.catalog().quizzes_for_course(course_id);
        if quizzes.is_empty() {
            return Ok(None);
        }

        let mut passed_quizzes = 0_usize;
        for quiz in &quizzes {
            if let Some(latest) = self.gamification.attempts().latest(user_id, quiz.id).await
                && latest.passed()
            {
                passed_quizzes += 1;
            }
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = {
            let ratio = passed_quizzes as f64 / quizzes.len() as f64;
            (ratio * 100.0).round() as u32
        };

        let mut row = self
            .gamification
            .progress()
            .get(user_id, course_id)
            .await
            .unwrap_or_else(|| CourseProgress::new(user_id, course_id));
        row.percent = percent;
        row.last_activity = Utc::now();

        let newly_completed = percent >= 100 && !row.completed;
        if newly_completed {
            row.completed = true;
            row.certificate = Some(format!(
                "certificates/{user_id}_{course_id}_certificate.pdf"
            ));
        }
        let certificate = row.certificate.clone();
        let completed = row.completed;
        self.gamification.progress().upsert(row).await;

        if newly_completed {
            self.gamification
                .handle_course_completion(user_id, course_id, certificate.clone())
                .await?;
        }

        Ok(if completed { certificate } else { None })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        BadgeCatalog, EventBus, InMemoryCatalog, Quiz, QuizQuestion,
    };

    struct Harness {
        quiz_service: QuizService,
        gamification: Arc<GamificationService>,
        user: UserId,
        course: CourseId,
    }

    fn question(correct: usize, points: u32) -> QuizQuestion {
        QuizQuestion {
            text: "q".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answers: Vec::new(),
            correct_answer: correct,
            points,
        }
    }

    /// One enrolled user, one course containing `quizzes`.
    fn harness(quizzes: Vec<Quiz>) -> Harness {
        let catalog = Arc::new(InMemoryCatalog::new());
        let course = quizzes
            .first()
            .map(|q| q.course_id)
            .unwrap_or_else(CourseId::new);
        catalog.add_course(course, "Rust Fundamentals");
        let user = UserId::new();
        catalog.enroll(user, course);
        for quiz in quizzes {
            catalog.add_quiz(quiz);
        }
        let gamification = Arc::new(GamificationService::new(
            catalog,
            BadgeCatalog::new(),
            EventBus::new(100),
        ));
        Harness {
            quiz_service: QuizService::new(Arc::clone(&gamification)),
            gamification,
            user,
            course,
        }
    }

    fn four_question_quiz(course: CourseId) -> Quiz {
        Quiz {
            id: QuizId::new(),
            course_id: course,
            title: "Ownership".to_string(),
            description: String::new(),
            questions: vec![
                question(0, 10),
                question(1, 10),
                question(2, 10),
                question(3, 10),
            ],
        }
    }

    #[tokio::test]
    async fn three_of_four_is_a_boundary_pass() {
        let course = CourseId::new();
        let quiz = four_question_quiz(course);
        let quiz_id = quiz.id;
        // Second quiz keeps the course from completing in this test.
        let other = four_question_quiz(course);
        let h = harness(vec![quiz, other]);

        let result = h
            .quiz_service
            .submit(quiz_id, h.user, &[0, 1, 2, 0])
            .await;
        let Ok(result) = result else {
            panic!("submit failed");
        };
        assert_eq!(result.score, 30);
        assert_eq!(result.total_points, 40);
        assert!((result.percentage - 75.0).abs() < f64::EPSILON);
        assert!(result.passed);
        assert!(result.certificate.is_none());
        assert!(result.next_attempt_allowed_at.is_none());
        assert_eq!(result.questions.len(), 4);

        // Base quiz award at 1.0× quality.
        let profile = h.gamification.profile_snapshot(h.user).await;
        assert_eq!(profile.total_points, 100);
        assert_eq!(profile.current_quiz_streak, 1);
    }

    #[tokio::test]
    async fn failed_attempt_starts_cooldown() {
        let course = CourseId::new();
        let quiz = four_question_quiz(course);
        let quiz_id = quiz.id;
        let h = harness(vec![quiz]);
        let t0 = Utc::now();

        let failed = h
            .quiz_service
            .submit_at(quiz_id, h.user, &[3, 0, 1, 2], t0)
            .await;
        let Ok(failed) = failed else {
            panic!("submit failed");
        };
        assert!(!failed.passed);
        assert_eq!(
            failed.next_attempt_allowed_at,
            Some(t0 + Duration::minutes(30))
        );

        // Ten minutes later: rejected, no attempt recorded.
        let rejected = h
            .quiz_service
            .submit_at(quiz_id, h.user, &[0, 1, 2, 3], t0 + Duration::minutes(10))
            .await;
        let Err(EngineError::CooldownActive { retry_at }) = rejected else {
            panic!("expected cooldown rejection");
        };
        assert_eq!(retry_at, t0 + Duration::minutes(30));
        assert_eq!(h.quiz_service.attempts_for(h.user).await.len(), 1);

        // Thirty-one minutes later: accepted.
        let accepted = h
            .quiz_service
            .submit_at(quiz_id, h.user, &[0, 1, 2, 3], t0 + Duration::minutes(31))
            .await;
        assert!(accepted.is_ok());
        assert_eq!(h.quiz_service.attempts_for(h.user).await.len(), 2);
    }

    #[tokio::test]
    async fn passing_every_quiz_completes_the_course() {
        let course = CourseId::new();
        let quiz = four_question_quiz(course);
        let quiz_id = quiz.id;
        let h = harness(vec![quiz]);

        let result = h
            .quiz_service
            .submit(quiz_id, h.user, &[0, 1, 2, 3])
            .await;
        let Ok(result) = result else {
            panic!("submit failed");
        };
        assert!(result.passed);
        let Some(certificate) = result.certificate else {
            panic!("expected certificate");
        };
        assert!(certificate.starts_with("certificates/"));
        assert!(certificate.ends_with("_certificate.pdf"));

        let progress = h.gamification.progress().get(h.user, h.course).await;
        assert_eq!(progress.as_ref().map(|p| p.percent), Some(100));
        assert_eq!(progress.map(|p| p.completed), Some(true));

        // Perfect score (2×) plus course completion.
        let profile = h.gamification.profile_snapshot(h.user).await;
        assert_eq!(profile.total_points, 200 + 500);
        assert_eq!(profile.current_course_streak, 1);
        assert_eq!(h.gamification.audit(h.user).await.ok(), Some(700));
    }

    #[tokio::test]
    async fn completing_twice_does_not_reaward() {
        let course = CourseId::new();
        let quiz = four_question_quiz(course);
        let quiz_id = quiz.id;
        let h = harness(vec![quiz]);

        let first = h.quiz_service.submit(quiz_id, h.user, &[0, 1, 2, 3]).await;
        assert!(first.is_ok());
        let balance_after_first = h.gamification.profile_snapshot(h.user).await.total_points;

        // Wait out nothing: a pass has no cooldown.
        let second = h.quiz_service.submit(quiz_id, h.user, &[0, 1, 2, 3]).await;
        let Ok(second) = second else {
            panic!("second submit failed");
        };
        // Certificate is still reported, but completion rewards fire once.
        assert!(second.certificate.is_some());
        let profile = h.gamification.profile_snapshot(h.user).await;
        assert_eq!(profile.current_course_streak, 1);
        assert_eq!(profile.total_points, balance_after_first + 200);
    }

    #[tokio::test]
    async fn unscored_quiz_defaults_to_ten_points_each() {
        let course = CourseId::new();
        let quiz = Quiz {
            id: QuizId::new(),
            course_id: course,
            title: "Legacy".to_string(),
            description: String::new(),
            questions: vec![question(0, 0), question(1, 0)],
        };
        let quiz_id = quiz.id;
        let other = four_question_quiz(course);
        let h = harness(vec![quiz, other]);

        let result = h.quiz_service.submit(quiz_id, h.user, &[0, 1]).await;
        let Ok(result) = result else {
            panic!("submit failed");
        };
        assert_eq!(result.total_points, 20);
        assert_eq!(result.score, 20);
        assert!(result.passed);
        assert_eq!(
            result.questions.first().map(|q| q.max_points),
            Some(DEFAULT_QUESTION_POINTS)
        );
    }

    #[tokio::test]
    async fn multi_answer_questions_accept_any_member() {
        let course = CourseId::new();
        let quiz = Quiz {
            id: QuizId::new(),
            course_id: course,
            title: "Multi".to_string(),
            description: String::new(),
            questions: vec![QuizQuestion {
                text: "q".to_string(),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answers: vec![0, 2],
                correct_answer: 1,
                points: 10,
            }],
        };
        let quiz_id = quiz.id;
        let other = four_question_quiz(course);
        let h = harness(vec![quiz, other]);

        let result = h.quiz_service.submit(quiz_id, h.user, &[2]).await;
        let Ok(result) = result else {
            panic!("submit failed");
        };
        assert!(result.passed);
        assert_eq!(result.questions.first().map(|q| q.expected), Some(0));
    }

    #[tokio::test]
    async fn short_answer_list_scores_paired_prefix() {
        let course = CourseId::new();
        let quiz = four_question_quiz(course);
        let quiz_id = quiz.id;
        let other = four_question_quiz(course);
        let h = harness(vec![quiz, other]);

        // Two answers for a four-question quiz: 20 of 40 points reachable.
        let result = h.quiz_service.submit(quiz_id, h.user, &[0, 1]).await;
        let Ok(result) = result else {
            panic!("submit failed");
        };
        assert_eq!(result.score, 20);
        assert_eq!(result.total_points, 20);
        assert_eq!(result.questions.len(), 2);
        // Full marks on the answered prefix still counts as a pass.
        assert!(result.passed);
    }

    #[tokio::test]
    async fn unknown_quiz_is_not_found() {
        let h = harness(vec![]);
        let result = h.quiz_service.submit(QuizId::new(), h.user, &[0]).await;
        assert!(matches!(result, Err(EngineError::QuizNotFound(_))));
    }

    #[tokio::test]
    async fn unenrolled_user_is_rejected() {
        let course = CourseId::new();
        let quiz = four_question_quiz(course);
        let quiz_id = quiz.id;
        let h = harness(vec![quiz]);

        let stranger = UserId::new();
        let result = h.quiz_service.submit(quiz_id, stranger, &[0, 1, 2, 3]).await;
        assert!(matches!(result, Err(EngineError::NotEnrolled { .. })));
        assert!(h.quiz_service.attempts_for(stranger).await.is_empty());
    }

    #[tokio::test]
    async fn failure_resets_quiz_streak() {
        let course = CourseId::new();
        let quiz_a = four_question_quiz(course);
        let quiz_b = four_question_quiz(course);
        let (id_a, id_b) = (quiz_a.id, quiz_b.id);
        let h = harness(vec![quiz_a, quiz_b]);

        let pass = h.quiz_service.submit(id_a, h.user, &[0, 1, 2, 3]).await;
        assert!(pass.is_ok());
        assert_eq!(
            h.gamification.profile_snapshot(h.user).await.current_quiz_streak,
            1
        );

        let fail = h.quiz_service.submit(id_b, h.user, &[3, 2, 1, 0]).await;
        let Ok(fail) = fail else {
            panic!("submit failed");
        };
        assert!(!fail.passed);
        assert_eq!(
            h.gamification.profile_snapshot(h.user).await.current_quiz_streak,
            0
        );
    }
}
