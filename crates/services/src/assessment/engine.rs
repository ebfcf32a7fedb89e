use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use course_core::Clock;
use course_core::model::{AttemptId, CourseId, GradeRecord, QuizPayload, QuizScore};
use course_core::quiz::{AnswerCode, Question, Quiz, QuizError};

use super::attempt::{Attempt, AttemptState, DeliveryStatus};
use crate::error::{AssessmentError, SendError};
use crate::grade_submitter::GradeSubmitter;

//
// ─── SUBMISSION HANDOFF ────────────────────────────────────────────────────────
//

/// Grade computed by `begin_submit`, waiting to be delivered.
///
/// Holds no borrow of the engine so navigation can continue while the
/// request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingGrade {
    attempt_id: AttemptId,
    score: QuizScore,
}

impl PendingGrade {
    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn score(&self) -> QuizScore {
        self.score
    }

    #[must_use]
    pub fn record(&self) -> GradeRecord {
        self.score.grade_record()
    }

    /// Posts the grade; the outcome goes back through `finish_submit`.
    pub async fn deliver(self, submitter: &GradeSubmitter, course_id: &CourseId) -> GradeDelivery {
        let outcome = submitter.submit(course_id, self.record()).await;
        GradeDelivery {
            attempt_id: self.attempt_id,
            score: self.score,
            outcome,
        }
    }
}

/// Result of delivering a `PendingGrade`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeDelivery {
    attempt_id: AttemptId,
    score: QuizScore,
    outcome: Result<(), SendError>,
}

impl GradeDelivery {
    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn score(&self) -> QuizScore {
        self.score
    }

    #[must_use]
    pub fn outcome(&self) -> &Result<(), SendError> {
        &self.outcome
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Runs attempts over one parsed quiz.
#[derive(Debug)]
pub struct AssessmentEngine {
    quiz: Quiz,
    attempt: Attempt,
    clock: Clock,
}

impl AssessmentEngine {
    /// Parses the module payload and starts the first attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the payload is not a valid quiz.
    pub fn from_payload(payload: &QuizPayload, clock: Clock) -> Result<Self, QuizError> {
        Ok(Self::new(Quiz::parse(&payload.body)?, clock))
    }

    #[must_use]
    pub fn new(quiz: Quiz, clock: Clock) -> Self {
        Self::with_rng(quiz, clock, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(quiz: Quiz, clock: Clock, rng: &mut R) -> Self {
        let attempt = Attempt::start(&quiz, clock.now(), rng);
        Self {
            quiz,
            attempt,
            clock,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    #[must_use]
    pub fn state(&self) -> AttemptState {
        self.attempt.state
    }

    // Navigation

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.attempt.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions()[self.attempt.current]
    }

    /// Moves to the next question; false on the last one.
    pub fn next_question(&mut self) -> bool {
        if self.attempt.current + 1 >= self.quiz.len() {
            return false;
        }
        self.attempt.current += 1;
        true
    }

    pub fn previous_question(&mut self) -> bool {
        if self.attempt.current == 0 {
            return false;
        }
        self.attempt.current -= 1;
        true
    }

    /// Answers of a question in this attempt's shuffled order.
    #[must_use]
    pub fn presented_variants(&self, number: u32) -> Option<Vec<(&AnswerCode, &str)>> {
        let question = self.quiz.question(number)?;
        let order = self.attempt.order(number)?;
        Some(
            order
                .iter()
                .filter_map(|code| {
                    question
                        .variants()
                        .get(code)
                        .map(|text| (code, text.as_str()))
                })
                .collect(),
        )
    }

    // Answers

    /// Records or replaces the answer for a question.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::NotActive` once submission has started,
    /// `UnknownQuestion` for a number outside the quiz and `UnknownAnswer`
    /// for a code the question does not offer.
    pub fn select(&mut self, number: u32, code: AnswerCode) -> Result<(), AssessmentError> {
        if self.attempt.state != AttemptState::Active {
            return Err(AssessmentError::NotActive);
        }
        let question = self
            .quiz
            .question(number)
            .ok_or(AssessmentError::UnknownQuestion(number))?;
        if !question.has_variant(&code) {
            return Err(AssessmentError::UnknownAnswer {
                number,
                code: code.as_str().to_owned(),
            });
        }
        self.attempt.selections.insert(number, code);
        Ok(())
    }

    #[must_use]
    pub fn selection(&self, number: u32) -> Option<&AnswerCode> {
        self.attempt.selections.get(&number)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.attempt.selections.len()
    }

    /// True once every question has a selection.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.answered_count() == self.quiz.len()
    }

    // Submission

    /// Scores the attempt and locks its answers.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Incomplete` while a question is unanswered
    /// and `AssessmentError::NotActive` if the attempt was already submitted.
    pub fn begin_submit(&mut self) -> Result<PendingGrade, AssessmentError> {
        if self.attempt.state != AttemptState::Active {
            return Err(AssessmentError::NotActive);
        }
        if !self.can_submit() {
            return Err(AssessmentError::Incomplete {
                answered: self.answered_count(),
                total: self.quiz.len(),
            });
        }

        let score = self.quiz.score(&self.attempt.selections);
        self.attempt.score = Some(score);
        self.attempt.state = AttemptState::Submitting;
        debug!(
            attempt_id = %self.attempt.id(),
            correct = score.correct(),
            total = score.total(),
            "attempt submitting"
        );
        Ok(PendingGrade {
            attempt_id: self.attempt.id(),
            score,
        })
    }

    /// Completes the attempt whatever the delivery outcome.
    ///
    /// Returns false, changing nothing, when the delivery belongs to a
    /// discarded attempt or the attempt is not waiting for one.
    pub fn finish_submit(&mut self, delivery: GradeDelivery) -> bool {
        if delivery.attempt_id != self.attempt.id()
            || self.attempt.state != AttemptState::Submitting
        {
            debug!(attempt_id = %delivery.attempt_id, "ignoring late grade delivery");
            return false;
        }

        let status = match delivery.outcome {
            Ok(()) => DeliveryStatus::Delivered,
            Err(SendError::Unauthenticated) => {
                warn!(attempt_id = %delivery.attempt_id, "grade not delivered, session ended");
                DeliveryStatus::SessionEnded
            }
            Err(SendError::Api(err)) => {
                warn!(attempt_id = %delivery.attempt_id, error = %err, "grade delivery failed");
                DeliveryStatus::Failed(err)
            }
        };

        self.attempt.delivery = Some(status);
        self.attempt.state = AttemptState::Completed;
        self.attempt.completed_at = Some(self.clock.now());
        info!(
            attempt_id = %delivery.attempt_id,
            percentage = delivery.score.percentage(),
            passed = delivery.score.passed(),
            "attempt completed"
        );
        true
    }

    /// `begin_submit`, deliver and `finish_submit` in one step.
    ///
    /// # Errors
    ///
    /// See `begin_submit`. Delivery failures are not errors.
    pub async fn submit(
        &mut self,
        submitter: &GradeSubmitter,
        course_id: &CourseId,
    ) -> Result<QuizScore, AssessmentError> {
        let pending = self.begin_submit()?;
        let delivery = pending.deliver(submitter, course_id).await;
        self.finish_submit(delivery);
        Ok(pending.score())
    }

    /// Score of a completed attempt.
    #[must_use]
    pub fn score(&self) -> Option<QuizScore> {
        match self.attempt.state {
            AttemptState::Completed => self.attempt.score,
            AttemptState::Active | AttemptState::Submitting => None,
        }
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.attempt.completed_at
    }

    /// Discards the attempt and its results and starts a fresh one.
    pub fn restart(&mut self) {
        self.restart_with_rng(&mut rand::rng());
    }

    pub fn restart_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        debug!(attempt_id = %self.attempt.id(), "restarting attempt");
        self.attempt = Attempt::start(&self.quiz, self.clock.now(), rng);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::authorized::AuthorizedClient;
    use crate::error::ApiError;
    use crate::grade_submitter::testing::RecordingGrades;
    use crate::session::testing::ScriptedRefresher;
    use crate::session::{Credentials, Session};
    use course_core::time::{fixed_clock, fixed_now};

    const QUIZ: &str = r#"[
        {"question": "Q1", "ans_variants": {"a": "one", "b": "two"}, "question_num": 1, "correct_var": "b"},
        {"question": "Q2", "ans_variants": {"a": "one", "b": "two"}, "question_num": 2, "correct_var": "a"},
        {"question": "Q3", "ans_variants": {"a": "one", "b": "two", "c": "three"}, "question_num": 3, "correct_var": "a"}
    ]"#;

    fn engine() -> AssessmentEngine {
        let payload = QuizPayload {
            id: Some("t1".into()),
            body: QUIZ.into(),
        };
        AssessmentEngine::from_payload(&payload, fixed_clock()).unwrap()
    }

    fn answer(engine: &mut AssessmentEngine, pairs: &[(u32, &str)]) {
        for (number, code) in pairs {
            engine.select(*number, AnswerCode::from(*code)).unwrap();
        }
    }

    fn submitter(grades: &Arc<RecordingGrades>) -> GradeSubmitter {
        let session = Arc::new(Session::new(Arc::new(ScriptedRefresher::default())));
        session.sign_in(Credentials::new("a1", "r1"));
        GradeSubmitter::new(AuthorizedClient::new(session), grades.clone())
    }

    #[test]
    fn select_is_idempotent_and_overwrites() {
        let mut engine = engine();
        answer(&mut engine, &[(1, "a"), (1, "a")]);
        assert_eq!(engine.answered_count(), 1);

        answer(&mut engine, &[(1, "b")]);
        assert_eq!(engine.selection(1), Some(&AnswerCode::from("b")));
        assert_eq!(engine.answered_count(), 1);
        assert_eq!(engine.current_index(), 0);
    }

    #[test]
    fn select_rejects_unknown_question_and_answer() {
        let mut engine = engine();
        assert_eq!(
            engine.select(9, AnswerCode::from("a")),
            Err(AssessmentError::UnknownQuestion(9))
        );
        assert_eq!(
            engine.select(1, AnswerCode::from("z")),
            Err(AssessmentError::UnknownAnswer {
                number: 1,
                code: "z".into()
            })
        );
        assert_eq!(engine.answered_count(), 0);
    }

    #[test]
    fn submit_requires_every_answer() {
        let mut engine = engine();
        answer(&mut engine, &[(1, "b"), (2, "a")]);
        assert!(!engine.can_submit());
        assert_eq!(
            engine.begin_submit(),
            Err(AssessmentError::Incomplete {
                answered: 2,
                total: 3
            })
        );
        assert_eq!(engine.state(), AttemptState::Active);
    }

    #[tokio::test]
    async fn two_of_three_scores_sixty_seven_and_posts_grade() {
        let grades = Arc::new(RecordingGrades::default());
        let mut engine = engine();
        answer(&mut engine, &[(1, "b"), (2, "a"), (3, "b")]);

        let score = engine
            .submit(&submitter(&grades), &CourseId::new("c1"))
            .await
            .unwrap();

        assert_eq!(score.correct(), 2);
        assert_eq!(score.percentage(), 67);
        assert!(!score.passed());
        assert_eq!(engine.state(), AttemptState::Completed);
        assert_eq!(engine.score(), Some(score));
        assert_eq!(engine.completed_at(), Some(fixed_now()));
        assert_eq!(engine.attempt().delivery(), Some(&DeliveryStatus::Delivered));

        let posted = grades.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].2,
            GradeRecord {
                total_questions: 3,
                correct_count: 2
            }
        );
    }

    #[tokio::test]
    async fn failed_delivery_still_completes_with_score() {
        let grades = Arc::new(RecordingGrades::failing(vec![ApiError::HttpStatus(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        )]));
        let mut engine = engine();
        answer(&mut engine, &[(1, "b"), (2, "a"), (3, "a")]);

        let score = engine
            .submit(&submitter(&grades), &CourseId::new("c1"))
            .await
            .unwrap();

        assert_eq!(score.percentage(), 100);
        assert_eq!(engine.state(), AttemptState::Completed);
        assert!(matches!(
            engine.attempt().delivery(),
            Some(DeliveryStatus::Failed(ApiError::HttpStatus(_)))
        ));
    }

    #[test]
    fn answers_are_locked_while_submitting() {
        let mut engine = engine();
        answer(&mut engine, &[(1, "b"), (2, "a"), (3, "a")]);
        engine.begin_submit().unwrap();

        assert_eq!(engine.state(), AttemptState::Submitting);
        assert_eq!(
            engine.select(1, AnswerCode::from("a")),
            Err(AssessmentError::NotActive)
        );
        assert_eq!(engine.begin_submit(), Err(AssessmentError::NotActive));
        assert_eq!(engine.score(), None);
        assert!(engine.can_submit());
    }

    #[tokio::test]
    async fn restart_after_completion_discards_results() {
        let grades = Arc::new(RecordingGrades::default());
        let mut engine = engine();
        answer(&mut engine, &[(1, "b"), (2, "a"), (3, "a")]);
        engine
            .submit(&submitter(&grades), &CourseId::new("c1"))
            .await
            .unwrap();
        assert_eq!(engine.state(), AttemptState::Completed);
        let finished = engine.attempt().id();

        engine.restart();

        assert_eq!(engine.state(), AttemptState::Active);
        assert_ne!(engine.attempt().id(), finished);
        assert_eq!(engine.answered_count(), 0);
        assert_eq!(engine.selection(1), None);
        assert_eq!(engine.score(), None);
        assert_eq!(engine.completed_at(), None);
        assert_eq!(engine.attempt().delivery(), None);
        assert!(!engine.can_submit());
        assert_eq!(grades.posted().len(), 1);
    }

    #[test]
    fn late_delivery_for_discarded_attempt_is_ignored() {
        let mut engine = engine();
        answer(&mut engine, &[(1, "b"), (2, "a"), (3, "a")]);
        let pending = engine.begin_submit().unwrap();

        engine.restart();
        let stale = GradeDelivery {
            attempt_id: pending.attempt_id(),
            score: pending.score(),
            outcome: Ok(()),
        };

        assert!(!engine.finish_submit(stale));
        assert_eq!(engine.state(), AttemptState::Active);
        assert_eq!(engine.answered_count(), 0);
        assert_eq!(engine.score(), None);
    }

    #[test]
    fn restart_reshuffles_but_keeps_answer_key() {
        let mut rng = StdRng::seed_from_u64(42);
        let quiz = Quiz::parse(QUIZ).unwrap();
        let mut engine = AssessmentEngine::with_rng(quiz, fixed_clock(), &mut rng);

        let mut orders = HashSet::new();
        for _ in 0..50 {
            let order: Vec<String> = engine
                .presented_variants(3)
                .unwrap()
                .into_iter()
                .map(|(code, _)| code.to_string())
                .collect();
            assert_eq!(order.len(), 3);
            orders.insert(order);
            engine.restart_with_rng(&mut rng);
        }

        assert!(orders.len() > 1);
        let q3 = engine.quiz().question(3).unwrap();
        assert_eq!(q3.correct(), &AnswerCode::from("a"));
    }

    #[test]
    fn presented_variants_pair_codes_with_text() {
        let engine = engine();
        let mut shown = engine.presented_variants(3).unwrap();
        shown.sort_by(|a, b| a.0.cmp(b.0));
        assert_eq!(
            shown,
            vec![
                (&AnswerCode::from("a"), "one"),
                (&AnswerCode::from("b"), "two"),
                (&AnswerCode::from("c"), "three"),
            ]
        );
        assert!(engine.presented_variants(4).is_none());
    }

    #[test]
    fn question_pointer_stays_in_bounds() {
        let mut engine = engine();
        assert!(!engine.previous_question());
        assert!(engine.next_question());
        assert!(engine.next_question());
        assert!(!engine.next_question());
        assert_eq!(engine.current_question().number(), 3);
        assert!(engine.previous_question());
        assert_eq!(engine.current_question().number(), 2);
    }
}
