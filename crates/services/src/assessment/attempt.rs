use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use course_core::model::{AttemptId, QuizScore};
use course_core::quiz::{AnswerCode, Quiz};

use crate::error::ApiError;

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Active,
    Submitting,
    Completed,
}

/// What happened to the grade of a completed attempt.
///
/// Never affects the displayed score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(ApiError),
    SessionEnded,
}

/// One learner's pass through a quiz.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: AttemptId,
    started_at: DateTime<Utc>,
    order: BTreeMap<u32, Vec<AnswerCode>>,
    pub(super) selections: BTreeMap<u32, AnswerCode>,
    pub(super) state: AttemptState,
    pub(super) current: usize,
    pub(super) score: Option<QuizScore>,
    pub(super) completed_at: Option<DateTime<Utc>>,
    pub(super) delivery: Option<DeliveryStatus>,
}

impl Attempt {
    /// Starts an attempt with an independent shuffle of each question's answers.
    pub fn start<R: Rng + ?Sized>(quiz: &Quiz, started_at: DateTime<Utc>, rng: &mut R) -> Self {
        let order = quiz
            .questions()
            .iter()
            .map(|q| {
                let mut codes: Vec<AnswerCode> = q.variants().keys().cloned().collect();
                codes.shuffle(rng);
                (q.number(), codes)
            })
            .collect();

        Self {
            id: AttemptId::generate(),
            started_at,
            order,
            selections: BTreeMap::new(),
            state: AttemptState::Active,
            current: 0,
            score: None,
            completed_at: None,
            delivery: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn state(&self) -> AttemptState {
        self.state
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn delivery(&self) -> Option<&DeliveryStatus> {
        self.delivery.as_ref()
    }

    /// Presentation order of a question's answer codes.
    #[must_use]
    pub fn order(&self, number: u32) -> Option<&[AnswerCode]> {
        self.order.get(&number).map(Vec::as_slice)
    }

    #[must_use]
    pub fn selections(&self) -> &BTreeMap<u32, AnswerCode> {
        &self.selections
    }
}
