//! Quiz payload decoding, validation and scoring.
//!
//! A quiz payload is a JSON array of questions:
//!
//! ```json
//! [{ "question": "2 + 2?", "ans_variants": { "a": "3", "b": "4" },
//!    "question_num": 1, "correct_var": "b" }]
//! ```
//!
//! Payloads are validated eagerly: a `Quiz` only exists if every question is
//! complete and every correct code points into its own variant map.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::model::QuizScore;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A quiz payload that cannot be displayed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz payload is not a valid question list: {0}")]
    InvalidJson(String),

    #[error("quiz has no questions")]
    Empty,

    #[error("question #{index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("question {number} has no answer variants")]
    NoVariants { number: u32 },

    #[error("question {number}: correct answer `{code}` is not one of its variants")]
    UnknownCorrectCode { number: u32, code: String },

    #[error("question number {number} appears more than once")]
    DuplicateQuestionNumber { number: u32 },
}

//
// ─── ANSWER CODE ───────────────────────────────────────────────────────────────
//

/// Short key of an answer variant (e.g. "a", "b").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerCode(String);

impl AnswerCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnswerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnswerCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    number: u32,
    variants: BTreeMap<AnswerCode, String>,
    correct: AnswerCode,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoVariants` for an empty variant map and
    /// `QuizError::UnknownCorrectCode` when `correct` is not one of its keys.
    pub fn new(
        text: impl Into<String>,
        number: u32,
        variants: BTreeMap<AnswerCode, String>,
        correct: AnswerCode,
    ) -> Result<Self, QuizError> {
        if variants.is_empty() {
            return Err(QuizError::NoVariants { number });
        }
        if !variants.contains_key(&correct) {
            return Err(QuizError::UnknownCorrectCode {
                number,
                code: correct.0,
            });
        }
        Ok(Self {
            text: text.into(),
            number,
            variants,
            correct,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn variants(&self) -> &BTreeMap<AnswerCode, String> {
        &self.variants
    }

    #[must_use]
    pub fn correct(&self) -> &AnswerCode {
        &self.correct
    }

    #[must_use]
    pub fn has_variant(&self, code: &AnswerCode) -> bool {
        self.variants.contains_key(code)
    }

    #[must_use]
    pub fn is_correct(&self, code: &AnswerCode) -> bool {
        &self.correct == code
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Ordered, validated list of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    question: Option<String>,
    ans_variants: Option<BTreeMap<String, String>>,
    question_num: Option<u32>,
    correct_var: Option<String>,
}

impl Quiz {
    /// Creates a quiz from already built questions, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` for no questions and
    /// `QuizError::DuplicateQuestionNumber` when two questions share a number.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.number) {
                return Err(QuizError::DuplicateQuestionNumber { number: q.number });
            }
        }
        Ok(Self { questions })
    }

    /// Decodes and validates a raw quiz payload.
    ///
    /// # Errors
    ///
    /// Returns a `QuizError` describing the first structural or referential
    /// problem found.
    pub fn parse(raw: &str) -> Result<Self, QuizError> {
        let wire: Vec<QuestionWire> =
            serde_json::from_str(raw).map_err(|e| QuizError::InvalidJson(e.to_string()))?;

        let questions = wire
            .into_iter()
            .enumerate()
            .map(|(index, w)| {
                let missing = |field| QuizError::MissingField { index, field };
                let text = w.question.ok_or_else(|| missing("question"))?;
                let variants = w.ans_variants.ok_or_else(|| missing("ans_variants"))?;
                let number = w.question_num.ok_or_else(|| missing("question_num"))?;
                let correct = w.correct_var.ok_or_else(|| missing("correct_var"))?;
                let variants = variants
                    .into_iter()
                    .map(|(code, text)| (AnswerCode(code), text))
                    .collect();
                Question::new(text, number, variants, AnswerCode(correct))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(questions)
    }

    /// Encodes the quiz back into the payload shape accepted by `parse`.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let items: Vec<Value> = self
            .questions
            .iter()
            .map(|q| {
                let variants: Map<String, Value> = q
                    .variants
                    .iter()
                    .map(|(code, text)| (code.0.clone(), Value::String(text.clone())))
                    .collect();
                json!({
                    "question": q.text,
                    "ans_variants": variants,
                    "question_num": q.number,
                    "correct_var": q.correct.0,
                })
            })
            .collect();
        Value::Array(items).to_string()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false for a constructed quiz; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, number: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.number == number)
    }

    /// Scores a set of selections keyed by question number.
    ///
    /// Unanswered questions count as incorrect; selections for unknown
    /// question numbers are ignored.
    #[must_use]
    pub fn score(&self, selections: &BTreeMap<u32, AnswerCode>) -> QuizScore {
        let correct = self
            .questions
            .iter()
            .filter(|q| selections.get(&q.number).is_some_and(|code| q.is_correct(code)))
            .count();
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        QuizScore::new(u32::try_from(correct).unwrap_or(u32::MAX), total)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
