use serde::{Deserialize, Serialize};

/// Minimum percentage counted as a passed quiz.
pub const PASS_THRESHOLD_PERCENT: u32 = 70;

/// Score summary sent to the backend for a completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    #[serde(rename = "courseMaxTest")]
    pub total_questions: u32,
    #[serde(rename = "userGrade")]
    pub correct_count: u32,
}

/// Locally computed result of a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    correct: u32,
    total: u32,
    percentage: u32,
}

impl QuizScore {
    /// Builds a score, clamping `correct` to `total`.
    #[must_use]
    pub fn new(correct: u32, total: u32) -> Self {
        let correct = correct.min(total);
        Self {
            correct,
            total,
            percentage: rounded_percentage(correct, total),
        }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// `round(100 * correct / total)`, halves rounding up.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.percentage >= PASS_THRESHOLD_PERCENT
    }

    #[must_use]
    pub fn grade_record(&self) -> GradeRecord {
        GradeRecord {
            total_questions: self.total,
            correct_count: self.correct,
        }
    }
}

fn rounded_percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct);
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(100)
}
