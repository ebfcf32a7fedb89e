//! Quiz attempts: shuffled presentation, answer tracking, scoring and grade
//! hand-off.

mod attempt;
mod engine;

pub use attempt::{Attempt, AttemptState, DeliveryStatus};
pub use engine::{AssessmentEngine, GradeDelivery, PendingGrade};
