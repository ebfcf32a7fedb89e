mod course;
mod grade;
mod ids;
mod module;

pub use course::Course;
pub use grade::{GradeRecord, PASS_THRESHOLD_PERCENT, QuizScore};
pub use ids::{AttemptId, CourseId, ModuleId, ParseIdError};
pub use module::{
    Module, ModuleContent, ModuleError, ModuleKind, QuizPayload, RawPayloads, VideoRef,
};
