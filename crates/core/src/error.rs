use thiserror::Error;

use crate::model::ModuleError;
use crate::quiz::QuizError;
use crate::sequencer::SequencerError;

/// Any domain validation failure raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}
