//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::ModuleError;
use storage::sqlite::SqliteInitError;

/// Failures talking to the course backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("access credential rejected")]
    AuthExpired,
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("module #{index} is invalid: {source}")]
    InvalidModule {
        index: usize,
        #[source]
        source: ModuleError,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Errors emitted by `Session`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("not signed in")]
    SignedOut,
    #[error("credential refresh failed: {0}")]
    RefreshFailed(#[source] ApiError),
}

/// Errors emitted by `AuthorizedClient`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SendError {
    /// The session is gone; the caller should return to sign-in.
    #[error("session ended, sign in again")]
    Unauthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors that put a course view into its error state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseLoadError {
    #[error("failed to load modules: {0}")]
    Network(ApiError),
    #[error("course has no modules")]
    EmptyCourse,
    #[error("module #{index} is invalid: {source}")]
    InvalidModule {
        index: usize,
        #[source]
        source: ModuleError,
    },
    #[error("session ended, sign in again")]
    Unauthenticated,
}

impl From<SendError> for CourseLoadError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::Unauthenticated => Self::Unauthenticated,
            SendError::Api(ApiError::InvalidModule { index, source }) => {
                Self::InvalidModule { index, source }
            }
            SendError::Api(api) => Self::Network(api),
        }
    }
}

/// Errors emitted by `AssessmentEngine`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("only {answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },
    #[error("attempt is no longer accepting answers")]
    NotActive,
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(u32),
    #[error("question {number} has no answer `{code}`")]
    UnknownAnswer { number: u32, code: String },
}

/// Errors emitted by `CoursePlayer`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("course is not loaded")]
    NotReady,
    #[error("active module is not a playable quiz")]
    NoQuiz,
    #[error("quiz must be completed before continuing")]
    QuizNotCompleted,
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error("invalid api base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}
