#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod assessment;
pub mod authorized;
pub mod course_service;
pub mod error;
pub mod grade_submitter;
pub mod player;
pub mod session;

pub use course_core::Clock;

pub use api::{ApiConfig, GradeBackend, HttpBackend, ModulePage, ModuleProvider};
pub use app_services::AppServices;
pub use assessment::{AssessmentEngine, AttemptState, DeliveryStatus, GradeDelivery, PendingGrade};
pub use authorized::AuthorizedClient;
pub use course_service::CourseService;
pub use error::{
    ApiError, AppServicesError, AssessmentError, AuthError, CourseLoadError, PlayerError,
    SendError,
};
pub use grade_submitter::GradeSubmitter;
pub use player::{
    ActiveView, CoursePlayer, LoadTicket, LoadedCourse, PlayerPhase, QuizDelivery, QuizSubmission,
};
pub use session::{AccessToken, CredentialRefresher, Credentials, RefreshToken, Session};
