//! Backend contracts consumed by the course services, plus the HTTP adapter.

mod config;
mod dto;
mod http;

use async_trait::async_trait;
use course_core::model::{Course, CourseId, GradeRecord, Module};

use crate::error::ApiError;
use crate::session::AccessToken;

pub use config::ApiConfig;
pub use http::HttpBackend;

/// One page of modules for a course, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePage {
    /// Count reported by the backend; may disagree with `items.len()`.
    pub total: u32,
    pub course: Option<Course>,
    pub items: Vec<Module>,
}

/// Source of a course's modules.
#[async_trait]
pub trait ModuleProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::AuthExpired` when `access` is rejected, and other
    /// `ApiError` variants for transport, status or payload failures.
    async fn fetch_modules(
        &self,
        access: &AccessToken,
        course_id: &CourseId,
    ) -> Result<ModulePage, ApiError>;
}

/// Sink for quiz grades.
#[async_trait]
pub trait GradeBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::AuthExpired` when `access` is rejected, and other
    /// `ApiError` variants for transport or status failures.
    async fn post_grade(
        &self,
        access: &AccessToken,
        course_id: &CourseId,
        record: &GradeRecord,
    ) -> Result<(), ApiError>;
}
