use std::sync::Arc;

use course_core::model::CourseId;
use storage::repository::Storage;

use crate::Clock;
use crate::api::{ApiConfig, GradeBackend, HttpBackend, ModuleProvider};
use crate::authorized::AuthorizedClient;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::grade_submitter::GradeSubmitter;
use crate::player::CoursePlayer;
use crate::session::{CredentialRefresher, Credentials, Session};

/// Assembles the session and course services around one backend.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<Session>,
    courses: Arc<CourseService>,
}

impl AppServices {
    /// Build services against the HTTP backend with `SQLite` progress storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        config: ApiConfig,
        clock: Clock,
        credentials: Option<Credentials>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let backend = Arc::new(HttpBackend::new(config));
        let services = Self::from_parts(
            Arc::clone(&backend) as Arc<dyn CredentialRefresher>,
            Arc::clone(&backend) as Arc<dyn ModuleProvider>,
            backend as Arc<dyn GradeBackend>,
            &storage,
            clock,
        );
        if let Some(credentials) = credentials {
            services.session.sign_in(credentials);
        }
        Ok(services)
    }

    /// Wires services from explicit collaborators; the session starts signed out.
    #[must_use]
    pub fn from_parts(
        refresher: Arc<dyn CredentialRefresher>,
        modules: Arc<dyn ModuleProvider>,
        grades: Arc<dyn GradeBackend>,
        storage: &Storage,
        clock: Clock,
    ) -> Self {
        let session = Arc::new(Session::new(refresher));
        let client = AuthorizedClient::new(Arc::clone(&session));
        let submitter = GradeSubmitter::new(client.clone(), grades);
        let courses = Arc::new(CourseService::new(client, modules, submitter, storage, clock));
        Self { session, courses }
    }

    #[must_use]
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    /// Opens and loads a course in one step.
    pub async fn open_course(&self, course_id: CourseId) -> CoursePlayer {
        let mut player = self.courses.open(course_id);
        self.courses.load(&mut player).await;
        player
    }
}
