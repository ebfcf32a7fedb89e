use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use course_core::model::{CourseId, GradeRecord};

use super::dto::{ModulesResponse, RefreshRequest, TokenResponse};
use super::{ApiConfig, GradeBackend, ModulePage, ModuleProvider};
use crate::error::ApiError;
use crate::session::{AccessToken, CredentialRefresher, Credentials, RefreshToken};

/// reqwest-backed client for the course backend.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: ApiConfig,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::AuthExpired),
        other => Err(ApiError::HttpStatus(other)),
    }
}

#[async_trait]
impl ModuleProvider for HttpBackend {
    async fn fetch_modules(
        &self,
        access: &AccessToken,
        course_id: &CourseId,
    ) -> Result<ModulePage, ApiError> {
        let url = self
            .config
            .endpoint(&["api", "modules", "course", course_id.as_str()]);
        let response = self
            .client
            .get(url)
            .bearer_auth(access.as_str())
            .send()
            .await?;
        let body: ModulesResponse = check_status(response)?.json().await?;

        if usize::try_from(body.total).ok() != Some(body.items.len()) {
            debug!(
                course_id = %course_id,
                total = body.total,
                items = body.items.len(),
                "module count differs from reported total"
            );
        }

        let mut course = None;
        let mut items = Vec::with_capacity(body.items.len());
        for (index, record) in body.items.into_iter().enumerate() {
            let (owner, module) = record
                .into_module()
                .map_err(|source| ApiError::InvalidModule { index, source })?;
            if course.is_none() {
                course = Some(owner);
            }
            items.push(module);
        }

        Ok(ModulePage {
            total: body.total,
            course,
            items,
        })
    }
}

#[async_trait]
impl GradeBackend for HttpBackend {
    async fn post_grade(
        &self,
        access: &AccessToken,
        course_id: &CourseId,
        record: &GradeRecord,
    ) -> Result<(), ApiError> {
        let url = self
            .config
            .endpoint(&["api", "test-grades", course_id.as_str()]);
        let response = self
            .client
            .post(url)
            .bearer_auth(access.as_str())
            .json(record)
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialRefresher for HttpBackend {
    async fn refresh(&self, refresh: &RefreshToken) -> Result<Credentials, ApiError> {
        let url = self.config.endpoint(&["api", "auth", "refresh"]);
        let response = self
            .client
            .post(url)
            .json(&RefreshRequest {
                refresh_token: refresh.as_str(),
            })
            .send()
            .await?;
        let body: TokenResponse = check_status(response)?.json().await?;
        Ok(body.into_credentials(refresh))
    }
}
