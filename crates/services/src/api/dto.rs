use serde::{Deserialize, Serialize};
use url::Url;

use course_core::model::{
    Course, CourseId, Module, ModuleContent, ModuleError, ModuleId, ModuleKind, RawPayloads,
};

use crate::session::{Credentials, RefreshToken};

#[derive(Debug, Deserialize)]
pub(crate) struct ModulesResponse {
    pub total: u32,
    pub items: Vec<ModuleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CourseRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub approximate_time: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CourseRecord {
    pub(crate) fn into_course(self) -> Course {
        Course::new(
            CourseId::new(self.id),
            self.title,
            self.description.unwrap_or_default(),
            self.approximate_time.unwrap_or_default(),
            self.image_url.and_then(|raw| Url::parse(raw.trim()).ok()),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModuleRecord {
    pub id: String,
    pub course: CourseRecord,
    pub module_type: String,
    pub module_num: i64,
    pub module_title: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub video: Option<VideoRecord>,
    #[serde(default)]
    pub test: Option<TestRecord>,
}

impl ModuleRecord {
    /// Validates the tagged payload and splits off the embedded course.
    pub(crate) fn into_module(self) -> Result<(Course, Module), ModuleError> {
        let kind = ModuleKind::parse(&self.module_type)?;
        let raw = RawPayloads {
            text: self.text,
            video: self.video.map(|v| (v.id, v.video_url)),
            test: self.test.map(|t| (t.id, t.body)),
        };
        let content = ModuleContent::from_parts(kind, raw)?;
        let course = self.course.into_course();
        let module = Module::new(
            ModuleId::new(self.id),
            course.id().clone(),
            self.module_num,
            self.module_title,
            content,
        );
        Ok((course, module))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Keeps the previous refresh token when the backend does not rotate it.
    pub(crate) fn into_credentials(self, previous: &RefreshToken) -> Credentials {
        let refresh = self
            .refresh_token
            .unwrap_or_else(|| previous.as_str().to_owned());
        Credentials::new(self.access_token, refresh)
    }
}
