use url::Url;

use crate::model::ids::CourseId;

/// Descriptive metadata of a course.
///
/// Fetched alongside the module list and read-only for the whole playthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: String,
    approximate_time: String,
    image_url: Option<Url>,
}

impl Course {
    #[must_use]
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: impl Into<String>,
        approximate_time: impl Into<String>,
        image_url: Option<Url>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            approximate_time: approximate_time.into(),
            image_url,
        }
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Free-form duration hint as entered by the author (e.g. "2 hours").
    #[must_use]
    pub fn approximate_time(&self) -> &str {
        &self.approximate_time
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }
}
