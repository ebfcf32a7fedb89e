use std::env;

use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Url,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url.trim())?,
        })
    }

    /// Reads `COURSE_API_BASE_URL`, falling back to a local backend.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the variable holds an invalid URL.
    pub fn from_env() -> Result<Self, url::ParseError> {
        let base_url = env::var("COURSE_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Self::new(&base_url)
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_and_encodes_segments() {
        let config = ApiConfig::new("https://lms.example.com/").unwrap();
        let url = config.endpoint(&["api", "modules", "course", "a b"]);
        assert_eq!(url.as_str(), "https://lms.example.com/api/modules/course/a%20b");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let config = ApiConfig::new("https://lms.example.com/backend").unwrap();
        let url = config.endpoint(&["api", "test-grades", "c1"]);
        assert_eq!(url.as_str(), "https://lms.example.com/backend/api/test-grades/c1");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        assert!(ApiConfig::new("/api").is_err());
    }
}
