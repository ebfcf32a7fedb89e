use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("{kind} module has no {kind} payload")]
    MissingPayload { kind: ModuleKind },

    #[error("{kind} module also carries a {extra} payload")]
    ConflictingPayload { kind: ModuleKind, extra: ModuleKind },

    #[error("invalid video url `{raw}`")]
    InvalidVideoUrl { raw: String },

    #[error("unknown module type `{raw}`")]
    UnknownKind { raw: String },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Type tag of a module as sent by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleKind {
    Text,
    Video,
    Test,
}

impl ModuleKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Video => "VIDEO",
            Self::Test => "TEST",
        }
    }

    /// Parses the backend tag.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::UnknownKind` for anything but TEXT, VIDEO or TEST.
    pub fn parse(raw: &str) -> Result<Self, ModuleError> {
        match raw {
            "TEXT" => Ok(Self::Text),
            "VIDEO" => Ok(Self::Video),
            "TEST" => Ok(Self::Test),
            _ => Err(ModuleError::UnknownKind { raw: raw.to_owned() }),
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

/// Reference to an embeddable video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: Option<String>,
    pub url: Url,
}

/// Raw quiz payload as stored on the backend.
///
/// The body is decoded lazily by `Quiz::parse` when the module becomes active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPayload {
    pub id: Option<String>,
    pub body: String,
}

/// The single payload carried by a module, selected by its type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleContent {
    Text(String),
    Video(VideoRef),
    Test(QuizPayload),
}

/// Untrusted, nullable payload fields as they arrive on the wire.
#[derive(Debug, Clone, Default)]
pub struct RawPayloads {
    pub text: Option<String>,
    pub video: Option<(Option<String>, String)>,
    pub test: Option<(Option<String>, Option<String>)>,
}

impl ModuleContent {
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Text(_) => ModuleKind::Text,
            Self::Video(_) => ModuleKind::Video,
            Self::Test(_) => ModuleKind::Test,
        }
    }

    /// Builds the content from the tag and the nullable wire fields.
    ///
    /// Exactly the payload named by `kind` must be present.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::MissingPayload` when the tagged payload is absent,
    /// `ModuleError::ConflictingPayload` when another payload is populated too,
    /// and `ModuleError::InvalidVideoUrl` when a video url does not parse.
    pub fn from_parts(kind: ModuleKind, raw: RawPayloads) -> Result<Self, ModuleError> {
        let present = [
            (ModuleKind::Text, raw.text.is_some()),
            (ModuleKind::Video, raw.video.is_some()),
            (ModuleKind::Test, raw.test.is_some()),
        ];
        if let Some((extra, _)) = present
            .iter()
            .find(|(other, populated)| *other != kind && *populated)
        {
            return Err(ModuleError::ConflictingPayload {
                kind,
                extra: *extra,
            });
        }

        match kind {
            ModuleKind::Text => raw
                .text
                .map(Self::Text)
                .ok_or(ModuleError::MissingPayload { kind }),
            ModuleKind::Video => {
                let (id, raw_url) = raw.video.ok_or(ModuleError::MissingPayload { kind })?;
                let url = Url::parse(raw_url.trim())
                    .map_err(|_| ModuleError::InvalidVideoUrl { raw: raw_url })?;
                Ok(Self::Video(VideoRef { id, url }))
            }
            ModuleKind::Test => {
                let (id, body) = raw.test.ok_or(ModuleError::MissingPayload { kind })?;
                let body = body.ok_or(ModuleError::MissingPayload { kind })?;
                Ok(Self::Test(QuizPayload { id, body }))
            }
        }
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// One unit of course content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    id: ModuleId,
    course_id: CourseId,
    number: i64,
    title: String,
    content: ModuleContent,
}

impl Module {
    #[must_use]
    pub fn new(
        id: ModuleId,
        course_id: CourseId,
        number: i64,
        title: impl Into<String>,
        content: ModuleContent,
    ) -> Self {
        Self {
            id,
            course_id,
            number,
            title: title.into(),
            content,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    /// Position key within the course; lower numbers come first.
    #[must_use]
    pub fn number(&self) -> i64 {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.content.kind()
    }

    #[must_use]
    pub fn content(&self) -> &ModuleContent {
        &self.content
    }
}
