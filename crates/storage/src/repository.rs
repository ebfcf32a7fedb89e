use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{AttemptId, CourseId, ModuleId, QuizScore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Locally saved navigation progress for one course.
///
/// The frontier is stored as a module number rather than an index so it
/// survives modules being inserted or removed between sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub frontier_module_num: i64,
    pub updated_at: DateTime<Utc>,
}

/// Persisted shape of a completed quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResultRecord {
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub attempt_id: AttemptId,
    pub correct: u32,
    pub total: u32,
    pub percentage: u32,
    pub completed_at: DateTime<Utc>,
}

impl QuizResultRecord {
    #[must_use]
    pub fn from_score(
        course_id: CourseId,
        module_id: ModuleId,
        attempt_id: AttemptId,
        score: &QuizScore,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id,
            module_id,
            attempt_id,
            correct: score.correct(),
            total: score.total(),
            percentage: score.percentage(),
            completed_at,
        }
    }

    /// Rebuilds the score; the percentage is recomputed from the counts.
    #[must_use]
    pub fn score(&self) -> QuizScore {
        QuizScore::new(self.correct, self.total)
    }
}

/// Repository contract for course navigation progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch saved progress for a course, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_progress(&self, course_id: &CourseId)
    -> Result<Option<CourseProgress>, StorageError>;

    /// Insert or replace progress for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored.
    async fn save_progress(&self, progress: &CourseProgress) -> Result<(), StorageError>;
}

/// Repository contract for completed quiz attempts.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Append a result and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, record: &QuizResultRecord) -> Result<i64, StorageError>;

    /// Most recent result for a quiz module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_result(
        &self,
        course_id: &CourseId,
        module_id: &ModuleId,
    ) -> Result<Option<QuizResultRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<CourseId, CourseProgress>>>,
    results: Arc<Mutex<Vec<QuizResultRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(course_id).cloned())
    }

    async fn save_progress(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(progress.course_id.clone(), progress.clone());
        Ok(())
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(&self, record: &QuizResultRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(record.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn latest_result(
        &self,
        course_id: &CourseId,
        module_id: &ModuleId,
    ) -> Result<Option<QuizResultRecord>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .rev()
            .find(|r| &r.course_id == course_id && &r.module_id == module_id)
            .cloned())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub quiz_results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let quiz_results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Self {
            progress,
            quiz_results,
        }
    }
}
