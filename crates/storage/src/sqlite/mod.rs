use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ProgressRepository, QuizResultRepository, Storage};

mod mapping;
mod migrate;
mod progress_repo;
mod quiz_result_repo;

/// Local store for course progress and quiz results.
///
/// One pool serves both repository traits; clones share it.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Failure while opening or migrating the course database.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open the course database at `database_url`.
    ///
    /// Every pooled connection runs in WAL mode with a 5s busy timeout, so a
    /// progress save and a quiz result append may overlap without failing.
    /// The schema is not touched; call [`Self::migrate`] before first use.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a
    /// connection pragma is rejected.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Pool shared by the progress and quiz result queries.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema to the latest version recorded in `schema_migrations`.
    ///
    /// Version 1 adds `course_progress` (one frontier row per course) and
    /// the append-only `quiz_results` table with its per-module lookup index.
    /// Versions already applied are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a schema statement fails; a partially
    /// applied version is rolled back.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Open and migrate the course database, then hand out its progress
    /// and quiz result repositories.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or
    /// migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let quiz_results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Ok(Self {
            progress,
            quiz_results,
        })
    }
}
