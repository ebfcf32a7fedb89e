use course_core::model::CourseId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{CourseProgress, ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT frontier_module_num, updated_at
                FROM course_progress
                WHERE course_id = ?1
            ",
        )
        .bind(course_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(CourseProgress {
            course_id: course_id.clone(),
            frontier_module_num: row.try_get("frontier_module_num").map_err(ser)?,
            updated_at: row.try_get("updated_at").map_err(ser)?,
        }))
    }

    async fn save_progress(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO course_progress (course_id, frontier_module_num, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(course_id) DO UPDATE SET
                    frontier_module_num = excluded.frontier_module_num,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(progress.course_id.as_str())
        .bind(progress.frontier_module_num)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
