use course_core::model::{AttemptId, CourseId, ModuleId};
use sqlx::Row;
use sqlx::types::Uuid;

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64};
use crate::repository::{QuizResultRecord, QuizResultRepository, StorageError};

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResultRecord, StorageError> {
    Ok(QuizResultRecord {
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        module_id: ModuleId::new(row.try_get::<String, _>("module_id").map_err(ser)?),
        attempt_id: AttemptId::from_uuid(row.try_get::<Uuid, _>("attempt_id").map_err(ser)?),
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        total: u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        percentage: u32_from_i64(
            "percentage",
            row.try_get::<i64, _>("percentage").map_err(ser)?,
        )?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, record: &QuizResultRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    course_id, module_id, attempt_id, correct, total, percentage, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(record.course_id.as_str())
        .bind(record.module_id.as_str())
        .bind(record.attempt_id.value())
        .bind(i64::from(record.correct))
        .bind(i64::from(record.total))
        .bind(i64::from(record.percentage))
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn latest_result(
        &self,
        course_id: &CourseId,
        module_id: &ModuleId,
    ) -> Result<Option<QuizResultRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT course_id, module_id, attempt_id, correct, total, percentage, completed_at
                FROM quiz_results
                WHERE course_id = ?1 AND module_id = ?2
                ORDER BY completed_at DESC, id DESC
                LIMIT 1
            ",
        )
        .bind(course_id.as_str())
        .bind(module_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_result_row).transpose()
    }
}
