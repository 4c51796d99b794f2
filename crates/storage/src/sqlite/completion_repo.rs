use async_trait::async_trait;
use prep_core::model::{CompletionKey, CompletionSet, Subject, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, subtopic_from_column, subtopic_to_column, user_id_to_i64};
use crate::repository::{CompletionRecord, CompletionRepository, StorageError};

#[async_trait]
impl CompletionRepository for SqliteRepository {
    async fn list_completions(
        &self,
        user_id: UserId,
        subject: Subject,
    ) -> Result<CompletionSet, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT topic, subtopic
            FROM completions
            WHERE user_id = ?1 AND subject = ?2
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(subject.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut set = CompletionSet::new();
        for row in rows {
            set.insert(CompletionKey {
                topic: row.try_get("topic").map_err(ser)?,
                subtopic: subtopic_from_column(row.try_get("subtopic").map_err(ser)?),
            });
        }
        Ok(set)
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO completions (user_id, subject, topic, subtopic, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, subject, topic, subtopic) DO NOTHING
            ",
        )
        .bind(user_id_to_i64(record.user_id)?)
        .bind(record.subject.as_str())
        .bind(&record.key.topic)
        .bind(subtopic_to_column(record.key.subtopic.as_deref()))
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }
}
