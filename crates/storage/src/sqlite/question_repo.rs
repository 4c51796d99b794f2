use async_trait::async_trait;
use prep_core::model::{QuestionCount, QuestionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, count_from_i64, parse_subject, question_id_from_i64, question_id_to_i64, ser,
    user_id_from_i64, user_id_to_i64,
};
use crate::repository::{NewQuestionRecord, QuestionRecord, QuestionRepository, StorageError};

#[async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        question: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO questions (subject, topic, subtopic, stem, published, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(question.subject.as_str())
        .bind(question.topic)
        .bind(question.subtopic)
        .bind(question.stem)
        .bind(i64::from(question.published))
        .bind(user_id_to_i64(question.created_by)?)
        .bind(question.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        question_id_from_i64(res.last_insert_rowid())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<QuestionRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, subject, topic, subtopic, stem, published, created_by, created_at
            FROM questions
            WHERE id = ?1
            ",
        )
        .bind(question_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(question_from_row).transpose()
    }

    async fn question_counts(
        &self,
        published_only: bool,
    ) -> Result<Vec<QuestionCount>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT subject, topic, subtopic, COUNT(*) AS count
            FROM questions
            WHERE ?1 = 0 OR published = 1
            GROUP BY subject, topic, subtopic
            ORDER BY subject, topic, subtopic
            ",
        )
        .bind(i64::from(published_only))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let subject: String = row.try_get("subject").map_err(ser)?;
            counts.push(QuestionCount {
                subject: parse_subject(&subject)?,
                topic: row.try_get("topic").map_err(ser)?,
                subtopic: row.try_get("subtopic").map_err(ser)?,
                count: count_from_i64("count", row.try_get("count").map_err(ser)?)?,
            });
        }
        Ok(counts)
    }
}

fn question_from_row(row: &SqliteRow) -> Result<QuestionRecord, StorageError> {
    let subject: String = row.try_get("subject").map_err(ser)?;
    Ok(QuestionRecord {
        id: question_id_from_i64(row.try_get("id").map_err(ser)?)?,
        subject: parse_subject(&subject)?,
        topic: row.try_get("topic").map_err(ser)?,
        subtopic: row.try_get("subtopic").map_err(ser)?,
        stem: row.try_get("stem").map_err(ser)?,
        published: row.try_get::<i64, _>("published").map_err(ser)? != 0,
        created_by: user_id_from_i64(row.try_get("created_by").map_err(ser)?)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
