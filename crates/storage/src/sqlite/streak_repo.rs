use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use prep_core::model::{QuestionId, Subject, UserId};
use prep_core::streak::{DAILY_TARGET, DailyProgress};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, count_from_i64, question_id_to_i64, ser, user_id_from_i64, user_id_to_i64,
};
use crate::repository::{AttemptOutcome, StorageError, StreakRepository};

const SELECT_DAY: &str = r"
    SELECT user_id, date, math_count, verbal_count, completed_at
    FROM streak_days
    WHERE user_id = ?1 AND date = ?2
";

const BUMP_MATH: &str = r"
    UPDATE streak_days
    SET math_count = MIN(?3, math_count + 1)
    WHERE user_id = ?1 AND date = ?2
";

const BUMP_VERBAL: &str = r"
    UPDATE streak_days
    SET verbal_count = MIN(?3, verbal_count + 1)
    WHERE user_id = ?1 AND date = ?2
";

#[async_trait]
impl StreakRepository for SqliteRepository {
    async fn get_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyProgress>, StorageError> {
        let row = sqlx::query(SELECT_DAY)
            .bind(user_id_to_i64(user_id)?)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(day_from_row).transpose()
    }

    async fn save_day(&self, day: &DailyProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO streak_days (user_id, date, math_count, verbal_count, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, date) DO UPDATE SET
                math_count = excluded.math_count,
                verbal_count = excluded.verbal_count,
                completed_at = excluded.completed_at
            ",
        )
        .bind(user_id_to_i64(day.user_id)?)
        .bind(day.date)
        .bind(i64::from(day.math_count))
        .bind(i64::from(day.verbal_count))
        .bind(day.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn completed_days(&self, user_id: UserId) -> Result<Vec<NaiveDate>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT date
            FROM streak_days
            WHERE user_id = ?1 AND completed_at IS NOT NULL
            ORDER BY date DESC
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| row.try_get::<NaiveDate, _>("date").map_err(ser))
            .collect()
    }

    async fn record_attempt(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        subject: Subject,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StorageError> {
        let user = user_id_to_i64(user_id)?;
        // Write first: the transaction must hold the write lock from its
        // first statement so busy_timeout applies.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO question_attempts (user_id, question_id, subject, attempted_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, question_id, attempted_date) DO NOTHING
            ",
        )
        .bind(user)
        .bind(question_id_to_i64(question_id)?)
        .bind(subject.as_str())
        .bind(date)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?
        .rows_affected()
            > 0;

        let mut completed_day = false;
        if inserted {
            sqlx::query(
                r"
                INSERT INTO streak_days (user_id, date)
                VALUES (?1, ?2)
                ON CONFLICT(user_id, date) DO NOTHING
                ",
            )
            .bind(user)
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            let bump = match subject {
                Subject::Math => BUMP_MATH,
                Subject::Verbal => BUMP_VERBAL,
            };
            sqlx::query(bump)
                .bind(user)
                .bind(date)
                .bind(i64::from(DAILY_TARGET))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;

            completed_day = sqlx::query(
                r"
                UPDATE streak_days
                SET completed_at = ?3
                WHERE user_id = ?1 AND date = ?2
                  AND completed_at IS NULL
                  AND math_count >= ?4 AND verbal_count >= ?4
                ",
            )
            .bind(user)
            .bind(date)
            .bind(at)
            .bind(i64::from(DAILY_TARGET))
            .execute(&mut *tx)
            .await
            .map_err(conn)?
            .rows_affected()
                > 0;
        }

        let row = sqlx::query(SELECT_DAY)
            .bind(user)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        let day = match row {
            Some(row) => day_from_row(&row)?,
            None => DailyProgress::new(user_id, date),
        };

        tx.commit().await.map_err(conn)?;

        Ok(AttemptOutcome {
            counted: inserted,
            completed_day,
            day,
        })
    }
}

fn day_from_row(row: &SqliteRow) -> Result<DailyProgress, StorageError> {
    Ok(DailyProgress {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        date: row.try_get("date").map_err(ser)?,
        math_count: count_from_i64("math_count", row.try_get("math_count").map_err(ser)?)?,
        verbal_count: count_from_i64("verbal_count", row.try_get("verbal_count").map_err(ser)?)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
