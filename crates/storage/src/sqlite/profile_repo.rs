use async_trait::async_trait;
use prep_core::model::UserId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser, user_id_from_i64, user_id_to_i64};
use crate::repository::{ProfileRecord, ProfileRepository, StorageError};

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<ProfileRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, role, is_admin, math_level, verbal_level, streak_offset
            FROM profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ProfileRecord {
            user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
            role: row.try_get("role").map_err(ser)?,
            is_admin: row.try_get::<i64, _>("is_admin").map_err(ser)? != 0,
            math_level: row.try_get("math_level").map_err(ser)?,
            verbal_level: row.try_get("verbal_level").map_err(ser)?,
            streak_offset: row.try_get("streak_offset").map_err(ser)?,
        }))
    }

    async fn upsert_profile(&self, profile: &ProfileRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, role, is_admin, math_level, verbal_level, streak_offset)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                role = excluded.role,
                is_admin = excluded.is_admin,
                math_level = excluded.math_level,
                verbal_level = excluded.verbal_level,
                streak_offset = excluded.streak_offset
            ",
        )
        .bind(user_id_to_i64(profile.user_id)?)
        .bind(&profile.role)
        .bind(i64::from(profile.is_admin))
        .bind(profile.math_level.as_deref())
        .bind(profile.verbal_level.as_deref())
        .bind(profile.streak_offset)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
