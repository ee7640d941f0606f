use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::{QuizSettings, UserId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_settings_row};
use crate::repository::{SettingsRepository, StorageError};

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self, user_id: UserId) -> Result<Option<QuizSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                mode,
                questions_per_session,
                timer_seconds,
                auto_advance_ms
            FROM settings
            WHERE user_id = ?1
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        map_settings_row(&row).map(Some)
    }

    async fn save_settings(
        &self,
        user_id: UserId,
        settings: &QuizSettings,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO settings (
                user_id,
                mode,
                questions_per_session,
                timer_seconds,
                auto_advance_ms,
                updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                mode = excluded.mode,
                questions_per_session = excluded.questions_per_session,
                timer_seconds = excluded.timer_seconds,
                auto_advance_ms = excluded.auto_advance_ms,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(settings.mode().label())
        .bind(i64::from(settings.questions_per_session()))
        .bind(i64::from(settings.timer_seconds()))
        .bind(i64::from(settings.auto_advance_ms()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
