use std::sync::Arc;

use quiz_core::model::{QuizSettings, QuizSettingsDraft, UserId};
use storage::repository::SettingsRepository;

use crate::error::SettingsServiceError;

#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    #[must_use]
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Load the user's settings, or defaults if none were saved.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` on storage failures.
    pub async fn load(&self, user_id: UserId) -> Result<QuizSettings, SettingsServiceError> {
        let settings = self.repo.get_settings(user_id).await?;
        Ok(settings.unwrap_or_default())
    }

    /// Validate and persist new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError` if validation fails or persistence fails.
    pub async fn save(
        &self,
        user_id: UserId,
        draft: QuizSettingsDraft,
    ) -> Result<QuizSettings, SettingsServiceError> {
        let settings = draft.validate()?;
        self.repo.save_settings(user_id, &settings).await?;
        Ok(settings)
    }
}
