use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuizMode;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("questions per session must be > 0")]
    InvalidQuestionsPerSession,

    #[error("timer seconds must be 0 (disabled) or between 5 and 3600, got {0}")]
    InvalidTimerSeconds(u32),

    #[error("auto advance delay must be <= 10000 ms, got {0}")]
    InvalidAutoAdvance(u32),
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Per-player quiz configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSettings {
    mode: QuizMode,
    questions_per_session: u32,
    timer_seconds: u32,
    auto_advance_ms: u32,
}

/// Unvalidated settings as they arrive from flags, env vars or storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettingsDraft {
    pub mode: QuizMode,
    pub questions_per_session: u32,
    pub timer_seconds: u32,
    pub auto_advance_ms: u32,
}

impl Default for QuizSettingsDraft {
    fn default() -> Self {
        Self {
            mode: QuizMode::RandomMix,
            questions_per_session: QuizSettings::DEFAULT_QUESTIONS,
            timer_seconds: 0,
            auto_advance_ms: QuizSettings::DEFAULT_AUTO_ADVANCE_MS,
        }
    }
}

impl QuizSettingsDraft {
    /// Validate the draft.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any field is out of range.
    pub fn validate(self) -> Result<QuizSettings, SettingsError> {
        if self.questions_per_session == 0 {
            return Err(SettingsError::InvalidQuestionsPerSession);
        }
        if self.timer_seconds != 0 && !(5..=3600).contains(&self.timer_seconds) {
            return Err(SettingsError::InvalidTimerSeconds(self.timer_seconds));
        }
        if self.auto_advance_ms > 10_000 {
            return Err(SettingsError::InvalidAutoAdvance(self.auto_advance_ms));
        }

        Ok(QuizSettings {
            mode: self.mode,
            questions_per_session: self.questions_per_session,
            timer_seconds: self.timer_seconds,
            auto_advance_ms: self.auto_advance_ms,
        })
    }
}

impl QuizSettings {
    pub const DEFAULT_QUESTIONS: u32 = 10;
    pub const DEFAULT_AUTO_ADVANCE_MS: u32 = 1500;

    /// Rehydrate settings from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if stored values are out of range.
    pub fn from_persisted(
        mode: QuizMode,
        questions_per_session: u32,
        timer_seconds: u32,
        auto_advance_ms: u32,
    ) -> Result<Self, SettingsError> {
        QuizSettingsDraft {
            mode,
            questions_per_session,
            timer_seconds,
            auto_advance_ms,
        }
        .validate()
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    #[must_use]
    pub fn questions_per_session(&self) -> u32 {
        self.questions_per_session
    }

    /// Session-wide countdown in seconds; 0 means the timer is off.
    #[must_use]
    pub fn timer_seconds(&self) -> u32 {
        self.timer_seconds
    }

    #[must_use]
    pub fn timer_enabled(&self) -> bool {
        self.timer_seconds > 0
    }

    /// Pause between answering and the next question.
    #[must_use]
    pub fn auto_advance_ms(&self) -> u32 {
        self.auto_advance_ms
    }

    /// Convert back into an editable draft.
    #[must_use]
    pub fn to_draft(&self) -> QuizSettingsDraft {
        QuizSettingsDraft {
            mode: self.mode,
            questions_per_session: self.questions_per_session,
            timer_seconds: self.timer_seconds,
            auto_advance_ms: self.auto_advance_ms,
        }
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            mode: QuizMode::RandomMix,
            questions_per_session: Self::DEFAULT_QUESTIONS,
            timer_seconds: 0,
            auto_advance_ms: Self::DEFAULT_AUTO_ADVANCE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draft_validates_to_default_settings() {
        let settings = QuizSettingsDraft::default().validate().unwrap();
        assert_eq!(settings, QuizSettings::default());
        assert!(!settings.timer_enabled());
    }

    #[test]
    fn rejects_zero_questions() {
        let draft = QuizSettingsDraft {
            questions_per_session: 0,
            ..QuizSettingsDraft::default()
        };
        assert_eq!(
            draft.validate(),
            Err(SettingsError::InvalidQuestionsPerSession)
        );
    }

    #[test]
    fn timer_bounds() {
        let too_short = QuizSettingsDraft {
            timer_seconds: 3,
            ..QuizSettingsDraft::default()
        };
        assert_eq!(too_short.validate(), Err(SettingsError::InvalidTimerSeconds(3)));

        let minute = QuizSettings::from_persisted(QuizMode::SingleOp, 5, 60, 0).unwrap();
        assert!(minute.timer_enabled());
        assert_eq!(minute.to_draft().timer_seconds, 60);
    }

    #[test]
    fn rejects_long_auto_advance() {
        let err = QuizSettings::from_persisted(QuizMode::SingleOp, 5, 0, 20_000).unwrap_err();
        assert_eq!(err, SettingsError::InvalidAutoAdvance(20_000));
    }
}
