use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{Level, SessionSummary, UserId};

/// Longest display name accepted, in characters.
pub const DISPLAY_NAME_MAX_CHARS: usize = 40;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error("display name is longer than {max} characters")]
    DisplayNameTooLong { max: usize },
}

/// Trimmed, non-empty player name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a name.
    ///
    /// # Errors
    ///
    /// Returns `UserError` when the trimmed name is empty or longer than
    /// [`DISPLAY_NAME_MAX_CHARS`].
    pub fn new(raw: &str) -> Result<Self, UserError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserError::EmptyDisplayName);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX_CHARS {
            return Err(UserError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Wraps a name built from known-good word lists.
    pub(crate) fn from_generated(name: String) -> Self {
        Self(name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A player profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    id: UserId,
    display_name: DisplayName,
    created_at: DateTime<Utc>,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: UserId, display_name: DisplayName, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn rename(&mut self, display_name: DisplayName) {
        self.display_name = display_name;
    }
}

/// Lifetime figures over a player's completed sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub games_played: u32,
    pub best_score: u32,
    /// Mean score, rounded down.
    pub average_score: u32,
    pub average_accuracy: f64,
    pub best_streak: u32,
    pub highest_level: Level,
}

impl UserStats {
    /// Aggregate completed sessions. `None` when there are none.
    #[must_use]
    pub fn from_summaries<'a, I>(summaries: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a SessionSummary>,
    {
        let mut games: u32 = 0;
        let mut total_score: u64 = 0;
        let mut total_accuracy = 0.0;
        let mut best_score = 0;
        let mut best_streak = 0;
        let mut highest_level = Level::MIN;

        for summary in summaries {
            games = games.saturating_add(1);
            total_score += u64::from(summary.final_score());
            total_accuracy += summary.accuracy();
            best_score = best_score.max(summary.final_score());
            best_streak = best_streak.max(summary.max_streak());
            highest_level = highest_level.max(summary.highest_level());
        }

        if games == 0 {
            return None;
        }
        let average_score = u32::try_from(total_score / u64::from(games)).unwrap_or(u32::MAX);
        Some(Self {
            games_played: games,
            best_score,
            average_score,
            average_accuracy: total_accuracy / f64::from(games),
            best_streak,
            highest_level,
        })
    }
}
