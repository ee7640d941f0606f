use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Level;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("answered ({answered}) exceeds total questions ({total})")]
    CountMismatch { answered: u32, total: u32 },

    #[error("accuracy must be within 0..=100, got {0}")]
    InvalidAccuracy(f64),
}

//
// ─── PROGRESSION STATE ─────────────────────────────────────────────────────────
//

/// Progression counters for one session.
///
/// Only the session state machine mutates this; callers receive copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Number of questions presented so far.
    pub question_index: u32,
    pub score: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    pub current_level: Level,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub consecutive_wrong: u32,
}

impl SessionState {
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.correct_count.saturating_add(self.wrong_count)
    }

    /// Percentage of correct answers, 0 when nothing was answered.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let answered = self.answered();
        if answered == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) / f64::from(answered) * 100.0
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Every configured question was answered.
    Completed,
    /// The session countdown ran out.
    TimeExpired,
}

impl EndReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::TimeExpired => "time_expired",
        }
    }
}

/// Final results of a finished quiz session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    final_score: u32,
    accuracy: f64,
    max_streak: u32,
    highest_level: Level,
    correct_count: u32,
    wrong_count: u32,
    total_questions: u32,
    end_reason: EndReason,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Build the summary from the final progression state.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn from_state(
        state: &SessionState,
        highest_level: Level,
        total_questions: u32,
        end_reason: EndReason,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionSummaryError> {
        Self::from_persisted(
            state.score,
            state.accuracy(),
            state.max_streak,
            highest_level.max(state.current_level),
            state.correct_count,
            state.wrong_count,
            total_questions,
            end_reason,
            started_at,
            completed_at,
        )
    }

    /// Rehydrate a session summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if times, counts or accuracy do not line up.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        final_score: u32,
        accuracy: f64,
        max_streak: u32,
        highest_level: Level,
        correct_count: u32,
        wrong_count: u32,
        total_questions: u32,
        end_reason: EndReason,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let answered = correct_count.saturating_add(wrong_count);
        if answered > total_questions {
            return Err(SessionSummaryError::CountMismatch {
                answered,
                total: total_questions,
            });
        }
        if !(0.0..=100.0).contains(&accuracy) {
            return Err(SessionSummaryError::InvalidAccuracy(accuracy));
        }

        Ok(Self {
            final_score,
            accuracy,
            max_streak,
            highest_level,
            correct_count,
            wrong_count,
            total_questions,
            end_reason,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn final_score(&self) -> u32 {
        self.final_score
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[must_use]
    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    #[must_use]
    pub fn highest_level(&self) -> Level {
        self.highest_level
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn wrong_count(&self) -> u32 {
        self.wrong_count
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn end_reason(&self) -> EndReason {
        self.end_reason
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
