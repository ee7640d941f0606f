//! Points awarded per answer.

use serde::{Deserialize, Serialize};

/// Scoring constants and bonus calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringEngine {
    base_score: u32,
    streak_bonus_multiplier: u32,
    streak_bonus_threshold: u32,
    question_budget_ms: u64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self {
            base_score: Self::BASE_SCORE,
            streak_bonus_multiplier: Self::STREAK_BONUS_MULTIPLIER,
            streak_bonus_threshold: Self::STREAK_BONUS_THRESHOLD,
            question_budget_ms: Self::QUESTION_BUDGET_MS,
        }
    }
}

impl ScoringEngine {
    pub const BASE_SCORE: u32 = 10;
    pub const STREAK_BONUS_MULTIPLIER: u32 = 2;
    pub const STREAK_BONUS_THRESHOLD: u32 = 3;
    /// Nominal time allowed per question when grading speed.
    pub const QUESTION_BUDGET_MS: u64 = 10_000;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn base_score(&self) -> u32 {
        self.base_score
    }

    #[must_use]
    pub fn question_budget_ms(&self) -> u64 {
        self.question_budget_ms
    }

    /// New running score after one answer.
    ///
    /// Incorrect answers leave the score unchanged. `streak` is the streak
    /// including this answer. The time bonus applies only with the timer on
    /// and a positive answer time.
    #[must_use]
    pub fn calculate_score(
        &self,
        current: u32,
        streak: u32,
        is_correct: bool,
        answer_time_ms: u64,
        timer_enabled: bool,
    ) -> u32 {
        if !is_correct {
            return current;
        }

        let mut points = self.base_score + self.streak_bonus(streak);
        if timer_enabled && answer_time_ms > 0 {
            points += self.time_bonus(answer_time_ms, self.question_budget_ms);
        }
        current.saturating_add(points)
    }

    /// `multiplier × ⌊streak / threshold⌋`.
    #[must_use]
    pub fn streak_bonus(&self, streak: u32) -> u32 {
        if self.streak_bonus_threshold == 0 {
            return 0;
        }
        self.streak_bonus_multiplier * (streak / self.streak_bonus_threshold)
    }

    /// 5 / 3 / 1 / 0 for answers under a quarter, half, three quarters of the budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_bonus(&self, answer_time_ms: u64, budget_ms: u64) -> u32 {
        if answer_time_ms == 0 || budget_ms == 0 {
            return 0;
        }
        let ratio = answer_time_ms as f64 / budget_ms as f64;
        if ratio < 0.25 {
            5
        } else if ratio < 0.5 {
            3
        } else if ratio < 0.75 {
            1
        } else {
            0
        }
    }
}
