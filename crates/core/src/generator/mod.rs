//! Procedural question generators.
//!
//! Every generator takes its random source per call so sequences are
//! reproducible from a seed.

mod mixed;
mod single_op;

use rand::{Rng, RngCore};
use thiserror::Error;

use crate::model::{Level, Question, QuestionError, QuizMode, SessionId};

pub use mixed::MixedExpressionGenerator;
pub use single_op::SingleOpGenerator;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("{mode} does not support level {level} (minimum {min})")]
    InvalidLevel {
        mode: QuizMode,
        level: Level,
        min: Level,
    },
    #[error(transparent)]
    Question(#[from] QuestionError),
}

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// A source of multiple-choice questions for one mode.
pub trait QuestionGenerator: Send + Sync {
    fn mode(&self) -> QuizMode;

    /// Lowest level this generator is designed for.
    fn min_level(&self) -> Level;

    fn supports_level(&self, level: Level) -> bool {
        level >= self.min_level()
    }

    /// Generate one question for `session_id` at `level`.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::InvalidLevel` if `level` is below `min_level`.
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        session_id: SessionId,
        level: Level,
    ) -> Result<Question, GeneratorError>;
}

/// Both generators, selected by mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorSet {
    single_op: SingleOpGenerator,
    mixed: MixedExpressionGenerator,
}

impl GeneratorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_mode(&self, mode: QuizMode) -> &dyn QuestionGenerator {
        match mode {
            QuizMode::SingleOp => &self.single_op,
            QuizMode::RandomMix => &self.mixed,
        }
    }

    /// Generator that will serve `mode` at `level`.
    ///
    /// Falls back to single-op when the mode's generator does not support the
    /// level (mixed mode at level 1).
    #[must_use]
    pub fn select(&self, mode: QuizMode, level: Level) -> &dyn QuestionGenerator {
        let preferred = self.for_mode(mode);
        if preferred.supports_level(level) {
            preferred
        } else {
            &self.single_op
        }
    }
}

/// Uniform draw from `[lo, hi)`, collapsing to `lo` when the range is empty.
pub(crate) fn sample(rng: &mut dyn RngCore, lo: i64, hi_exclusive: i64) -> i64 {
    if hi_exclusive <= lo {
        lo
    } else {
        rng.random_range(lo..hi_exclusive)
    }
}
