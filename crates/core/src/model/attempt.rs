use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{OPTION_COUNT, Question};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("selected index must be in 0..4, got {0}")]
    InvalidSelection(usize),
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// Record of a single answer to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub selected_index: usize,
    pub correct: bool,
    pub answer_time_ms: u64,
}

impl Attempt {
    /// Grade `selected_index` against `question`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidSelection` if the index is not one of the options.
    pub fn grade(
        question: &Question,
        selected_index: usize,
        answer_time_ms: u64,
    ) -> Result<Self, AttemptError> {
        if selected_index >= OPTION_COUNT {
            return Err(AttemptError::InvalidSelection(selected_index));
        }
        Ok(Self {
            selected_index,
            correct: question.is_correct(selected_index),
            answer_time_ms,
        })
    }
}
