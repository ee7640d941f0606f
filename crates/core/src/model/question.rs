use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Level, SessionId};

/// Number of answer options shown per question.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("expression cannot be empty")]
    EmptyExpression,

    #[error("correct index {index} is out of range")]
    IndexOutOfRange { index: usize },

    #[error("option at correct index is {found}, expected {expected}")]
    AnswerMismatch { expected: i64, found: i64 },

    #[error("options must be distinct, {value} appears more than once")]
    DuplicateOption { value: i64 },

    #[error("options at level {level} must be non-negative, got {value}")]
    NegativeOption { level: Level, value: i64 },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A generated multiple-choice question.
///
/// Immutable once built; `new` enforces that the correct answer sits at
/// `correct_index`, that the options are distinct, and that levels 1–2 only
/// ever show non-negative options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    session_id: SessionId,
    level: Level,
    expression: String,
    correct_answer: i64,
    options: [i64; OPTION_COUNT],
    correct_index: usize,
}

impl Question {
    /// Validate and build a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when any invariant is violated.
    pub fn new(
        session_id: SessionId,
        level: Level,
        expression: impl Into<String>,
        correct_answer: i64,
        options: [i64; OPTION_COUNT],
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        let expression = expression.into();
        if expression.trim().is_empty() {
            return Err(QuestionError::EmptyExpression);
        }

        let Some(&found) = options.get(correct_index) else {
            return Err(QuestionError::IndexOutOfRange {
                index: correct_index,
            });
        };
        if found != correct_answer {
            return Err(QuestionError::AnswerMismatch {
                expected: correct_answer,
                found,
            });
        }

        for (i, value) in options.iter().enumerate() {
            if options[..i].contains(value) {
                return Err(QuestionError::DuplicateOption { value: *value });
            }
            if level.value() <= 2 && *value < 0 {
                return Err(QuestionError::NegativeOption {
                    level,
                    value: *value,
                });
            }
        }

        Ok(Self {
            session_id,
            level,
            expression,
            correct_answer,
            options,
            correct_index,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Display form, e.g. `"12 + 3 × 4"`.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    #[must_use]
    pub fn correct_answer(&self) -> i64 {
        self.correct_answer
    }

    #[must_use]
    pub fn options(&self) -> &[i64; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn is_correct(&self, selected_index: usize) -> bool {
        selected_index == self.correct_index
    }
}
