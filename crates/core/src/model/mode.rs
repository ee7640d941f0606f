use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown quiz mode: {raw:?}")]
pub struct ModeParseError {
    pub raw: String,
}

/// Question family played in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuizMode {
    /// One operation per question.
    SingleOp,
    /// Chained operations evaluated left to right.
    #[default]
    RandomMix,
}

impl QuizMode {
    pub const SINGLE_OP_LABEL: &'static str = "Single-op";
    pub const RANDOM_MIX_LABEL: &'static str = "Random Mix";

    /// Human-facing label, also the persisted form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuizMode::SingleOp => Self::SINGLE_OP_LABEL,
            QuizMode::RandomMix => Self::RANDOM_MIX_LABEL,
        }
    }

    /// Reads a stored label back: `"Single-op"` selects single-op, every
    /// other label selects mixed.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label == Self::SINGLE_OP_LABEL {
            QuizMode::SingleOp
        } else {
            QuizMode::RandomMix
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Strict parsing for configuration input (flags and env vars).
impl FromStr for QuizMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "single-op" | "single" | "singleop" => Ok(QuizMode::SingleOp),
            "random-mix" | "mixed" | "mix" | "randommix" => Ok(QuizMode::RandomMix),
            _ => Err(ModeParseError { raw: s.to_string() }),
        }
    }
}
