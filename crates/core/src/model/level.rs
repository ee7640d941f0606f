use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::Operator;

/// Highest operand any level can produce.
pub const MAX_OPERAND_CAP: i64 = 500;

const LOW_OPERATORS: &[Operator] = &[Operator::Add, Operator::Subtract];
const MID_OPERATORS: &[Operator] = &[Operator::Add, Operator::Subtract, Operator::Multiply];
const ALL_OPERATORS: &[Operator] = &[
    Operator::Add,
    Operator::Subtract,
    Operator::Multiply,
    Operator::Divide,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("level must be >= 1, got {0}")]
pub struct LevelError(pub u32);

/// Difficulty tier, always >= 1 and without an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Level(u32);

impl Level {
    pub const MIN: Level = Level(1);

    /// Creates a level.
    ///
    /// # Errors
    ///
    /// Returns `LevelError` for level 0.
    pub fn new(value: u32) -> Result<Self, LevelError> {
        if value == 0 {
            return Err(LevelError(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One level down, never below `Level::MIN`.
    #[must_use]
    pub fn prev(self) -> Self {
        Self(self.0.saturating_sub(1).max(1))
    }

    /// Operand range and operator set for this level.
    #[must_use]
    pub fn profile(self) -> LevelProfile {
        match self.0 {
            0 | 1 => LevelProfile::new(1, 10, LOW_OPERATORS),
            2 => LevelProfile::new(1, 20, MID_OPERATORS),
            3 => LevelProfile::new(2, 50, ALL_OPERATORS),
            4 => LevelProfile::new(3, 100, ALL_OPERATORS),
            n => {
                let grown = 100 + (i64::from(n) - 4) * 50;
                LevelProfile::new(5, grown.min(MAX_OPERAND_CAP), ALL_OPERATORS)
            }
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive operand range and allowed operators for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProfile {
    min: i64,
    max: i64,
    operators: &'static [Operator],
}

impl LevelProfile {
    fn new(min: i64, max: i64, operators: &'static [Operator]) -> Self {
        Self {
            min,
            max,
            operators,
        }
    }

    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    #[must_use]
    pub fn operators(&self) -> &'static [Operator] {
        self.operators
    }

    #[must_use]
    pub fn allows(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }
}
