//! Wrong-answer synthesis and option shuffling.

use rand::{Rng, RngCore};
use tracing::debug;

use crate::model::{Level, OPTION_COUNT, Operator};

/// Rejected draws tolerated before the remaining slots are filled deterministically.
pub const MAX_DISTRACTOR_ATTEMPTS: usize = 100;

/// Candidate family used to build plausible wrong answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistractorFamily {
    /// Off-by-one and near misses for `+` and `-`.
    Additive,
    /// Close misses, ×1.5 and halving for `×`.
    Multiplicative,
    /// Off-by-one, doubling and small jitter for `÷`.
    Divisive,
    /// Near misses scaled by the size of a chained result.
    Mixed,
}

impl DistractorFamily {
    #[must_use]
    pub fn for_operator(op: Operator) -> Self {
        match op {
            Operator::Add | Operator::Subtract => DistractorFamily::Additive,
            Operator::Multiply => DistractorFamily::Multiplicative,
            Operator::Divide => DistractorFamily::Divisive,
        }
    }
}

/// Shuffled options together with the slot holding the correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSet {
    pub options: [i64; OPTION_COUNT],
    pub correct_index: usize,
}

/// Builds four distinct options around a correct answer.
#[derive(Debug, Clone, Copy)]
pub struct DistractorGenerator {
    max_attempts: usize,
}

impl Default for DistractorGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DistractorGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_DISTRACTOR_ATTEMPTS,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Produce three distinct distractors, shuffle, and locate the correct answer.
    ///
    /// Negative candidates are rejected unless the correct answer is itself
    /// negative. Terminates after at most `max_attempts` rejected draws.
    pub fn generate(
        &self,
        rng: &mut dyn RngCore,
        correct: i64,
        family: DistractorFamily,
        level: Level,
    ) -> OptionSet {
        let mut values = Vec::with_capacity(OPTION_COUNT);
        values.push(correct);

        let mut rejected = 0;
        while values.len() < OPTION_COUNT && rejected < self.max_attempts {
            let candidate = candidate(rng, correct, family, level);
            let allowed = candidate >= 0 || correct < 0;
            if allowed && !values.contains(&candidate) {
                values.push(candidate);
            } else {
                rejected += 1;
            }
        }

        if values.len() < OPTION_COUNT {
            debug!(
                correct,
                ?family,
                found = values.len(),
                "distractor space exhausted, filling remaining options"
            );
            let mut next = correct.saturating_add(1);
            while values.len() < OPTION_COUNT {
                if !values.contains(&next) {
                    values.push(next);
                }
                next = next.saturating_add(1);
            }
        }

        let mut options = [0; OPTION_COUNT];
        options.copy_from_slice(&values);
        shuffle(rng, options)
    }
}

/// Fisher–Yates over the four slots; the correct answer starts in slot 0.
fn shuffle(rng: &mut dyn RngCore, mut options: [i64; OPTION_COUNT]) -> OptionSet {
    let mut correct_index = 0;
    for i in (1..OPTION_COUNT).rev() {
        let j = rng.random_range(0..=i);
        options.swap(i, j);
        if correct_index == i {
            correct_index = j;
        } else if correct_index == j {
            correct_index = i;
        }
    }
    OptionSet {
        options,
        correct_index,
    }
}

/// Upper bound (exclusive) for near-miss offsets at a level.
fn level_cap(level: Level) -> i64 {
    match level.value() {
        0 | 1 => 5,
        2 => 10,
        _ => 20,
    }
}

fn near_bound(correct: i64, family: DistractorFamily, level: Level) -> i64 {
    match family {
        DistractorFamily::Mixed => (correct.abs() / 5).max(5).min(level_cap(level)),
        _ => level_cap(level),
    }
}

fn candidate(
    rng: &mut dyn RngCore,
    correct: i64,
    family: DistractorFamily,
    level: Level,
) -> i64 {
    let branch = rng.random_range(0..4);
    match family {
        DistractorFamily::Additive | DistractorFamily::Mixed => {
            let bound = near_bound(correct, family, level);
            match branch {
                0 => correct + 1,
                1 => correct - 1,
                2 => correct + rng.random_range(2..bound),
                _ => correct - rng.random_range(2..bound),
            }
        }
        DistractorFamily::Multiplicative => {
            let spread = (correct / 4).max(2);
            match branch {
                0 => correct + rng.random_range(1..spread),
                1 => correct - rng.random_range(1..spread),
                2 => correct * 3 / 2,
                _ => correct / 2,
            }
        }
        DistractorFamily::Divisive => match branch {
            0 => correct + 1,
            1 => correct - 1,
            2 => correct * 2,
            _ => correct + rng.random_range(-3..=3),
        },
    }
}
