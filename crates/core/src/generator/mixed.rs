use rand::{Rng, RngCore};

use super::{GeneratorError, QuestionGenerator, sample};
use crate::distractor::{DistractorFamily, DistractorGenerator};
use crate::expression::Expression;
use crate::model::{Level, LevelProfile, Operator, Question, QuizMode, SessionId};

/// Chains are re-drawn at most this many times while looking for a
/// non-negative result at levels 1–2.
const MAX_CHAIN_DRAWS: usize = 100;

/// Chained `n0 op1 n1 op2 n2 …` questions evaluated strictly left to right.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixedExpressionGenerator {
    distractors: DistractorGenerator,
}

impl MixedExpressionGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn operation_count(rng: &mut dyn RngCore, level: Level) -> usize {
        match level.value() {
            0 | 1 => 1,
            2 => rng.random_range(1..=2),
            _ => rng.random_range(2..=3),
        }
    }

    fn build_chain(rng: &mut dyn RngCore, level: Level, profile: &LevelProfile) -> Expression {
        let (min, max) = (profile.min(), profile.max());
        let ops = profile.operators();

        let mut chain = Expression::starting_with(sample(rng, min, max + 1));
        for _ in 0..Self::operation_count(rng, level) {
            let op = ops[rng.random_range(0..ops.len())];
            let next = if op == Operator::Divide && level.value() <= 2 {
                let divisors = divisors_in_range(chain.last_operand(), min, max);
                if divisors.is_empty() {
                    sample(rng, min.max(2), max.min(10))
                } else {
                    divisors[rng.random_range(0..divisors.len())]
                }
            } else {
                sample(rng, min, max + 1)
            };
            chain.push(op, next);
        }
        chain
    }
}

/// Exact divisors of `number` within `[max(min, 2), min(max, number)]`.
fn divisors_in_range(number: i64, min: i64, max: i64) -> Vec<i64> {
    (min.max(2)..=max.min(number))
        .filter(|d| number % d == 0)
        .collect()
}

impl QuestionGenerator for MixedExpressionGenerator {
    fn mode(&self) -> QuizMode {
        QuizMode::RandomMix
    }

    fn min_level(&self) -> Level {
        Level::MIN.next()
    }

    fn generate(
        &self,
        rng: &mut dyn RngCore,
        session_id: SessionId,
        level: Level,
    ) -> Result<Question, GeneratorError> {
        if !self.supports_level(level) {
            return Err(GeneratorError::InvalidLevel {
                mode: self.mode(),
                level,
                min: self.min_level(),
            });
        }

        let profile = level.profile();
        let mut chain = Self::build_chain(rng, level, &profile);
        let mut answer = chain.evaluate();
        let mut draws = 1;
        while level.value() <= 2 && answer < 0 && draws < MAX_CHAIN_DRAWS {
            chain = Self::build_chain(rng, level, &profile);
            answer = chain.evaluate();
            draws += 1;
        }

        let set = self
            .distractors
            .generate(rng, answer, DistractorFamily::Mixed, level);

        Ok(Question::new(
            session_id,
            level,
            chain.to_string(),
            answer,
            set.options,
            set.correct_index,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn level(n: u32) -> Level {
        Level::new(n).unwrap()
    }

    #[test]
    fn rejects_level_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = MixedExpressionGenerator::new()
            .generate(&mut rng, SessionId::new(1), Level::MIN)
            .unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidLevel { .. }));
    }

    #[test]
    fn chain_evaluates_left_to_right_to_the_answer() {
        let generator = MixedExpressionGenerator::new();
        let mut rng = StdRng::seed_from_u64(314);
        for lvl in [2, 3, 4, 6, 15] {
            for _ in 0..1000 {
                let q = generator.generate(&mut rng, SessionId::new(9), level(lvl)).unwrap();
                let chain: Expression = q.expression().parse().unwrap();
                assert_eq!(chain.evaluate(), q.correct_answer(), "{}", q.expression());
                assert_eq!(q.options()[q.correct_index()], q.correct_answer());
                if lvl <= 2 {
                    assert!(q.options().iter().all(|o| *o >= 0), "{:?}", q.options());
                }
            }
        }
    }

    #[test]
    fn operation_counts_follow_level() {
        let mut rng = StdRng::seed_from_u64(12);
        assert_eq!(MixedExpressionGenerator::operation_count(&mut rng, Level::MIN), 1);
        for _ in 0..200 {
            let two = MixedExpressionGenerator::operation_count(&mut rng, level(2));
            assert!((1..=2).contains(&two));
            let high = MixedExpressionGenerator::operation_count(&mut rng, level(7));
            assert!((2..=3).contains(&high));
        }
    }

    #[test]
    fn chains_use_level_range_and_operators() {
        let mut rng = StdRng::seed_from_u64(21);
        let profile = level(2).profile();
        for _ in 0..300 {
            let chain = MixedExpressionGenerator::build_chain(&mut rng, level(2), &profile);
            assert!((1..=2).contains(&chain.operator_count()));
            assert!(!chain.to_string().contains('÷'));
        }
    }

    #[test]
    fn divisors_respect_bounds() {
        assert_eq!(divisors_in_range(12, 1, 20), vec![2, 3, 4, 6, 12]);
        assert_eq!(divisors_in_range(12, 1, 5), vec![2, 3, 4]);
        assert!(divisors_in_range(7, 1, 5).is_empty());
        assert!(divisors_in_range(1, 1, 20).is_empty());
    }

    #[test]
    fn same_seed_same_sequence() {
        let generator = MixedExpressionGenerator::new();
        let run = || {
            let mut rng = StdRng::seed_from_u64(2718);
            (2..=8)
                .map(|l| generator.generate(&mut rng, SessionId::new(4), level(l)).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
