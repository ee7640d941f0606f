use rand::{Rng, RngCore};

use super::{GeneratorError, QuestionGenerator, sample};
use crate::distractor::{DistractorFamily, DistractorGenerator};
use crate::expression::Expression;
use crate::model::{Level, LevelProfile, Operator, Question, QuizMode, SessionId};

/// Products stay within the times tables regardless of level.
const FACTOR_CAP: i64 = 12;

/// `a OP b` questions with exact, non-negative answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleOpGenerator {
    distractors: DistractorGenerator,
}

impl SingleOpGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick operands for `op` and return `(a, b, answer)`.
    fn operands(rng: &mut dyn RngCore, op: Operator, profile: &LevelProfile) -> (i64, i64, i64) {
        let (min, max) = (profile.min(), profile.max());
        match op {
            Operator::Add => {
                let a = sample(rng, min, max + 1);
                let b = sample(rng, min, max + 1);
                (a, b, a + b)
            }
            Operator::Subtract => {
                let a = sample(rng, min + 5, max + 1);
                let b = sample(rng, min, a);
                (a, b, a - b)
            }
            Operator::Multiply => {
                let cap = max.min(FACTOR_CAP);
                let a = sample(rng, min, cap);
                let b = sample(rng, min, cap);
                (a, b, a * b)
            }
            Operator::Divide => {
                let b = sample(rng, min.max(2), max.min(FACTOR_CAP));
                let quotient = sample(rng, min, max / b + 1);
                (b * quotient, b, quotient)
            }
        }
    }
}

impl QuestionGenerator for SingleOpGenerator {
    fn mode(&self) -> QuizMode {
        QuizMode::SingleOp
    }

    fn min_level(&self) -> Level {
        Level::MIN
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
        let ops = profile.operators();
        let op = ops[rng.random_range(0..ops.len())];

        let (a, b, answer) = Self::operands(rng, op, &profile);
        let mut expression = Expression::starting_with(a);
        expression.push(op, b);

        let set = self
            .distractors
            .generate(rng, answer, DistractorFamily::for_operator(op), level);

        Ok(Question::new(
            session_id,
            level,
            expression.to_string(),
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
    fn questions_hold_invariants_at_every_tier() {
        let generator = SingleOpGenerator::new();
        let mut rng = StdRng::seed_from_u64(2024);
        for lvl in [1, 2, 3, 4, 5, 9, 30] {
            for _ in 0..1000 {
                let q = generator.generate(&mut rng, SessionId::new(1), level(lvl)).unwrap();
                let parsed: Expression = q.expression().parse().unwrap();
                assert_eq!(parsed.evaluate(), q.correct_answer(), "{}", q.expression());
                assert_eq!(q.options()[q.correct_index()], q.correct_answer());
                assert!(q.correct_answer() >= 0);
                if lvl <= 2 {
                    assert!(q.options().iter().all(|o| *o >= 0));
                }
            }
        }
    }

    #[test]
    fn operators_respect_level_table() {
        let generator = SingleOpGenerator::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let q = generator.generate(&mut rng, SessionId::new(1), level(1)).unwrap();
            assert!(!q.expression().contains('×') && !q.expression().contains('÷'));
            let q = generator.generate(&mut rng, SessionId::new(1), level(2)).unwrap();
            assert!(!q.expression().contains('÷'));
        }
    }

    #[test]
    fn division_is_exact() {
        let profile = level(6).profile();
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..1000 {
            let (a, b, answer) = SingleOpGenerator::operands(&mut rng, Operator::Divide, &profile);
            assert_ne!(b, 0);
            assert_eq!(a, b * answer);
            assert!((2..FACTOR_CAP).contains(&b));
        }
    }

    #[test]
    fn subtraction_never_goes_negative_and_products_stay_small() {
        let mut rng = StdRng::seed_from_u64(8);
        for lvl in [1, 3, 10] {
            let profile = level(lvl).profile();
            for _ in 0..500 {
                let (a, b, diff) =
                    SingleOpGenerator::operands(&mut rng, Operator::Subtract, &profile);
                assert!(b < a && diff > 0);
                let (a, b, _) = SingleOpGenerator::operands(&mut rng, Operator::Multiply, &profile);
                assert!(a < FACTOR_CAP && b < FACTOR_CAP);
            }
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let generator = SingleOpGenerator::new();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (1..=6)
                .map(|l| generator.generate(&mut rng, SessionId::new(3), level(l)).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(41), run(41));
    }
}
