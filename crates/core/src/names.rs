//! Random "Adjective Noun NNNN" names for quick profiles.

use rand::{Rng, RngCore};

use crate::model::DisplayName;

const ADJECTIVES: [&str; 16] = [
    "Smart", "Quick", "Clever", "Bright", "Sharp", "Fast", "Super", "Amazing", "Cool", "Awesome",
    "Fun", "Happy", "Lucky", "Star", "Speedy", "Wizard",
];

const NOUNS: [&str; 13] = [
    "Player",
    "Solver",
    "Thinker",
    "Champion",
    "Master",
    "Genius",
    "Hero",
    "Student",
    "Learner",
    "Explorer",
    "Discoverer",
    "Adventurer",
    "Builder",
];

/// Four-digit suffix range, upper bound exclusive.
const SUFFIX_RANGE: std::ops::Range<u32> = 1000..9999;

/// Draw a profile name such as `"Quick Solver 4821"`.
pub fn random_display_name(rng: &mut dyn RngCore) -> DisplayName {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let suffix = rng.random_range(SUFFIX_RANGE);
    // longest draw is 23 characters
    DisplayName::from_generated(format!("{adjective} {noun} {suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn names_follow_adjective_noun_number() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let name = random_display_name(&mut rng);
            let parts: Vec<&str> = name.as_str().split(' ').collect();
            assert_eq!(parts.len(), 3, "{name}");
            assert!(ADJECTIVES.contains(&parts[0]));
            assert!(NOUNS.contains(&parts[1]));
            let suffix: u32 = parts[2].parse().unwrap();
            assert!(SUFFIX_RANGE.contains(&suffix));
        }
    }

    #[test]
    fn generated_names_pass_validation() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let name = random_display_name(&mut rng);
            assert_eq!(DisplayName::new(name.as_str()).unwrap(), name);
        }
    }

    #[test]
    fn same_seed_same_name() {
        let a = random_display_name(&mut StdRng::seed_from_u64(77));
        let b = random_display_name(&mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }
}
