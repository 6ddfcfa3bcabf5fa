//! Anonymous pseudonyms of the form "Adjective Animal".
//!
//! A pseudonym is drawn once when an account is created and never changes.
//! Collisions between users are allowed.

use rand::Rng;

pub const ADJECTIVES: [&str; 22] = [
    "Brave", "Witty", "Curious", "Bold", "Creative", "Gentle", "Swift", "Bright", "Clever",
    "Daring", "Elegant", "Fierce", "Graceful", "Humble", "Keen", "Lively", "Noble", "Radiant",
    "Serene", "Vibrant", "Wise", "Zealous",
];

pub const ANIMALS: [&str; 22] = [
    "Panda", "Wolf", "Eagle", "Dolphin", "Tiger", "Owl", "Fox", "Lion", "Butterfly", "Hawk",
    "Penguin", "Rabbit", "Bear", "Deer", "Whale", "Flamingo", "Koala", "Cheetah", "Elephant",
    "Peacock", "Otter", "Swan",
];

/// Generate a pseudonym from the thread-local RNG.
pub fn generate_name() -> String {
    generate_name_with(&mut rand::thread_rng())
}

/// Generate a pseudonym from a caller-supplied RNG.
///
/// The adjective and the animal are drawn independently and uniformly.
pub fn generate_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let animal = ANIMALS[rng.gen_range(0..ANIMALS.len())];
    format!("{} {}", adjective, animal)
}

/// Avatar initials: the first letter of every word ("Brave Panda" -> "BP").
pub fn initials(pseudonym: &str) -> String {
    pseudonym
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn name_is_adjective_then_animal() {
        let name = generate_name();
        let (adjective, animal) = name.split_once(' ').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(ANIMALS.contains(&animal));
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let a = generate_name_with(&mut StdRng::seed_from_u64(7));
        let b = generate_name_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn many_draws_cover_more_than_one_name() {
        let mut rng = StdRng::seed_from_u64(42);
        let names: std::collections::HashSet<String> =
            (0..200).map(|_| generate_name_with(&mut rng)).collect();
        assert!(names.len() > 50);
    }

    #[test]
    fn word_lists_have_no_spaces() {
        for word in ADJECTIVES.iter().chain(ANIMALS.iter()) {
            assert!(!word.contains(' '), "{word} would break the two-word format");
        }
    }

    #[test]
    fn initials_take_first_letters() {
        assert_eq!(initials("Brave Panda"), "BP");
        assert_eq!(initials("  Swift   Owl "), "SO");
        assert_eq!(initials(""), "");
    }
}
