//! Identity tokens for template roots, variables and scrubbed copies.

use log::{debug, trace};
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Lowercase letters, digits, uppercase letters and a hyphen.
pub const IDENTITY_ALPHABET: &[u8; 63] =
    b"abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-";

pub const DEFAULT_IDENTITY_LENGTH: usize = 9;

/// Random token generator that never hands out the same token twice.
///
/// Tokens already present in a document can be reserved up front so freshly
/// generated identities never collide with authored ones.
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    issued: HashSet<String>,
    /// Taken tokens per length, counting only tokens drawn from the alphabet
    taken_per_length: HashMap<usize, usize>,
}

/// Number of distinct tokens of `length` characters.
fn token_space(length: usize) -> usize {
    let length = u32::try_from(length).unwrap_or(u32::MAX);
    IDENTITY_ALPHABET.len().saturating_pow(length)
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `identity` as taken. Returns false if it was already taken.
    pub fn reserve(&mut self, identity: &str) -> bool {
        let inserted = self.issued.insert(identity.to_string());
        if inserted && identity.bytes().all(|b| IDENTITY_ALPHABET.contains(&b)) {
            *self.taken_per_length.entry(identity.len()).or_default() += 1;
        }
        inserted
    }

    pub fn is_taken(&self, identity: &str) -> bool {
        self.issued.contains(identity)
    }

    /// Draws a token of `requested` characters (at least one) that was neither
    /// issued nor reserved before.
    ///
    /// When every token of that length is taken the token grows by one character
    /// until a length with free tokens is reached.
    pub fn generate(&mut self, requested: usize) -> String {
        let mut length = requested.max(1);
        while self.taken_per_length.get(&length).copied().unwrap_or(0) >= token_space(length) {
            length += 1;
        }
        if length != requested.max(1) {
            debug!("All identities of length {requested} are taken, using length {length}");
        }

        let mut rng = rand::thread_rng();
        loop {
            let candidate: String = (0..length)
                .map(|_| IDENTITY_ALPHABET[rng.gen_range(0..IDENTITY_ALPHABET.len())] as char)
                .collect();
            if self.reserve(&candidate) {
                return candidate;
            }
            trace!("Identity collision on '{candidate}', drawing again");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_alphabet_and_length() {
        let mut generator = IdentityGenerator::new();
        let token = generator.generate(DEFAULT_IDENTITY_LENGTH);
        assert_eq!(token.len(), DEFAULT_IDENTITY_LENGTH);
        assert!(token.bytes().all(|b| IDENTITY_ALPHABET.contains(&b)));
        assert_eq!(generator.generate(0).len(), 1);
    }

    #[test]
    fn test_generate_never_repeats() {
        let mut generator = IdentityGenerator::new();
        // 63 one-character tokens exhaust the alphabet exactly
        let tokens: HashSet<String> = (0..63).map(|_| generator.generate(1)).collect();
        assert_eq!(tokens.len(), 63);
    }

    #[test]
    fn test_reserved_tokens_are_skipped() {
        let mut generator = IdentityGenerator::new();
        for c in IDENTITY_ALPHABET.iter().skip(1) {
            assert!(generator.reserve(&(*c as char).to_string()));
        }
        assert_eq!(generator.generate(1), "a");
        assert!(!generator.reserve("a"));
    }

    #[test]
    fn test_exhausted_length_grows_token() {
        let mut generator = IdentityGenerator::new();
        for _ in 0..IDENTITY_ALPHABET.len() {
            assert_eq!(generator.generate(1).len(), 1);
        }
        let longer = generator.generate(1);
        assert_eq!(longer.len(), 2);
        assert!(generator.is_taken(&longer));
    }

    #[test]
    fn test_foreign_reservations_do_not_count_against_alphabet() {
        let mut generator = IdentityGenerator::new();
        assert!(generator.reserve("#"));
        assert!(generator.reserve("é"));
        let tokens: HashSet<String> = (0..63).map(|_| generator.generate(1)).collect();
        assert_eq!(tokens.len(), 63);
    }
}
