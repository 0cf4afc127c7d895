//! Random identities, display names and secrets for new investors.

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use secrecy::SecretString;
use uuid::Uuid;

use crate::types::Identity;

const FIRST_NAMES: &[&str] = &[
    "Aiko", "Basil", "Chiara", "Dmitri", "Emeka", "Freya", "Goro", "Hana", "Ines", "Jun",
    "Kofi", "Lena", "Mateo", "Nia", "Oskar", "Priya", "Quinn", "Rin", "Sven", "Tomoko",
];

const LAST_NAMES: &[&str] = &[
    "Abe", "Brandt", "Costa", "Dubois", "Endo", "Fischer", "Garcia", "Hayashi", "Ivanova",
    "Jensen", "Kato", "Lindqvist", "Mori", "Nakamura", "Okafor", "Petrov", "Sato", "Tanaka",
];

const SECRET_LEN: usize = 16;

/// Source of the per-investor random values the controller needs.
#[cfg_attr(test, mockall::automock)]
pub trait RandomProvider: Send + Sync {
    /// A fresh identity token. Distinct across calls.
    fn new_identity(&self) -> Identity;

    fn new_display_name(&self) -> String;

    fn new_secret(&self) -> SecretString;
}

/// Thread-local RNG backed provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl RandomProvider for Random {
    fn new_identity(&self) -> Identity {
        Identity::new(Uuid::new_v4().simple().to_string())
    }

    fn new_display_name(&self) -> String {
        let mut rng = rand::thread_rng();
        let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Anon");
        let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Investor");
        format!("{first} {last}")
    }

    fn new_secret(&self) -> SecretString {
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SECRET_LEN)
            .map(char::from)
            .collect();
        SecretString::new(secret)
    }
}
