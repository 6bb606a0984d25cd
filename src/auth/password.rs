// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing using Argon2id.
//!
//! Hashes are PHC strings, so the parameters travel with the hash and a cost
//! change only affects newly hashed passwords. Comparison happens inside
//! `argon2` in constant time.
//!
//! Both operations are CPU-bound (tens of milliseconds at the default cost);
//! async callers run them on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Default Argon2 iteration count.
pub const DEFAULT_HASH_COST: u32 = 3;

/// Default Argon2 memory size in KiB (19 MiB).
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19_456;

/// Input for the precomputed dummy hash. Never a real credential.
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-users";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("failed to hash password: {0}")]
    HashingFailed(String),
    #[error("stored hash is not a valid PHC string: {0}")]
    InvalidHashFormat(String),
}

/// Argon2id hasher with a configurable work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of [`DUMMY_PASSWORD`] at the configured cost, verified against
    /// when a login names an unknown user.
    dummy_hash: String,
    /// Dummy verifications run, shared across clones.
    dummy_runs: Arc<AtomicU64>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("t_cost", &self.params.t_cost())
            .field("m_cost", &self.params.m_cost())
            .finish()
    }
}

impl PasswordHasher {
    /// `cost` is the iteration count, `memory_kib` the memory size.
    pub fn new(cost: u32, memory_kib: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        let mut hasher = Self {
            params,
            dummy_hash: String::new(),
            dummy_runs: Arc::new(AtomicU64::new(0)),
        };
        hasher.dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored PHC hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::InvalidHashFormat(e.to_string())),
        }
    }

    /// Burn the same work as a real verification; always `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        // The result is irrelevant; only the elapsed time matters.
        let _ = self.verify(password, &self.dummy_hash);
        self.dummy_runs.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// How many times [`Self::verify_dummy`] has run on this hasher or its clones.
    pub fn dummy_verifications(&self) -> u64 {
        self.dummy_runs.load(Ordering::Relaxed)
    }
}

/// Advisory strength score (0 weakest, 4 strongest).
///
/// Only [`MIN_PASSWORD_LEN`] is enforced; the score is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PasswordStrength {
    pub score: u8,
    pub feedback: Vec<String>,
}

impl PasswordStrength {
    pub fn is_acceptable(&self) -> bool {
        self.score > 0
    }
}

/// Score a candidate password.
pub fn password_strength(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    let has_lower = password.chars().any(char::is_lowercase);
    let has_upper = password.chars().any(char::is_uppercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    let mut feedback = Vec::new();
    if len < MIN_PASSWORD_LEN {
        feedback.push(format!("Use at least {MIN_PASSWORD_LEN} characters"));
        return PasswordStrength { score: 0, feedback };
    }

    let mut score = 1u8;
    if len >= 12 {
        score += 1;
    } else {
        feedback.push("Longer passwords are stronger".to_string());
    }
    if has_lower && has_upper {
        score += 1;
    } else {
        feedback.push("Mix upper and lower case letters".to_string());
    }
    if has_digit {
        score += 1;
    } else {
        feedback.push("Add a number".to_string());
    }
    if has_symbol {
        score += 1;
    } else {
        feedback.push("Add a symbol".to_string());
    }

    PasswordStrength {
        score: score.min(4),
        feedback,
    }
}
