// File:    password.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Generates strong random passwords under character-class constraints.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Password generation backed by the operating system's CSPRNG.
//!
//! A password is built in three steps: one character is seeded from every
//! enabled class, the remaining positions are filled from the union of the
//! enabled classes, and the whole sequence is shuffled. Seeding makes class
//! coverage hold by construction, so generation never has to retry.

use crate::error::{Error, Result};
use log::error;
use rand::rngs::OsRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, TryRngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Upper-case ASCII letters.
pub const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Lower-case ASCII letters.
pub const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
/// ASCII digits.
pub const DIGITS: &[u8] = b"0123456789";
/// Punctuation accepted by most password forms.
pub const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{};:,<.>/?";
/// Pool used when a policy enables no class at all.
pub const DEFAULT_POOL: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Which characters a generated password must and may contain.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PasswordPolicy {
    /// Number of characters to produce. Must be at least 1.
    pub length: usize,
    /// Include `A-Z`.
    pub include_upper: bool,
    /// Include `a-z`.
    pub include_lower: bool,
    /// Include `0-9`.
    pub include_digits: bool,
    /// Include [`SYMBOLS`].
    pub include_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(24)
    }
}

impl PasswordPolicy {
    /// A policy of the given length with every class enabled.
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self {
            length,
            include_upper: true,
            include_lower: true,
            include_digits: true,
            include_symbols: true,
        }
    }

    /// Checks that the policy can produce a password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] when `length` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.length < 1 {
            return Err(Error::InvalidPolicy(
                "password length must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// The enabled character pools in priority order (upper, lower, digits,
    /// symbols). Falls back to a single [`DEFAULT_POOL`] class when nothing is
    /// enabled.
    #[must_use]
    pub fn pools(&self) -> Vec<&'static [u8]> {
        let pools: Vec<&'static [u8]> = [
            (self.include_upper, UPPER),
            (self.include_lower, LOWER),
            (self.include_digits, DIGITS),
            (self.include_symbols, SYMBOLS),
        ]
        .into_iter()
        .filter_map(|(enabled, pool)| enabled.then_some(pool))
        .collect();

        if pools.is_empty() {
            vec![DEFAULT_POOL]
        } else {
            pools
        }
    }
}

/// A freshly generated password. The buffer is wiped when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct GeneratedPassword(String);

impl GeneratedPassword {
    /// The password text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the password.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for passwords produced by [`generate`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for GeneratedPassword {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GeneratedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeneratedPassword(<{} chars redacted>)", self.0.len())
    }
}

/// Generates a password satisfying `policy`.
///
/// Every enabled class contributes at least one character when `length` is at
/// least the number of enabled classes. For shorter passwords only the first
/// `length` classes in priority order are guaranteed.
///
/// # Errors
///
/// Returns [`Error::InvalidPolicy`] if the policy fails [`PasswordPolicy::validate`].
///
/// # Panics
///
/// Panics if the operating system's entropy source is unavailable.
pub fn generate(policy: &PasswordPolicy) -> Result<GeneratedPassword> {
    policy.validate()?;
    let pools = policy.pools();
    let mut rng = OsRng.unwrap_err();

    loop {
        let mut bytes = assemble(&pools, policy.length, &mut rng);
        let conforming = covers_seeded_pools(&bytes, &pools, policy.length);
        let mut password: String = bytes.iter().copied().map(char::from).collect();
        bytes.zeroize();
        if conforming {
            return Ok(GeneratedPassword(password));
        }
        // Unreachable while seeding is correct; never hand out a weaker password.
        error!("generated password is missing a required character class, regenerating");
        password.zeroize();
    }
}

fn assemble<R: Rng + ?Sized>(pools: &[&[u8]], length: usize, rng: &mut R) -> Vec<u8> {
    let union: Vec<u8> = pools.concat();
    let mut bytes: Vec<u8> = pools
        .iter()
        .take(length)
        .filter_map(|pool| pool.choose(rng).copied())
        .collect();

    let remaining = length.saturating_sub(bytes.len());
    bytes.extend((0..remaining).filter_map(|_| union.choose(rng).copied()));
    bytes.shuffle(rng);
    bytes
}

fn covers_seeded_pools(bytes: &[u8], pools: &[&[u8]], length: usize) -> bool {
    bytes.len() == length
        && pools
            .iter()
            .take(length)
            .all(|pool| bytes.iter().any(|b| pool.contains(b)))
}
