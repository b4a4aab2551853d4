// File:    otp.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Produces time-based one-time passcodes from stored Base32 secrets.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use crate::error::{Error, Result};
use totp_rs::{Algorithm, Secret, TOTP};

/// Something that turns a Base32 secret into the current passcode.
pub trait CodeGenerator {
    /// The passcode for the current time step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSecret`] if `secret_base32` cannot be decoded.
    fn current_code(&self, secret_base32: &str) -> Result<String>;
}

/// RFC 6238 TOTP with the parameters authenticator apps assume by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totp {
    /// Number of digits in each code.
    pub digits: usize,
    /// Seconds per time step.
    pub step: u64,
}

impl Default for Totp {
    fn default() -> Self {
        Self { digits: 6, step: 30 }
    }
}

impl Totp {
    fn build(&self, secret_base32: &str) -> Result<TOTP> {
        let normalized = normalize_secret(secret_base32);
        if normalized.is_empty() {
            return Err(Error::InvalidSecret("secret is empty".to_owned()));
        }
        let bytes = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|e| Error::InvalidSecret(format!("not valid Base32 ({e:?})")))?;
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            self.digits,
            1,
            self.step,
            bytes,
        ))
    }

    /// The code for an explicit Unix timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSecret`] if `secret_base32` cannot be decoded.
    pub fn code_at(&self, secret_base32: &str, unix_seconds: u64) -> Result<String> {
        Ok(self.build(secret_base32)?.generate(unix_seconds))
    }
}

impl CodeGenerator for Totp {
    fn current_code(&self, secret_base32: &str) -> Result<String> {
        self.build(secret_base32)?
            .generate_current()
            .map_err(|e| Error::InvalidSecret(format!("system clock is before the Unix epoch: {e}")))
    }
}

/// Canonical form of a pasted secret: whitespace and `=` padding removed,
/// letters upper-cased.
#[must_use]
pub fn normalize_secret(secret: &str) -> String {
    secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
