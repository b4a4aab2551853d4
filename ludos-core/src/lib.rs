// File:    lib.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: The main library crate for ludos-core, tying together password generation, rotation and TOTP label management.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! # Ludos Core Library
//!
//! This library provides the core of the Ludos privacy toolkit: strong
//! password generation, a background worker that rotates passwords into an
//! append-only log, and management of TOTP secrets whose material lives in the
//! operating system's secret store.

/// TOTP secret management on top of the secret store and label index.
pub mod authenticator;
/// Storage locations and tunables.
pub mod config;
/// The crate-wide error type.
pub mod error;
/// Time-based one-time passcodes.
pub mod otp;
/// Random password generation under character-class constraints.
pub mod password;
/// The background rotation worker and its log.
pub mod rotation;
/// The JSON index of stored TOTP labels.
pub mod secret_index;
/// Backends holding secret material.
pub mod secret_store;

pub use config::Config;
pub use error::{Error, Result};
pub use password::{GeneratedPassword, PasswordPolicy};
pub use rotation::RotationWorker;
