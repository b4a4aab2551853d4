// File:    error.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: The error type shared by every operation in ludos-core.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use std::io;
use std::path::PathBuf;

/// Errors produced by the toolkit core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The password policy cannot produce a password. Raised before any
    /// randomness is consumed or any file is touched.
    #[error("invalid password policy: {0}")]
    InvalidPolicy(String),

    /// The rotation log could not be opened or appended to.
    #[error("failed to write rotation log '{}': {source}", path.display())]
    LogWrite {
        /// Location of the rotation log.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// The rotation log exists but could not be read.
    #[error("failed to read rotation log '{}': {source}", path.display())]
    LogRead {
        /// Location of the rotation log.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// The OS secret store is missing, locked or refused the operation.
    #[error("secret store unavailable: {0}")]
    SecretStoreUnavailable(String),

    /// A TOTP secret is empty or not valid Base32.
    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(String),

    /// A label is empty once surrounding whitespace is removed.
    #[error("invalid label '{0}'")]
    InvalidLabel(String),

    /// No secret is stored for the requested label.
    #[error("no secret stored for label '{0}'")]
    UnknownLabel(String),

    /// The secret index could not be read or replaced.
    #[error("secret index '{}' could not be accessed: {source}", path.display())]
    Index {
        /// Location of the index document.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// The secret index exists but is not a valid index document.
    #[error("secret index '{}' is malformed: {source}", path.display())]
    IndexFormat {
        /// Location of the index document.
        path: PathBuf,
        /// Parser failure.
        source: serde_json::Error,
    },

    /// No home directory is known for the current user.
    #[error("could not determine the home directory; pass an explicit data directory")]
    NoHomeDir,

    /// The background rotation thread could not be created.
    #[error("failed to spawn rotation worker: {0}")]
    Spawn(#[source] io::Error),
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
