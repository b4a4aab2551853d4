// File:    config.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Storage locations and tunables handed to the toolkit components at construction.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Namespace used for secret store entries when none is configured.
pub const DEFAULT_APP_NAME: &str = "ludos";
/// File name of the TOTP label index inside the data directory.
pub const INDEX_FILE_NAME: &str = ".ludos_totp_index.json";
/// File name of the rotation log inside the data directory.
pub const ROTATION_FILE_NAME: &str = ".ludos_rotation.txt";
/// Shortest interval the rotation worker will sleep between cycles (0.1 hour).
pub const DEFAULT_MIN_ROTATION_INTERVAL: Duration = Duration::from_secs(360);

/// Where the toolkit keeps its files and how it namespaces secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Service name for secret store entries.
    pub app_name: String,
    /// JSON document mapping TOTP labels to their metadata.
    pub index_path: PathBuf,
    /// Append-only log written by the rotation worker.
    pub rotation_log_path: PathBuf,
    /// Floor applied to every rotation interval.
    pub min_rotation_interval: Duration,
}

impl Config {
    /// Places both data files inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            app_name: DEFAULT_APP_NAME.to_owned(),
            index_path: dir.join(INDEX_FILE_NAME),
            rotation_log_path: dir.join(ROTATION_FILE_NAME),
            min_rotation_interval: DEFAULT_MIN_ROTATION_INTERVAL,
        }
    }

    /// Places both data files in the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHomeDir`] if the platform reports no home directory.
    pub fn from_home() -> Result<Self> {
        dirs::home_dir().map(Self::in_dir).ok_or(Error::NoHomeDir)
    }

    /// Overrides the secret store namespace.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Overrides the minimum rotation interval.
    #[must_use]
    pub const fn with_min_rotation_interval(mut self, floor: Duration) -> Self {
        self.min_rotation_interval = floor;
        self
    }
}
