// File:    secret_index.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Persists the index of stored TOTP labels and their creation times.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! The label index for TOTP secrets.
//!
//! The index is a small JSON object mapping each label to `{ "created": ... }`.
//! It is rewritten in full on every change and never holds secret material.

use crate::error::{Error, Result};
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Metadata kept for one stored TOTP secret. The secret itself lives in the
/// secret store, never here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SecretLabelEntry {
    /// When the secret was stored, as an ISO-8601 UTC timestamp.
    pub created: String,
}

impl SecretLabelEntry {
    /// An entry stamped with the current UTC time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            created: format!("{}Z", Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f")),
        }
    }
}

/// The whole index document, keyed by label.
pub type IndexDocument = BTreeMap<String, SecretLabelEntry>;

/// A JSON file mapping labels to [`SecretLabelEntry`] metadata.
///
/// Every mutation reloads the file, applies the change and atomically replaces
/// it, so two handles on the same path never lose each other's writes unless
/// they interleave within a single call.
#[derive(Debug, Clone)]
pub struct SecretIndex {
    path: PathBuf,
}

impl SecretIndex {
    /// An index stored at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the index document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the index. A missing file is an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if the file cannot be read and
    /// [`Error::IndexFormat`] if it is not a valid index document.
    pub fn load(&self) -> Result<IndexDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IndexDocument::new()),
            Err(source) => {
                return Err(Error::Index {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(IndexDocument::new());
        }
        serde_json::from_str(&contents).map_err(|source| Error::IndexFormat {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the index with `document`, writing a sibling temporary file
    /// and renaming it over the target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if the document cannot be written.
    pub fn save(&self, document: &IndexDocument) -> Result<()> {
        let index_io = |source| Error::Index {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(document).map_err(|source| Error::IndexFormat {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir).map_err(index_io)?;
        staged.write_all(json.as_bytes()).map_err(index_io)?;
        staged.as_file().sync_all().map_err(index_io)?;
        staged
            .persist(&self.path)
            .map_err(|e| index_io(e.error))?;
        debug!("Saved secret index with {} label(s)", document.len());
        Ok(())
    }

    /// Records `label`, refreshing its creation time if it already exists.
    ///
    /// # Errors
    ///
    /// Propagates load and save failures.
    pub fn insert(&self, label: &str) -> Result<SecretLabelEntry> {
        let mut document = self.load()?;
        let entry = SecretLabelEntry::now();
        document.insert(label.to_owned(), entry.clone());
        self.save(&document)?;
        Ok(entry)
    }

    /// Drops `label`. Returns whether it was present; the file is only
    /// rewritten when something changed.
    ///
    /// # Errors
    ///
    /// Propagates load and save failures.
    pub fn remove(&self, label: &str) -> Result<bool> {
        let mut document = self.load()?;
        if document.remove(label).is_none() {
            return Ok(false);
        }
        self.save(&document)?;
        Ok(true)
    }

    /// Whether `label` is recorded.
    ///
    /// # Errors
    ///
    /// Propagates load failures.
    pub fn contains(&self, label: &str) -> Result<bool> {
        Ok(self.load()?.contains_key(label))
    }

    /// All entries sorted by label.
    ///
    /// # Errors
    ///
    /// Propagates load failures.
    pub fn entries(&self) -> Result<Vec<(String, SecretLabelEntry)>> {
        Ok(self.load()?.into_iter().collect())
    }
}
