// File:    authenticator.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Manages TOTP secrets: secret material in the secret store, labels in the local index.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::otp::{normalize_secret, CodeGenerator};
use crate::secret_index::{SecretIndex, SecretLabelEntry};
use crate::secret_store::SecretStore;
use log::info;

/// Adds, lists, removes and produces codes for labelled TOTP secrets.
pub struct Authenticator<S, G> {
    app_name: String,
    store: S,
    codes: G,
    index: SecretIndex,
}

impl<S: SecretStore, G: CodeGenerator> Authenticator<S, G> {
    /// Builds an authenticator using the namespace and index path from `config`.
    pub fn new(config: &Config, store: S, codes: G) -> Self {
        Self {
            app_name: config.app_name.clone(),
            store,
            codes,
            index: SecretIndex::new(config.index_path.clone()),
        }
    }

    /// The secret store account that holds `label`'s secret.
    #[must_use]
    pub fn account_for(&self, label: &str) -> String {
        format!("{}:{label}", self.app_name)
    }

    /// Stores `secret` under `label`, replacing any existing secret.
    ///
    /// The secret is checked by producing one code before anything is written.
    /// If the store rejects it, the index is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLabel`], [`Error::InvalidSecret`],
    /// [`Error::SecretStoreUnavailable`] or an index error.
    pub fn add(&self, label: &str, secret: &str) -> Result<SecretLabelEntry> {
        let label = clean_label(label)?;
        let secret = normalize_secret(secret);
        if secret.is_empty() {
            return Err(Error::InvalidSecret("secret is empty".to_owned()));
        }
        self.codes.current_code(&secret)?;

        self.store
            .set(&self.app_name, &self.account_for(label), &secret)?;
        let entry = self.index.insert(label)?;
        info!("Stored secret for '{label}'");
        Ok(entry)
    }

    /// The current code for `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLabel`] if no secret is stored for the label.
    pub fn code(&self, label: &str) -> Result<String> {
        let label = clean_label(label)?;
        let secret = self
            .store
            .get(&self.app_name, &self.account_for(label))?
            .ok_or_else(|| Error::UnknownLabel(label.to_owned()))?;
        self.codes.current_code(&secret)
    }

    /// Every recorded label with its metadata, sorted by label.
    ///
    /// # Errors
    ///
    /// Propagates index load failures.
    pub fn list(&self) -> Result<Vec<(String, SecretLabelEntry)>> {
        self.index.entries()
    }

    /// Deletes `label`'s secret and drops it from the index. Removing a label
    /// that does not exist succeeds; the return value says whether the index
    /// held it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretStoreUnavailable`] if the store cannot delete,
    /// in which case the index is left untouched.
    pub fn remove(&self, label: &str) -> Result<bool> {
        let label = clean_label(label)?;
        self.store
            .delete(&self.app_name, &self.account_for(label))?;
        let removed = self.index.remove(label)?;
        info!("Removed '{label}'");
        Ok(removed)
    }
}

fn clean_label(label: &str) -> Result<&str> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidLabel(label.to_owned()));
    }
    Ok(trimmed)
}
