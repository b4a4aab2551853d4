// File:    secret_store.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Access to the credential vault that holds TOTP secret material.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Secret storage backends.
//!
//! The toolkit never writes secret material to its own files. Secrets are kept
//! in a [`SecretStore`], addressed by a service namespace and an account name.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A vault of secrets keyed by `(service, account)`.
pub trait SecretStore {
    /// Stores `secret`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretStoreUnavailable`] if the store rejects the write.
    fn set(&self, service: &str, account: &str, secret: &str) -> Result<()>;

    /// Fetches a secret, or `None` if nothing is stored under the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretStoreUnavailable`] if the store cannot be queried.
    fn get(&self, service: &str, account: &str) -> Result<Option<String>>;

    /// Deletes a secret. Deleting a missing secret succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretStoreUnavailable`] for any failure other than
    /// the secret being absent.
    fn delete(&self, service: &str, account: &str) -> Result<()>;
}

/// The operating system's credential store (Secret Service, Keychain,
/// Credential Manager) via the `keyring` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl KeyringStore {
    fn entry(service: &str, account: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(service, account).map_err(|e| unavailable("open entry", &e))
    }
}

fn unavailable(action: &str, error: &keyring::Error) -> Error {
    Error::SecretStoreUnavailable(format!("{action}: {error}"))
}

impl SecretStore for KeyringStore {
    fn set(&self, service: &str, account: &str, secret: &str) -> Result<()> {
        Self::entry(service, account)?
            .set_password(secret)
            .map_err(|e| unavailable("store secret", &e))
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<String>> {
        match Self::entry(service, account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(unavailable("load secret", &e)),
        }
    }

    fn delete(&self, service: &str, account: &str) -> Result<()> {
        match Self::entry(service, account)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(unavailable("delete secret", &e)),
        }
    }
}

/// A process-local store. Contents vanish when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of secrets held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.lock().len()
    }

    /// Whether the store holds no secrets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.lock().is_empty()
    }
}

impl SecretStore for MemoryStore {
    fn set(&self, service: &str, account: &str, secret: &str) -> Result<()> {
        self.secrets
            .lock()
            .insert((service.to_owned(), account.to_owned()), secret.to_owned());
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<String>> {
        Ok(self
            .secrets
            .lock()
            .get(&(service.to_owned(), account.to_owned()))
            .cloned())
    }

    fn delete(&self, service: &str, account: &str) -> Result<()> {
        self.secrets
            .lock()
            .remove(&(service.to_owned(), account.to_owned()));
        Ok(())
    }
}

impl<S: SecretStore + ?Sized> SecretStore for &S {
    fn set(&self, service: &str, account: &str, secret: &str) -> Result<()> {
        (**self).set(service, account, secret)
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<String>> {
        (**self).get(service, account)
    }

    fn delete(&self, service: &str, account: &str) -> Result<()> {
        (**self).delete(service, account)
    }
}
