//! Bearer token storage in the OS keychain.
//!
//! There is no plaintext fallback: when the keychain cannot be written the
//! error propagates to the caller.

use keyring::{Entry, Error as KeyringError};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{AppError, Result};

pub const KEYRING_SERVICE: &str = "youtrack-helper";
const KEYRING_ACCOUNT: &str = "token";

/// Keychain-backed store for the single bearer token, with an in-process
/// cache so repeated reads do not hit the platform store.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<CredentialInner>,
}

struct CredentialInner {
    keyring_service: String,
    /// Built once; an error here means the platform store is unusable.
    entry: std::result::Result<Entry, String>,
    token_cache: Mutex<Option<String>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }
}

impl CredentialStore {
    pub fn with_service(service: impl Into<String>) -> Self {
        let keyring_service = service.into();
        let entry = Entry::new(&keyring_service, KEYRING_ACCOUNT).map_err(|err| err.to_string());
        CredentialStore {
            inner: Arc::new(CredentialInner {
                keyring_service,
                entry,
                token_cache: Mutex::new(None),
            }),
        }
    }

    /// Stores the token in the keychain. The cache is only updated once the
    /// write succeeded.
    pub fn set(&self, token: &str) -> Result<()> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(AppError::EmptyToken);
        }

        self.token_entry()
            .map_err(|err| AppError::CredentialWrite(err.to_string()))?
            .set_password(trimmed)
            .map_err(|err| AppError::CredentialWrite(err.to_string()))?;
        *self.inner.token_cache.lock() = Some(trimmed.to_string());
        debug!("Token stored in keychain service {}", self.inner.keyring_service);
        Ok(())
    }

    /// Returns the stored token. A missing entry or an inaccessible keychain
    /// both read as `None`.
    pub fn get(&self) -> Option<String> {
        if let Some(token) = self.inner.token_cache.lock().clone() {
            return Some(token);
        }

        let token = self.load_from_store();
        if token.is_some() {
            *self.inner.token_cache.lock() = token.clone();
        }
        token
    }

    pub fn has_token(&self) -> bool {
        self.get().is_some()
    }

    /// Removes the token; a missing entry is not an error.
    pub fn clear(&self) -> Result<()> {
        let entry = self
            .token_entry()
            .map_err(|err| AppError::CredentialWrite(err.to_string()))?;
        match entry.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => {}
            Err(err) => return Err(AppError::CredentialWrite(err.to_string())),
        }
        *self.inner.token_cache.lock() = None;
        Ok(())
    }

    fn load_from_store(&self) -> Option<String> {
        let entry = match self.token_entry() {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Keychain unavailable; treating token as absent: {}", err);
                return None;
            }
        };
        match entry.get_password() {
            Ok(secret) if !secret.trim().is_empty() => Some(secret),
            Ok(_) | Err(KeyringError::NoEntry) => None,
            Err(err) => {
                warn!("Failed to read token from keychain: {}", err);
                None
            }
        }
    }

    fn token_entry(&self) -> std::result::Result<&Entry, &str> {
        self.inner.entry.as_ref().map_err(String::as_str)
    }
}

/// Routes keyring calls to the in-memory mock so tests never touch the OS store.
#[cfg(test)]
pub(crate) fn use_mock_keyring() {
    keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
}
