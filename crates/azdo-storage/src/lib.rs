//! Secure storage for the Azure DevOps personal access token.
//!
//! The token is the only secret azdo-tools needs. It can come from the
//! environment, but for day-to-day use it is kept in the operating system's
//! credential manager:
//!
//! - **macOS**: Keychain Services
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service (GNOME Keyring / KWallet)
//!
//! # Example
//!
//! ```ignore
//! use azdo_storage::{CredentialStore, KeychainStore, AZURE_DEVOPS_TOKEN_KEY};
//!
//! let store = KeychainStore::new();
//! store.store(AZURE_DEVOPS_TOKEN_KEY, "pat-xxx")?;
//! assert_eq!(store.get(AZURE_DEVOPS_TOKEN_KEY)?, Some("pat-xxx".to_string()));
//! store.delete(AZURE_DEVOPS_TOKEN_KEY)?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use azdo_core::{Error, Result};
use keyring::Entry;
use tracing::{debug, warn};

/// Service name used in the OS keychain.
const SERVICE_NAME: &str = "azdo-tools";

/// Keychain entry holding the Azure DevOps PAT.
pub const AZURE_DEVOPS_TOKEN_KEY: &str = "azure-devops/token";

/// Credential storage backend.
pub trait CredentialStore: Send + Sync {
    /// Store a credential, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a credential. `Ok(None)` when it does not exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a credential. Deleting a missing credential succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

/// Standard credential key for a service's API token.
pub fn token_key(service: &str) -> String {
    format!("{}/token", service)
}

/// Read the stored PAT, treating keychain failures as "no token".
///
/// Startup must not fail just because no keyring daemon is running when the
/// token is supplied through the environment instead.
pub fn stored_token(store: &dyn CredentialStore) -> Option<String> {
    match store.get(AZURE_DEVOPS_TOKEN_KEY) {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Could not read token from credential store");
            None
        }
    }
}

// =============================================================================
// KeychainStore
// =============================================================================

/// Credential store backed by the OS keychain.
#[derive(Debug)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
        }
    }

    /// Use a custom service name, e.g. to keep test entries apart from real ones.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            Error::Storage(format!(
                "Failed to open keychain entry '{}': {}",
                key, e
            ))
        })
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        debug!(key = key, "Storing credential in keychain");

        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Storage(format!("Failed to store credential '{}': {}", key, e)))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(key = key, "Reading credential from keychain");

        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "Failed to read credential '{}': {}",
                key, e
            ))),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key = key, "Deleting credential from keychain");

        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to delete credential '{}': {}",
                key, e
            ))),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory credential store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let mut credentials = HashMap::new();
        credentials.insert(AZURE_DEVOPS_TOKEN_KEY.to_string(), token.into());
        Self {
            credentials: RwLock::new(credentials),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let credentials = self
            .credentials
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(credentials.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .remove(key);
        Ok(())
    }
}
