//! OS Keychain integration for master key storage.
//!
//! Uses the platform-native secure storage:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use std::sync::Mutex;

use anyhow::{Context, Result};
use davshelf_core::branding;
use keyring::Entry;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{generate_master_key, KEY_SIZE};

/// Keychain account holding the hex-encoded master key.
const MASTER_KEY_NAME: &str = "master-encryption-key";

/// Source of the key that encrypts server passwords.
pub trait MasterKeyProvider: Send + Sync {
    /// Get the master key, creating one if it doesn't exist.
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>>;

    fn key_exists(&self) -> bool;

    /// Delete the master key. Stored passwords become unreadable.
    fn delete_key(&self) -> Result<()>;
}

/// Master key kept in the OS keychain under [`branding::KEYCHAIN_SERVICE`].
pub struct KeychainKeyProvider {
    entry: Entry,
}

impl KeychainKeyProvider {
    pub fn new() -> Result<Self> {
        Self::with_names(branding::KEYCHAIN_SERVICE, MASTER_KEY_NAME)
    }

    /// Use a custom service and account name.
    pub fn with_names(service: &str, key_name: &str) -> Result<Self> {
        let entry = Entry::new(service, key_name).context("Failed to create keychain entry")?;
        Ok(Self { entry })
    }
}

impl MasterKeyProvider for KeychainKeyProvider {
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        match self.entry.get_password() {
            Ok(hex_key) => {
                debug!("[Keychain] Retrieved master key");
                let hex_key = Zeroizing::new(hex_key);
                let bytes = Zeroizing::new(
                    hex::decode(hex_key.as_str()).context("Invalid key format in keychain")?,
                );
                if bytes.len() != KEY_SIZE {
                    anyhow::bail!(
                        "Invalid key size in keychain: expected {}, got {}",
                        KEY_SIZE,
                        bytes.len()
                    );
                }

                let mut key = Zeroizing::new([0u8; KEY_SIZE]);
                key.copy_from_slice(&bytes);
                Ok(key)
            }
            Err(keyring::Error::NoEntry) => {
                info!("[Keychain] No master key found, generating one");
                let key = Zeroizing::new(generate_master_key()?);
                let hex_key = Zeroizing::new(hex::encode(&key[..]));
                self.entry
                    .set_password(&hex_key)
                    .context("Failed to store master key in keychain")?;
                Ok(key)
            }
            Err(e) => {
                warn!(error = ?e, "[Keychain] Failed to read master key");
                Err(anyhow::anyhow!("Failed to access keychain: {}", e))
            }
        }
    }

    fn key_exists(&self) -> bool {
        self.entry.get_password().is_ok()
    }

    fn delete_key(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) => {
                info!("[Keychain] Master key deleted");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to delete key from keychain: {}", e)),
        }
    }
}

/// Process-local master key, for tests and headless runs without a keychain.
#[derive(Default)]
pub struct MemoryKeyProvider {
    key: Mutex<Option<Zeroizing<[u8; KEY_SIZE]>>>,
}

impl MemoryKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Mutex::new(Some(Zeroizing::new(key))),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Zeroizing<[u8; KEY_SIZE]>>>> {
        self.key
            .lock()
            .map_err(|_| anyhow::anyhow!("Master key lock poisoned"))
    }
}

impl MasterKeyProvider for MemoryKeyProvider {
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let mut slot = self.slot()?;
        if let Some(key) = slot.as_ref() {
            return Ok(key.clone());
        }
        let key = Zeroizing::new(generate_master_key()?);
        *slot = Some(key.clone());
        Ok(key)
    }

    fn key_exists(&self) -> bool {
        self.slot().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn delete_key(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
