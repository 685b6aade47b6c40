//! Durable credential storage.
//!
//! Two backends share one contract:
//!
//! - `FileStore`: the bundle lives in an encrypted file in the app data
//!   directory. Writes are sealed with ChaCha20-Poly1305 under a key derived
//!   from an app-supplied device secret, and go through a temp-file rename so
//!   a concurrent reader never observes a partial bundle.
//! - `KeyringStore`: the bundle lives in a single OS keychain entry.
//!
//! Incomplete or unreadable state always reads back as absent.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use argon2::Argon2;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use keyring::Entry;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};

use super::CredentialBundle;

/// Credential file name in the data directory
const BUNDLE_FILE: &str = "credentials.bin";

/// Service name for keychain entries
const SERVICE_NAME: &str = "claimline";

/// Keychain account under which the bundle is stored
const BUNDLE_ACCOUNT: &str = "session";

/// Argon2 salt length in bytes
const SALT_LEN: usize = 16;

/// ChaCha20-Poly1305 nonce length in bytes
const NONCE_LEN: usize = 12;

/// Derived key length in bytes
const KEY_LEN: usize = 32;

/// Durable home of the credential bundle.
///
/// Operations are atomic with respect to each other, and `clear` leaves the
/// store indistinguishable from its state before the first `put`.
pub trait CredentialStore: Send + Sync {
    /// Current bundle, or `None` when nothing usable is stored.
    fn get(&self) -> Result<Option<CredentialBundle>>;

    /// Replace the stored bundle wholesale.
    fn put(&self, bundle: &CredentialBundle) -> Result<()>;

    /// Remove all stored credential state.
    fn clear(&self) -> Result<()>;
}

/// In-memory view of what is on disk, so repeated reads skip the file.
enum Cached {
    Unknown,
    Absent,
    Present(CredentialBundle),
}

/// Encrypted file-backed store.
pub struct FileStore {
    path: PathBuf,
    secret: String,
    cached: Mutex<Cached>,
}

impl FileStore {
    /// `device_secret` is supplied by the embedding app (for example an
    /// installation id from the platform keystore) and never written to disk.
    pub fn new(data_dir: PathBuf, device_secret: impl Into<String>) -> Self {
        Self {
            path: data_dir.join(BUNDLE_FILE),
            secret: device_secret.into(),
            cached: Mutex::new(Cached::Unknown),
        }
    }

    fn read_disk(&self) -> Result<Option<CredentialBundle>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path).context("Failed to read credential file")?;
        let bundle = match self.unseal(&raw) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "Credential file unreadable, treating as absent");
                return Ok(None);
            }
        };
        if !bundle.is_complete() {
            debug!("Stored bundle incomplete, treating as absent");
            return Ok(None);
        }
        Ok(Some(bundle))
    }

    fn seal(&self, bundle: &CredentialBundle) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let plaintext = serde_json::to_vec(bundle).context("Failed to encode credential bundle")?;
        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| anyhow!("Failed to encrypt credential bundle"))?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn unseal(&self, raw: &[u8]) -> Result<CredentialBundle> {
        if raw.len() < SALT_LEN + NONCE_LEN {
            return Err(anyhow!("Credential file too short"));
        }
        let (salt, rest) = raw.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let plaintext = self
            .cipher(salt)?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt credential bundle"))?;
        serde_json::from_slice(&plaintext).context("Failed to parse credential bundle")
    }

    fn cipher(&self, salt: &[u8]) -> Result<ChaCha20Poly1305> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(self.secret.as_bytes(), salt, &mut key)
            .map_err(|e| anyhow!("Failed to derive storage key: {}", e))?;
        Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Result<Option<CredentialBundle>> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        match &*cached {
            Cached::Present(bundle) => return Ok(Some(bundle.clone())),
            Cached::Absent => return Ok(None),
            Cached::Unknown => {}
        }
        let loaded = self.read_disk()?;
        *cached = match &loaded {
            Some(bundle) => Cached::Present(bundle.clone()),
            None => Cached::Absent,
        };
        Ok(loaded)
    }

    fn put(&self, bundle: &CredentialBundle) -> Result<()> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let sealed = self.seal(bundle)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &sealed).context("Failed to write credential file")?;
        fs::rename(&tmp, &self.path).context("Failed to replace credential file")?;
        // An incomplete pair reads back as absent, warm or cold.
        *cached = if bundle.is_complete() {
            Cached::Present(bundle.clone())
        } else {
            Cached::Absent
        };
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove credential file")?;
        }
        *cached = Cached::Absent;
        Ok(())
    }
}

/// OS keychain-backed store. The whole bundle is one entry, so every
/// operation is a single keychain call.
pub struct KeyringStore {
    gate: Mutex<()>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            gate: Mutex::new(()),
        }
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, BUNDLE_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self) -> Result<Option<CredentialBundle>> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        match Self::entry()?.get_password() {
            Ok(raw) => {
                let bundle: CredentialBundle = match serde_json::from_str(&raw) {
                    Ok(bundle) => bundle,
                    Err(e) => {
                        warn!(error = %e, "Keychain entry unreadable, treating as absent");
                        return Ok(None);
                    }
                };
                if bundle.is_complete() {
                    Ok(Some(bundle))
                } else {
                    Ok(None)
                }
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read keychain entry")),
        }
    }

    fn put(&self, bundle: &CredentialBundle) -> Result<()> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = serde_json::to_string(bundle).context("Failed to encode credential bundle")?;
        Self::entry()?
            .set_password(&raw)
            .context("Failed to store credentials in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete keychain entry")),
        }
    }
}
