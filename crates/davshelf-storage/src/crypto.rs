//! Password encryption at rest.
//!
//! Server passwords are sealed with AES-256-GCM under the master key before
//! they are written to `webdav_servers.password_enc`. Stored form is
//! `hex(nonce || ciphertext || tag)`. An empty password is stored as an empty
//! string so anonymous shares carry no ciphertext.

use anyhow::{Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Size of the master key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Seals and opens server passwords.
pub struct PasswordCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl PasswordCipher {
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, master_key)
            .map_err(|_| anyhow::anyhow!("Invalid master key"))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt a password for storage.
    pub fn seal(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Ok(String::new());
        }

        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let mut sealed = password.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut sealed)
            .map_err(|_| anyhow::anyhow!("Failed to encrypt password"))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + sealed.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&sealed);
        Ok(hex::encode(stored))
    }

    /// Decrypt a stored password.
    pub fn open(&self, stored: &str) -> Result<String> {
        if stored.is_empty() {
            return Ok(String::new());
        }

        let bytes = hex::decode(stored).context("Stored password is not hex")?;
        if bytes.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            anyhow::bail!("Stored password is truncated");
        }

        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| anyhow::anyhow!("Invalid nonce"))?;

        let mut buf = sealed.to_vec();
        let plain = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut buf)
            .map_err(|_| anyhow::anyhow!("Failed to decrypt password (wrong key or corrupted data)"))?;

        String::from_utf8(plain.to_vec()).context("Decrypted password is not UTF-8")
    }
}

/// Generate a random master key.
pub fn generate_master_key() -> Result<[u8; KEY_SIZE]> {
    let mut key = [0u8; KEY_SIZE];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| anyhow::anyhow!("Failed to generate master key"))?;
    Ok(key)
}
