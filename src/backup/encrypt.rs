// dbbackup/src/backup/encrypt.rs
//! AES-256-GCM file encryption.
//!
//! The output is the 12-byte nonce followed by the sealed ciphertext and its
//! 16-byte tag, with no header. Anything that decrypts these files relies on
//! that exact layout.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use std::fs;
use std::path::Path;

use crate::errors::{BackupError, Result};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

/// Encrypts `input_path` into `output_path` with `key`.
///
/// The key length is checked before anything touches the filesystem.
pub fn encrypt_file(input_path: &Path, output_path: &Path, key: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(BackupError::InvalidKeyLength(key.len()));
    }

    let plaintext = fs::read(input_path).map_err(|e| {
        BackupError::io(format!("read src for encrypt ({})", input_path.display()), e)
    })?;

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| BackupError::Cipher(format!("new cipher: {e}")))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_ref())
        .map_err(|e| BackupError::Cipher(format!("seal: {e}")))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    fs::write(output_path, &blob).map_err(|e| {
        BackupError::io(format!("write ciphertext ({})", output_path.display()), e)
    })?;

    Ok(())
}
