//! AES-256-GCM encryptor for sensitive setting values at rest.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cambo_application::SecretEncryptor;
use cambo_core::{AppError, AppResult};

/// AES-256-GCM encryptor producing base64 storage strings.
#[derive(Clone)]
pub struct AesSecretEncryptor {
    cipher: Aes256Gcm,
}

impl AesSecretEncryptor {
    /// Creates a new encryptor from a 32-byte key.
    pub fn new(key_bytes: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(key_bytes.into());
        Self { cipher }
    }

    /// Creates a new encryptor from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> AppResult<Self> {
        let decoded = hex::decode(hex_key).map_err(|error| {
            AppError::Validation(format!("invalid SETTINGS_ENCRYPTION_KEY hex: {error}"))
        })?;

        if decoded.len() != 32 {
            return Err(AppError::Validation(
                "SETTINGS_ENCRYPTION_KEY must be exactly 32 bytes (64 hex chars)".to_owned(),
            ));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&decoded);
        Ok(Self::new(&key))
    }
}

impl SecretEncryptor for AesSecretEncryptor {
    fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|error| AppError::Internal(format!("failed to encrypt value: {error}")))?;

        // Prepend the 12-byte nonce to the ciphertext for storage.
        let mut bytes = Vec::with_capacity(nonce.len() + ciphertext.len());
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(bytes))
    }

    fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        let bytes = BASE64
            .decode(ciphertext)
            .map_err(|error| AppError::Internal(format!("invalid ciphertext encoding: {error}")))?;

        if bytes.len() < 12 {
            return Err(AppError::Internal(
                "ciphertext too short: missing nonce".to_owned(),
            ));
        }

        let (nonce_bytes, encrypted) = bytes.split_at(12);
        let nonce_array: [u8; 12] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Internal("nonce must be exactly 12 bytes".to_owned()))?;
        let nonce = Nonce::from(nonce_array);

        let plaintext = self
            .cipher
            .decrypt(&nonce, encrypted)
            .map_err(|error| AppError::Internal(format!("failed to decrypt value: {error}")))?;

        String::from_utf8(plaintext)
            .map_err(|error| AppError::Internal(format!("decrypted value is not UTF-8: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambo_application::SecretEncryptor;

    #[test]
    fn encrypt_decrypt_roundtrip() -> AppResult<()> {
        let key = [42u8; 32];
        let encryptor = AesSecretEncryptor::new(&key);

        let encrypted = encryptor.encrypt("smtp-relay-password")?;
        assert_ne!(encrypted, "smtp-relay-password");
        assert_eq!(encryptor.decrypt(&encrypted)?, "smtp-relay-password");
        Ok(())
    }

    #[test]
    fn decrypt_with_wrong_key_fails() -> AppResult<()> {
        let encryptor1 = AesSecretEncryptor::new(&[42u8; 32]);
        let encryptor2 = AesSecretEncryptor::new(&[99u8; 32]);

        let encrypted = encryptor1.encrypt("secret")?;
        assert!(encryptor2.decrypt(&encrypted).is_err());
        Ok(())
    }
}
