//! Credential encryption at rest.
//!
//! AES-256-GCM with HKDF per-organisation key derivation: a leaked row from
//! one organisation never exposes another's credentials, and rotating the
//! master key re-seals everything.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{ConnectorError, ConnectorResult};

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Context string for HKDF key derivation.
const HKDF_INFO: &[u8] = b"elba-connector-credentials-v1";

/// Seals and opens vendor credential sets with organisation-scoped keys.
#[derive(Clone)]
pub struct CredentialCipher {
    master_key: [u8; KEY_LENGTH],
}

impl CredentialCipher {
    /// Build a cipher from a 32-byte master key.
    #[must_use]
    pub fn new(master_key: [u8; KEY_LENGTH]) -> Self {
        Self { master_key }
    }

    /// Build a cipher from a hex-encoded master key (the deployment format).
    pub fn from_hex(hex_key: &str) -> ConnectorResult<Self> {
        let bytes = hex::decode(hex_key.trim()).map_err(|e| ConnectorError::EncryptionFailed {
            message: format!("invalid hex master key: {e}"),
        })?;
        let key: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| ConnectorError::EncryptionFailed {
                    message: format!("master key must be {KEY_LENGTH} bytes, got {}", bytes.len()),
                })?;
        Ok(Self::new(key))
    }

    /// Derive the organisation-scoped key. 32 bytes is always a valid
    /// HKDF-SHA256 output length, so expansion cannot fail.
    fn derive_key(&self, organisation_id: Uuid) -> [u8; KEY_LENGTH] {
        let hkdf = Hkdf::<Sha256>::new(Some(organisation_id.as_bytes()), &self.master_key);
        let mut derived = [0u8; KEY_LENGTH];
        hkdf.expand(HKDF_INFO, &mut derived)
            .expect("HKDF-SHA256 supports 32-byte output");
        derived
    }

    /// Encrypt a credential payload for one organisation.
    ///
    /// Returns `nonce || ciphertext || tag`.
    pub fn seal(&self, organisation_id: Uuid, plaintext: &[u8]) -> ConnectorResult<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(&self.derive_key(organisation_id)).map_err(|e| {
            ConnectorError::EncryptionFailed {
                message: format!("cipher init failed: {e}"),
            }
        })?;

        use rand::rngs::OsRng;
        use rand::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| ConnectorError::EncryptionFailed {
                message: format!("encryption failed: {e}"),
            })?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a credential payload sealed with [`CredentialCipher::seal`]
    /// for the same organisation.
    pub fn open(&self, organisation_id: Uuid, sealed: &[u8]) -> ConnectorResult<Vec<u8>> {
        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(ConnectorError::DecryptionFailed {
                message: "ciphertext too short".to_string(),
            });
        }

        let cipher = Aes256Gcm::new_from_slice(&self.derive_key(organisation_id)).map_err(|e| {
            ConnectorError::DecryptionFailed {
                message: format!("cipher init failed: {e}"),
            }
        })?;

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| ConnectorError::DecryptionFailed {
                message: format!("decryption failed: {e}"),
            })
    }

    /// Seal a serde credential set as JSON.
    pub fn seal_json<T: serde::Serialize>(
        &self,
        organisation_id: Uuid,
        credentials: &T,
    ) -> ConnectorResult<Vec<u8>> {
        let json = serde_json::to_vec(credentials)?;
        self.seal(organisation_id, &json)
    }

    /// Open a sealed credential set into raw JSON, left to the vendor
    /// connector to interpret.
    pub fn open_json(
        &self,
        organisation_id: Uuid,
        sealed: &[u8],
    ) -> ConnectorResult<serde_json::Value> {
        let plaintext = self.open(organisation_id, sealed)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random master key as a hex string, for initial setup.
#[must_use]
pub fn generate_master_key_hex() -> String {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut key = [0u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    hex::encode(key)
}
