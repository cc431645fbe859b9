use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::Deserialize;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
/// File signature, followed by a format version byte.
const SIGNATURE: &[u8; 4] = b"CYKP";
const VERSION: u8 = 1;
/// signature (4) || version (1) || m_cost (4) || t_cost (4) || p_cost (4)
const HEADER_LEN: usize = 4 + 1 + 12;
/// Upper cost bounds accepted from a header: 2 GiB, 16 passes, 16 lanes.
const MAX_MEMORY_KIB: u32 = 1 << 21;
const MAX_ITERATIONS: u32 = 16;
const MAX_PARALLELISM: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed: wrong passphrase or corrupted data")]
    Decryption,
    #[error("not a sealed profile file")]
    InvalidFormat,
    #[error("unsupported sealed format version {0}")]
    UnsupportedVersion(u8),
}

/// Argon2id cost parameters. Written into every sealed file so later
/// changes to the configured costs never lock out existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    fn header(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(SIGNATURE);
        header[4] = VERSION;
        header[5..9].copy_from_slice(&self.memory_kib.to_le_bytes());
        header[9..13].copy_from_slice(&self.iterations.to_le_bytes());
        header[13..17].copy_from_slice(&self.parallelism.to_le_bytes());
        header
    }

    fn from_header(header: &[u8]) -> Result<Self, CryptoError> {
        if header.len() < HEADER_LEN || &header[..4] != SIGNATURE {
            return Err(CryptoError::InvalidFormat);
        }
        if header[4] != VERSION {
            return Err(CryptoError::UnsupportedVersion(header[4]));
        }
        let word = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&header[at..at + 4]);
            u32::from_le_bytes(buf)
        };
        let kdf = Self {
            memory_kib: word(5),
            iterations: word(9),
            parallelism: word(13),
        };
        // The header is only authenticated after the key exists, so bound the work first.
        if !kdf.within_limits() {
            return Err(CryptoError::InvalidFormat);
        }
        Ok(kdf)
    }

    fn within_limits(&self) -> bool {
        self.memory_kib <= MAX_MEMORY_KIB
            && self.iterations <= MAX_ITERATIONS
            && self.parallelism <= MAX_PARALLELISM
    }

    fn derive_key(
        &self,
        passphrase: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|_| CryptoError::KeyDerivation)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut *key)
            .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(key)
    }
}

/// Encrypt `plaintext` under a passphrase.
///
/// Layout: header || salt (16) || nonce (12) || ciphertext. The header is
/// authenticated as associated data.
pub fn seal(
    passphrase: &str,
    plaintext: &[u8],
    kdf: &KdfParams,
) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    if !kdf.within_limits() {
        return Err(CryptoError::KeyDerivation);
    }
    let header = kdf.header();
    let key = kdf.derive_key(passphrase, &salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| CryptoError::Encryption)?;

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;

    let mut out = Vec::with_capacity(HEADER_LEN + SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Reverse of [`seal`]. Cost parameters come from the sealed header.
pub fn open(passphrase: &str, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let body_at = HEADER_LEN + SALT_LEN + NONCE_LEN;
    if sealed.len() < body_at {
        return Err(CryptoError::InvalidFormat);
    }
    let (header, rest) = sealed.split_at(HEADER_LEN);
    let kdf = KdfParams::from_header(header)?;
    let (salt, rest) = rest.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = kdf.derive_key(passphrase, salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| CryptoError::Decryption)?;

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| CryptoError::Decryption)?;

    Ok(Zeroizing::new(plaintext))
}
