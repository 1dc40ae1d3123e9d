//! Password-based authenticated encryption for container payloads.
//!
//! The scheme is built from three pieces:
//! - SHA-256 iterated key derivation from the password (7z's scheme, with
//!   `2^n` rounds over salt, UTF-16LE password and round counter)
//! - AES-256-CBC with PKCS#7 padding for the compressed payload
//! - HMAC-SHA256 over the header and ciphertext
//!
//! The derived master key is never used directly. Separate cipher, MAC and
//! key-check values are expanded from it with HMAC-SHA256 under fixed
//! labels. The key check is stored in the header so a wrong password is
//! reported as such before anything is decrypted; the tag then catches any
//! tampering or damage of the bytes it covers.

mod nonce;
mod password;

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{Error, Result};

pub use nonce::NoncePolicy;
pub use password::Password;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// Length of the CBC initialization vector.
pub const IV_LEN: usize = 16;

/// Maximum salt length accepted in a container header.
pub const MAX_SALT_LEN: usize = 16;

/// Length of the stored key check value.
pub const KEY_CHECK_LEN: usize = 8;

/// Length of the HMAC-SHA256 tag appended to encrypted containers.
pub const TAG_LEN: usize = 32;

/// Maximum allowed value for `num_cycles_power` in key derivation.
///
/// `2^30` rounds take tens of seconds; anything above is treated as a
/// hostile container.
pub const MAX_NUM_CYCLES_POWER: u8 = 30;

const CIPHER_LABEL: &[u8] = b"docseal/cipher";
const MAC_LABEL: &[u8] = b"docseal/mac";
const CHECK_LABEL: &[u8] = b"docseal/check";

/// Derives a 32-byte master key from a password.
///
/// Runs `2^num_cycles_power` SHA-256 rounds over `salt || password || i`.
///
/// # Errors
///
/// Returns [`Error::ResourceLimitExceeded`] if `num_cycles_power` exceeds
/// [`MAX_NUM_CYCLES_POWER`].
pub fn derive_key(
    password: &Password,
    salt: &[u8],
    num_cycles_power: u8,
) -> Result<Zeroizing<[u8; 32]>> {
    if num_cycles_power > MAX_NUM_CYCLES_POWER {
        log::warn!(
            "rejecting key derivation with cycles power {} (max {})",
            num_cycles_power,
            MAX_NUM_CYCLES_POWER
        );
        return Err(Error::ResourceLimitExceeded(format!(
            "key derivation cycles power {} exceeds maximum {}",
            num_cycles_power, MAX_NUM_CYCLES_POWER
        )));
    }

    let password_bytes = password.as_utf16_le();
    let mut sha = Sha256::new();
    for round in 0..(1u64 << num_cycles_power) {
        sha.update(salt);
        sha.update(&*password_bytes);
        sha.update(round.to_le_bytes());
    }
    Ok(Zeroizing::new(sha.finalize().into()))
}

fn keyed_mac(key: &[u8]) -> Result<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| Error::CryptoError(format!("invalid MAC key: {}", e)))
}

/// Keys for one sealed container.
///
/// Holds the master key and the subkeys expanded from it. Everything is
/// zeroized on drop.
pub struct ContainerKeys {
    master: Zeroizing<[u8; 32]>,
    cipher: Zeroizing<[u8; 32]>,
    mac: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for ContainerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerKeys").finish_non_exhaustive()
    }
}

impl ContainerKeys {
    /// Derives the key set for a password and header parameters.
    pub fn derive(password: &Password, salt: &[u8], num_cycles_power: u8) -> Result<Self> {
        let master = derive_key(password, salt, num_cycles_power)?;
        let cipher = expand(&master, CIPHER_LABEL)?;
        let mac = expand(&master, MAC_LABEL)?;
        Ok(Self {
            master,
            cipher,
            mac,
        })
    }

    /// Returns the value stored in the header to recognize this password.
    pub fn key_check(&self) -> Result<[u8; KEY_CHECK_LEN]> {
        let full = expand(&self.master, CHECK_LABEL)?;
        let mut check = [0u8; KEY_CHECK_LEN];
        check.copy_from_slice(&full[..KEY_CHECK_LEN]);
        Ok(check)
    }

    /// Compares a stored key check in constant time.
    pub fn verify_key_check(&self, stored: &[u8]) -> Result<bool> {
        if stored.len() != KEY_CHECK_LEN {
            return Ok(false);
        }
        let mut mac = keyed_mac(&self.master[..])?;
        mac.update(CHECK_LABEL);
        Ok(mac.verify_truncated_left(stored).is_ok())
    }

    /// Encrypts with AES-256-CBC and PKCS#7 padding.
    pub fn encrypt(&self, iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let pad_len = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
        let mut buf = Vec::with_capacity(plaintext.len() + pad_len);
        buf.extend_from_slice(plaintext);
        buf.extend(std::iter::repeat_n(pad_len as u8, pad_len));

        let len = buf.len();
        Aes256CbcEnc::new_from_slices(&self.cipher[..], iv)
            .map_err(|e| Error::CryptoError(e.to_string()))?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|e| Error::CryptoError(e.to_string()))?;
        Ok(buf)
    }

    /// Decrypts a payload produced by [`encrypt`][Self::encrypt].
    ///
    /// Callers verify the tag first; a length or padding failure here means
    /// the container is damaged.
    pub fn decrypt(&self, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::corrupt(format!(
                "encrypted payload of {} bytes is not block aligned",
                ciphertext.len()
            )));
        }

        let mut buf = ciphertext.to_vec();
        Aes256CbcDec::new_from_slices(&self.cipher[..], iv)
            .map_err(|e| Error::CryptoError(e.to_string()))?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| Error::corrupt("encrypted payload is not block aligned"))?;

        let pad_len = buf.last().copied().unwrap_or(0) as usize;
        if pad_len == 0
            || pad_len > BLOCK_SIZE
            || !buf[buf.len() - pad_len..]
                .iter()
                .all(|&b| b as usize == pad_len)
        {
            return Err(Error::corrupt("invalid payload padding"));
        }
        buf.truncate(buf.len() - pad_len);
        Ok(buf)
    }

    /// Computes the tag over `header || ciphertext`.
    pub fn tag(&self, header: &[u8], ciphertext: &[u8]) -> Result<[u8; TAG_LEN]> {
        let mut mac = keyed_mac(&self.mac[..])?;
        mac.update(header);
        mac.update(ciphertext);
        Ok(mac.finalize().into_bytes().into())
    }

    /// Verifies the tag over `header || ciphertext` in constant time.
    pub fn verify_tag(&self, header: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<bool> {
        let mut mac = keyed_mac(&self.mac[..])?;
        mac.update(header);
        mac.update(ciphertext);
        Ok(mac.verify_slice(tag).is_ok())
    }
}

fn expand(master: &[u8; 32], label: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut mac = keyed_mac(master)?;
    mac.update(label);
    Ok(Zeroizing::new(mac.finalize().into_bytes().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(password: &str) -> ContainerKeys {
        ContainerKeys::derive(&Password::new(password), b"salty", 4).unwrap()
    }

    #[test]
    fn test_derive_key_deterministic() {
        let password = Password::new("7zr");
        let a = derive_key(&password, b"salt", 6).unwrap();
        let b = derive_key(&password, b"salt", 6).unwrap();
        assert_eq!(*a, *b);

        let other_salt = derive_key(&password, b"SALT", 6).unwrap();
        assert_ne!(*a, *other_salt);
        let other_password = derive_key(&Password::new("7zR"), b"salt", 6).unwrap();
        assert_ne!(*a, *other_password);
    }

    #[test]
    fn test_derive_key_known_answer() {
        // cycles power 0 is a single SHA-256 over salt || password || 0u64.
        let key = derive_key(&Password::new("a"), b"", 0).unwrap();
        let expected: [u8; 32] = Sha256::digest([0x61, 0, 0, 0, 0, 0, 0, 0, 0, 0]).into();
        assert_eq!(*key, expected);
    }

    #[test]
    fn test_derive_key_cycles_limit() {
        let err = derive_key(&Password::new("x"), b"", MAX_NUM_CYCLES_POWER + 1).unwrap_err();
        assert!(matches!(err, Error::ResourceLimitExceeded(_)));
    }

    #[test]
    fn test_subkeys_are_distinct() {
        let k = keys("secret");
        assert_ne!(*k.cipher, *k.mac);
        assert_ne!(*k.cipher, *k.master);
    }

    #[test]
    fn test_key_check() {
        let right = keys("secret");
        let check = right.key_check().unwrap();
        assert!(right.verify_key_check(&check).unwrap());
        assert!(!keys("Secret").verify_key_check(&check).unwrap());
        assert!(!right.verify_key_check(&check[..4]).unwrap());
    }

    #[test]
    fn test_encrypt_roundtrip() {
        let k = keys("secret");
        let iv = [7u8; IV_LEN];
        for len in [0usize, 1, 15, 16, 17, 1000] {
            let plain: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let ct = k.encrypt(&iv, &plain).unwrap();
            assert_eq!(ct.len() % BLOCK_SIZE, 0);
            assert!(ct.len() > plain.len());
            assert_eq!(k.decrypt(&iv, &ct).unwrap(), plain);
        }
    }

    #[test]
    fn test_decrypt_rejects_unaligned() {
        let k = keys("secret");
        let err = k.decrypt(&[0; IV_LEN], &[1, 2, 3]).unwrap_err();
        assert!(err.is_corruption());
        assert!(k.decrypt(&[0; IV_LEN], &[]).unwrap_err().is_corruption());
    }

    #[test]
    fn test_tag_detects_changes() {
        let k = keys("secret");
        let tag = k.tag(b"header", b"body").unwrap();
        assert!(k.verify_tag(b"header", b"body", &tag).unwrap());
        assert!(!k.verify_tag(b"header", b"bodY", &tag).unwrap());
        assert!(!k.verify_tag(b"Header", b"body", &tag).unwrap());
        assert!(!keys("other").verify_tag(b"header", b"body", &tag).unwrap());
    }
}
