//! Salt and IV generation.

use super::{IV_LEN, MAX_SALT_LEN};
use crate::{Error, Result};

/// How salt and IV are chosen when a container is sealed.
///
/// Documents always use [`Random`][Self::Random], which draws from the
/// operating system CSPRNG. [`Explicit`][Self::Explicit] exists for
/// reproducible output in tests and known-answer checks; reusing an IV with
/// the same password leaks plaintext structure, so never use it for real data.
#[derive(Debug, Clone, Default)]
pub enum NoncePolicy {
    /// Fresh salt and IV from the OS random source.
    #[default]
    Random,
    /// Fixed salt and IV.
    Explicit {
        /// Salt bytes (at most 16).
        salt: Vec<u8>,
        /// Initialization vector.
        iv: [u8; IV_LEN],
    },
}

impl NoncePolicy {
    /// Creates an explicit policy.
    pub fn explicit(salt: Vec<u8>, iv: [u8; IV_LEN]) -> Self {
        Self::Explicit { salt, iv }
    }

    /// Produces a `(salt, iv)` pair. `salt_len` only applies to `Random`.
    pub fn generate(&self, salt_len: usize) -> Result<(Vec<u8>, [u8; IV_LEN])> {
        match self {
            Self::Random => {
                let mut salt = vec![0u8; salt_len.min(MAX_SALT_LEN)];
                let mut iv = [0u8; IV_LEN];
                fill_random(&mut salt)?;
                fill_random(&mut iv)?;
                Ok((salt, iv))
            }
            Self::Explicit { salt, iv } => {
                if salt.len() > MAX_SALT_LEN {
                    return Err(Error::CryptoError(format!(
                        "salt of {} bytes exceeds {} bytes",
                        salt.len(),
                        MAX_SALT_LEN
                    )));
                }
                Ok((salt.clone(), *iv))
            }
        }
    }
}

fn fill_random(buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    getrandom::getrandom(buf)
        .map_err(|e| Error::CryptoError(format!("random source unavailable: {}", e)))
}
