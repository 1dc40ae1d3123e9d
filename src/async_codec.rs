//! Tokio wrappers for the blocking container operations.
//!
//! Key derivation and LZMA2 are CPU-bound, so each call runs whole on
//! Tokio's blocking pool. A call cannot be cancelled once started; dropping
//! the future only discards the result.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn run() -> docseal::Result<()> {
//! use docseal::async_codec::{create_async, extract_async};
//! use docseal::Password;
//!
//! let password = Some(Password::new("secret"));
//! create_async(b"<cherrytree/>".to_vec(), "notes.ctd", password.clone(), "notes.ctz").await?;
//! let bytes = extract_async("notes.ctz", password).await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use std::path::PathBuf;

use crate::write::WriteResult;
use crate::{Error, Password, Result};

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
}

/// Async form of [`read::extract`](crate::read::extract).
pub async fn extract_async(path: impl Into<PathBuf>, password: Option<Password>) -> Result<Vec<u8>> {
    let path = path.into();
    run_blocking(move || crate::read::extract(&path, password.as_ref())).await
}

/// Async form of [`write::create`](crate::write::create).
pub async fn create_async(
    plaintext: Vec<u8>,
    entry_name: impl Into<String>,
    password: Option<Password>,
    destination: impl Into<PathBuf>,
) -> Result<WriteResult> {
    let entry_name = entry_name.into();
    let destination = destination.into();
    run_blocking(move || {
        crate::write::create(&plaintext, &entry_name, password.as_ref(), &destination)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_extract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.ctz");
        let password = Some(Password::new("pw"));

        let result = create_async(b"NodeContent".to_vec(), "notes.ctd", password.clone(), &path)
            .await
            .unwrap();
        assert!(result.encrypted);

        let bytes = extract_async(&path, password).await.unwrap();
        assert_eq!(bytes, b"NodeContent");

        let err = extract_async(&path, None).await.unwrap_err();
        assert!(matches!(err, Error::PasswordRequired));
    }
}
