//! Error types for container and document operations.
//!
//! This module provides the [`Error`] enum which represents every failure
//! mode of the archive subsystem, along with a convenient [`Result<T>`]
//! type alias.
//!
//! # Recoverable vs. fatal
//!
//! Callers usually only need to distinguish a handful of cases:
//!
//! ```rust
//! use docseal::Error;
//!
//! fn user_message(error: &Error) -> &'static str {
//!     match error {
//!         Error::PasswordRequired | Error::WrongPassword => "Please enter the correct password.",
//!         Error::CorruptArchive { .. } => "The document is damaged and cannot be read.",
//!         Error::SaveWriteFailed { .. } => "Saving failed. Your changes are still open, try again.",
//!         _ => "Unexpected error.",
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The main error type for container and document operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | File system operations |
/// | Workspace | [`WorkspaceCreateFailed`][Self::WorkspaceCreateFailed], [`WorkspaceBusy`][Self::WorkspaceBusy], [`CleanupFailed`][Self::CleanupFailed] | Scratch directory handling |
/// | Password | [`PasswordRequired`][Self::PasswordRequired], [`WrongPassword`][Self::WrongPassword], [`Cancelled`][Self::Cancelled] | User input |
/// | Integrity | [`CorruptArchive`][Self::CorruptArchive] | Damaged or truncated containers |
/// | Compatibility | [`UnsupportedMethod`][Self::UnsupportedMethod] | Unknown codec ids |
/// | Entries | [`InvalidEntryName`][Self::InvalidEntryName], [`EntryNotFound`][Self::EntryNotFound], [`EntryExists`][Self::EntryExists] | Bad names or lookups |
/// | Document | [`SaveWriteFailed`][Self::SaveWriteFailed], [`InvalidState`][Self::InvalidState] | Façade misuse or failed saves |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The scratch workspace for a document could not be created.
    ///
    /// This is fatal to the open operation and is never retried.
    #[error("cannot create workspace at '{}': {source}", path.display())]
    WorkspaceCreateFailed {
        /// The workspace directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The workspace for a document is held by a live session.
    ///
    /// Either this process already has the document open, or another
    /// running process owns the workspace lock.
    #[error("workspace '{}' is in use by process {pid}", path.display())]
    WorkspaceBusy {
        /// The workspace directory.
        path: PathBuf,
        /// The process id recorded in the workspace lock.
        pid: u32,
    },

    /// Removing a workspace failed.
    ///
    /// The façade only logs this error; it never blocks the user.
    #[error("cannot remove workspace '{}': {source}", path.display())]
    CleanupFailed {
        /// The workspace directory that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A password is required but none was provided.
    #[error("password required for encrypted container")]
    PasswordRequired,

    /// The supplied password does not match the one used at creation.
    ///
    /// Detected through the key check value stored in the header, before any
    /// payload byte is decrypted.
    #[error("wrong password")]
    WrongPassword,

    /// The container structure is invalid, truncated, or fails an
    /// integrity check.
    #[error("corrupt container: {reason}")]
    CorruptArchive {
        /// A description of what was found to be invalid.
        reason: String,
    },

    /// The container uses a compression method this build does not know.
    #[error("unsupported method: {method_id:#04x}")]
    UnsupportedMethod {
        /// The method id recorded in the container.
        method_id: u8,
    },

    /// A cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    CryptoError(String),

    /// A resource limit was exceeded.
    ///
    /// Guards against hostile containers, e.g. an extreme key derivation
    /// iteration count.
    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// An entry name is invalid.
    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),

    /// An entry was not found in the container.
    #[error("entry not found: {name}")]
    EntryNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// An entry with the same name was already added.
    #[error("entry already exists: {name}")]
    EntryExists {
        /// The duplicated name.
        name: String,
    },

    /// Saving a document failed.
    ///
    /// The original document file is intact and the staged edits remain in
    /// the workspace, so the save can be retried.
    #[error("failed to save document: {source}")]
    SaveWriteFailed {
        /// What went wrong while writing.
        #[source]
        source: Box<Error>,
    },

    /// The user cancelled a password prompt.
    #[error("operation cancelled")]
    Cancelled,

    /// A document operation was called in a state that does not allow it.
    #[error("cannot {operation} while the document is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The current session state.
        state: &'static str,
    },
}

impl Error {
    /// Returns `true` if the caller may retry after fixing the input.
    ///
    /// - `PasswordRequired`, `WrongPassword`: prompt again
    /// - `SaveWriteFailed`: the document is intact; save again
    /// - `Cancelled`: the user may restart the operation
    /// - `Io` (transient kinds only)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::PasswordRequired
            | Error::WrongPassword
            | Error::SaveWriteFailed { .. }
            | Error::Cancelled => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptArchive { .. })
    }

    /// Returns `true` if this is an encryption-related error.
    pub fn is_encryption_error(&self) -> bool {
        matches!(
            self,
            Error::PasswordRequired | Error::WrongPassword | Error::CryptoError(_)
        )
    }

    /// Creates a `CorruptArchive` error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptArchive {
            reason: reason.into(),
        }
    }

    /// Wraps an error as a `SaveWriteFailed` unless it already is one.
    pub fn save_failed(source: Error) -> Self {
        match source {
            e @ Error::SaveWriteFailed { .. } => e,
            other => Error::SaveWriteFailed {
                source: Box::new(other),
            },
        }
    }

    /// Converts an unexpected end of input into a `CorruptArchive` error.
    ///
    /// Truncated containers surface from readers as `UnexpectedEof`; every
    /// other I/O error is passed through unchanged.
    pub(crate) fn from_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::corrupt(format!("truncated {}", what))
        } else {
            Error::Io(err)
        }
    }
}

/// A specialized Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;
