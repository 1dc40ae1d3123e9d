//! Session configuration.

use std::path::PathBuf;

use crate::format::CodecParams;

/// Default number of wrong passwords accepted before opening fails.
pub const DEFAULT_MAX_PASSWORD_ATTEMPTS: u32 = 3;

/// How many backup copies to keep, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupPolicy {
    /// Number of rotated copies to keep. Zero disables backups.
    pub copies: u32,
    /// Directory for rotated copies; `None` keeps them next to the document.
    pub custom_dir: Option<PathBuf>,
}

impl BackupPolicy {
    /// Keeps `copies` rotated backups next to the document.
    pub fn new(copies: u32) -> Self {
        Self {
            copies,
            custom_dir: None,
        }
    }

    /// No backups.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Stores rotated backups below `dir`.
    pub fn custom_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.custom_dir = Some(dir.into());
        self
    }

    /// Returns true if backups are kept.
    pub fn is_enabled(&self) -> bool {
        self.copies > 0
    }
}

/// Options for a [`DocumentSession`](super::DocumentSession).
///
/// # Example
///
/// ```rust
/// use docseal::document::{BackupPolicy, SessionOptions};
///
/// let options = SessionOptions::new()
///     .max_password_attempts(5)
///     .backup(BackupPolicy::new(3));
/// assert_eq!(options.max_password_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Directory for workspaces; `None` uses the system temporary directory.
    pub workspace_root: Option<PathBuf>,
    /// Wrong passwords accepted before opening fails with
    /// [`Error::WrongPassword`](crate::Error::WrongPassword).
    pub max_password_attempts: u32,
    /// Backup rotation on save.
    pub backup: BackupPolicy,
    /// Codec settings for saved containers.
    pub params: CodecParams,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            workspace_root: None,
            max_password_attempts: DEFAULT_MAX_PASSWORD_ATTEMPTS,
            backup: BackupPolicy::disabled(),
            params: CodecParams::DOCUMENT,
        }
    }
}

impl SessionOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places workspaces below `root`.
    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Sets the number of wrong passwords accepted (at least one).
    pub fn max_password_attempts(mut self, attempts: u32) -> Self {
        self.max_password_attempts = attempts.max(1);
        self
    }

    /// Sets the backup policy.
    pub fn backup(mut self, policy: BackupPolicy) -> Self {
        self.backup = policy;
        self
    }

    /// Overrides the codec settings of saved containers.
    ///
    /// Documents are always saved with [`CodecParams::DOCUMENT`] in normal
    /// use; lowering the key derivation cost is useful in tests.
    pub fn codec_params(mut self, params: CodecParams) -> Self {
        self.params = params;
        self
    }
}
