//! Opening, saving and closing note documents.
//!
//! A [`DocumentSession`] ties a container file on disk to a plain staged
//! file inside a private [`Workspace`]. The editor reads and writes the
//! staged file; [`save`](DocumentSession::save) seals it back into the
//! container atomically.
//!
//! ```text
//! Closed --open/create--> Opening --ok--> Open --save--> Saving --> Open
//!    ^                       |              |
//!    +-------- error --------+              +--close--> Closing --> Closed
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use docseal::document::{DocumentSession, SessionOptions};
//! use docseal::Password;
//!
//! let mut session = DocumentSession::new(SessionOptions::new());
//! let mut prompt = |_: &std::path::Path, _: u32| Some(Password::new("secret"));
//! let staged = session.open("notes.ctz", &mut prompt)?;
//! std::fs::write(&staged, b"<cherrytree/>")?;
//! session.save(None)?;
//! session.close()?;
//! # Ok::<(), docseal::Error>(())
//! ```

mod backup;
mod options;
mod prompt;

pub use options::{BackupPolicy, DEFAULT_MAX_PASSWORD_ATTEMPTS, SessionOptions};
pub use prompt::{NoPrompt, PasswordPrompt};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::fs::{SharedFileSystem, StdFileSystem};
use crate::read::Archive;
use crate::workspace::{Workspace, WorkspaceManager, staged_file_name};
use crate::write::{ArchiveWriter, EntryMeta, commit_atomic};
use crate::{EntryName, Error, Password, Result};

/// Lifecycle state of a [`DocumentSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document is open.
    Closed,
    /// A document is being opened or created.
    Opening,
    /// A document is open and its staged file may be edited.
    Open,
    /// The staged file is being written back.
    Saving,
    /// The workspace is being released.
    Closing,
}

impl SessionState {
    /// Returns a lowercase name for messages.
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Closed => "closed",
            SessionState::Opening => "opening",
            SessionState::Open => "open",
            SessionState::Saving => "saving",
            SessionState::Closing => "closing",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The document currently held by a session.
#[derive(Debug)]
struct OpenDocument {
    workspace: Workspace,
    entry_name: EntryName,
    password: Option<Password>,
}

/// One open document and its workspace.
///
/// Operations take `&mut self`, so a session is used from one thread at a
/// time. Dropping a session releases its workspace without saving.
#[derive(Debug)]
pub struct DocumentSession {
    options: SessionOptions,
    fs: SharedFileSystem,
    workspaces: WorkspaceManager,
    state: SessionState,
    current: Option<OpenDocument>,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl DocumentSession {
    /// Creates a closed session.
    pub fn new(options: SessionOptions) -> Self {
        let workspaces = match &options.workspace_root {
            Some(root) => WorkspaceManager::new(root),
            None => WorkspaceManager::system(),
        };
        Self {
            options,
            fs: StdFileSystem::shared(),
            workspaces,
            state: SessionState::Closed,
            current: None,
        }
    }

    /// Routes all file access through `fs`.
    pub fn with_file_system(mut self, fs: SharedFileSystem) -> Self {
        self.workspaces = self.workspaces.with_file_system(fs.clone());
        self.fs = fs;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the options this session was created with.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the staged file the editor works on.
    pub fn staged_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|doc| doc.workspace.staged_path())
    }

    /// Returns the absolute path of the open document.
    pub fn document_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|doc| doc.workspace.document_path())
    }

    /// Returns the name of the entry holding the document.
    pub fn entry_name(&self) -> Option<&EntryName> {
        self.current.as_ref().map(|doc| &doc.entry_name)
    }

    /// Returns true if the open document is saved encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|doc| doc.password.is_some())
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    /// Opens a document and returns the staged file path.
    ///
    /// `prompt` is asked for a password when the container is encrypted,
    /// and again after each wrong password, up to
    /// [`SessionOptions::max_password_attempts`] wrong attempts.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if the prompt returns `None`
    /// - [`Error::WrongPassword`] after too many wrong passwords
    /// - [`Error::WorkspaceBusy`] if the document is already open
    /// - [`Error::CorruptArchive`] for damaged containers
    ///
    /// On error the session is closed again.
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<PathBuf> {
        self.expect_state(SessionState::Closed, "open")?;
        self.state = SessionState::Opening;

        match self.open_document(path.as_ref(), None, prompt) {
            Ok(doc) => {
                let staged = doc.workspace.staged_path().to_path_buf();
                self.current = Some(doc);
                self.state = SessionState::Open;
                Ok(staged)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// Opens a document with a known password, without prompting.
    ///
    /// # Errors
    ///
    /// [`Error::PasswordRequired`] if the document is encrypted and
    /// `password` is `None` or empty, [`Error::WrongPassword`] if it does
    /// not match; otherwise as [`open`](Self::open).
    pub fn open_with_password(
        &mut self,
        path: impl AsRef<Path>,
        password: Option<Password>,
    ) -> Result<PathBuf> {
        let password = password.and_then(Password::non_empty);
        let had_password = password.is_some();

        self.expect_state(SessionState::Closed, "open")?;
        self.state = SessionState::Opening;

        match self.open_document(path.as_ref(), password, &mut NoPrompt) {
            Ok(doc) => {
                let staged = doc.workspace.staged_path().to_path_buf();
                self.current = Some(doc);
                self.state = SessionState::Open;
                Ok(staged)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(match e {
                    Error::Cancelled if had_password => Error::WrongPassword,
                    Error::Cancelled => Error::PasswordRequired,
                    other => other,
                })
            }
        }
    }

    fn open_document(
        &self,
        path: &Path,
        mut password: Option<Password>,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<OpenDocument> {
        let workspace = self.workspaces.acquire(path)?;
        let mut archive = Archive::open_with(self.fs.clone(), workspace.document_path())?;

        let max_wrong = self.options.max_password_attempts.max(1);
        let mut wrong = 0u32;
        let mut attempt = 0u32;

        let (entry, bytes) = loop {
            if archive.is_encrypted() && password.is_none() {
                attempt += 1;
                let answer = prompt
                    .request(workspace.document_path(), attempt)
                    .ok_or(Error::Cancelled)?;
                password = answer.non_empty();
                if password.is_none() {
                    wrong += 1;
                    if wrong >= max_wrong {
                        return Err(Error::WrongPassword);
                    }
                    continue;
                }
            }

            archive.set_password(password.clone());
            match archive.extract_first() {
                Ok(decoded) => break decoded,
                Err(Error::WrongPassword) => {
                    wrong += 1;
                    log::debug!(
                        "wrong password for '{}' ({} of {})",
                        workspace.document_path().display(),
                        wrong,
                        max_wrong
                    );
                    if wrong >= max_wrong {
                        return Err(Error::WrongPassword);
                    }
                    password = None;
                }
                Err(e) => return Err(e),
            }
        };

        self.fs.write_private(workspace.staged_path(), &bytes)?;
        log::debug!(
            "opened '{}' into '{}'",
            workspace.document_path().display(),
            workspace.staged_path().display()
        );

        Ok(OpenDocument {
            workspace,
            entry_name: entry.name,
            password: if archive.is_encrypted() { password } else { None },
        })
    }

    /// Creates a new document at `path` holding `initial` and opens it.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] with [`AlreadyExists`](std::io::ErrorKind::AlreadyExists)
    /// if `path` exists; workspace and write errors otherwise.
    pub fn create(
        &mut self,
        path: impl AsRef<Path>,
        initial: &[u8],
        password: Option<Password>,
    ) -> Result<PathBuf> {
        self.expect_state(SessionState::Closed, "create")?;
        self.state = SessionState::Opening;

        match self.create_document(path.as_ref(), initial, password) {
            Ok(doc) => {
                let staged = doc.workspace.staged_path().to_path_buf();
                self.current = Some(doc);
                self.state = SessionState::Open;
                Ok(staged)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn create_document(
        &self,
        path: &Path,
        initial: &[u8],
        password: Option<Password>,
    ) -> Result<OpenDocument> {
        if self.fs.exists(path) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", path.display()),
            )));
        }

        let workspace = self.workspaces.acquire(path)?;
        self.fs.write_private(workspace.staged_path(), initial)?;

        let doc = OpenDocument {
            entry_name: entry_name_for(workspace.document_path())?,
            password: password.and_then(Password::non_empty),
            workspace,
        };
        self.write_container(&doc, doc.workspace.document_path(), doc.password.as_ref(), false)?;
        Ok(doc)
    }

    /// Seals the staged file back into the document.
    ///
    /// `None` keeps the current password; `Some` sets a new one, and an
    /// empty password saves the document unencrypted.
    ///
    /// # Errors
    ///
    /// [`Error::SaveWriteFailed`]; the document file and the staged file are
    /// both intact and the session stays open.
    pub fn save(&mut self, password: Option<Password>) -> Result<()> {
        self.expect_state(SessionState::Open, "save")?;
        let Some(doc) = self.current.as_ref() else {
            return Err(Error::InvalidState {
                operation: "save",
                state: self.state.name(),
            });
        };

        self.state = SessionState::Saving;
        let new_password = match password {
            Some(p) => p.non_empty(),
            None => doc.password.clone(),
        };
        let target = doc.workspace.document_path().to_path_buf();
        let outcome = self.write_container(doc, &target, new_password.as_ref(), true);
        self.state = SessionState::Open;

        match outcome {
            Ok(()) => {
                if let Some(doc) = self.current.as_mut() {
                    doc.password = new_password;
                }
                Ok(())
            }
            Err(e) => {
                log::error!("failed to save '{}': {}", target.display(), e);
                Err(Error::save_failed(e))
            }
        }
    }

    /// Saves the document under a new path and continues with that path.
    ///
    /// `password` behaves as in [`save`](Self::save). The old document is
    /// left as it was. A path naming the open document is a plain
    /// [`save`](Self::save).
    pub fn save_as(&mut self, path: impl AsRef<Path>, password: Option<Password>) -> Result<()> {
        self.expect_state(SessionState::Open, "save")?;
        let same_document = std::path::absolute(path.as_ref())
            .is_ok_and(|target| Some(target.as_path()) == self.document_path());
        if same_document {
            return self.save(password);
        }
        let Some(doc) = self.current.as_ref() else {
            return Err(Error::InvalidState {
                operation: "save",
                state: self.state.name(),
            });
        };

        self.state = SessionState::Saving;
        let new_password = match password {
            Some(p) => p.non_empty(),
            None => doc.password.clone(),
        };
        let outcome = self.save_to_new_path(doc, path.as_ref(), new_password);
        self.state = SessionState::Open;

        match outcome {
            Ok(new_doc) => {
                if let Some(old) = self.current.replace(new_doc) {
                    if let Err(e) = old.workspace.release() {
                        log::warn!("previous workspace not removed: {}", e);
                    }
                }
                Ok(())
            }
            Err(e) => {
                log::error!("failed to save as '{}': {}", path.as_ref().display(), e);
                Err(Error::save_failed(e))
            }
        }
    }

    fn save_to_new_path(
        &self,
        doc: &OpenDocument,
        path: &Path,
        password: Option<Password>,
    ) -> Result<OpenDocument> {
        let workspace = self.workspaces.acquire(path)?;
        self.fs
            .copy(doc.workspace.staged_path(), workspace.staged_path())?;

        let new_doc = OpenDocument {
            entry_name: entry_name_for(workspace.document_path())?,
            password,
            workspace,
        };
        self.write_container(
            &new_doc,
            new_doc.workspace.document_path(),
            new_doc.password.as_ref(),
            true,
        )?;
        Ok(new_doc)
    }

    /// Writes the staged file of `doc` to `target`, rotating backups when
    /// enabled.
    fn write_container(
        &self,
        doc: &OpenDocument,
        target: &Path,
        password: Option<&Password>,
        with_backup: bool,
    ) -> Result<()> {
        let data = self.fs.read(doc.workspace.staged_path())?;

        let mut writer = ArchiveWriter::new()
            .with_file_system(self.fs.clone())
            .params(self.options.params);
        writer.set_password(password.cloned());
        writer.add_entry(doc.entry_name.clone(), data, EntryMeta::new())?;
        let sealed = writer.encode()?;

        let policy = &self.options.backup;
        let pending = if with_backup && policy.is_enabled() && self.fs.exists(target) {
            Some(backup::stage(self.fs.as_ref(), target)?)
        } else {
            None
        };

        if let Err(e) = commit_atomic(self.fs.as_ref(), target, &sealed) {
            if let Some(pending) = &pending {
                backup::discard(self.fs.as_ref(), pending);
            }
            return Err(e);
        }

        if let Some(pending) = &pending {
            if let Err(e) = backup::rotate(self.fs.as_ref(), target, pending, policy) {
                log::warn!("backup rotation for '{}' failed: {}", target.display(), e);
            }
        }
        Ok(())
    }

    /// Closes the document and removes its workspace.
    ///
    /// Unsaved edits in the staged file are discarded. A workspace that
    /// cannot be removed is logged and otherwise ignored.
    pub fn close(&mut self) -> Result<()> {
        self.expect_state(SessionState::Open, "close")?;
        self.state = SessionState::Closing;

        if let Some(doc) = self.current.take() {
            let document = doc.workspace.document_path().to_path_buf();
            if let Err(e) = doc.workspace.release() {
                log::warn!("closing '{}': {}", document.display(), e);
            }
        }
        self.state = SessionState::Closed;
        Ok(())
    }
}

/// Entry name used inside the container for a document: the staged file
/// name.
fn entry_name_for(document: &Path) -> Result<EntryName> {
    let staged = staged_file_name(document)?;
    EntryName::new(&staged.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CodecParams;

    fn session(root: &Path) -> DocumentSession {
        DocumentSession::new(
            SessionOptions::new()
                .workspace_root(root.join("ws"))
                .codec_params(CodecParams::DOCUMENT.with_kdf_cycles_power(4)),
        )
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::Saving.to_string(), "saving");
        assert_eq!(SessionState::Closed.name(), "closed");
    }

    #[test]
    fn test_operations_require_open_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        assert!(matches!(
            session.save(None),
            Err(Error::InvalidState { operation: "save", state: "closed" })
        ));
        assert!(matches!(session.close(), Err(Error::InvalidState { .. })));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_create_edit_save_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.ctz");
        let mut session = session(dir.path());

        let staged = session
            .create(&doc, b"<cherrytree/>", Some(Password::new("pw")))
            .unwrap();
        assert_eq!(staged.file_name().unwrap(), "notes.ctd");
        assert_eq!(session.entry_name().unwrap(), "notes.ctd");
        assert!(session.is_encrypted());
        assert!(doc.exists());

        std::fs::write(&staged, b"<cherrytree><node/></cherrytree>").unwrap();
        session.save(None).unwrap();
        session.close().unwrap();
        assert!(!staged.exists());

        let staged = session
            .open_with_password(&doc, Some(Password::new("pw")))
            .unwrap();
        assert_eq!(
            std::fs::read(&staged).unwrap(),
            b"<cherrytree><node/></cherrytree>"
        );
        session.close().unwrap();
    }

    #[test]
    fn test_create_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.ctz");
        std::fs::write(&doc, b"x").unwrap();
        let mut session = session(dir.path());
        let err = session.create(&doc, b"", None).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_save_removes_password() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.ctz");
        let mut session = session(dir.path());
        session.create(&doc, b"data", Some(Password::new("pw"))).unwrap();

        session.save(Some(Password::new(""))).unwrap();
        assert!(!session.is_encrypted());
        assert!(!Archive::open(&doc).unwrap().is_encrypted());
    }

    #[test]
    fn test_save_as_moves_session() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.ctz");
        let second = dir.path().join("b.ctx");
        let mut session = session(dir.path());
        let old_staged = session.create(&first, b"data", None).unwrap();

        session.save_as(&second, None).unwrap();
        assert!(!old_staged.exists());
        assert_eq!(session.entry_name().unwrap(), "b.ctb");
        assert_eq!(
            session.document_path().unwrap().file_name().unwrap(),
            "b.ctx"
        );
        let archive = Archive::open(&second).unwrap();
        assert_eq!(archive.extract_entry("b.ctb").unwrap(), b"data");
        assert!(first.exists());
    }

    #[test]
    fn test_save_as_current_path_saves_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.ctz");
        let mut session = session(dir.path());
        let staged = session.create(&doc, b"v1", None).unwrap();

        std::fs::write(&staged, b"v2").unwrap();
        session.save_as(&doc, Some(Password::new("pw"))).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.staged_path(), Some(staged.as_path()));
        assert!(session.is_encrypted());

        let archive = Archive::open(&doc).unwrap().with_password("pw");
        assert_eq!(archive.extract_entry("notes.ctd").unwrap(), b"v2");
    }
}
