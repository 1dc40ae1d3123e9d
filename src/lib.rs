//! # docseal
//!
//! Password-protected, compressed single-file containers for note-tree
//! documents, plus the session layer that opens such a document into a
//! private scratch workspace and seals it back on save.
//!
//! A container holds one or more named entries, compressed together with
//! LZMA2 and, when a password is set, encrypted with AES-256-CBC and
//! authenticated with HMAC-SHA256. Writes go through a temporary sibling
//! file and a rename, so a failed save never damages the previous version.
//!
//! ## Quick Start
//!
//! ### Sealing and extracting a document
//!
//! ```rust,no_run
//! use docseal::{Password, Result};
//!
//! fn main() -> Result<()> {
//!     let password = Password::new("secret");
//!     docseal::create(b"<cherrytree/>", "notes.ctd", Some(&password), "notes.ctz")?;
//!
//!     let bytes = docseal::extract("notes.ctz", Some(&password))?;
//!     assert_eq!(bytes, b"<cherrytree/>");
//!     Ok(())
//! }
//! ```
//!
//! ### Listing entries
//!
//! ```rust,no_run
//! use docseal::{Archive, Result};
//!
//! fn main() -> Result<()> {
//!     let archive = Archive::open("notes.ctz")?;
//!     for entry in archive.entries() {
//!         println!("{}: {} bytes", entry.name, entry.size);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Editing a document in a session
//!
//! ```rust,no_run
//! use docseal::document::{DocumentSession, SessionOptions};
//! use docseal::{Password, Result};
//!
//! fn main() -> Result<()> {
//!     let mut session = DocumentSession::new(SessionOptions::new());
//!     let mut prompt = |_: &std::path::Path, _: u32| Some(Password::new("secret"));
//!     let staged = session.open("notes.ctz", &mut prompt)?;
//!
//!     std::fs::write(&staged, b"<cherrytree><node/></cherrytree>")?;
//!     session.save(None)?;
//!     session.close()
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | Tokio wrappers for extract and create |
//!
//! ## Logging
//!
//! The crate emits records through the [`log`] facade and never installs a
//! logger. Passwords are never logged.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod container;
pub mod crypto;
pub mod document;
pub mod entry_name;
pub mod error;
pub mod format;
pub mod fs;
pub mod read;
pub mod timestamp;
pub mod workspace;
pub mod write;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod async_codec;

pub use container::{ContainerInfo, Entry, EntryIter};
pub use crypto::{NoncePolicy, Password};
pub use document::{DocumentSession, PasswordPrompt, SessionOptions, SessionState};
pub use entry_name::EntryName;
pub use error::{Error, Result};
pub use format::CodecParams;
pub use read::{Archive, ExtractOptions, ExtractResult, OverwritePolicy, extract};
pub use timestamp::Timestamp;
pub use workspace::{Workspace, WorkspaceManager};
pub use write::{ArchiveUpdater, ArchiveWriter, WriteResult, create, update};

#[cfg(feature = "async")]
pub use async_codec::{create_async, extract_async};
