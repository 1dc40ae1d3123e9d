//! Validated names for entries inside a container.

use crate::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Upper bound on the encoded name length; the on-disk field is a `u16`.
pub const MAX_NAME_LENGTH: usize = u16::MAX as usize;

/// A relative, `/`-separated entry name.
///
/// Names are checked when they are created, both when adding entries and
/// when parsing a container, so extraction can join them onto a target
/// directory without escaping it. A valid name:
/// - is not empty and fits in [`MAX_NAME_LENGTH`] bytes
/// - contains no NUL byte
/// - does not start or end with `/`
/// - has no empty, `.` or `..` segment
///
/// Names that only some platforms cannot store on disk (`aux.ctd`, `a\b`)
/// are valid entry names; [`to_path`](Self::to_path) rejects them where
/// they would be misread.
///
/// # Examples
///
/// ```
/// use docseal::EntryName;
///
/// let name = EntryName::new("notes/content.xml").unwrap();
/// assert_eq!(name.file_name(), "content.xml");
///
/// assert!(EntryName::new("../escape.ctd").is_err());
/// assert!(EntryName::new("/etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryName(String);

impl EntryName {
    /// Validates and wraps a name.
    pub fn new(name: &str) -> Result<Self> {
        validate(name)?;
        Ok(Self(name.to_owned()))
    }

    /// Builds a name from a relative filesystem path.
    ///
    /// Platform separators are converted to `/`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        Error::InvalidEntryName(format!("non UTF-8 path '{}'", path.display()))
                    })?;
                    segments.push(part);
                }
                _ => {
                    return Err(Error::InvalidEntryName(format!(
                        "path '{}' is not a plain relative path",
                        path.display()
                    )));
                }
            }
        }
        Self::new(&segments.join("/"))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resolves this name below `root`.
    ///
    /// # Errors
    ///
    /// On Windows, [`Error::InvalidEntryName`] for segments containing a
    /// backslash or naming a reserved device (`CON`, `aux.txt`, ...).
    pub fn to_path(&self, root: &Path) -> Result<PathBuf> {
        let mut path = root.to_path_buf();
        for segment in self.0.split('/') {
            check_host_segment(segment)?;
            path.push(segment);
        }
        Ok(path)
    }
}

#[cfg(windows)]
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reserved device names match case-insensitively, with or without an
/// extension (`con.txt` is reserved too).
#[cfg(windows)]
fn is_windows_reserved(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment);
    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
}

#[cfg(windows)]
fn check_host_segment(segment: &str) -> Result<()> {
    if segment.contains('\\') {
        return Err(Error::InvalidEntryName(format!(
            "'{}' contains a backslash",
            segment
        )));
    }
    if is_windows_reserved(segment) {
        return Err(Error::InvalidEntryName(format!(
            "'{}' is a reserved device name",
            segment
        )));
    }
    Ok(())
}

#[cfg(not(windows))]
fn check_host_segment(_segment: &str) -> Result<()> {
    Ok(())
}

fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName("empty name".into()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::InvalidEntryName(format!(
            "name exceeds {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName("contains NUL byte".into()));
    }
    if name.starts_with('/') {
        return Err(Error::InvalidEntryName(format!("'{}' is absolute", name)));
    }

    for segment in name.split('/') {
        match segment {
            "" => {
                return Err(Error::InvalidEntryName(format!(
                    "'{}' has an empty segment",
                    name
                )));
            }
            "." | ".." => {
                return Err(Error::InvalidEntryName(format!(
                    "'{}' has a '{}' segment",
                    name, segment
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

impl AsRef<str> for EntryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for EntryName {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntryName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        validate(&s)?;
        Ok(Self(s))
    }
}

impl PartialEq<str> for EntryName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntryName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
