//! Password prompting.

use std::path::Path;

use crate::Password;

/// Supplies passwords when opening an encrypted document.
///
/// `attempt` starts at 1 and increases after every wrong password. Returning
/// `None` cancels the open with [`Error::Cancelled`](crate::Error::Cancelled).
///
/// Closures implement this trait:
///
/// ```rust
/// use docseal::document::PasswordPrompt;
/// use docseal::Password;
///
/// let mut prompt = |_doc: &std::path::Path, attempt: u32| {
///     (attempt == 1).then(|| Password::new("secret"))
/// };
/// assert!(prompt.request(std::path::Path::new("a.ctz"), 1).is_some());
/// assert!(prompt.request(std::path::Path::new("a.ctz"), 2).is_none());
/// ```
pub trait PasswordPrompt {
    /// Asks for the password of `document`.
    fn request(&mut self, document: &Path, attempt: u32) -> Option<Password>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&Path, u32) -> Option<Password>,
{
    fn request(&mut self, document: &Path, attempt: u32) -> Option<Password> {
        self(document, attempt)
    }
}

/// A prompt that never supplies a password.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn request(&mut self, _document: &Path, _attempt: u32) -> Option<Password> {
        None
    }
}
