//! Directory operations.

use std::path::Path;

use crate::{DirEntry, FsError};

/// Directory listing, creation and removal.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir {
    /// List directory contents in insertion order.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is a file
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError>;

    /// Create a directory (parent must exist).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn create_dir(&mut self, path: &Path) -> Result<(), FsError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is a file
    /// - [`FsError::DirectoryNotEmpty`] if the directory is not empty
    fn remove_dir(&mut self, path: &Path) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// - Outer `Result` (from [`FsDir::read_dir`]) = "can I open this directory?"
/// - Inner `Result` (per item) = "can I read this entry?"
///
/// # Example
///
/// ```rust
/// use treefs::{Fs, FsError};
/// use std::path::Path;
///
/// fn list_names<B: Fs>(backend: &B) -> Result<Vec<String>, FsError> {
///     let mut names = Vec::new();
///     for entry in backend.read_dir(Path::new("/"))? {
///         names.push(entry?.name);
///     }
///     Ok(names)
/// }
/// ```
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected listing.
    pub fn from_vec(entries: Vec<DirEntry>) -> Self {
        Self(Box::new(entries.into_iter().map(Ok)))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
