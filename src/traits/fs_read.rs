//! Read operations.

use std::path::Path;

use crate::{FsError, Metadata};

/// Attribute and content queries.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead {
    /// Attributes of the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;

    /// Check if a path resolves.
    ///
    /// Returns `Ok(false)` for missing paths; never fails in the in-memory
    /// implementations.
    fn exists(&self, path: &Path) -> Result<bool, FsError>;

    /// Entire file contents.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    /// - [`FsError::IsADirectory`] if the path is a directory
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Up to `len` bytes starting at `offset`; empty past the end.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    /// - [`FsError::IsADirectory`] if the path is a directory
    fn read_range(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, FsError>;
}
