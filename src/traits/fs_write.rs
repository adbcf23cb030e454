//! Write operations.

use std::path::Path;
use std::time::SystemTime;

use crate::FsError;

/// File creation, mutation and removal.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite {
    /// Create an empty file. The parent directory must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if the path already exists
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::ResourceExhausted`] if the entry cannot be allocated
    fn create_file(&mut self, path: &Path) -> Result<(), FsError>;

    /// Replace the file's contents with `data`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    /// - [`FsError::IsADirectory`] if the path is a directory
    /// - [`FsError::ResourceExhausted`] if the buffer cannot be allocated
    fn write(&mut self, path: &Path, data: &[u8]) -> Result<usize, FsError>;

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    /// - [`FsError::IsADirectory`] if the path is a directory
    fn remove_file(&mut self, path: &Path) -> Result<(), FsError>;

    /// Move a file or directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `to` already exists
    /// - [`FsError::NotFound`] if `from` does not exist
    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Resize a file, zero-filling when growing.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    /// - [`FsError::IsADirectory`] if the path is a directory
    /// - [`FsError::ResourceExhausted`] if the buffer cannot grow
    fn truncate(&mut self, path: &Path, size: u64) -> Result<(), FsError>;

    /// Overwrite the access and modification times.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    fn set_times(
        &mut self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError>;
}
