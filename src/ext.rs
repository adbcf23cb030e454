//! # Extension Traits
//!
//! Convenience methods layered on top of [`Fs`].
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FsExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](FsExt::is_dir) | Check if path is a directory |
//! | [`file_size`](FsExt::file_size) | Size of a file, or aggregate size of a directory |
//! | [`list_names`](FsExt::list_names) | Child names of a directory, in insertion order |
//! | [`put`](FsExt::put) | Create a file if needed and replace its contents |
//!
//! With the `serde` feature, [`FsExtJson`] adds `read_json` / `write_json`.

use std::path::Path;

use crate::{Fs, FsError};

/// Extension methods for any [`Fs`] implementation.
///
/// # Example
///
/// ```rust
/// use treefs::{Config, FsExt, FsSession, FsTree};
/// use std::path::Path;
///
/// let mut fs = FsSession::from_tree(FsTree::new(), Config::default().with_autosave(false));
/// fs.put(Path::new("/motd"), b"welcome")?;
/// assert!(fs.is_file(Path::new("/motd"))?);
/// assert_eq!(fs.list_names(Path::new("/"))?, vec!["motd"]);
/// # Ok::<(), treefs::FsError>(())
/// ```
pub trait FsExt: Fs {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_file()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_dir()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Size in bytes; for directories, the total of everything below.
    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        Ok(self.metadata(path)?.size)
    }

    /// Names of a directory's children.
    fn list_names(&self, path: &Path) -> Result<Vec<String>, FsError> {
        self.read_dir(path)?
            .map(|entry| entry.map(|e| e.name))
            .collect()
    }

    /// Replace a file's contents, creating the file first if it is missing.
    fn put(&mut self, path: &Path, data: &[u8]) -> Result<usize, FsError> {
        if !self.exists(path)? {
            self.create_file(path)?;
        }
        self.write(path, data)
    }
}

impl<B: Fs + ?Sized> FsExt for B {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON helpers, available with the `serde` feature.
    pub trait FsExtJson: Fs {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - [`FsError::NotFound`] if the file doesn't exist
        /// - [`FsError::CorruptFormat`] if the contents are not valid JSON for `T`
        fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, FsError> {
            let data = self.read(path)?;
            serde_json::from_slice(&data).map_err(|e| FsError::CorruptFormat {
                path: path.to_path_buf(),
                details: e.to_string(),
            })
        }

        /// Serialize a value as pretty-printed JSON and store it, creating
        /// the file if needed.
        fn write_json<T: Serialize>(&mut self, path: &Path, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value).map_err(|e| FsError::CorruptFormat {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;
            self.put(path, &json).map(|_| ())
        }
    }

    impl<B: Fs + ?Sized> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;
