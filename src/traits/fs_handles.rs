//! Handle-based file operations.
//!
//! An adapter resolves a path once with [`FsHandles::open`] and reuses the
//! returned [`Handle`] for subsequent reads and writes:
//!
//! 1. `open()` - resolve the path, refresh the access time, get a handle
//! 2. `read_at()` / `write_at()` - positional I/O without path resolution
//! 3. `close()` - release the handle
//!
//! # Example
//!
//! ```rust
//! use treefs::{Config, FsHandles, FsSession, FsTree, FsWrite};
//! use std::path::Path;
//!
//! let config = Config::default().with_autosave(false);
//! let mut fs = FsSession::from_tree(FsTree::new(), config);
//! fs.create_file(Path::new("/log"))?;
//!
//! let handle = fs.open(Path::new("/log"))?;
//! fs.write_at(handle, b"hello", 0)?;
//! fs.write_at(handle, b" world", 5)?;
//! assert_eq!(fs.read_at(handle, 0, 64)?, b"hello world");
//! fs.close(handle)?;
//! # Ok::<(), treefs::FsError>(())
//! ```

use std::path::Path;

use crate::{FsError, Handle};

/// Handle-based file operations.
pub trait FsHandles {
    /// Resolve `path`, refresh its access time and return a handle to it.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not resolve
    fn open(&mut self, path: &Path) -> Result<Handle, FsError>;

    /// Read up to `len` bytes at `offset`; empty past the end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the entry has been removed
    /// - [`FsError::IsADirectory`] if the handle refers to a directory
    fn read_at(&self, handle: Handle, offset: u64, len: usize) -> Result<Vec<u8>, FsError>;

    /// Write `data` at `offset`, zero-filling any gap; returns bytes written.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the entry has been removed
    /// - [`FsError::IsADirectory`] if the handle refers to a directory
    /// - [`FsError::ResourceExhausted`] if the file cannot grow
    fn write_at(&mut self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Release a handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the entry has been removed
    fn close(&mut self, handle: Handle) -> Result<(), FsError>;
}
