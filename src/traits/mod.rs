//! # Filesystem Traits
//!
//! The operation surface an adapter (such as a FUSE binding) drives.
//!
//! ## Trait Layers
//!
//! ```text
//! Layer 1 (Core):   FsRead + FsWrite + FsDir = Fs
//!                                             ↓
//! Layer 2 (Mount):  Fs + FsHandles = FsFuse
//! ```
//!
//! ## Quick Reference
//!
//! | Adapter callback | Trait method |
//! |------------------|--------------|
//! | getattr | [`FsRead::metadata`] |
//! | read | [`FsRead::read_range`] / [`FsHandles::read_at`] |
//! | readdir | [`FsDir::read_dir`] |
//! | mkdir / rmdir | [`FsDir::create_dir`] / [`FsDir::remove_dir`] |
//! | mknod / unlink | [`FsWrite::create_file`] / [`FsWrite::remove_file`] |
//! | truncate | [`FsWrite::truncate`] |
//! | write | [`FsWrite::write`] / [`FsHandles::write_at`] |
//! | rename | [`FsWrite::rename`] |
//! | utime | [`FsWrite::set_times`] |
//! | open / release | [`FsHandles::open`] / [`FsHandles::close`] |
//!
//! ## Blanket Implementations
//!
//! Composite traits are implemented automatically for every type that
//! implements their components.
//!
//! ## Mutability
//!
//! Reads take `&self`, mutations `&mut self`. The core is single-threaded;
//! callers serialize access.

mod fs_dir;
mod fs_handles;
mod fs_read;
mod fs_write;

// Layer 1 - Core traits
pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_read::FsRead;
pub use fs_write::FsWrite;

// Layer 2 - Mount traits
pub use fs_handles::FsHandles;

/// Path-based filesystem: attributes, contents and directory operations.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements [`FsRead`],
/// [`FsWrite`] and [`FsDir`].
///
/// # Example
///
/// ```rust
/// use treefs::{Config, Fs, FsError, FsSession, FsTree};
/// use std::path::Path;
///
/// fn stash<B: Fs>(fs: &mut B, data: &[u8]) -> Result<u64, FsError> {
///     fs.create_dir(Path::new("/stash"))?;
///     fs.create_file(Path::new("/stash/blob"))?;
///     fs.write(Path::new("/stash/blob"), data)?;
///     Ok(fs.metadata(Path::new("/stash"))?.size)
/// }
///
/// let config = Config::default().with_autosave(false);
/// let mut session = FsSession::from_tree(FsTree::new(), config);
/// assert_eq!(stash(&mut session, b"abc").unwrap(), 3);
/// ```
pub trait Fs: FsRead + FsWrite + FsDir {}

// Blanket implementation - any type implementing all three gets Fs for free
impl<T: FsRead + FsWrite + FsDir> Fs for T {}

/// Everything a userspace-filesystem adapter needs, handles included.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type implementing `Fs + FsHandles`.
pub trait FsFuse: Fs + FsHandles {}

// Blanket implementation
impl<T: Fs + FsHandles> FsFuse for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_is_object_safe() {
        fn _check(_: &dyn Fs) {}
        fn _check_fuse(_: &dyn FsFuse) {}
    }

    #[test]
    fn session_is_fuse() {
        fn assert_fuse<T: FsFuse>() {}
        assert_fuse::<crate::FsSession>();
    }
}
