//! # Filesystem Session
//!
//! [`FsSession`] ties an [`FsTree`] to its persistence file and exposes the
//! path-based operation traits an adapter calls.
//!
//! ## Lifecycle
//!
//! 1. [`FsSession::mount`] loads the persistence file, or starts from an
//!    empty root when it is absent or unreadable
//! 2. Every mutating trait call rewrites the whole file (with `autosave`)
//! 3. [`FsSession::unmount`] saves one last time and tears the tree down
//!
//! ## Usage
//!
//! ```rust,no_run
//! use treefs::{Config, FsDir, FsSession, FsWrite};
//! use std::path::Path;
//!
//! let mut fs = FsSession::mount(Config::default().with_persist_path("/var/lib/treefs.db"));
//! fs.create_dir(Path::new("/notes"))?;
//! fs.create_file(Path::new("/notes/today"))?;
//! fs.write(Path::new("/notes/today"), b"buy milk")?;
//! fs.unmount()?;
//! # Ok::<(), treefs::FsError>(())
//! ```

use std::path::Path;
use std::time::SystemTime;

use tracing::{info, warn};

use crate::codec::{Codec, Load};
use crate::{
    Config, FileType, FsDir, FsError, FsHandles, FsRead, FsTree, FsWrite, Handle, Metadata,
    NodeId, ReadDirIter,
};

/// A mounted filesystem: the tree, its configuration and its codec.
#[derive(Debug)]
pub struct FsSession {
    tree: FsTree,
    codec: Codec,
    config: Config,
}

impl FsSession {
    /// Load the tree from `config.persist_path`.
    ///
    /// An absent file starts an empty tree. An unreadable or corrupt file is
    /// logged and also replaced by an empty tree; the file is left as is
    /// until the next save.
    pub fn mount(config: Config) -> Self {
        match Self::try_mount(config.clone()) {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    path = %config.persist_path.display(),
                    error = %e,
                    "discarding unreadable persistence file"
                );
                Self::from_tree(FsTree::with_config(&config), config)
            }
        }
    }

    /// Like [`mount`](Self::mount), but reports unreadable or corrupt files.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the file exists but cannot be read
    /// - [`FsError::CorruptFormat`] if the file does not parse
    pub fn try_mount(config: Config) -> Result<Self, FsError> {
        let codec = Codec::new(&config);
        let tree = match codec.load(&config.persist_path)? {
            Load::Restored(tree) => tree,
            Load::NotPresent => {
                info!(path = %config.persist_path.display(), "starting with an empty tree");
                FsTree::with_config(&config)
            }
        };
        Ok(Self {
            tree,
            codec,
            config,
        })
    }

    /// Wrap an existing tree without touching the persistence file.
    pub fn from_tree(tree: FsTree, config: Config) -> Self {
        Self {
            tree,
            codec: Codec::new(&config),
            config,
        }
    }

    /// The underlying tree.
    pub fn tree(&self) -> &FsTree {
        &self.tree
    }

    /// The session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rewrite the persistence file from the current tree.
    ///
    /// # Errors
    ///
    /// - [`FsError::Unencodable`] if a path or file contents contain the
    ///   separator; the tree's own checks keep this from happening unless the
    ///   codec's separator differs from the tree's
    /// - [`FsError::Io`] if the file cannot be written
    pub fn save(&self) -> Result<(), FsError> {
        self.codec.save(&self.tree, &self.config.persist_path)
    }

    /// Save and destroy the tree, returning the number of entries destroyed.
    ///
    /// The tree is torn down even when the final save fails; the save error
    /// is returned.
    pub fn unmount(self) -> Result<usize, FsError> {
        let saved = self.save();
        let destroyed = self.tree.teardown();
        saved.map(|()| destroyed)
    }

    /// Rewrite the file after a mutation that has already been applied.
    ///
    /// An error here means the change is live in memory but not on disk.
    fn persist(&self) -> Result<(), FsError> {
        if self.config.autosave {
            self.save()?;
        }
        Ok(())
    }

    fn node_for(&self, handle: Handle) -> Result<NodeId, FsError> {
        self.tree
            .node_by_id(handle.0)
            .ok_or(FsError::InvalidHandle { handle })
    }

    fn create(&mut self, path: &Path, file_type: FileType) -> Result<(), FsError> {
        self.tree.create(path, file_type)?;
        self.persist()
    }
}

// =============================================================================
// FsRead
// =============================================================================

impl FsRead for FsSession {
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let node = self.tree.resolve(path)?;
        self.tree.metadata(node)
    }

    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.tree.resolve(path).is_ok())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let node = self.tree.resolve(path)?;
        Ok(self.tree.read(node)?.to_vec())
    }

    fn read_range(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let node = self.tree.resolve(path)?;
        Ok(self.tree.read_at(node, offset, len)?.to_vec())
    }
}

// =============================================================================
// FsWrite
// =============================================================================

impl FsWrite for FsSession {
    fn create_file(&mut self, path: &Path) -> Result<(), FsError> {
        self.create(path, FileType::File)
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> Result<usize, FsError> {
        let node = self.tree.resolve(path)?;
        let written = self.tree.write(node, data, 0)?;
        self.persist()?;
        Ok(written)
    }

    fn remove_file(&mut self, path: &Path) -> Result<(), FsError> {
        let node = self.tree.resolve(path)?;
        if self.tree.entry(node).is_some_and(|e| e.is_dir()) {
            return Err(FsError::IsADirectory {
                path: path.to_path_buf(),
                operation: "remove_file",
            });
        }
        self.tree.remove(node)?;
        self.persist()
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.tree.rename(from, to)?;
        self.persist()
    }

    fn truncate(&mut self, path: &Path, size: u64) -> Result<(), FsError> {
        let node = self.tree.resolve(path)?;
        self.tree.truncate(node, size)?;
        self.persist()
    }

    fn set_times(
        &mut self,
        path: &Path,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        let node = self.tree.resolve(path)?;
        self.tree.set_times(node, accessed, modified)?;
        self.persist()
    }
}

// =============================================================================
// FsDir
// =============================================================================

impl FsDir for FsSession {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let node = self.tree.resolve(path)?;
        Ok(ReadDirIter::from_vec(self.tree.list(node)?))
    }

    fn create_dir(&mut self, path: &Path) -> Result<(), FsError> {
        self.create(path, FileType::Directory)
    }

    fn remove_dir(&mut self, path: &Path) -> Result<(), FsError> {
        let node = self.tree.resolve(path)?;
        if self.tree.entry(node).is_some_and(|e| e.is_file()) {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        self.tree.remove(node)?;
        self.persist()
    }
}

// =============================================================================
// FsHandles
// =============================================================================

impl FsHandles for FsSession {
    fn open(&mut self, path: &Path) -> Result<Handle, FsError> {
        let node = self.tree.resolve(path)?;
        self.tree.touch(node)?;
        let id = self.tree.metadata(node)?.id;
        Ok(Handle(id))
    }

    fn read_at(&self, handle: Handle, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let node = self.node_for(handle)?;
        Ok(self.tree.read_at(node, offset, len)?.to_vec())
    }

    fn write_at(&mut self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let node = self.node_for(handle)?;
        let written = self.tree.write_at(node, data, offset)?;
        self.persist()?;
        Ok(written)
    }

    fn close(&mut self, handle: Handle) -> Result<(), FsError> {
        self.node_for(handle).map(|_| ())
    }
}
