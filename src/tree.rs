//! # Mutation Engine
//!
//! [`FsTree`] is the filesystem session: it owns the root, the id counter and
//! every entry, and implements the operations that change the tree.
//!
//! ## Size invariant
//!
//! A directory's `size` is the sum of the sizes of everything below it. Every
//! operation that changes a file's length or moves a subtree restores this by
//! calling [`FsTree::propagate_size`] on the affected parent chain.
//!
//! ## Failure atomicity
//!
//! Each operation validates existence, kinds, names and contents before
//! touching the tree, so a failed call leaves it unchanged.
//!
//! ## Encodability
//!
//! Names and file contents never contain the configured field separator, so
//! every reachable tree can be saved.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::entry::{Arena, Children, Entry, Payload};
use crate::path_resolver::{PathResolver, TokenResolver, tokenize};
use crate::{Config, DirEntry, FileType, FsError, Metadata, NodeId, Permissions, ROOT_ID};

/// Signed difference `new - old` between two sizes.
fn size_delta(old: u64, new: u64) -> i64 {
    (new as i64).wrapping_sub(old as i64)
}

fn exhausted(operation: &'static str) -> FsError {
    FsError::ResourceExhausted { operation }
}

/// In-memory filesystem tree.
///
/// Single-threaded: mutations take `&mut self` and run to completion.
///
/// # Example
///
/// ```rust
/// use treefs::{FileType, FsTree};
/// use std::path::Path;
///
/// let mut tree = FsTree::new();
/// tree.create(Path::new("/a"), FileType::Directory)?;
/// let file = tree.create(Path::new("/a/b.txt"), FileType::File)?;
/// tree.write(file, b"hello", 0)?;
///
/// let dir = tree.resolve(Path::new("/a"))?;
/// assert_eq!(tree.entry(dir).unwrap().size(), 5);
/// # Ok::<(), treefs::FsError>(())
/// ```
pub struct FsTree {
    arena: Arena,
    root: NodeId,
    next_id: u64,
    ids: HashMap<u64, NodeId>,
    resolver: Box<dyn PathResolver>,
    max_name_len: usize,
    separator: u8,
}

impl FsTree {
    /// A tree holding only an empty root, with default settings.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// A tree holding only an empty root.
    ///
    /// Names are limited by `config.max_name_len` and may not contain
    /// `config.separator`.
    pub fn with_config(config: &Config) -> Self {
        let root = Entry::new(
            "/".to_owned(),
            FileType::Directory,
            ROOT_ID,
            None,
            SystemTime::now(),
        );
        let (arena, root) = Arena::with_root(root);
        let mut ids = HashMap::new();
        ids.insert(ROOT_ID, root);
        Self {
            arena,
            root,
            next_id: ROOT_ID + 1,
            ids,
            resolver: Box::new(TokenResolver),
            max_name_len: config.max_name_len,
            separator: config.separator.get(),
        }
    }

    /// Replace the path resolution strategy.
    pub fn with_resolver(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// The root directory.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up an entry by node.
    #[inline]
    pub fn entry(&self, node: NodeId) -> Option<&Entry> {
        self.arena.get(node)
    }

    /// Look up a live entry by its id.
    pub fn node_by_id(&self, id: u64) -> Option<NodeId> {
        self.ids.get(&id).copied()
    }

    /// Number of entries, root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the root has no children.
    pub fn is_empty(&self) -> bool {
        self.arena.len() == 1
    }

    /// The id the next created entry will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Absolute path of an entry, rebuilt from the parent chain.
    pub fn path_of(&self, node: NodeId) -> Option<PathBuf> {
        let mut names = Vec::new();
        let mut current = self.arena.get(node)?;
        while let Some(parent) = current.parent {
            names.push(current.name.as_str());
            current = self.arena.get(parent)?;
        }
        let mut path = PathBuf::from("/");
        path.extend(names.iter().rev());
        Some(path)
    }

    /// Resolve a path to the entry it names.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if any component does not resolve
    pub fn resolve(&self, path: &Path) -> Result<NodeId, FsError> {
        self.resolver.resolve(self, path)
    }

    fn get(&self, node: NodeId) -> Result<&Entry, FsError> {
        self.arena.get(node).ok_or_else(|| FsError::NotFound {
            path: PathBuf::new(),
        })
    }

    fn display_path(&self, node: NodeId) -> PathBuf {
        self.path_of(node).unwrap_or_default()
    }

    fn expect_file(&self, node: NodeId, operation: &'static str) -> Result<&Entry, FsError> {
        let entry = self.get(node)?;
        if entry.is_dir() {
            return Err(FsError::IsADirectory {
                path: self.display_path(node),
                operation,
            });
        }
        Ok(entry)
    }

    fn children_mut_of(&mut self, node: NodeId) -> Result<&mut Children, FsError> {
        let path = self.display_path(node);
        self.arena
            .get_mut(node)
            .and_then(Entry::children_mut)
            .ok_or(FsError::NotADirectory { path })
    }

    fn validate_name(&self, name: &str) -> Result<(), FsError> {
        let reason = if name.len() > self.max_name_len {
            "name too long"
        } else if name.as_bytes().contains(&self.separator) {
            "contains the field separator"
        } else {
            return Ok(());
        };
        Err(FsError::InvalidName {
            name: name.to_owned(),
            reason,
        })
    }

    fn check_contents(&self, node: NodeId, data: &[u8]) -> Result<(), FsError> {
        if data.contains(&self.separator) {
            return Err(FsError::Unencodable {
                path: self.display_path(node),
            });
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> Result<u64, FsError> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or_else(|| exhausted("allocate_id"))?;
        Ok(id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create an empty file or directory at `path`.
    ///
    /// Every component but the last must resolve; the last must not exist.
    /// The new entry gets size 0, current timestamps and a fresh id, and is
    /// appended to its parent's children.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if the final component (or the root) exists
    /// - [`FsError::NotFound`] if an intermediate component is missing
    /// - [`FsError::NotADirectory`] if the parent is a file
    /// - [`FsError::InvalidName`] if the name is too long or contains the separator
    /// - [`FsError::ResourceExhausted`] if memory or ids run out
    pub fn create(&mut self, path: &Path, file_type: FileType) -> Result<NodeId, FsError> {
        let mut tokens = tokenize(path).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        if tokens.next().is_none() {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation: "create",
            });
        }

        let (parent, name) = self.resolver.resolve_parent(self, path)?;
        self.validate_name(name)?;
        let siblings = self.children_mut_of(parent)?;
        if siblings.get(name).is_some() {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation: "create",
            });
        }
        siblings.reserve(1)?;
        self.ids.try_reserve(1)?;

        let id = self.allocate_id()?;
        let entry = Entry::new(name.to_owned(), file_type, id, Some(parent), SystemTime::now());
        let node = self.arena.insert(entry)?;
        self.children_mut_of(parent)?.append_child(name, node)?;
        self.ids.insert(id, node);

        debug!(path = %path.display(), id, ?file_type, "created entry");
        Ok(node)
    }

    /// Remove a file or an empty directory.
    ///
    /// Detaches the entry from its parent, subtracts its size from every
    /// ancestor and frees it.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `node` is not a live entry
    /// - [`FsError::DirectoryNotEmpty`] if `node` is a directory with children
    /// - [`FsError::RootEntry`] if `node` is the root
    pub fn remove(&mut self, node: NodeId) -> Result<(), FsError> {
        let entry = self.get(node)?;
        let Some(parent) = entry.parent else {
            return Err(FsError::RootEntry {
                operation: "remove",
            });
        };
        if entry.children().is_some_and(|c| !c.is_empty()) {
            return Err(FsError::DirectoryNotEmpty {
                path: self.display_path(node),
            });
        }
        let size = entry.size;
        let name = entry.name.clone();

        self.children_mut_of(parent)?.detach_child(&name);
        self.propagate_size(parent, size_delta(size, 0));
        if let Some(entry) = self.arena.take(node) {
            self.ids.remove(&entry.id);
            debug!(name = %entry.name, id = entry.id, size, "removed entry");
        }
        Ok(())
    }

    /// Add `delta` to the size of `start` and every ancestor up to the root.
    ///
    /// `start` is the parent of the entry whose size changed.
    pub fn propagate_size(&mut self, start: NodeId, delta: i64) {
        if delta == 0 {
            return;
        }
        let mut current = Some(start);
        while let Some(node) = current {
            let Some(entry) = self.arena.get_mut(node) else {
                break;
            };
            entry.size = entry.size.saturating_add_signed(delta);
            current = entry.parent;
        }
    }

    /// Replace a file's entire contents with `data`.
    ///
    /// `offset` is accepted for interface compatibility and ignored: the
    /// result is always `contents := data`. Use [`write_at`](Self::write_at)
    /// for positional writes.
    ///
    /// # Errors
    ///
    /// - [`FsError::IsADirectory`] if `node` is a directory
    /// - [`FsError::Unencodable`] if `data` contains the field separator
    /// - [`FsError::ResourceExhausted`] if the buffer cannot be allocated
    pub fn write(&mut self, node: NodeId, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let old = self.expect_file(node, "write")?.size;
        self.check_contents(node, data)?;
        let mut contents = Vec::new();
        contents.try_reserve_exact(data.len())?;
        contents.extend_from_slice(data);

        let new = data.len() as u64;
        let parent = self.commit_contents(node, contents)?;
        if let Some(parent) = parent {
            self.propagate_size(parent, size_delta(old, new));
        }
        debug!(id = self.get(node)?.id, offset, old, new, "replaced file contents");
        Ok(data.len())
    }

    /// Write `data` at `offset`, extending the file with zero bytes if the
    /// offset lies past the end. An empty `data` leaves the file untouched.
    ///
    /// # Errors
    ///
    /// - [`FsError::IsADirectory`] if `node` is a directory
    /// - [`FsError::Unencodable`] if `data` contains the field separator
    /// - [`FsError::ResourceExhausted`] if the buffer cannot grow
    pub fn write_at(&mut self, node: NodeId, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let old = self.expect_file(node, "write")?.size;
        if data.is_empty() {
            return Ok(0);
        }
        self.check_contents(node, data)?;
        let start = usize::try_from(offset).map_err(|_| exhausted("write"))?;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| exhausted("write"))?;

        let entry = self.arena.get_mut(node).ok_or_else(|| FsError::NotFound {
            path: PathBuf::new(),
        })?;
        if let Payload::File(buf) = &mut entry.payload {
            if end > buf.len() {
                buf.try_reserve(end - buf.len())?;
                buf.resize(end, 0);
            }
            buf[start..end].copy_from_slice(data);
            entry.size = buf.len() as u64;
        }
        entry.modified = SystemTime::now();
        let (new, parent) = (entry.size, entry.parent);

        if let Some(parent) = parent {
            self.propagate_size(parent, size_delta(old, new));
        }
        debug!(offset, written = data.len(), old, new, "wrote file range");
        Ok(data.len())
    }

    /// Resize a file, zero-filling when growing and cutting when shrinking.
    ///
    /// The fill byte is never a valid separator, so the result stays
    /// encodable.
    ///
    /// # Errors
    ///
    /// - [`FsError::IsADirectory`] if `node` is a directory
    /// - [`FsError::ResourceExhausted`] if the buffer cannot grow
    pub fn truncate(&mut self, node: NodeId, new_size: u64) -> Result<(), FsError> {
        let old = self.expect_file(node, "truncate")?.size;
        let new_len = usize::try_from(new_size).map_err(|_| exhausted("truncate"))?;

        let entry = self.arena.get_mut(node).ok_or_else(|| FsError::NotFound {
            path: PathBuf::new(),
        })?;
        if let Payload::File(buf) = &mut entry.payload {
            if new_len > buf.len() {
                buf.try_reserve(new_len - buf.len())?;
                buf.resize(new_len, 0);
            } else {
                buf.truncate(new_len);
            }
        }
        entry.size = new_size;
        entry.modified = SystemTime::now();
        let parent = entry.parent;

        if let Some(parent) = parent {
            self.propagate_size(parent, size_delta(old, new_size));
        }
        debug!(old, new = new_size, "truncated file");
        Ok(())
    }

    /// Move the entry at `from` to `to`.
    ///
    /// The entry keeps its id, size, timestamps and payload; directories keep
    /// their whole subtree. Both the old and the new ancestor chains have
    /// their sizes adjusted.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `to` already resolves
    /// - [`FsError::NotFound`] if `from` does not resolve, or the parent of
    ///   `to` is missing
    /// - [`FsError::NotADirectory`] if the parent of `to` is a file
    /// - [`FsError::RootEntry`] if `from` is the root
    /// - [`FsError::InvalidRename`] if a directory would move into itself
    /// - [`FsError::InvalidName`] if the new name is not storable
    pub fn rename(&mut self, from: &Path, to: &Path) -> Result<NodeId, FsError> {
        if self.resolve(to).is_ok() {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
                operation: "rename",
            });
        }
        let node = self.resolve(from)?;
        let entry = self.get(node)?;
        let Some(old_parent) = entry.parent else {
            return Err(FsError::RootEntry {
                operation: "rename",
            });
        };
        let (size, old_name) = (entry.size, entry.name.clone());

        let (new_parent, new_name) = self.resolver.resolve_parent(self, to)?;
        self.validate_name(new_name)?;
        let mut ancestor = Some(new_parent);
        while let Some(a) = ancestor {
            if a == node {
                return Err(FsError::InvalidRename {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    reason: "destination is inside the source directory",
                });
            }
            ancestor = self.arena.get(a).and_then(Entry::parent);
        }
        self.children_mut_of(new_parent)?.reserve(1)?;

        self.children_mut_of(old_parent)?.detach_child(&old_name);
        self.propagate_size(old_parent, size_delta(size, 0));
        if let Some(entry) = self.arena.get_mut(node) {
            entry.name = new_name.to_owned();
            entry.parent = Some(new_parent);
        }
        self.children_mut_of(new_parent)?.append_child(new_name, node)?;
        self.propagate_size(new_parent, size_delta(0, size));

        debug!(from = %from.display(), to = %to.display(), size, "renamed entry");
        Ok(node)
    }

    /// Overwrite both timestamps of an entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `node` is not a live entry
    pub fn set_times(
        &mut self,
        node: NodeId,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        let entry = self.arena.get_mut(node).ok_or_else(|| FsError::NotFound {
            path: PathBuf::new(),
        })?;
        entry.accessed = accessed;
        entry.modified = modified;
        Ok(())
    }

    /// Refresh an entry's access time.
    pub fn touch(&mut self, node: NodeId) -> Result<(), FsError> {
        let entry = self.arena.get_mut(node).ok_or_else(|| FsError::NotFound {
            path: PathBuf::new(),
        })?;
        entry.accessed = SystemTime::now();
        Ok(())
    }

    /// Destroy the whole tree, children before parents.
    ///
    /// Unlike [`remove`](Self::remove) this ignores the empty-directory rule.
    /// Returns the number of entries destroyed, root included.
    pub fn teardown(mut self) -> usize {
        let mut destroyed = 0;
        let mut stack = vec![(self.root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                if self.arena.take(node).is_some() {
                    destroyed += 1;
                }
                continue;
            }
            stack.push((node, true));
            if let Some(children) = self.arena.get_mut(node).and_then(Entry::children_mut) {
                stack.extend(children.take_all().into_iter().rev().map(|c| (c, false)));
            }
        }
        self.ids.clear();
        debug!(destroyed, "tree torn down");
        destroyed
    }

    fn commit_contents(
        &mut self,
        node: NodeId,
        contents: Vec<u8>,
    ) -> Result<Option<NodeId>, FsError> {
        let entry = self.arena.get_mut(node).ok_or_else(|| FsError::NotFound {
            path: PathBuf::new(),
        })?;
        entry.size = contents.len() as u64;
        entry.modified = SystemTime::now();
        if let Payload::File(buf) = &mut entry.payload {
            *buf = contents;
        }
        Ok(entry.parent)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// File contents.
    ///
    /// # Errors
    ///
    /// - [`FsError::IsADirectory`] if `node` is a directory
    pub fn read(&self, node: NodeId) -> Result<&[u8], FsError> {
        let entry = self.expect_file(node, "read")?;
        Ok(entry.contents().unwrap_or_default())
    }

    /// Up to `len` bytes of a file starting at `offset`.
    ///
    /// Returns an empty slice when `offset` is at or past the end.
    pub fn read_at(&self, node: NodeId, offset: u64, len: usize) -> Result<&[u8], FsError> {
        let data = self.read(node)?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(&data[start..end])
    }

    /// Attributes of an entry.
    pub fn metadata(&self, node: NodeId) -> Result<Metadata, FsError> {
        let entry = self.get(node)?;
        let file_type = entry.file_type();
        Ok(Metadata {
            file_type,
            size: entry.size,
            permissions: Permissions::for_type(file_type),
            modified: entry.modified,
            accessed: entry.accessed,
            id: entry.id,
            nlink: if entry.is_dir() { 2 } else { 1 },
        })
    }

    /// Children of a directory, in insertion order.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if `node` is a file
    pub fn list(&self, node: NodeId) -> Result<Vec<DirEntry>, FsError> {
        let dir_path = self.display_path(node);
        let children = self
            .get(node)?
            .children()
            .ok_or_else(|| FsError::NotADirectory {
                path: dir_path.clone(),
            })?;
        Ok(children
            .iter()
            .filter_map(|child| self.arena.get(child))
            .map(|e| DirEntry {
                name: e.name.clone(),
                path: dir_path.join(&e.name),
                file_type: e.file_type(),
                size: e.size,
                id: e.id,
            })
            .collect())
    }

    /// First directory whose size differs from the sum of its children.
    ///
    /// `None` means the size invariant holds for the whole tree.
    pub fn find_size_mismatch(&self) -> Option<PathBuf> {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let entry = self.arena.get(node)?;
            if let Some(children) = entry.children() {
                let sum: u64 = children
                    .iter()
                    .filter_map(|c| self.arena.get(c))
                    .map(|c| c.size)
                    .sum();
                if sum != entry.size {
                    return self.path_of(node);
                }
                stack.extend(children.iter());
            }
        }
        None
    }

    // ========================================================================
    // Persistence support
    // ========================================================================

    /// Overwrite the attributes of a freshly created entry with decoded values.
    ///
    /// Sizes are taken as given; ancestors are not adjusted.
    pub(crate) fn restore(
        &mut self,
        node: NodeId,
        id: u64,
        size: u64,
        modified: SystemTime,
        accessed: SystemTime,
        contents: Vec<u8>,
    ) -> Result<(), String> {
        let current = self.arena.get(node).map(|e| e.id).ok_or("entry vanished")?;
        if id != current && self.ids.contains_key(&id) {
            return Err(format!("duplicate id {id}"));
        }
        let next = id.checked_add(1).ok_or("id out of range")?;

        let entry = self.arena.get_mut(node).ok_or("entry vanished")?;
        match &mut entry.payload {
            Payload::File(buf) => {
                if contents.len() as u64 != size {
                    return Err(format!(
                        "size {size} does not match {} content bytes",
                        contents.len()
                    ));
                }
                *buf = contents;
            }
            Payload::Directory(_) => {
                if !contents.is_empty() {
                    return Err("directory record carries contents".to_owned());
                }
            }
        }
        entry.id = id;
        entry.size = size;
        entry.modified = modified;
        entry.accessed = accessed;

        self.ids.remove(&current);
        self.ids.insert(id, node);
        self.next_id = self.next_id.max(next);
        Ok(())
    }

    /// Continue id allocation after the largest live id.
    pub(crate) fn resume_ids(&mut self) {
        self.next_id = self
            .ids
            .keys()
            .max()
            .map_or(ROOT_ID + 1, |max| max.saturating_add(1));
    }

    /// Set the root's size to the sum of its direct children.
    pub(crate) fn reseat_root_size(&mut self) {
        let sum: u64 = self
            .arena
            .get(self.root)
            .and_then(Entry::children)
            .map(|c| c.iter().filter_map(|n| self.arena.get(n)).map(Entry::size).sum())
            .unwrap_or(0);
        if let Some(root) = self.arena.get_mut(self.root) {
            root.size = sum;
        }
    }
}

impl Default for FsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FsTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsTree")
            .field("entries", &self.arena.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
