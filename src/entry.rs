//! # Entry Model
//!
//! Node storage for the filesystem tree.
//!
//! ## Responsibility
//! - Define [`Entry`] (one file or directory) and its [`Payload`]
//! - Keep each directory's [`Children`] in insertion order with name lookup
//! - Own every entry in an [`Arena`] addressed by [`NodeId`]
//!
//! ## Ownership
//!
//! The arena owns all entries. A directory owns its children logically through
//! its `Children` collection; the `parent` field of an entry is a plain index
//! used for size propagation and removal, never for lifetime management.
//!
//! This module performs no I/O and reports no policy errors. The only failure
//! it surfaces is allocation exhaustion.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::{FileType, FsError};

/// Handle to an entry slot in the [`Arena`].
///
/// Obtained from path resolution and valid until the entry is removed. Slots
/// are recycled, so each id also carries the slot's generation: an id kept
/// past removal no longer matches and looks up nothing, even after the slot
/// holds a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Owned data of an entry: bytes for a file, children for a directory.
#[derive(Debug)]
pub enum Payload {
    /// File contents.
    File(Vec<u8>),
    /// Directory children.
    Directory(Children),
}

/// One file or directory in the tree.
#[derive(Debug)]
pub struct Entry {
    pub(crate) name: String,
    pub(crate) id: u64,
    pub(crate) size: u64,
    pub(crate) parent: Option<NodeId>,
    pub(crate) accessed: SystemTime,
    pub(crate) modified: SystemTime,
    pub(crate) payload: Payload,
}

impl Entry {
    /// A fresh, empty entry with both timestamps set to `now`.
    pub(crate) fn new(
        name: String,
        file_type: FileType,
        id: u64,
        parent: Option<NodeId>,
        now: SystemTime,
    ) -> Self {
        let payload = match file_type {
            FileType::File => Payload::File(Vec::new()),
            FileType::Directory => Payload::Directory(Children::default()),
        };
        Self {
            name,
            id,
            size: 0,
            parent,
            accessed: now,
            modified: now,
            payload,
        }
    }

    /// Name of the entry within its parent (`/` for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Byte length for files; aggregate subtree size for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Parent directory, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Last access time.
    pub fn accessed(&self) -> SystemTime {
        self.accessed
    }

    /// Last modification time.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Whether this entry is a file or a directory.
    pub fn file_type(&self) -> FileType {
        match self.payload {
            Payload::File(_) => FileType::File,
            Payload::Directory(_) => FileType::Directory,
        }
    }

    /// Returns `true` if this entry is a file.
    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self.payload, Payload::File(_))
    }

    /// Returns `true` if this entry is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self.payload, Payload::Directory(_))
    }

    /// File contents, `None` for directories.
    pub fn contents(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::File(bytes) => Some(bytes),
            Payload::Directory(_) => None,
        }
    }

    /// Child collection, `None` for files.
    pub fn children(&self) -> Option<&Children> {
        match &self.payload {
            Payload::Directory(children) => Some(children),
            Payload::File(_) => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match &mut self.payload {
            Payload::Directory(children) => Some(children),
            Payload::File(_) => None,
        }
    }
}

/// Ordered child collection of a directory.
///
/// Iteration follows insertion order; lookup by name is constant time.
/// Names are unique within one collection.
#[derive(Debug, Default)]
pub struct Children {
    order: Vec<NodeId>,
    by_name: HashMap<String, NodeId>,
}

impl Children {
    /// Number of children.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the directory has no children.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up a child by exact name.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Children in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Make room for `additional` more children without reallocating.
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), FsError> {
        self.order.try_reserve(additional)?;
        self.by_name.try_reserve(additional)?;
        Ok(())
    }

    /// Append a child at the tail.
    ///
    /// The caller guarantees `name` is not already present.
    pub(crate) fn append_child(&mut self, name: &str, node: NodeId) -> Result<(), FsError> {
        debug_assert!(!self.by_name.contains_key(name), "duplicate sibling {name}");
        self.reserve(1)?;
        self.order.push(node);
        self.by_name.insert(name.to_owned(), node);
        Ok(())
    }

    /// Remove a child from any position, keeping the order of the rest.
    pub(crate) fn detach_child(&mut self, name: &str) -> Option<NodeId> {
        let node = self.by_name.remove(name)?;
        if let Some(pos) = self.order.iter().position(|&n| n == node) {
            self.order.remove(pos);
        }
        Some(node)
    }

    pub(crate) fn take_all(&mut self) -> Vec<NodeId> {
        self.by_name.clear();
        std::mem::take(&mut self.order)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Slot storage owning every entry of a tree.
///
/// Freed slots are recycled under a new generation; entry ids are not tied
/// to slots.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl Arena {
    /// An arena holding only the root, which lives in slot 0 for good.
    pub(crate) fn with_root(root: Entry) -> (Self, NodeId) {
        let arena = Self {
            slots: vec![Slot {
                generation: 0,
                entry: Some(root),
            }],
            free: Vec::new(),
            live: 1,
        };
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        (arena, root)
    }

    pub(crate) fn insert(&mut self, entry: Entry) -> Result<NodeId, FsError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.try_reserve(1)?;
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.entry = Some(entry);
        self.live += 1;
        Ok(NodeId {
            index,
            generation: slot.generation,
        })
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots
            .get(node.index)
            .filter(|s| s.generation == node.generation)
    }

    pub(crate) fn get(&self, node: NodeId) -> Option<&Entry> {
        self.slot(node)?.entry.as_ref()
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(node.index)
            .filter(|s| s.generation == node.generation)?
            .entry
            .as_mut()
    }

    /// Remove an entry, returning it. The slot becomes reusable under the
    /// next generation.
    pub(crate) fn take(&mut self, node: NodeId) -> Option<Entry> {
        let slot = self
            .slots
            .get_mut(node.index)
            .filter(|s| s.generation == node.generation)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        self.live -= 1;
        Some(entry)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}
