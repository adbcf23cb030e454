//! # treefs
//!
//! An in-memory hierarchical filesystem core with whole-tree persistence,
//! meant to sit behind a userspace-filesystem adapter.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use treefs::{Config, FsDir, FsRead, FsSession, FsTree, FsWrite};
//! use std::path::Path;
//!
//! let config = Config::default().with_autosave(false);
//! let mut fs = FsSession::from_tree(FsTree::new(), config);
//!
//! fs.create_dir(Path::new("/a"))?;
//! fs.create_file(Path::new("/a/b.txt"))?;
//! fs.write(Path::new("/a/b.txt"), b"hello")?;
//! fs.rename(Path::new("/a/b.txt"), Path::new("/a/c.txt"))?;
//!
//! assert_eq!(fs.read(Path::new("/a/c.txt"))?, b"hello");
//! assert_eq!(fs.metadata(Path::new("/a"))?.size, 5);
//! # Ok::<(), treefs::FsError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FsTree`] | The tree itself: entries, id counter, node-level mutations |
//! | [`FsSession`] | A tree bound to its persistence file; implements the traits |
//! | [`Codec`] | Flat delimiter-separated persistence format |
//! | [`PathResolver`] | Strategy for turning paths into nodes |
//! | [`FsError`] | Error type with path and operation context |
//! | [`Metadata`] | Attributes reported for an entry |
//! | [`DirEntry`] | One directory listing entry |
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! Layer 1 (Core):   FsRead + FsWrite + FsDir = Fs
//!                                             ↓
//! Layer 2 (Mount):  Fs + FsHandles = FsFuse
//! ```
//!
//! ---
//!
//! ## Size Invariant
//!
//! A directory's size is always the sum of the sizes of everything below it,
//! so `stat` on a directory reports the bytes stored in that subtree.
//!
//! ---
//!
//! ## Error Handling
//!
//! ```rust
//! use treefs::FsError;
//! use std::path::PathBuf;
//!
//! let err = FsError::NotFound { path: PathBuf::from("/missing.txt") };
//! assert_eq!(err.to_string(), "not found: /missing.txt");
//! ```
//!
//! ---
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]: mutations at `debug`, load and
//! save at `info`, discarded persistence files at `warn`. Install any
//! subscriber to see them.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Metadata`], [`DirEntry`], [`Config`]; JSON helpers |

mod codec;
mod config;
mod entry;
mod error;
mod ext;
mod path_resolver;
mod session;
mod traits;
mod tree;
mod types;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use types::{DirEntry, FileType, Handle, Metadata, Permissions, ROOT_ID};

// Public re-exports - configuration
pub use config::{
    Config, DEFAULT_MAX_NAME_LEN, DEFAULT_PERSIST_FILE, DEFAULT_SEPARATOR, Separator,
};

// Public re-exports - tree storage
pub use entry::{Children, Entry, NodeId, Payload};
pub use tree::FsTree;

// Public re-exports - path resolution
pub use path_resolver::{PathResolver, TokenResolver, split_parent, tokenize};

// Public re-exports - persistence
pub use codec::{Codec, Load};
pub use session::FsSession;

// Public re-exports - traits
pub use traits::{Fs, FsDir, FsFuse, FsHandles, FsRead, FsWrite, ReadDirIter};

// Public re-exports - infrastructure
pub use ext::FsExt;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
