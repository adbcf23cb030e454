//! # Path Resolution
//!
//! Maps slash-delimited absolute paths onto entries of an [`FsTree`].
//!
//! ## Responsibility
//! - Split paths into tokens ([`tokenize`])
//! - Walk the tree from the root, token by token ([`PathResolver`])
//!
//! ## Dependencies
//! - [`FsTree`] for entry lookup
//! - [`FsError`] for error reporting
//!
//! ## Tokenizing
//!
//! Empty and whitespace-only segments are skipped, so `"//a/ /b/"` names the
//! same entry as `"/a/b"`. A name containing `/` cannot be expressed.
//!
//! ## Usage
//!
//! ```rust
//! use treefs::{FileType, FsTree};
//! use std::path::Path;
//!
//! let mut tree = FsTree::new();
//! tree.create(Path::new("/docs"), FileType::Directory).unwrap();
//! let docs = tree.resolve(Path::new("//docs/")).unwrap();
//! assert_eq!(tree.entry(docs).unwrap().name(), "docs");
//! ```

use std::path::Path;

use crate::{FsError, FsTree, NodeId};

/// Split a path into its non-empty components, in order.
///
/// Returns `None` for paths that are not valid UTF-8; no entry name can
/// match them.
pub fn tokenize(path: &Path) -> Option<impl Iterator<Item = &str>> {
    let s = path.to_str()?;
    Some(s.split('/').filter(|t| !t.trim().is_empty()))
}

/// Split a path into its parent tokens and final component.
///
/// Returns `None` when the path has no final component (the root) or is not
/// valid UTF-8.
pub fn split_parent(path: &Path) -> Option<(Vec<&str>, &str)> {
    let mut tokens: Vec<&str> = tokenize(path)?.collect();
    let last = tokens.pop()?;
    Some((tokens, last))
}

// ============================================================================
// Trait Definition
// ============================================================================

/// Strategy trait for path resolution algorithms.
///
/// Resolution never creates or mutates entries; it returns the exact entry
/// reached by the full token sequence, or fails.
///
/// # Object Safety
///
/// Takes `&FsTree` so the strategy can be stored as `Box<dyn PathResolver>`
/// inside the tree it resolves against.
///
/// # Implementors
///
/// - [`TokenResolver`] (default): linear scan of each directory, exact match
pub trait PathResolver: Send + Sync {
    /// Resolve a path to the entry it names.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] - a component does not exist, or a non-final
    ///   component is a file
    fn resolve(&self, tree: &FsTree, path: &Path) -> Result<NodeId, FsError>;

    /// Resolve every component except the last, returning the containing
    /// directory and the final name.
    ///
    /// The final component itself is not looked up.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] - an intermediate component does not exist
    /// - [`FsError::NotADirectory`] - the parent resolves to a file
    /// - [`FsError::InvalidName`] - the path has no final component
    fn resolve_parent<'p>(&self, tree: &FsTree, path: &'p Path)
    -> Result<(NodeId, &'p str), FsError>;
}

/// Default resolver: walks from the root, matching each token exactly
/// against the current directory's children.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenResolver;

impl TokenResolver {
    fn walk<'t>(
        tree: &FsTree,
        path: &Path,
        tokens: impl IntoIterator<Item = &'t str>,
    ) -> Result<NodeId, FsError> {
        let mut current = tree.root();
        for token in tokens {
            current = tree
                .entry(current)
                .and_then(|e| e.children())
                .and_then(|c| c.get(token))
                .ok_or_else(|| FsError::NotFound {
                    path: path.to_path_buf(),
                })?;
        }
        Ok(current)
    }
}

impl PathResolver for TokenResolver {
    fn resolve(&self, tree: &FsTree, path: &Path) -> Result<NodeId, FsError> {
        let tokens = tokenize(path).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        Self::walk(tree, path, tokens)
    }

    fn resolve_parent<'p>(
        &self,
        tree: &FsTree,
        path: &'p Path,
    ) -> Result<(NodeId, &'p str), FsError> {
        let (parents, last) = split_parent(path).ok_or_else(|| FsError::InvalidName {
            name: path.to_string_lossy().into_owned(),
            reason: "path has no final component",
        })?;
        let parent = Self::walk(tree, path, parents)?;
        match tree.entry(parent) {
            Some(e) if e.is_dir() => Ok((parent, last)),
            _ => Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
