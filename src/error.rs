//! Error types for the treefs filesystem core.

use std::path::PathBuf;

/// Filesystem error type with contextual variants.
///
/// The entry model and path resolver only report structural facts (found or
/// not found); the mutation engine and the persistence codec turn those facts
/// into the variants below. Every variant carries the path or operation that
/// caused it where one exists.
///
/// # Examples
///
/// ```rust
/// use treefs::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert!(err.to_string().contains("/missing"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/Entry Errors
    /// Path does not resolve to an entry.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Create or rename target already exists.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Directory removal was requested but the directory still has children.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    /// A file operation was attempted on a directory.
    #[error("{operation}: is a directory: {path}")]
    IsADirectory {
        /// The directory path.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// A directory was required but a file was found.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is a file.
        path: PathBuf,
    },

    /// Entry name cannot be stored in the tree or the persistence file.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Operation would remove or move the root directory.
    #[error("{operation}: not permitted on the root directory")]
    RootEntry {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Rename would move a directory into its own subtree.
    #[error("cannot rename {from} to {to}: {reason}")]
    InvalidRename {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Why the move is impossible.
        reason: &'static str,
    },

    /// Open handle no longer refers to a live entry.
    #[error("invalid handle: {}", handle.0)]
    InvalidHandle {
        /// The stale handle.
        handle: crate::Handle,
    },

    // Resource Errors
    /// Memory or id space could not be obtained.
    #[error("{operation}: resource exhausted")]
    ResourceExhausted {
        /// The operation that failed.
        operation: &'static str,
    },

    // Persistence Errors
    /// Persistence stream does not parse into well-formed records.
    #[error("corrupt persistence file {path} ({details})")]
    CorruptFormat {
        /// The persistence file.
        path: PathBuf,
        /// What was wrong with it.
        details: String,
    },

    /// An entry's path or contents contain the field separator.
    #[error("cannot encode {path}: path or contents contain the field separator")]
    Unencodable {
        /// The entry that cannot be stored.
        path: PathBuf,
    },

    /// Byte cannot serve as the persistence field separator.
    #[error("invalid field separator {separator:#04x}: {reason}")]
    InvalidSeparator {
        /// The rejected byte.
        separator: u8,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Attach a path and operation to a raw I/O error.
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        FsError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: PathBuf::new(),
                operation: "io",
            },
            std::io::ErrorKind::OutOfMemory => FsError::ResourceExhausted { operation: "io" },
            _ => FsError::Io {
                operation: "io",
                path: PathBuf::new(),
                source: error,
            },
        }
    }
}

impl From<std::collections::TryReserveError> for FsError {
    fn from(_: std::collections::TryReserveError) -> Self {
        FsError::ResourceExhausted { operation: "reserve" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_not_found_display() {
        let err = FsError::NotFound {
            path: PathBuf::from("/missing"),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn fs_error_already_exists_display() {
        let err = FsError::AlreadyExists {
            path: PathBuf::from("/exists"),
            operation: "create",
        };
        assert_eq!(err.to_string(), "create: already exists: /exists");
    }

    #[test]
    fn fs_error_is_a_directory_display() {
        let err = FsError::IsADirectory {
            path: PathBuf::from("/dir"),
            operation: "truncate",
        };
        assert_eq!(err.to_string(), "truncate: is a directory: /dir");
    }

    #[test]
    fn fs_error_invalid_name_display() {
        let err = FsError::InvalidName {
            name: "a\u{1f}b".into(),
            reason: "contains the field separator",
        };
        assert!(err.to_string().contains("field separator"));
    }

    #[test]
    fn fs_error_unencodable_display() {
        let err = FsError::Unencodable {
            path: PathBuf::from("/bin"),
        };
        assert_eq!(
            err.to_string(),
            "cannot encode /bin: path or contents contain the field separator"
        );
    }

    #[test]
    fn fs_error_invalid_separator_display() {
        let err = FsError::InvalidSeparator {
            separator: b'/',
            reason: "appears in every path",
        };
        assert_eq!(
            err.to_string(),
            "invalid field separator 0x2f: appears in every path"
        );
    }

    #[test]
    fn fs_error_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::NotFound { .. }));
    }

    #[test]
    fn fs_error_from_io_already_exists() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn fs_error_from_io_other() {
        let io_err = std::io::Error::other("test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::Io { .. }));
    }

    #[test]
    fn fs_error_from_try_reserve() {
        let mut v: Vec<u8> = Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        assert!(matches!(
            FsError::from(err),
            FsError::ResourceExhausted { .. }
        ));
    }
}
