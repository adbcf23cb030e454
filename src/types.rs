//! Core types shared by the tree, the codec and the operation traits.

use std::path::PathBuf;
use std::time::SystemTime;

/// The root directory always has id 0; the id counter starts at 1.
pub const ROOT_ID: u64 = 0;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Attributes of a filesystem entry, as reported to the operation adapter.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Type of the entry.
    pub file_type: FileType,
    /// Byte length for files; aggregate size of the subtree for directories.
    pub size: u64,
    /// Fixed permissions for the entry kind.
    pub permissions: Permissions,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub modified: SystemTime,
    /// Last access time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub accessed: SystemTime,
    /// Entry id, unique for the lifetime of the session.
    pub id: u64,
    /// Number of links (2 for directories, 1 for files).
    pub nlink: u64,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            permissions: Permissions::default_file(),
            modified: SystemTime::UNIX_EPOCH,
            accessed: SystemTime::UNIX_EPOCH,
            id: 0,
            nlink: 1,
        }
    }
}

/// A directory entry returned from `read_dir`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Name of the entry (filename only, not full path).
    pub name: String,
    /// Full path to the entry.
    pub path: PathBuf,
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Entry id.
    pub id: u64,
}

/// Unix-style permissions stored as a mode bitmask.
///
/// Permissions are not enforced; every entry reports the constant for its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Permissions reported for every file (0o777 = rwxrwxrwx).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o777)
    }

    /// Permissions reported for every directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }

    /// The fixed permissions for an entry kind.
    #[inline]
    pub const fn for_type(file_type: FileType) -> Self {
        match file_type {
            FileType::File => Self::default_file(),
            FileType::Directory => Self::default_dir(),
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// Opaque handle returned by `open`.
///
/// Wraps the id of the opened entry so later reads and writes skip path
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle(pub u64);

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}
