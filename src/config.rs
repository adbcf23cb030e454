//! Session configuration.

use std::path::{Path, PathBuf};

use crate::FsError;

/// Default name of the persistence file, relative to the working directory.
pub const DEFAULT_PERSIST_FILE: &str = "treefs.db";

/// Default field separator of the persistence format (ASCII unit separator).
pub const DEFAULT_SEPARATOR: u8 = 0x1F;

/// Longest entry name accepted by `create` and `rename`.
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

/// Field separator of the persistence format.
///
/// Only bytes that can never occur in the numeric fields, in every path, or
/// in zero-filled file regions are accepted, so any tree that passes the
/// name and contents checks can be saved and loaded back.
///
/// # Example
///
/// ```rust
/// use treefs::{FsError, Separator};
///
/// assert_eq!(Separator::new(b'|')?.get(), b'|');
/// assert!(Separator::new(b'/').is_err());
/// assert!(Separator::new(b'7').is_err());
/// # Ok::<(), FsError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Separator(u8);

impl Separator {
    /// Validate `byte` as a separator.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidSeparator`] for `/`, NUL, ASCII digits and `.`
    pub fn new(byte: u8) -> Result<Self, FsError> {
        let reason = match byte {
            b'/' => "appears in every path",
            0 => "appears in zero-filled contents",
            b'0'..=b'9' | b'.' => "appears in numeric fields",
            _ => return Ok(Self(byte)),
        };
        Err(FsError::InvalidSeparator {
            separator: byte,
            reason,
        })
    }

    /// The raw byte.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self(DEFAULT_SEPARATOR)
    }
}

impl TryFrom<u8> for Separator {
    type Error = FsError;

    fn try_from(byte: u8) -> Result<Self, FsError> {
        Self::new(byte)
    }
}

impl From<Separator> for u8 {
    fn from(separator: Separator) -> u8 {
        separator.0
    }
}

/// Settings for an [`FsSession`](crate::FsSession) and the codec it drives.
///
/// # Example
///
/// ```rust
/// use treefs::{Config, Separator};
///
/// let config = Config::default()
///     .with_persist_path("/tmp/state.db")
///     .with_separator(Separator::new(b'|')?)
///     .with_autosave(false);
/// assert!(!config.autosave);
/// # Ok::<(), treefs::FsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Where the tree is saved and loaded from.
    pub persist_path: PathBuf,
    /// Field separator of the persistence format.
    pub separator: Separator,
    /// Maximum length of a single entry name, in bytes.
    pub max_name_len: usize,
    /// Rewrite the persistence file after every mutation.
    pub autosave: bool,
}

impl Config {
    /// Set the persistence file location.
    pub fn with_persist_path(mut self, path: impl AsRef<Path>) -> Self {
        self.persist_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the field separator.
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Set the maximum entry name length.
    pub fn with_max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Enable or disable rewriting the file after every mutation.
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// A `separator` outside the accepted set is reported as
    /// [`FsError::CorruptFormat`].
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, FsError> {
        serde_json::from_str(json).map_err(|e| FsError::CorruptFormat {
            path: PathBuf::from("<config>"),
            details: e.to_string(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persist_path: PathBuf::from(DEFAULT_PERSIST_FILE),
            separator: Separator::default(),
            max_name_len: DEFAULT_MAX_NAME_LEN,
            autosave: true,
        }
    }
}
