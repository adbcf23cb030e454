//! # Persistence Codec
//!
//! Serializes a whole [`FsTree`] into one flat, delimiter-separated file and
//! rebuilds it on load.
//!
//! ## Format
//!
//! ```text
//! SEP path SEP is_file SEP id SEP size SEP mtime SEP atime SEP contents SEP ...
//! ```
//!
//! The file opens with the separator, and every field is followed by it, so
//! the stream ends with an empty trailing field. Each entry is one record of
//! seven fields; directories carry an empty `contents` field. Records appear
//! in pre-order (children in insertion order) so a parent always precedes its
//! children. The root is implicit. Timestamps are `secs.nanos` since the Unix
//! epoch.
//!
//! Nothing is escaped. Names containing the separator are refused when they
//! are created, and [`Codec::encode`] refuses contents containing it.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::{Config, FileType, FsError, FsTree, NodeId};

/// Number of fields in one record.
const FIELDS_PER_RECORD: usize = 7;

/// Outcome of [`Codec::load`].
#[derive(Debug)]
pub enum Load {
    /// A tree was read from the file.
    Restored(FsTree),
    /// No persistence file exists; start from an empty root.
    NotPresent,
}

/// Encoder/decoder for the flat persistence format.
#[derive(Debug, Clone)]
pub struct Codec {
    config: Config,
}

impl Codec {
    /// A codec using `config.separator`; decoded trees inherit `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// The field separator byte.
    pub fn separator(&self) -> u8 {
        self.config.separator.get()
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Serialize every entry below the root.
    ///
    /// # Errors
    ///
    /// - [`FsError::Unencodable`] if a path or file contents contain the separator
    pub fn encode(&self, tree: &FsTree) -> Result<Vec<u8>, FsError> {
        let sep = self.separator();
        let mut out = vec![sep];
        let mut stack: Vec<(NodeId, String)> = Vec::new();
        push_children(tree, tree.root(), "", &mut stack);

        while let Some((node, path)) = stack.pop() {
            let Some(entry) = tree.entry(node) else {
                continue;
            };
            let contents = entry.contents().unwrap_or_default();
            if path.as_bytes().contains(&sep) || contents.contains(&sep) {
                return Err(FsError::Unencodable {
                    path: PathBuf::from(&path),
                });
            }

            let mut field = |bytes: &[u8]| {
                out.extend_from_slice(bytes);
                out.push(sep);
            };
            field(path.as_bytes());
            field(if entry.is_file() { b"1" } else { b"0" });
            field(entry.id().to_string().as_bytes());
            field(entry.size().to_string().as_bytes());
            field(format_time(entry.modified()).as_bytes());
            field(format_time(entry.accessed()).as_bytes());
            field(contents);

            push_children(tree, node, &path, &mut stack);
        }
        Ok(out)
    }

    /// Encode `tree` and write it to `path`, replacing the file.
    ///
    /// Encoding happens first, so an unencodable tree leaves the old file in
    /// place. The tree itself is never modified.
    ///
    /// # Errors
    ///
    /// - [`FsError::Unencodable`] if the tree cannot be represented
    /// - [`FsError::Io`] if the file cannot be created or written
    pub fn save(&self, tree: &FsTree, path: &Path) -> Result<(), FsError> {
        let bytes = self.encode(tree)?;
        let mut file = File::create(path).map_err(|e| FsError::io("save", path, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| FsError::io("save", path, e))?;
        info!(path = %path.display(), entries = tree.len() - 1, bytes = bytes.len(), "saved tree");
        Ok(())
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Read the tree stored at `path`.
    ///
    /// A missing file is not an error: it yields [`Load::NotPresent`].
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the file exists but cannot be read
    /// - [`FsError::CorruptFormat`] if the contents do not parse
    pub fn load(&self, path: &Path) -> Result<Load, FsError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persistence file");
                return Ok(Load::NotPresent);
            }
            Err(e) => return Err(FsError::io("load", path, e)),
        };
        let tree = self.decode(BufReader::new(file), path)?;
        info!(path = %path.display(), entries = tree.len() - 1, "loaded tree");
        Ok(Load::Restored(tree))
    }

    /// Rebuild a tree from a byte stream.
    ///
    /// Records are replayed through [`FsTree::create`], then the decoded id,
    /// size, timestamps and contents overwrite the fresh entry without size
    /// propagation. `origin` only labels errors.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if reading fails
    /// - [`FsError::CorruptFormat`] on a missing leading separator, trailing
    ///   bytes, malformed fields, a missing parent, a duplicate path or id, or
    ///   a directory whose size disagrees with its children
    pub fn decode(&self, mut reader: impl BufRead, origin: &Path) -> Result<FsTree, FsError> {
        let sep = self.separator();
        let corrupt = |details: String| FsError::CorruptFormat {
            path: origin.to_path_buf(),
            details,
        };

        let mut tree = FsTree::with_config(&self.config);
        let mut fields: Vec<Vec<u8>> = Vec::with_capacity(FIELDS_PER_RECORD);
        let mut buf = Vec::new();
        let mut leading = true;
        let mut records = 0usize;

        loop {
            buf.clear();
            let n = reader
                .read_until(sep, &mut buf)
                .map_err(|e| FsError::io("load", origin, e))?;
            if buf.last() != Some(&sep) {
                // Trailing field: must be empty and close a whole record.
                if !buf.is_empty() {
                    return Err(corrupt(format!("{} unterminated bytes at end", buf.len())));
                }
                if leading {
                    return Err(corrupt("missing leading separator".to_owned()));
                }
                if !fields.is_empty() {
                    return Err(corrupt(format!(
                        "truncated record after {records} records"
                    )));
                }
                break;
            }
            buf.pop();
            if leading {
                if n != 1 {
                    return Err(corrupt("missing leading separator".to_owned()));
                }
                leading = false;
                continue;
            }

            fields.push(std::mem::take(&mut buf));
            if fields.len() == FIELDS_PER_RECORD {
                let record = std::mem::replace(&mut fields, Vec::with_capacity(FIELDS_PER_RECORD));
                replay(&mut tree, record).map_err(|e| corrupt(format!("record {records}: {e}")))?;
                records += 1;
            }
        }

        tree.reseat_root_size();
        tree.resume_ids();
        if let Some(dir) = tree.find_size_mismatch() {
            return Err(corrupt(format!(
                "size of {} disagrees with its children",
                dir.display()
            )));
        }
        Ok(tree)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Queue the children of `dir` so they pop off `stack` in insertion order.
fn push_children(tree: &FsTree, dir: NodeId, dir_path: &str, stack: &mut Vec<(NodeId, String)>) {
    let Some(children) = tree.entry(dir).and_then(|e| e.children()) else {
        return;
    };
    let start = stack.len();
    for child in children.iter() {
        if let Some(entry) = tree.entry(child) {
            stack.push((child, format!("{dir_path}/{}", entry.name())));
        }
    }
    stack[start..].reverse();
}

fn replay(tree: &mut FsTree, record: Vec<Vec<u8>>) -> Result<(), String> {
    let mut it = record.into_iter();
    let mut next = || it.next().ok_or_else(|| "missing field".to_owned());

    let path = String::from_utf8(next()?).map_err(|_| "path is not UTF-8".to_owned())?;
    let file_type = match next()?.as_slice() {
        b"1" => FileType::File,
        b"0" => FileType::Directory,
        other => return Err(format!("bad is_file flag {:?}", String::from_utf8_lossy(other))),
    };
    let id = parse_u64(&next()?, "id")?;
    let size = parse_u64(&next()?, "size")?;
    let modified = parse_time(&next()?)?;
    let accessed = parse_time(&next()?)?;
    let contents = next()?;

    let node = tree
        .create(Path::new(&path), file_type)
        .map_err(|e| e.to_string())?;
    tree.restore(node, id, size, modified, accessed, contents)
}

fn parse_u64(field: &[u8], what: &str) -> Result<u64, String> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("bad {what} {:?}", String::from_utf8_lossy(field)))
}

fn format_time(time: SystemTime) -> String {
    let d = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    format!("{}.{:09}", d.as_secs(), d.subsec_nanos())
}

/// Inverse of [`format_time`]: `secs.nnnnnnnnn`, exactly nine fraction digits.
fn parse_time(field: &[u8]) -> Result<SystemTime, String> {
    let bad = || format!("bad timestamp {:?}", String::from_utf8_lossy(field));
    let s = std::str::from_utf8(field).map_err(|_| bad())?;
    let (secs, nanos) = s.split_once('.').ok_or_else(bad)?;
    let digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());
    if !digits(secs) || nanos.len() != 9 || !digits(nanos) {
        return Err(bad());
    }
    let secs: u64 = secs.parse().map_err(|_| bad())?;
    let nanos: u32 = nanos.parse().map_err(|_| bad())?;
    UNIX_EPOCH
        .checked_add(Duration::new(secs, nanos))
        .ok_or_else(bad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Separator;

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    fn codec() -> Codec {
        Codec::new(&Config::default().with_separator(Separator::new(b'|').unwrap()))
    }

    fn decode(bytes: &[u8]) -> Result<FsTree, FsError> {
        codec().decode(bytes, p("<test>"))
    }

    #[test]
    fn empty_tree_is_single_separator() {
        let tree = FsTree::new();
        assert_eq!(codec().encode(&tree).unwrap(), b"|");
        assert!(decode(b"|").unwrap().is_empty());
    }

    #[test]
    fn encode_layout() {
        let mut tree = FsTree::new();
        let d = tree.create(p("/d"), FileType::Directory).unwrap();
        let f = tree.create(p("/d/f"), FileType::File).unwrap();
        tree.write(f, b"hey", 0).unwrap();
        let t = UNIX_EPOCH + Duration::new(5, 7);
        tree.set_times(d, t, t).unwrap();
        tree.set_times(f, t, t).unwrap();

        let bytes = codec().encode(&tree).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "|/d|0|1|3|5.000000007|5.000000007||/d/f|1|2|3|5.000000007|5.000000007|hey|"
        );
    }

    #[test]
    fn records_follow_preorder() {
        let mut tree = FsTree::new();
        tree.create(p("/b"), FileType::Directory).unwrap();
        tree.create(p("/a"), FileType::File).unwrap();
        tree.create(p("/b/x"), FileType::File).unwrap();

        let text = String::from_utf8(codec().encode(&tree).unwrap()).unwrap();
        let paths: Vec<_> = text
            .split('|')
            .skip(1)
            .step_by(FIELDS_PER_RECORD)
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(paths, vec!["/b", "/b/x", "/a"]);
    }

    /// Fill every `@` with a well-formed timestamp.
    fn stamped(template: &str) -> Vec<u8> {
        template.replace('@', "0.000000000").into_bytes()
    }

    #[test]
    fn decode_restores_attributes() {
        let bytes = b"|/d|0|9|3|1.500000000|2.250000000||/d/f|1|4|3|10.000000001|20.000000000|hey|";
        let tree = decode(bytes).unwrap();
        let f = tree.resolve(p("/d/f")).unwrap();
        let entry = tree.entry(f).unwrap();
        assert_eq!(entry.id(), 4);
        assert_eq!(entry.contents(), Some(&b"hey"[..]));
        assert_eq!(entry.modified(), UNIX_EPOCH + Duration::new(10, 1));

        let d = tree.entry(tree.resolve(p("/d")).unwrap()).unwrap();
        assert_eq!(d.modified(), UNIX_EPOCH + Duration::from_millis(1_500));
        assert_eq!(d.accessed(), UNIX_EPOCH + Duration::from_millis(2_250));
        assert_eq!(tree.entry(tree.root()).unwrap().size(), 3);
        assert_eq!(tree.node_by_id(9), tree.resolve(p("/d")).ok());
        assert_eq!(tree.next_id(), 10);
    }

    #[test]
    fn decode_rejects_missing_leading_separator() {
        assert!(matches!(
            decode(&stamped("/d|0|1|0|@|@||")),
            Err(FsError::CorruptFormat { .. })
        ));
        assert!(matches!(decode(b""), Err(FsError::CorruptFormat { .. })));
    }

    #[test]
    fn decode_rejects_truncated_record() {
        assert!(matches!(
            decode(b"|/d|0|1|0|"),
            Err(FsError::CorruptFormat { .. })
        ));
        assert!(matches!(
            decode(&stamped("|/d|0|1|0|@|@||junk")),
            Err(FsError::CorruptFormat { .. })
        ));
    }

    #[test]
    fn decode_accepts_well_formed_fixture() {
        let tree = decode(&stamped("|/d|0|1|3|@|@||/d/f|1|2|3|@|@|abc|")).unwrap();
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn decode_rejects_bad_fields() {
        for template in [
            "|/d|2|1|0|@|@||",
            "|/d|0|x|0|@|@||",
            "|/f|1|1|5|@|@|abc|",
            "|/a/b|1|1|0|@|@||",
            "|/d|0|1|0|@|@||/d|0|2|0|@|@||",
            "|/d|0|1|0|@|@||/e|0|1|0|@|@||",
            "|/d|0|1|7|@|@||",
        ] {
            let bytes = stamped(template);
            assert!(
                matches!(decode(&bytes), Err(FsError::CorruptFormat { .. })),
                "accepted {template:?}"
            );
        }
    }

    #[test]
    fn decode_rejects_short_or_long_fractions() {
        for time in ["1.5", "1", "1.0000000001", "1.00000000x", ".000000000", "+1.000000000"] {
            let bytes = format!("|/d|0|1|0|{time}|0.000000000||").into_bytes();
            assert!(
                matches!(decode(&bytes), Err(FsError::CorruptFormat { .. })),
                "accepted {time:?}"
            );
        }
    }

    #[test]
    fn encode_refuses_separator_in_contents() {
        let mut tree = FsTree::new();
        let f = tree.create(p("/f"), FileType::File).unwrap();
        tree.write(f, b"a|b", 0).unwrap();
        assert!(matches!(
            codec().encode(&tree),
            Err(FsError::Unencodable { .. })
        ));
    }

    #[test]
    fn encode_refuses_separator_in_path() {
        let mut tree = FsTree::new();
        tree.create(p("/a|b"), FileType::Directory).unwrap();
        let err = codec().encode(&tree).unwrap_err();
        assert!(matches!(err, FsError::Unencodable { .. }));
        assert!(err.to_string().contains("path or contents"));
    }

    #[test]
    fn time_format_round_trips() {
        let t = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        assert_eq!(parse_time(format_time(t).as_bytes()).unwrap(), t);
        assert_eq!(
            parse_time(b"42.000000000").unwrap(),
            UNIX_EPOCH + Duration::from_secs(42)
        );
        assert!(parse_time(b"42").is_err());
    }
}
