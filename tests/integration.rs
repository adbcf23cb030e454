//! Integration tests driving the public API end to end.
//!
//! These tests verify that:
//! 1. Path-based operations keep directory sizes equal to their subtree totals
//! 2. A saved tree reloads with identical paths, kinds, sizes, contents, ids and times
//! 3. Sessions persist after every mutation and survive a remount
//! 4. Errors carry useful context

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing_subscriber::{EnvFilter, fmt};
use treefs::*;

/// Route library events to the test harness; `RUST_LOG=treefs=debug` shows them.
fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_test_writer()
        .try_init();
}

fn p(s: &str) -> &Path {
    Path::new(s)
}

fn scratch() -> FsSession {
    FsSession::from_tree(FsTree::new(), Config::default().with_autosave(false))
}

fn persisted(dir: &TempDir) -> Config {
    Config::default().with_persist_path(dir.path().join("tree.db"))
}

/// Every entry as (path, is_file, id, size, contents, modified, accessed), pre-order.
fn snapshot(tree: &FsTree) -> Vec<(PathBuf, bool, u64, u64, Vec<u8>, SystemTime, SystemTime)> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        let entry = tree.entry(node).unwrap();
        out.push((
            tree.path_of(node).unwrap(),
            entry.is_file(),
            entry.id(),
            entry.size(),
            entry.contents().unwrap_or_default().to_vec(),
            entry.modified(),
            entry.accessed(),
        ));
        if let Some(children) = entry.children() {
            let kids: Vec<_> = children.iter().collect();
            stack.extend(kids.into_iter().rev());
        }
    }
    out
}

// =============================================================================
// Tests: Operation Scenarios
// =============================================================================

#[test]
fn create_write_rename_scenario() {
    init_tracing();
    let mut fs = scratch();
    fs.create_dir(p("/a")).unwrap();
    fs.create_file(p("/a/b.txt")).unwrap();
    fs.write(p("/a/b.txt"), b"hello").unwrap();

    assert_eq!(fs.metadata(p("/a")).unwrap().size, 5);
    assert_eq!(fs.metadata(p("/")).unwrap().size, 5);

    let id = fs.metadata(p("/a/b.txt")).unwrap().id;
    fs.rename(p("/a/b.txt"), p("/a/c.txt")).unwrap();
    assert!(!fs.exists(p("/a/b.txt")).unwrap());

    let meta = fs.metadata(p("/a/c.txt")).unwrap();
    assert_eq!(meta.id, id);
    assert_eq!(meta.size, 5);
    assert_eq!(fs.read(p("/a/c.txt")).unwrap(), b"hello");
    assert_eq!(fs.metadata(p("/a")).unwrap().size, 5);

    fs.remove_file(p("/a/c.txt")).unwrap();
    assert_eq!(fs.metadata(p("/a")).unwrap().size, 0);
    fs.remove_dir(p("/a")).unwrap();
    assert!(matches!(
        fs.metadata(p("/a")),
        Err(FsError::NotFound { .. })
    ));
}

#[test]
fn sizes_track_mixed_operations() {
    let mut fs = scratch();
    fs.create_dir(p("/x")).unwrap();
    fs.create_dir(p("/x/y")).unwrap();
    fs.create_dir(p("/z")).unwrap();
    for (path, data) in [
        ("/x/one", &b"1111"[..]),
        ("/x/y/two", &b"22"[..]),
        ("/z/three", &b"333333"[..]),
    ] {
        fs.create_file(p(path)).unwrap();
        fs.write(p(path), data).unwrap();
    }
    assert_eq!(fs.metadata(p("/")).unwrap().size, 12);

    fs.truncate(p("/x/one"), 10).unwrap();
    fs.rename(p("/x/y"), p("/z/y")).unwrap();
    fs.remove_file(p("/z/three")).unwrap();

    assert_eq!(fs.metadata(p("/x")).unwrap().size, 10);
    assert_eq!(fs.metadata(p("/z")).unwrap().size, 2);
    assert_eq!(fs.metadata(p("/")).unwrap().size, 12);
    assert_eq!(fs.tree().find_size_mismatch(), None);
}

#[test]
fn create_twice_and_remove_non_empty() {
    let mut fs = scratch();
    fs.create_dir(p("/d")).unwrap();
    fs.create_file(p("/d/f")).unwrap();

    let err = fs.create_file(p("/d/f")).unwrap_err();
    assert!(matches!(err, FsError::AlreadyExists { .. }));
    assert!(matches!(
        fs.remove_dir(p("/d")),
        Err(FsError::DirectoryNotEmpty { .. })
    ));
    assert_eq!(fs.list_names(p("/d")).unwrap(), vec!["f"]);
}

#[test]
fn read_range_is_clamped() {
    let mut fs = scratch();
    fs.put(p("/f"), b"0123456789").unwrap();
    assert_eq!(fs.read_range(p("/f"), 3, 4).unwrap(), b"3456");
    assert_eq!(fs.read_range(p("/f"), 8, 100).unwrap(), b"89");
    assert!(fs.read_range(p("/f"), 50, 1).unwrap().is_empty());
}

#[test]
fn metadata_reports_fixed_modes() {
    let mut fs = scratch();
    fs.create_dir(p("/d")).unwrap();
    fs.create_file(p("/d/f")).unwrap();

    let dir = fs.metadata(p("/d")).unwrap();
    assert!(dir.is_dir());
    assert_eq!(dir.permissions.mode(), 0o755);
    assert_eq!(dir.nlink, 2);

    let file = fs.metadata(p("/d/f")).unwrap();
    assert!(file.is_file());
    assert_eq!(file.permissions.mode(), 0o777);
    assert_eq!(file.nlink, 1);
}

// =============================================================================
// Tests: Persistence
// =============================================================================

#[test]
fn save_and_load_preserve_everything() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = persisted(&dir).with_autosave(false);
    let mut fs = FsSession::mount(config.clone());

    fs.create_dir(p("/docs")).unwrap();
    fs.create_dir(p("/docs/old")).unwrap();
    fs.put(p("/docs/readme"), b"read me\nplease").unwrap();
    fs.put(p("/docs/old/notes"), b"").unwrap();
    fs.put(p("/top"), b"xyz").unwrap();
    fs.set_times(
        p("/top"),
        SystemTime::UNIX_EPOCH + Duration::new(1_000, 5),
        SystemTime::UNIX_EPOCH + Duration::new(2_000, 999_999_999),
    )
    .unwrap();
    fs.save().unwrap();

    let reloaded = FsSession::try_mount(config).unwrap();
    assert_eq!(snapshot(reloaded.tree())[1..], snapshot(fs.tree())[1..]);
    assert_eq!(
        reloaded.metadata(p("/")).unwrap().size,
        fs.metadata(p("/")).unwrap().size
    );
    assert_eq!(reloaded.tree().next_id(), fs.tree().next_id());
}

#[test]
fn absent_file_mounts_empty_root() {
    let dir = TempDir::new().unwrap();
    let fs = FsSession::try_mount(persisted(&dir)).unwrap();
    assert!(fs.tree().is_empty());
    assert_eq!(fs.metadata(p("/")).unwrap().size, 0);
    assert!(fs.list_names(p("/")).unwrap().is_empty());
}

#[test]
fn autosave_survives_remount() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    {
        let mut fs = FsSession::mount(persisted(&dir));
        fs.create_dir(p("/a")).unwrap();
        fs.put(p("/a/log"), b"line").unwrap();
        let handle = fs.open(p("/a/log")).unwrap();
        fs.write_at(handle, b"s", 4).unwrap();
        fs.close(handle).unwrap();
    }

    let fs = FsSession::mount(persisted(&dir));
    assert_eq!(fs.read(p("/a/log")).unwrap(), b"lines");
    assert_eq!(fs.metadata(p("/a")).unwrap().size, 5);
}

#[test]
fn new_ids_continue_after_reload() {
    let dir = TempDir::new().unwrap();
    let mut fs = FsSession::mount(persisted(&dir));
    fs.create_file(p("/a")).unwrap();
    fs.create_file(p("/b")).unwrap();
    let b_id = fs.metadata(p("/b")).unwrap().id;
    fs.remove_file(p("/a")).unwrap();

    let mut fs = FsSession::mount(persisted(&dir));
    fs.create_file(p("/c")).unwrap();
    assert!(fs.metadata(p("/c")).unwrap().id > b_id);
}

#[test]
fn contents_with_separator_are_rejected() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mut fs = FsSession::mount(persisted(&dir));
    let err = fs.put(p("/bin"), &[b'a', DEFAULT_SEPARATOR, b'b']).unwrap_err();
    assert!(matches!(err, FsError::Unencodable { .. }));
    assert!(err.to_string().contains("/bin"));

    assert_eq!(fs.metadata(p("/bin")).unwrap().size, 0);
    fs.save().unwrap();
    let fs = FsSession::try_mount(persisted(&dir)).unwrap();
    assert!(fs.read(p("/bin")).unwrap().is_empty());
}

#[test]
fn separator_comes_from_config() {
    let dir = TempDir::new().unwrap();
    let config = persisted(&dir).with_separator(Separator::new(b'|').unwrap());
    let mut fs = FsSession::mount(config.clone());
    fs.put(p("/raw"), &[DEFAULT_SEPARATOR]).unwrap();
    assert!(matches!(
        fs.put(p("/raw"), b"a|b"),
        Err(FsError::Unencodable { .. })
    ));
    assert!(matches!(
        fs.create_file(p("/a|b")),
        Err(FsError::InvalidName { .. })
    ));

    let fs = FsSession::try_mount(config).unwrap();
    assert_eq!(fs.read(p("/raw")).unwrap(), [DEFAULT_SEPARATOR]);
}

// =============================================================================
// Tests: Generic Function Trait Bounds
// =============================================================================

#[test]
fn generic_function_with_fs_bound() {
    fn archive<B: Fs>(fs: &mut B, name: &str, data: &[u8]) -> Result<u64, FsError> {
        if !fs.is_dir(Path::new("/archive"))? {
            fs.create_dir(Path::new("/archive"))?;
        }
        let path = Path::new("/archive").join(name);
        fs.create_file(&path)?;
        fs.write(&path, data)?;
        fs.file_size(Path::new("/archive"))
    }

    let mut fs = scratch();
    assert_eq!(archive(&mut fs, "a", b"12").unwrap(), 2);
    assert_eq!(archive(&mut fs, "b", b"345").unwrap(), 5);
}

#[test]
fn generic_function_with_fuse_bound() {
    fn append<B: FsFuse>(fs: &mut B, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let end = fs.metadata(path)?.size;
        let handle = fs.open(path)?;
        fs.write_at(handle, data, end)?;
        fs.close(handle)
    }

    let mut fs = scratch();
    fs.put(p("/journal"), b"a").unwrap();
    append(&mut fs, p("/journal"), b"bc").unwrap();
    assert_eq!(fs.read(p("/journal")).unwrap(), b"abc");
}

// =============================================================================
// Tests: Error Handling Verification
// =============================================================================

#[test]
fn error_not_found_contains_path() {
    let fs = scratch();
    let err = fs.metadata(p("/nope/deeper")).unwrap_err();
    assert!(matches!(err, FsError::NotFound { .. }));
    assert!(err.to_string().contains("/nope/deeper"));
}

#[test]
fn error_is_a_directory_names_operation() {
    let mut fs = scratch();
    fs.create_dir(p("/d")).unwrap();
    let err = fs.write(p("/d"), b"x").unwrap_err();
    assert!(err.to_string().contains("is a directory"));
}

#[test]
fn error_root_operations() {
    let mut fs = scratch();
    assert!(matches!(
        fs.rename(p("/"), p("/elsewhere")),
        Err(FsError::RootEntry { .. })
    ));
    assert!(matches!(
        fs.create_dir(p("/")),
        Err(FsError::AlreadyExists { .. })
    ));
}
