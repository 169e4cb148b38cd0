// Whole runs through the public API, one fixture per behavior.

use replitex::events::log_text;
use replitex::{CancellationToken, Configuration, Engine, Event, EventSink, Mode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

fn config(dir: &Path, search: &str, replacement: &str, mode: Mode) -> Configuration {
    let mut config = Configuration::new(dir, search, replacement);
    config.mode = mode;
    config
}

fn start(config: Configuration) -> Vec<Event> {
    replitex::start(config.normalize().unwrap()).unwrap().wait()
}

fn logs(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::LogLine(line) => Some(log_text(line).to_string()),
            _ => None,
        })
        .collect()
}

fn files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

#[test]
fn test_in_place_is_idempotent() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("x.txt"), "aaa").unwrap();

    let events = start(config(dir.path(), "a", "b", Mode::InPlace));
    assert_eq!(events.last(), Some(&Event::Finished(true)));
    assert_eq!(read(dir.path(), "x.txt"), "bbb");
    assert!(logs(&events)
        .iter()
        .any(|l| l.ends_with("x.txt - replacements made: 3")));

    let events = start(config(dir.path(), "a", "b", Mode::InPlace));
    assert_eq!(read(dir.path(), "x.txt"), "bbb");
    assert!(logs(&events)
        .iter()
        .any(|l| l == "Replacement finished. Objects processed: 0"));
}

#[test]
fn test_keyword_exempts_whole_subtree() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("temp_build/foo_dir")).unwrap();
    fs::write(dir.path().join("temp_build/foo_dir/foo.txt"), "foo").unwrap();
    fs::write(dir.path().join("foo.txt"), "foo").unwrap();

    for mode in [Mode::InPlace, Mode::TreeCopy] {
        let mut config = config(dir.path(), "foo", "bar", mode);
        config.ignored_keywords.insert("TEMP".to_string());
        start(config);
    }

    assert_eq!(read(dir.path(), "temp_build/foo_dir/foo.txt"), "foo");
    assert_eq!(files(&dir.path().join("temp_build")).len(), 1);
    assert_eq!(read(dir.path(), "bar.txt"), "bar");
}

#[test]
fn test_ignored_path_is_left_alone() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("vendor/foo")).unwrap();
    fs::write(dir.path().join("vendor/foo/foo.txt"), "foo").unwrap();

    let mut config = config(dir.path(), "foo", "bar", Mode::InPlace);
    config.ignored_paths.insert(dir.path().join("vendor"));
    start(config);

    assert_eq!(read(dir.path(), "vendor/foo/foo.txt"), "foo");
}

#[test]
fn test_sibling_copy_unique_suffix() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("note.txt"), "say foo").unwrap();
    fs::write(dir.path().join("note_2.txt"), "unrelated").unwrap();

    start(config(dir.path(), "foo", "bar", Mode::SiblingCopy));

    assert_eq!(read(dir.path(), "note.txt"), "say foo");
    assert_eq!(read(dir.path(), "note_2.txt"), "unrelated");
    assert_eq!(read(dir.path(), "note_3.txt"), "say bar");
}

#[test]
fn test_tree_copy_is_multiplicative() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("foo/foo")).unwrap();
    fs::write(dir.path().join("foo/foo/file_foo.txt"), "foo").unwrap();

    let events = start(config(dir.path(), "foo", "bar", Mode::TreeCopy));
    assert_eq!(events.last(), Some(&Event::Finished(true)));

    let expected: Vec<PathBuf> = [
        "bar/bar/file_bar.txt",
        "bar/bar/file_foo.txt",
        "bar/foo/file_bar.txt",
        "bar/foo/file_foo.txt",
        "foo/bar/file_bar.txt",
        "foo/bar/file_foo.txt",
        "foo/foo/file_bar.txt",
        "foo/foo/file_foo.txt",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    assert_eq!(files(dir.path()), expected);

    for rel in &expected {
        let content = fs::read_to_string(dir.path().join(rel)).unwrap();
        if rel.ends_with("file_bar.txt") {
            assert_eq!(content, "bar", "{}", rel.display());
        } else {
            assert_eq!(content, "foo", "{}", rel.display());
        }
    }
}

#[test]
fn test_undecodable_file_is_renamed_but_never_read() {
    let dir = TempDir::new().unwrap();
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend_from_slice(b"secret foo");
    fs::write(dir.path().join("foo.raw"), &bytes).unwrap();

    let mut config = config(dir.path(), "foo", "bar", Mode::InPlace);
    config.encodings = vec!["utf-8".to_string()];
    config.ignored_keywords.insert("secret".to_string());
    start(config);

    assert!(!dir.path().join("foo.raw").exists());
    assert_eq!(fs::read(dir.path().join("bar.raw")).unwrap(), bytes);
}

#[test]
fn test_legacy_encoding_round_trip() {
    let dir = TempDir::new().unwrap();
    // "foo привет" in Windows-1251.
    let mut bytes = b"foo ".to_vec();
    bytes.extend_from_slice(&[0xEF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
    fs::write(dir.path().join("ru.txt"), &bytes).unwrap();

    start(config(dir.path(), "foo", "bar", Mode::InPlace));

    let mut expected = b"bar ".to_vec();
    expected.extend_from_slice(&[0xEF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
    assert_eq!(fs::read(dir.path().join("ru.txt")).unwrap(), expected);
}

#[test]
fn test_unencodable_replacement_is_logged_and_skipped() {
    let dir = TempDir::new().unwrap();
    let bytes = [b'f', b'o', b'o', b' ', 0xEF, 0xF0];
    fs::write(dir.path().join("ru.txt"), bytes).unwrap();
    fs::write(dir.path().join("ok.txt"), "foo").unwrap();

    let events = start(config(dir.path(), "foo", "日本", Mode::InPlace));

    assert_eq!(events.last(), Some(&Event::Finished(true)));
    assert_eq!(fs::read(dir.path().join("ru.txt")).unwrap(), bytes);
    assert_eq!(read(dir.path(), "ok.txt"), "日本");
    assert!(logs(&events)
        .iter()
        .any(|l| l.starts_with("Error processing") && l.contains("ru.txt")));
}

#[test]
fn test_cancelled_run_finishes_successfully() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("foo.txt"), "foo").unwrap();

    let engine = Engine::new(
        config(dir.path(), "foo", "bar", Mode::InPlace)
            .normalize()
            .unwrap(),
    )
    .unwrap();
    let (sink, rx) = EventSink::channel();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(engine.execute(&sink, &cancel));
    drop(sink);

    let events: Vec<Event> = rx.iter().collect();
    assert_eq!(events.last(), Some(&Event::Finished(true)));
    assert_eq!(read(dir.path(), "foo.txt"), "foo");
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::StatusChanged(s) if s.starts_with("Stopped"))));
}

#[test]
fn test_cancel_through_handle() {
    let dir = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("f{i}.txt")), "foo").unwrap();
    }

    let handle =
        replitex::start(config(dir.path(), "foo", "bar", Mode::InPlace).normalize().unwrap())
            .unwrap();
    handle.cancel();
    let events = handle.wait();

    let finished: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::Finished(_)))
        .collect();
    assert_eq!(finished, vec![&Event::Finished(true)]);
    assert_eq!(events.last(), Some(&Event::Finished(true)));
}

#[test]
fn test_empty_search_engine_is_noop() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "text").unwrap();

    let engine = Engine::new(Configuration::new(dir.path(), "", "x").normalize().unwrap()).unwrap();
    let (sink, rx) = EventSink::channel();
    assert!(engine.execute(&sink, &CancellationToken::new()));
    drop(sink);

    assert_eq!(rx.iter().last(), Some(Event::Finished(true)));
    assert_eq!(read(dir.path(), "a.txt"), "text");
}

#[test]
fn test_missing_folder_rejected_before_start() {
    let dir = TempDir::new().unwrap();
    let config = Configuration::new(dir.path().join("missing"), "a", "b")
        .normalize()
        .unwrap();
    assert!(replitex::start(config).is_err());
}
