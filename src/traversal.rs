use crate::errors::{Error, Result};
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What kind of filesystem object an entry is. Symlinks are `Other` and are
/// never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::Other
        }
    }
}

/// A path found by traversal. Recomputed on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn name(&self) -> Result<&str> {
        file_name(&self.path)
    }
}

/// Entries in the order traversal discovered them.
///
/// Every descendant comes after its ancestor, so walking the list backwards
/// visits children before the directories that contain them.
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    entries: Vec<Entry>,
}

impl EntryList {
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn discovery_order(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn reverse_order(&self) -> std::iter::Rev<std::slice::Iter<'_, Entry>> {
        self.entries.iter().rev()
    }

    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_file()).count()
    }
}

/// Lists the working folder: its direct children first, then, when
/// `recursive` is set, the full contents of each top-level directory.
///
/// Failing to read `root` itself is an error. Unreadable subfolders are
/// reported through `on_error` and skipped.
pub fn enumerate(
    root: &Path,
    recursive: bool,
    mut on_error: impl FnMut(&Path, &Error),
) -> Result<EntryList> {
    let mut list = EntryList::default();
    let top_level = read_dir_sorted(root)?;

    for (path, kind) in &top_level {
        list.push(Entry {
            path: path.clone(),
            kind: *kind,
        });
    }

    if recursive {
        for (dir, _) in top_level.iter().filter(|(_, kind)| *kind == EntryKind::Dir) {
            let walker = WalkDir::new(dir)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name();
            for entry in walker {
                match entry {
                    Ok(entry) => list.push(Entry {
                        path: entry.path().to_path_buf(),
                        kind: entry.file_type().into(),
                    }),
                    Err(err) => {
                        let path = err.path().unwrap_or(dir.as_path()).to_path_buf();
                        on_error(&path, &Error::WalkDir(err));
                    }
                }
            }
        }
    }

    Ok(list)
}

/// An entry seen at a logical location that may differ from where its
/// content is read.
///
/// During a real run both are the same path. A preview cannot create the
/// copies it plans, so a planned copy is read from the original it would
/// have been copied from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub path: PathBuf,
    pub source: PathBuf,
    pub kind: EntryKind,
}

impl Node {
    pub fn root(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            source: path.to_path_buf(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn name(&self) -> Result<&str> {
        file_name(&self.path)
    }

    /// The children of this directory, sorted by name.
    pub fn children(&self) -> Result<Vec<Node>> {
        Ok(read_dir_sorted(&self.source)?
            .into_iter()
            .filter_map(|(source, kind)| {
                let name = source.file_name()?.to_os_string();
                Some(Node {
                    path: self.path.join(&name),
                    source,
                    kind,
                })
            })
            .collect())
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<(PathBuf, EntryKind)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.path(), entry.file_type()?.into()));
    }
    entries.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(entries)
}

pub fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidName(path.to_path_buf()))
}
