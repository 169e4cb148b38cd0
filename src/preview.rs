use crate::effects::Effects;
use crate::errors::Result;
use crate::matcher::Matcher;
use encoding_rs::Encoding;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Line diffs kept per file. The total number of matched lines is always
/// reported in full.
pub const PREVIEW_LINE_LIMIT: usize = 10;

/// One changed line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    /// 1-based.
    pub line_number: usize,
    pub original: String,
    pub replaced: String,
}

/// What a content substitution does to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDiff {
    /// Occurrences substituted across the whole file.
    pub replacements: usize,
    /// Lines containing at least one occurrence.
    pub matched_lines: usize,
    /// The first [`PREVIEW_LINE_LIMIT`] matched lines, trimmed.
    pub lines: Vec<LineChange>,
}

impl ContentDiff {
    pub fn compute(text: &str, matcher: &Matcher) -> Self {
        let mut matched_lines = 0;
        let mut lines = Vec::new();
        for (idx, line) in text.split('\n').enumerate() {
            if !matcher.matches(line) {
                continue;
            }
            matched_lines += 1;
            if lines.len() < PREVIEW_LINE_LIMIT {
                let original = line.trim();
                lines.push(LineChange {
                    line_number: idx + 1,
                    original: original.to_string(),
                    replaced: matcher.replace(original).into_owned(),
                });
            }
        }
        Self {
            replacements: matcher.count(text),
            matched_lines,
            lines,
        }
    }
}

/// One action a run takes.
///
/// A preview collects these; a real run logs each one through its `Display`
/// rendering, so the two can be compared line by line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchRecord {
    NameChange {
        path: PathBuf,
        old_name: String,
        new_name: String,
        is_file: bool,
    },
    ContentChange {
        path: PathBuf,
        #[serde(flatten)]
        diff: ContentDiff,
    },
    CreatedCopy {
        source: PathBuf,
        path: PathBuf,
        is_file: bool,
    },
    CreatedRenamedCopy {
        source: PathBuf,
        path: PathBuf,
        old_name: String,
        new_name: String,
        is_file: bool,
    },
    CreatedCopyForContent {
        source: PathBuf,
        path: PathBuf,
        #[serde(flatten)]
        diff: ContentDiff,
    },
}

impl MatchRecord {
    /// The entry the action produced or changed.
    pub fn path(&self) -> &Path {
        match self {
            MatchRecord::NameChange { path, .. }
            | MatchRecord::ContentChange { path, .. }
            | MatchRecord::CreatedCopy { path, .. }
            | MatchRecord::CreatedRenamedCopy { path, .. }
            | MatchRecord::CreatedCopyForContent { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MatchRecord::NameChange { .. } => "name_change",
            MatchRecord::ContentChange { .. } => "content_change",
            MatchRecord::CreatedCopy { .. } => "created_copy",
            MatchRecord::CreatedRenamedCopy { .. } => "created_renamed_copy",
            MatchRecord::CreatedCopyForContent { .. } => "created_copy_for_content",
        }
    }

    pub fn diff(&self) -> Option<&ContentDiff> {
        match self {
            MatchRecord::ContentChange { diff, .. }
            | MatchRecord::CreatedCopyForContent { diff, .. } => Some(diff),
            _ => None,
        }
    }
}

fn kind_label(is_file: bool) -> &'static str {
    if is_file { "File" } else { "Folder" }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRecord::NameChange {
                path,
                old_name,
                new_name,
                is_file,
            } => write!(
                f,
                "{} renamed: {old_name} -> {new_name} ({})",
                kind_label(*is_file),
                path.display()
            ),
            MatchRecord::ContentChange { path, diff } => write!(
                f,
                "File: {} - replacements made: {}",
                path.display(),
                diff.replacements
            ),
            MatchRecord::CreatedCopy {
                source,
                path,
                is_file,
            } => write!(
                f,
                "{} copied: {} -> {}",
                kind_label(*is_file),
                source.display(),
                path.display()
            ),
            MatchRecord::CreatedRenamedCopy {
                source,
                path,
                is_file,
                ..
            } => write!(
                f,
                "{} copied with new name: {} -> {}",
                kind_label(*is_file),
                source.display(),
                path.display()
            ),
            MatchRecord::CreatedCopyForContent { source, path, diff } => write!(
                f,
                "Copy created for content: {} -> {} - replacements made: {}",
                source.display(),
                path.display(),
                diff.replacements
            ),
        }
    }
}

/// Effects of a preview run: nothing is touched, every action is collected.
///
/// Planned copies do not exist, so when the traversal comes back to a copied
/// directory it reads the original instead.
#[derive(Debug, Default)]
pub struct PreviewSimulator {
    records: Vec<MatchRecord>,
}

impl PreviewSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MatchRecord> {
        self.records
    }
}

impl Effects for PreviewSimulator {
    fn rewrite(&mut self, _path: &Path, _text: &str, _encoding: &'static Encoding) -> Result<()> {
        Ok(())
    }

    fn rename(&mut self, _from: &Path, _to: &Path) -> Result<()> {
        Ok(())
    }

    fn copy_file(&mut self, _from: &Path, _to: &Path) -> Result<()> {
        Ok(())
    }

    fn create_dir(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn copy_tree(&mut self, _from: &Path, _to: &Path) -> Result<()> {
        Ok(())
    }

    fn revisit_source(&self, original: &Path, _copy: &Path) -> PathBuf {
        original.to_path_buf()
    }

    fn record(&mut self, record: MatchRecord) {
        self.records.push(record);
    }
}
