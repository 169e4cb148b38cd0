use crate::config::Configuration;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Extensions whose content is never scanned or rewritten. Such files can
/// still be renamed and copied.
pub const BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".ico", ".svg",
    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v",
    ".mp3", ".wav", ".flac", ".aac", ".ogg", ".wma", ".m4a",
    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2",
    ".exe", ".dll", ".so", ".dylib", ".bin",
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    ".db", ".sqlite", ".dat", ".cache",
];

/// The exclusion rules of one run, derived once from its configuration.
///
/// Two levels of exclusion exist. An entry that is *fully ignored* (ignored
/// path, ignored extension, or an ignored keyword in its path, name or
/// content) takes part in no action at all. A file that is *binary by
/// extension* only has its content left alone.
#[derive(Debug, Clone, Default)]
pub struct IgnorePolicy {
    keywords: Vec<String>,
    paths: Vec<PathBuf>,
    extensions: BTreeSet<String>,
}

impl IgnorePolicy {
    /// Expects normalized values: lower-case keywords, absolute paths and
    /// dotted lower-case extensions.
    pub fn new(
        keywords: impl IntoIterator<Item = String>,
        paths: impl IntoIterator<Item = PathBuf>,
        extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            keywords: keywords.into_iter().collect(),
            paths: paths.into_iter().collect(),
            extensions: extensions.into_iter().collect(),
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(
            config.ignored_keywords.iter().cloned(),
            config.ignored_paths.iter().cloned(),
            config.ignored_extensions.iter().cloned(),
        )
    }

    /// `true` if `path` is an ignored path or lies beneath one, or if it is a
    /// file whose extension the user excluded.
    pub fn is_fully_ignored(&self, path: &Path, is_file: bool) -> bool {
        if self.paths.iter().any(|ignored| path.starts_with(ignored)) {
            return true;
        }
        is_file
            && !self.extensions.is_empty()
            && dotted_extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    /// `true` if any keyword occurs in `text`, ignoring case.
    pub fn contains_ignored_keyword(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let text = text.to_lowercase();
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }

    pub fn is_binary_by_extension(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// The lower-cased extension of `path` with its leading dot, if any.
///
/// Dot files such as `.bashrc` have no extension.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
