use crate::codec::ContentCodec;
use crate::errors::{Error, Result};
use crate::events::EventSink;
use crate::preview::MatchRecord;
use crate::unique_name::exists;
use encoding_rs::Encoding;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// The mutations a run can perform.
///
/// The traversal code decides *what* happens and calls into an `Effects`
/// implementation to make it happen. [`DiskEffects`] touches the filesystem;
/// the preview simulator only records. Keeping every decision on one side of
/// this trait is what makes a preview describe exactly what a real run does.
pub trait Effects {
    /// Replaces the content of `path` with `text` encoded as `encoding`.
    fn rewrite(&mut self, path: &Path, text: &str, encoding: &'static Encoding) -> Result<()>;

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()>;

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()>;

    fn create_dir(&mut self, path: &Path) -> Result<()>;

    /// Copies a directory and everything beneath it, byte for byte.
    fn copy_tree(&mut self, from: &Path, to: &Path) -> Result<()>;

    /// Where a directory copied from `original` to `copy` is read from when
    /// the traversal comes back to it.
    fn revisit_source(&self, original: &Path, copy: &Path) -> PathBuf;

    /// Called once for every action that took place.
    fn record(&mut self, record: MatchRecord);
}

/// Effects of a real run: filesystem mutations, each reported as a log line.
pub struct DiskEffects {
    sink: EventSink,
}

impl DiskEffects {
    pub fn new(sink: EventSink) -> Self {
        Self { sink }
    }
}

impl Effects for DiskEffects {
    fn rewrite(&mut self, path: &Path, text: &str, encoding: &'static Encoding) -> Result<()> {
        let bytes = ContentCodec::encode(path, text, encoding)?;
        write_atomically(path, &bytes)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        if exists(to) {
            return Err(Error::TargetExists(to.to_path_buf()));
        }
        fs::rename(from, to)?;
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        if exists(to) {
            return Err(Error::TargetExists(to.to_path_buf()));
        }
        fs::copy(from, to)?;
        Ok(())
    }

    fn create_dir(&mut self, path: &Path) -> Result<()> {
        fs::create_dir(path)?;
        Ok(())
    }

    fn copy_tree(&mut self, from: &Path, to: &Path) -> Result<()> {
        if exists(to) {
            return Err(Error::TargetExists(to.to_path_buf()));
        }
        for entry in WalkDir::new(from).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(from)
                .map_err(|_| Error::InvalidName(entry.path().to_path_buf()))?;
            let target = to.join(relative);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir(&target)?;
            } else if file_type.is_file() {
                fs::copy(entry.path(), &target)?;
            } else {
                tracing::warn!(path = %entry.path().display(), "not copying special file");
            }
        }
        Ok(())
    }

    fn revisit_source(&self, _original: &Path, copy: &Path) -> PathBuf {
        copy.to_path_buf()
    }

    fn record(&mut self, record: MatchRecord) {
        self.sink.log(record.to_string());
    }
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// keeping the original permissions.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| format!("Could not get parent directory for {}", path.display()))?;

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(bytes)?;

    let perms = fs::metadata(path)?.permissions();
    fs::set_permissions(temp_file.path(), perms)?;

    temp_file.persist(path)?;
    Ok(())
}
