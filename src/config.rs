use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

/// Encodings tried, in order, when decoding file content.
pub const DEFAULT_ENCODINGS: [&str; 3] = ["utf-8", "windows-1251", "windows-1252"];

/// How a run applies its substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Rewrite contents, then rename entries where they are.
    #[default]
    InPlace,
    /// Copy matching top-level entries next to the originals, renamed and rewritten.
    SiblingCopy,
    /// Copy matching entries at every level of the tree, revisiting new copies.
    TreeCopy,
}

/// Everything a single run needs to know.
///
/// Build one with [`Configuration::new`], adjust the public fields, then call
/// [`Configuration::normalize`] and [`Configuration::validate`] before
/// starting a run.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// The working folder the run operates on.
    pub folder: PathBuf,
    /// The text to search for. Empty text matches nothing.
    pub search: String,
    /// The text substituted for each occurrence.
    pub replacement: String,
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Descend into subfolders (InPlace only; SiblingCopy is top-level and
    /// TreeCopy always walks the whole tree).
    pub recursive: bool,
    /// Lower-cased keywords; any entry whose path, name or content contains
    /// one is left alone.
    pub ignored_keywords: BTreeSet<String>,
    /// Absolute paths excluded together with everything beneath them.
    pub ignored_paths: BTreeSet<PathBuf>,
    /// Extensions with a leading dot, lower-cased, excluded entirely.
    pub ignored_extensions: BTreeSet<String>,
    /// WHATWG encoding labels tried in order when decoding content.
    pub encodings: Vec<String>,
    pub mode: Mode,
    /// Simulate the run and report match records instead of mutating.
    pub preview: bool,
}

impl Configuration {
    /// Creates a configuration with the default options: case-insensitive,
    /// substring matching, recursive, InPlace, no preview.
    pub fn new(
        folder: impl Into<PathBuf>,
        search: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            search: search.into(),
            replacement: replacement.into(),
            case_sensitive: false,
            whole_word: false,
            recursive: true,
            ignored_keywords: BTreeSet::new(),
            ignored_paths: BTreeSet::new(),
            ignored_extensions: BTreeSet::new(),
            encodings: DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect(),
            mode: Mode::default(),
            preview: false,
        }
    }

    /// Brings user-supplied values into canonical form.
    ///
    /// Keywords are trimmed and lower-cased, extensions get a leading dot and
    /// are lower-cased, and the working folder and ignored paths become
    /// absolute, lexically cleaned paths. Empty values are dropped.
    pub fn normalize(mut self) -> Result<Self> {
        self.folder = absolute_clean(&self.folder)?;
        self.ignored_keywords = self
            .ignored_keywords
            .iter()
            .filter_map(|k| normalize_keyword(k))
            .collect();
        self.ignored_extensions = self
            .ignored_extensions
            .iter()
            .filter_map(|e| normalize_extension(e))
            .collect();
        self.ignored_paths = self
            .ignored_paths
            .iter()
            .map(|p| absolute_clean(p))
            .collect::<Result<_>>()?;
        if self.encodings.is_empty() {
            self.encodings = DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect();
        }
        Ok(self)
    }

    /// Rejects configurations that must never reach the engine.
    pub fn validate(&self) -> Result<()> {
        if self.search.trim().is_empty() {
            return Err("Search text must not be empty".into());
        }
        if !self.folder.exists() {
            return Err(format!("Working folder '{}' does not exist", self.folder.display()).into());
        }
        if !self.folder.is_dir() {
            return Err(format!("Working folder '{}' is not a directory", self.folder.display()).into());
        }
        for label in &self.encodings {
            if encoding_rs::Encoding::for_label(label.trim().as_bytes()).is_none() {
                return Err(Error::UnknownEncoding(label.clone()));
            }
        }
        Ok(())
    }

    /// Overlays the values present in a config file onto this configuration.
    ///
    /// Scalar options are only taken from the file when the caller has not
    /// already set them, which is how command-line flags win over the file.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(find) = file.find {
            if self.search.is_empty() {
                self.search = find;
            }
        }
        if let Some(replace) = file.replace {
            if self.replacement.is_empty() {
                self.replacement = replace;
            }
        }
        if let Some(v) = file.case_sensitive {
            self.case_sensitive |= v;
        }
        if let Some(v) = file.whole_word {
            self.whole_word |= v;
        }
        if let Some(v) = file.recursive {
            self.recursive &= v;
        }
        if let Some(mode) = file.mode {
            if self.mode == Mode::default() {
                self.mode = mode;
            }
        }
        self.ignored_keywords.extend(file.ignored_keywords);
        self.ignored_paths.extend(file.ignored_paths);
        self.ignored_extensions.extend(file.ignored_extensions);
        if !file.encodings.is_empty() {
            self.encodings = file.encodings;
        }
    }
}

/// The on-disk YAML form of a configuration. Every field is optional.
///
/// ```yaml
/// find: OldName
/// replace: NewName
/// whole_word: true
/// mode: tree-copy
/// ignored_keywords: [temp, backup]
/// ignored_paths: [/srv/project/vendor]
/// ignored_extensions: [.lock, log]
/// encodings: [utf-8, windows-1251, windows-1252]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub find: Option<String>,
    pub replace: Option<String>,
    pub case_sensitive: Option<bool>,
    pub whole_word: Option<bool>,
    pub recursive: Option<bool>,
    pub mode: Option<Mode>,
    pub ignored_keywords: Vec<String>,
    pub ignored_paths: Vec<PathBuf>,
    pub ignored_extensions: Vec<String>,
    pub encodings: Vec<String>,
}

/// A utility for locating and loading configuration files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds the configuration file by searching in a prioritized list of locations.
    ///
    /// The search order is:
    /// 1. The absolute path provided in `config_path`, if it exists.
    /// 2. A path relative to the current directory.
    /// 3. A path relative to the `working_dir`.
    /// 4. Inside the user configuration directory (`<config_dir>/replitex`).
    /// 5. Next to the executable.
    pub fn find_config(config_path: &Path, working_dir: &Path) -> Result<PathBuf> {
        if config_path.is_absolute() && config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        let in_working_dir = working_dir.join(config_path);
        if in_working_dir.exists() {
            return Ok(in_working_dir);
        }

        let user_config = dirs::config_dir().map(|dir| dir.join("replitex").join(config_path));
        if let Some(candidate) = &user_config {
            if candidate.exists() {
                return Ok(candidate.clone());
            }
        }

        let exe_config = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(config_path)));
        if let Some(candidate) = &exe_config {
            if candidate.exists() {
                return Ok(candidate.clone());
            }
        }

        let mut tried_locations = vec![
            config_path.display().to_string(),
            in_working_dir.display().to_string(),
        ];
        tried_locations.extend(user_config.iter().map(|p| p.display().to_string()));
        tried_locations.extend(exe_config.iter().map(|p| p.display().to_string()));

        Err(format!(
            "Config file '{}' not found. Searched in:\n  - {}",
            config_path.display(),
            tried_locations.join("\n  - ")
        )
        .into())
    }

    /// Loads a `ConfigFile` from a YAML file.
    pub fn load(path: &Path) -> Result<ConfigFile> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }
}

fn normalize_keyword(keyword: &str) -> Option<String> {
    let keyword = keyword.trim();
    (!keyword.is_empty()).then(|| keyword.to_lowercase())
}

fn normalize_extension(extension: &str) -> Option<String> {
    let extension = extension.trim().to_lowercase();
    match extension.as_str() {
        "" | "." => None,
        e if e.starts_with('.') => Some(extension),
        _ => Some(format!(".{extension}")),
    }
}

/// Makes `path` absolute and removes `.` and `..` components without
/// touching the filesystem.
pub fn absolute_clean(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_sets() {
        let dir = TempDir::new().unwrap();
        let mut config = Configuration::new(dir.path(), "foo", "bar");
        config.ignored_keywords = ["  Temp ", "", "CACHE"].iter().map(|s| s.to_string()).collect();
        config.ignored_extensions = ["PNG", ".Log", " ", "."].iter().map(|s| s.to_string()).collect();
        config.ignored_paths = [dir.path().join("a/./b/../c")].into_iter().collect();

        let config = config.normalize().unwrap();

        let keywords: Vec<_> = config.ignored_keywords.iter().cloned().collect();
        assert_eq!(keywords, vec!["cache", "temp"]);
        let extensions: Vec<_> = config.ignored_extensions.iter().cloned().collect();
        assert_eq!(extensions, vec![".log", ".png"]);
        assert!(config.ignored_paths.contains(&dir.path().join("a").join("c")));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let dir = TempDir::new().unwrap();

        let config = Configuration::new(dir.path(), "   ", "x").normalize().unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Configuration::new(dir.path().join("missing"), "a", "b")
            .normalize()
            .unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let config = Configuration::new(&file, "a", "b").normalize().unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Configuration::new(dir.path(), "a", "b");
        config.encodings = vec!["klingon".to_string()];
        assert!(matches!(config.validate(), Err(Error::UnknownEncoding(_))));

        let config = Configuration::new(dir.path(), "a", "b").normalize().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_overlay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("replitex.yaml");
        fs::write(
            &path,
            "find: Old\nreplace: New\nwhole_word: true\nmode: tree-copy\nignored_keywords: [temp]\nignored_extensions: [lock]\n",
        )
        .unwrap();

        let found = ConfigLoader::find_config(Path::new("replitex.yaml"), dir.path()).unwrap();
        assert_eq!(found, path);

        let file = ConfigLoader::load(&found).unwrap();
        let mut config = Configuration::new(dir.path(), "", "");
        config.apply_file(file);
        let config = config.normalize().unwrap();

        assert_eq!(config.search, "Old");
        assert_eq!(config.replacement, "New");
        assert!(config.whole_word);
        assert_eq!(config.mode, Mode::TreeCopy);
        assert!(config.ignored_keywords.contains("temp"));
        assert!(config.ignored_extensions.contains(".lock"));
    }

    #[test]
    fn test_missing_config_lists_locations() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::find_config(Path::new("nope-replitex.yaml"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Searched in"));
    }
}
