use std::path::Path;

/// Returns a name that does not exist yet inside `dir`.
///
/// `original` is returned unchanged when `dir/original` is free. Otherwise the
/// name is split into base and extension and `base_2.ext`, `base_3.ext`, ...
/// are probed until one is free. Probing always asks the real filesystem.
pub fn unique_name(original: &str, dir: &Path) -> String {
    if !exists(&dir.join(original)) {
        return original.to_string();
    }

    let (base, ext) = split_extension(original);
    (2u64..)
        .map(|n| format!("{base}_{n}{ext}"))
        .find(|candidate| !exists(&dir.join(candidate)))
        .unwrap_or_else(|| original.to_string())
}

/// Splits `name` into base and extension (with its dot). A leading dot does
/// not start an extension, so `.env` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if !name[..idx].trim_start_matches('.').is_empty() => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Like `Path::exists`, but also sees dangling symlinks.
pub fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_free_name_is_unchanged() {
        let dir = TempDir::new().unwrap();
        assert_eq!(unique_name("note.txt", dir.path()), "note.txt");
    }

    #[test]
    fn test_suffix_increments_past_taken_names() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.txt"), "a").unwrap();
        assert_eq!(unique_name("note.txt", dir.path()), "note_2.txt");

        fs::write(dir.path().join("note_2.txt"), "b").unwrap();
        assert_eq!(unique_name("note.txt", dir.path()), "note_3.txt");
    }

    #[test]
    fn test_directories_and_dot_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join(".env"), "").unwrap();
        assert_eq!(unique_name("assets", dir.path()), "assets_2");
        assert_eq!(unique_name(".env", dir.path()), ".env_2");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("..hidden.txt"), ("..hidden", ".txt"));
    }
}
