//! Reports directory
//!
//! Artifacts are written under a single directory with a per-kind prefix and a
//! UTC timestamp. Existing files are never overwritten.

use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const MAX_SUFFIX: u32 = 1000;

/// Errors from reading or writing the reports directory
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

impl StoreError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// The artifact families kept in the reports directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Introspect,
    CompareDbModels,
    CompareModelsDoc,
    Summary,
}

impl ArtifactKind {
    pub const COMPARISONS: [ArtifactKind; 2] = [ArtifactKind::CompareDbModels, ArtifactKind::CompareModelsDoc];

    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Introspect => "introspect_",
            ArtifactKind::CompareDbModels => "compare_db_models_",
            ArtifactKind::CompareModelsDoc => "compare_models_doc_",
            ArtifactKind::Summary => "summary_",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Summary => "md",
            _ => "json",
        }
    }

    /// Command that produces this artifact
    pub fn command(&self) -> &'static str {
        match self {
            ArtifactKind::Introspect => "introspect",
            ArtifactKind::CompareDbModels => "compare-db-models",
            ArtifactKind::CompareModelsDoc => "compare-models-doc",
            ArtifactKind::Summary => "report",
        }
    }

    fn matches(&self, path: &Path) -> bool {
        let extension_ok = path.extension().and_then(|e| e.to_str()) == Some(self.extension());
        let prefix_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(self.prefix()));
        extension_ok && prefix_ok
    }
}

/// Handle on the reports directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new artifact, creating the directory if needed
    ///
    /// The file name carries a microsecond timestamp; on a collision a numeric
    /// suffix is appended rather than replacing the existing file.
    pub fn write_new(&self, kind: ArtifactKind, contents: &[u8]) -> Result<PathBuf, StoreError> {
        self.write_new_as(kind, kind.extension(), contents)
    }

    /// Like [`write_new`](Self::write_new) with an explicit file extension
    pub fn write_new_as(&self, kind: ArtifactKind, extension: &str, contents: &[u8]) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string();

        for attempt in 0..MAX_SUFFIX {
            let name = if attempt == 0 {
                format!("{}{}.{}", kind.prefix(), stamp, extension)
            } else {
                format!("{}{}_{}.{}", kind.prefix(), stamp, attempt, extension)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    fill(file, &path, contents)?;
                    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }

        Err(StoreError::Io {
            path: self.dir.clone(),
            message: format!("no free file name for {}{}", kind.prefix(), stamp),
        })
    }

    /// All artifacts of a kind, oldest first
    ///
    /// A missing directory yields an empty list.
    pub fn list(&self, kind: ArtifactKind) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() || !kind.matches(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| StoreError::io(&path, e))?;
            found.push((modified, path));
        }

        // Ties on mtime fall back to the name, which embeds the timestamp
        found.sort();
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    /// Most recently modified artifact of a kind
    pub fn latest(&self, kind: ArtifactKind) -> Result<Option<PathBuf>, StoreError> {
        Ok(self.list(kind)?.pop())
    }

    /// Read and decode a JSON artifact
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Write `contents`, removing `path` if the write does not complete
fn fill(mut file: impl Write, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Err(e) = file.write_all(contents).and_then(|()| file.flush()) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial artifact");
        }
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_creates_directory() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("reports"));

        let path = store.write_new(ArtifactKind::Introspect, b"{}").unwrap();

        assert!(path.starts_with(temp.path().join("reports")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("introspect_"));
        assert!(name.ends_with(".json"));
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn writes_never_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());

        let paths: Vec<PathBuf> = (0..5)
            .map(|i| store.write_new(ArtifactKind::Summary, format!("# {}", i).as_bytes()).unwrap())
            .collect();

        let mut unique = paths.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert_eq!(store.list(ArtifactKind::Summary).unwrap().len(), 5);
    }

    #[test]
    fn explicit_extension() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());

        let path = store.write_new_as(ArtifactKind::Summary, "json", b"[]").unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("summary_"));
        assert!(name.ends_with(".json"));
        assert!(store.list(ArtifactKind::Summary).unwrap().is_empty());
    }

    #[test]
    fn kinds_are_kept_apart() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());

        store.write_new(ArtifactKind::CompareDbModels, b"{}").unwrap();
        store.write_new(ArtifactKind::CompareModelsDoc, b"{}").unwrap();
        fs::write(temp.path().join("compare_db_models_notes.txt"), "ignored").unwrap();

        assert_eq!(store.list(ArtifactKind::CompareDbModels).unwrap().len(), 1);
        assert_eq!(store.list(ArtifactKind::CompareModelsDoc).unwrap().len(), 1);
        assert!(store.latest(ArtifactKind::Introspect).unwrap().is_none());
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_artifact() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        let path = temp.path().join("introspect_20261018_120000_000000.json");
        fs::write(&path, b"").unwrap();

        let err = fill(FullDisk, &path, b"{\"schema\": {}}").unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.to_string().contains("no space left on device"));
        assert!(!path.exists());
        assert!(store.latest(ArtifactKind::Introspect).unwrap().is_none());
    }

    #[test]
    fn missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("absent"));

        assert!(store.list(ArtifactKind::Introspect).unwrap().is_empty());
        assert!(store.latest(ArtifactKind::Introspect).unwrap().is_none());
    }

    #[test]
    fn load_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        let path = store.write_new(ArtifactKind::Introspect, b"not json").unwrap();

        let err = store.load::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
