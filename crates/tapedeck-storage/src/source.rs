//! Where cassettes are loaded from

use crate::error::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CASSETTE_EXTENSION: &str = "yaml";

/// A read-only bundle of cassette files
///
/// Implementations return `(name, yaml_text)` pairs. Names are `/`-separated
/// paths relative to the bundle root without the `.yaml` extension.
pub trait CassetteSource: Send + Sync {
    fn read_all(&self) -> StorageResult<Vec<(String, String)>>;

    /// Human-readable location for log lines
    fn describe(&self) -> String;
}

/// Reject names that could escape the cassettes directory
pub fn validate_name(name: &str) -> StorageResult<()> {
    let invalid = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.contains('\0')
        || name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Cassettes stored as `*.yaml` files under a directory tree
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, out: &mut Vec<(String, String)>) -> StorageResult<()> {
        let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk(&path, out)?;
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(CASSETTE_EXTENSION) {
                continue;
            }
            let Some(name) = self.name_for(&path) else {
                continue;
            };
            debug!("Reading cassette {} from {}", name, path.display());
            let text = String::from_utf8(fs::read(&path)?).map_err(|e| {
                StorageError::MalformedCassetteAsset {
                    file: format!("{}.{}", name, CASSETTE_EXTENSION),
                    reason: e.to_string(),
                }
            })?;
            out.push((name, text));
        }
        Ok(())
    }

    fn name_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

impl CassetteSource for DirSource {
    fn read_all(&self) -> StorageResult<Vec<(String, String)>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        self.walk(&self.root, &mut out)?;
        Ok(out)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Cassettes held in memory, for tests and embedded fixtures
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, yaml: impl Into<String>) -> Self {
        self.files.insert(name.into(), yaml.into());
        self
    }
}

impl CassetteSource for MemorySource {
    fn read_all(&self) -> StorageResult<Vec<(String, String)>> {
        Ok(self
            .files
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn describe(&self) -> String {
        format!("memory ({} cassettes)", self.files.len())
    }
}
