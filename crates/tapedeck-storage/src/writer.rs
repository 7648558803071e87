//! Persisting newly recorded cassettes

use crate::atomic_writer::AtomicWriter;
use crate::error::{StorageError, StorageResult};
use crate::source::validate_name;
use std::fs;
use std::path::{Path, PathBuf};
use tapedeck_core::Cassette;
use tracing::info;

/// Writes new cassette files under a root directory
///
/// Existing files are never overwritten.
#[derive(Debug, Clone)]
pub struct CassetteWriter {
    root: PathBuf,
}

impl CassetteWriter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a cassette name
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.yaml", name)))
    }

    pub fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.path_for(name)?.exists())
    }

    /// Create the root directory if it does not exist yet
    pub fn ensure_root(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Write `cassette` as a new file, failing if one already exists
    pub fn write_new(&self, cassette: &Cassette) -> StorageResult<PathBuf> {
        let path = self.path_for(&cassette.name)?;
        if path.exists() {
            return Err(StorageError::AlreadyExists(path));
        }

        let yaml = cassette
            .to_yaml()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut writer = AtomicWriter::new(&path)?;
        writer.write(b"---\n")?;
        writer.write(yaml.as_bytes())?;
        writer.commit_new()?;

        info!(
            "Wrote cassette {} ({} interactions) to {}",
            cassette.name,
            cassette.interactions.len(),
            path.display()
        );
        Ok(path)
    }
}
