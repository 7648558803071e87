//! Atomic file writer for cassette files

use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes to a sibling temporary file and links it into place on commit
///
/// A writer dropped without committing removes its temporary file, so a
/// failed recording never leaves a partial cassette behind.
pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: File,
}

impl AtomicWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let final_path = path.as_ref().to_path_buf();

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = Self::temp_path(&final_path);
        let file = File::create(&temp_path)?;

        Ok(Self {
            temp_path,
            final_path,
            file,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    /// Move the file into place only if nothing exists at the destination
    ///
    /// The check and the move are a single filesystem operation (a hard link),
    /// so two writers racing for the same path cannot both succeed.
    pub fn commit_new(self) -> StorageResult<()> {
        let (temp_path, final_path) = self.finish()?;
        let linked = fs::hard_link(&temp_path, &final_path);
        let _ = fs::remove_file(&temp_path);
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(final_path))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish(mut self) -> StorageResult<(PathBuf, PathBuf)> {
        self.file.flush()?;
        self.file.sync_all()?;

        let temp_path = self.temp_path.clone();
        let final_path = self.final_path.clone();

        // Keep Drop from deleting the temp file before it is moved
        std::mem::forget(self);
        Ok((temp_path, final_path))
    }

    fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}
