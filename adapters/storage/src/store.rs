use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::StorageError;

/// Durable key-value medium holding at most one snapshot.
pub trait SnapshotStore {
    /// Returns the stored snapshot text, if any.
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replaces the stored snapshot text.
    fn write(&mut self, contents: &str) -> Result<(), StorageError>;

    /// Deletes the stored snapshot; succeeds when nothing is stored.
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Snapshot kept in a single file on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            location: self.path.display().to_string(),
            source,
        }
    }
}

impl SnapshotStore for FileStore {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            // Non-UTF-8 bytes are corrupt data rather than a storage failure.
            Err(error) if error.kind() == io::ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, contents).map_err(|error| self.io_error(error))?;
        fs::rename(&staging, &self.path).map_err(|error| self.io_error(error))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error(error)),
        }
    }
}

/// Snapshot kept in memory; used by tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    contents: Option<String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding the provided text.
    #[must_use]
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    /// Stored text, if any.
    #[must_use]
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        self.contents = Some(contents.to_owned());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.contents = None;
        Ok(())
    }
}
