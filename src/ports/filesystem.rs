//! Filesystem port for artifact I/O.

use std::path::Path;

use chrono::{DateTime, Utc};

/// Error type returned by the filesystem port.
pub type FsError = Box<dyn std::error::Error + Send + Sync>;

/// Size and modification time of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    /// Length of the file in bytes.
    pub len: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Provides filesystem access for reading and writing workflow artifacts.
///
/// The filesystem is the only source of workflow state, so every status
/// query and every transition goes through this trait. Abstracting it lets
/// tests control modification times and inject write failures.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Writes the given contents to a file, creating parent directories and
    /// overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entry names in a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;

    /// Returns size and modification time, or `None` when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but cannot be inspected.
    fn metadata(&self, path: &Path) -> Result<Option<FileMeta>, FsError>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Creates a file only if it does not exist yet.
    ///
    /// Returns `Ok(false)` when the file already exists.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the file already existing.
    fn create_new(&self, path: &Path, contents: &str) -> Result<bool, FsError>;
}
