//! The flat storage directory.
//!
//! `Storage` is the only place where a client-supplied name becomes an
//! on-disk path, and it always runs the name through the sanitizer first.
//! The directory itself is the source of truth: nothing is cached or
//! indexed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{self, File};
use tokio::io::ErrorKind;
use tracing::info;
use uuid::Uuid;

use crate::atomic::{AtomicFile, TEMP_PREFIX, sweep_stale};
use crate::sanitize::sanitize_filename;

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

/// A sanitized name and the path it maps to inside the root.
#[derive(Debug)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Creates the root (with parents), checks that it is writable and
    /// removes upload temp files a previous process left behind.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        let check = self.root.join(format!(".fileshelf-write-check-{}", Uuid::new_v4()));
        fs::write(&check, b"").await?;
        fs::remove_file(&check).await?;
        let removed = sweep_stale(&self.root).await?;
        if removed > 0 {
            info!(removed, "removed stale upload temp files");
        }
        Ok(())
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Maps a requested name to a direct child of the root.
    ///
    /// With `allow_missing_leaf` unset a missing file is an `Io(NotFound)`.
    pub async fn locate(
        &self,
        requested: &str,
        allow_missing_leaf: bool,
    ) -> Result<StoredFile, StorageError> {
        let name = sanitize_filename(requested).ok_or(StorageError::InvalidName)?;
        let path = self.root.join(&name);
        if path.parent() != Some(self.root.as_path()) {
            return Err(StorageError::InvalidName);
        }

        match fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(StorageError::InvalidName);
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound && allow_missing_leaf => {}
            Err(err) => return Err(StorageError::Io(err)),
        }

        Ok(StoredFile { name, path })
    }

    /// Lists the root without recursing.
    ///
    /// Entries come back in directory enumeration order, which depends on
    /// the OS and filesystem and is not alphabetical. Only in-flight upload
    /// temp files are skipped.
    pub async fn list_entries(&self) -> Result<Vec<FileEntry>, StorageError> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Removed between enumeration and stat.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            entries.push(FileEntry {
                name,
                is_dir: metadata.is_dir(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(format_timestamp),
            });
        }

        Ok(entries)
    }

    /// Opens a stored file for reading.
    pub async fn open_file(
        &self,
        requested: &str,
    ) -> Result<(StoredFile, File, Metadata), StorageError> {
        let stored = self.locate(requested, false).await?;
        if fs::metadata(&stored.path).await?.is_dir() {
            return Err(StorageError::NotAFile);
        }
        let file = File::open(&stored.path).await?;
        let metadata = file.metadata().await?;
        verify_opened(&stored.path, &metadata).await?;
        Ok((stored, file, metadata))
    }

    /// Starts a write that replaces `requested` once finalized.
    pub async fn begin_write(
        &self,
        requested: &str,
    ) -> Result<(StoredFile, AtomicFile), StorageError> {
        let stored = self.locate(requested, true).await?;
        if fs::metadata(&stored.path)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
        {
            return Err(StorageError::NotAFile);
        }
        let atomic = AtomicFile::new(&stored.path).await?;
        Ok((stored, atomic))
    }

    pub async fn delete_file(&self, requested: &str) -> Result<StoredFile, StorageError> {
        let stored = self.locate(requested, false).await?;
        let metadata = fs::metadata(&stored.path).await?;
        if metadata.is_dir() {
            return Err(StorageError::NotAFile);
        }
        fs::remove_file(&stored.path).await?;
        Ok(stored)
    }
}

/// Checks that the opened handle is the entry `locate` vetted, so a symlink
/// swapped in before the open is not followed.
async fn verify_opened(path: &Path, opened: &Metadata) -> Result<(), StorageError> {
    let entry = fs::symlink_metadata(path).await?;
    if entry.file_type().is_symlink() || opened.is_dir() {
        return Err(StorageError::InvalidName);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if entry.dev() != opened.dev() || entry.ino() != opened.ino() {
            return Err(StorageError::InvalidName);
        }
    }
    Ok(())
}

fn format_timestamp(timestamp: SystemTime) -> String {
    let datetime: DateTime<Utc> = timestamp.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug)]
pub enum StorageError {
    InvalidName,
    NotAFile,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<String>,
}
