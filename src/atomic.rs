//! Temp-file writes published by rename.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use uuid::Uuid;

/// Name prefix of in-flight upload files inside the storage root.
///
/// Sanitized names never start with `.`, so these never collide with a
/// stored file.
pub const TEMP_PREFIX: &str = ".fileshelf-upload-";

/// A hidden temp file next to its target, renamed over it on `finalize`.
///
/// Dropping it without `finalize` (an aborted or cancelled upload) removes
/// the temp file.
pub struct AtomicFile {
    target: PathBuf,
    // Declared before `guard` so the handle is closed before removal.
    file: File,
    guard: TempGuard,
}

/// Removes the temp file on drop unless disarmed.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl AtomicFile {
    pub async fn new(target: &Path) -> io::Result<Self> {
        let parent = target.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "target has no parent directory")
        })?;
        let temp_path = parent.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let file = File::create(&temp_path).await?;
        Ok(Self {
            target: target.to_path_buf(),
            file,
            guard: TempGuard {
                path: temp_path,
                armed: true,
            },
        })
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Closes the handle and removes the temp file.
    pub async fn cleanup(self) {
        let AtomicFile {
            file, mut guard, ..
        } = self;
        drop(file);
        let _ = fs::remove_file(&guard.path).await;
        guard.disarm();
    }

    /// Flushes, closes and renames the temp file over the target.
    ///
    /// An existing target is replaced; concurrent writers race and the last
    /// rename wins. On error the temp file is removed when `guard` drops.
    pub async fn finalize(self) -> io::Result<()> {
        let AtomicFile {
            target,
            file,
            mut guard,
        } = self;
        file.sync_all().await?;
        drop(file);

        if let Err(err) = fs::rename(&guard.path, &target).await {
            #[cfg(windows)]
            {
                if fs::remove_file(&target).await.is_ok()
                    && fs::rename(&guard.path, &target).await.is_ok()
                {
                    guard.disarm();
                    return Ok(());
                }
            }
            return Err(err);
        }

        guard.disarm();
        Ok(())
    }
}

/// Removes temp files left behind by a previous process in `dir`.
pub async fn sweep_stale(dir: &Path) -> io::Result<usize> {
    let mut entries = fs::read_dir(dir).await?;
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX)
            && fs::remove_file(entry.path()).await.is_ok()
        {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn finalize_replaces_target() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("data.bin");
        std::fs::write(&target, b"old").expect("seed target");

        let mut atomic = AtomicFile::new(&target).await.expect("atomic");
        atomic.file_mut().write_all(b"new").await.expect("write");
        atomic.finalize().await.expect("finalize");

        assert_eq!(std::fs::read(&target).expect("read"), b"new");
        let leftovers = std::fs::read_dir(temp.path())
            .expect("read_dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn cleanup_leaves_target_untouched() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("data.bin");
        std::fs::write(&target, b"keep").expect("seed target");

        let mut atomic = AtomicFile::new(&target).await.expect("atomic");
        atomic.file_mut().write_all(b"partial").await.expect("write");
        atomic.cleanup().await;

        assert_eq!(std::fs::read(&target).expect("read"), b"keep");
        assert_eq!(std::fs::read_dir(temp.path()).expect("read_dir").count(), 1);
    }

    #[tokio::test]
    async fn dropping_unfinished_write_removes_temp_file() {
        let temp = tempdir().expect("tempdir");
        let target = temp.path().join("data.bin");

        let mut atomic = AtomicFile::new(&target).await.expect("atomic");
        atomic.file_mut().write_all(b"partial").await.expect("write");
        assert_eq!(std::fs::read_dir(temp.path()).expect("read_dir").count(), 1);
        drop(atomic);

        assert_eq!(std::fs::read_dir(temp.path()).expect("read_dir").count(), 0);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn sweep_removes_only_temp_files() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join(format!("{TEMP_PREFIX}stale")), b"x").expect("write");
        std::fs::write(temp.path().join("kept.txt"), b"x").expect("write");

        let removed = sweep_stale(temp.path()).await.expect("sweep");

        assert_eq!(removed, 1);
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .expect("read_dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["kept.txt".to_string()]);
    }
}
