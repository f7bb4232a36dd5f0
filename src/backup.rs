//! Hidden-sibling file backups.
//!
//! A backup of `model.ckpt` lives at `.model.ckpt.backup` in the same
//! directory, so its existence is discoverable from the original path alone
//! and no separate index is needed. Backing up copies; restoring moves the
//! copy back, leaving no residual backup file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SweepError};

/// Derive the hidden backup path for a file: `.<name>.backup` next to it.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.backup"))
}

/// A file paired with its hidden sibling backup location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    original: PathBuf,
    backup: PathBuf,
}

impl BackupHandle {
    pub fn new(original: impl Into<PathBuf>) -> Self {
        let original = original.into();
        let backup = backup_path_for(&original);
        Self { original, backup }
    }

    /// Rediscover a backup by name. None if no backup file is on disk.
    pub fn for_existing(original: impl Into<PathBuf>) -> Option<Self> {
        let handle = Self::new(original);
        handle.backup.exists().then_some(handle)
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn backup_file(&self) -> &Path {
        &self.backup
    }
}

/// Copy `path` to its hidden sibling backup. The source is left in place;
/// fails if the source is missing or the copy fails.
pub fn backup(path: &Path) -> Result<BackupHandle> {
    let handle = BackupHandle::new(path);
    fs::copy(&handle.original, &handle.backup)
        .map_err(|e| SweepError::io(&handle.original, e))?;
    Ok(handle)
}

/// Move the backup copy back to the original location. Fails if the backup
/// is missing.
pub fn restore(handle: &BackupHandle) -> Result<()> {
    fs::rename(&handle.backup, &handle.original).map_err(|e| SweepError::io(&handle.backup, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_naming() {
        let p = Path::new("/data/Documents/Models/dream.safetensors");
        assert_eq!(
            backup_path_for(p),
            PathBuf::from("/data/Documents/Models/.dream.safetensors.backup")
        );
    }

    #[test]
    fn test_backup_copies_and_restore_moves_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.ckpt");
        fs::write(&file, b"weights").unwrap();

        let handle = backup(&file).unwrap();
        assert!(file.exists(), "source must survive a backup");
        assert_eq!(fs::read(handle.backup_file()).unwrap(), b"weights");

        fs::remove_file(&file).unwrap();
        restore(&handle).unwrap();
        assert_eq!(fs::read(&file).unwrap(), b"weights");
        assert!(!handle.backup_file().exists(), "restore must consume the backup");
    }

    #[test]
    fn test_backup_of_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = backup(&dir.path().join("absent.ckpt")).unwrap_err();
        assert!(matches!(err, SweepError::Io { .. }));
    }

    #[test]
    fn test_restore_of_missing_backup_fails() {
        let dir = tempfile::tempdir().unwrap();
        let handle = BackupHandle::new(dir.path().join("model.ckpt"));
        assert!(restore(&handle).is_err());
    }

    #[test]
    fn test_for_existing_requires_backup_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.ckpt");
        assert!(BackupHandle::for_existing(&file).is_none());

        fs::write(&file, b"w").unwrap();
        backup(&file).unwrap();
        assert!(BackupHandle::for_existing(&file).is_some());
    }
}
