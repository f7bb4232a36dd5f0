//! Single-level undo ledger and the restoration procedures it dispatches to.
//!
//! The ledger holds at most one record: each new deletion replaces the prior
//! record wholesale, so undo always reverses exactly the most recent
//! destructive operation. State persists as one JSON document at a fixed
//! per-user path and is overwritten atomically on every record.

use std::fs;
use std::path::PathBuf;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::archive::{restore_rows, BackupPayload};
use crate::backup::{self, BackupHandle};
use crate::config::DataDirs;
use crate::error::{Result, SweepError};
use crate::schema::{table_exists, ThumbnailTable};

/// The single persisted description of the most recent reversible deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UndoRecord {
    Models {
        files: Vec<String>,
    },
    Projects {
        names: Vec<String>,
    },
    Images {
        project: String,
        rowids: Vec<i64>,
        data: BackupPayload,
    },
}

/// Counts from one restoration pass. Skipped items (already present, backup
/// missing, per-item I/O failure) make a degraded success, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub restored: usize,
    pub skipped: usize,
}

/// Single-slot, file-backed undo store. Load once at startup, pass by
/// mutable reference to every operation that records or consumes undo state.
pub struct UndoLedger {
    dirs: DataDirs,
    current: Option<UndoRecord>,
}

impl UndoLedger {
    /// Load pending undo state from disk. A missing or unreadable document
    /// means no pending undo; corruption is discarded, never fatal.
    pub fn load(dirs: DataDirs) -> Self {
        let current = match fs::read_to_string(dirs.undo_file()) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!(
                        "Discarding corrupt undo file {}: {}",
                        dirs.undo_file().display(),
                        e
                    );
                    None
                }
            },
            Err(_) => None,
        };
        Self { dirs, current }
    }

    pub fn has_pending(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&UndoRecord> {
        self.current.as_ref()
    }

    /// Record a new operation, replacing any prior unconsumed record.
    pub fn record(&mut self, record: UndoRecord) {
        self.current = Some(record);
        if let Err(e) = self.persist() {
            log::warn!("Failed to persist undo state: {}", e);
        }
    }

    /// Drop any pending record without restoring. Idempotent.
    pub fn clear(&mut self) {
        self.current = None;
        if self.dirs.undo_file().exists() {
            if let Err(e) = fs::remove_file(self.dirs.undo_file()) {
                log::warn!("Failed to remove undo file: {}", e);
            }
        }
    }

    /// Reverse the recorded deletion. Clears the record only on success;
    /// on failure the record stays so the operator can retry or inspect.
    pub fn consume_and_restore(&mut self) -> Result<RestoreOutcome> {
        let record = self.current.as_ref().ok_or(SweepError::NoPendingUndo)?;
        let outcome = match record {
            UndoRecord::Models { files } => self.restore_models(files),
            UndoRecord::Projects { names } => self.restore_projects(names),
            UndoRecord::Images { project, data, .. } => self.restore_images(project, data)?,
        };
        self.clear();
        log::info!(
            "Undo completed: {} restored, {} skipped",
            outcome.restored,
            outcome.skipped
        );
        Ok(outcome)
    }

    // Write-to-sibling-then-rename so a crash mid-write never leaves a
    // half-written document at the well-known path.
    fn persist(&self) -> std::io::Result<()> {
        let Some(record) = &self.current else {
            return Ok(());
        };
        let path = self.dirs.undo_file();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string(record).map_err(std::io::Error::other)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }

    // ── Restoration procedures ──────────────────────────────

    fn restore_models(&self, files: &[String]) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();
        for file in files {
            let live = self.dirs.model_path(file);
            if live.exists() {
                log::warn!("Model file {} still exists, skipping", file);
                outcome.skipped += 1;
                continue;
            }
            match BackupHandle::for_existing(&live) {
                Some(handle) => match backup::restore(&handle) {
                    Ok(()) => {
                        log::info!("Restored model: {}", file);
                        outcome.restored += 1;
                    }
                    Err(e) => {
                        log::error!("Failed to restore model {}: {}", file, e);
                        outcome.skipped += 1;
                    }
                },
                None => {
                    log::warn!("Backup not found for model: {}", file);
                    outcome.skipped += 1;
                }
            }
        }
        log::info!("Restored {} model files", outcome.restored);
        outcome
    }

    fn restore_projects(&self, names: &[String]) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();
        for name in names {
            let primary = self.dirs.project_db_path(name);
            match BackupHandle::for_existing(&primary) {
                Some(handle) => match backup::restore(&handle) {
                    Ok(()) => {
                        // Side files come along when their backups survived.
                        for side in self.dirs.project_side_paths(name) {
                            if let Some(side_handle) = BackupHandle::for_existing(&side) {
                                if let Err(e) = backup::restore(&side_handle) {
                                    log::warn!(
                                        "Failed to restore {}: {}",
                                        side.display(),
                                        e
                                    );
                                }
                            }
                        }
                        log::info!("Restored project database: {}", name);
                        outcome.restored += 1;
                    }
                    Err(e) => {
                        log::error!("Failed to restore project {}: {}", name, e);
                        outcome.skipped += 1;
                    }
                },
                None => {
                    log::warn!("Backup not found for project: {}", name);
                    outcome.skipped += 1;
                }
            }
        }
        log::info!("Restored {} projects", outcome.restored);
        outcome
    }

    fn restore_images(&self, project: &str, data: &BackupPayload) -> Result<RestoreOutcome> {
        let db_path = self.dirs.project_db_path(project);
        if !db_path.exists() {
            log::warn!(
                "Project {} database not found, cannot restore images",
                project
            );
            return Err(SweepError::ProjectNotFound(project.to_string()));
        }

        let mut conn = Connection::open(&db_path)?;
        let tx = conn.transaction()?;
        let mut outcome = RestoreOutcome::default();

        for (name, bytes) in restore_rows(&data.tensors)? {
            tx.execute(
                "INSERT INTO tensors (name, data) VALUES (?1, ?2)",
                params![name, bytes],
            )?;
            outcome.restored += 1;
        }

        for table in ThumbnailTable::PROBE_ORDER {
            let bucket = data.bucket(table);
            if bucket.is_empty() {
                continue;
            }
            if !table_exists(&tx, table.table_name())? {
                log::warn!(
                    "Table {} no longer exists, skipping {} thumbnail rows",
                    table.table_name(),
                    bucket.len()
                );
                outcome.skipped += bucket.len();
                continue;
            }
            // OR REPLACE keeps this idempotent against a partial prior restore.
            let sql = format!(
                "INSERT OR REPLACE INTO {} (rowid, p) VALUES (?1, ?2)",
                table.table_name()
            );
            for (rowid, bytes) in restore_rows(bucket)? {
                let rowid: i64 = rowid.parse().map_err(|_| {
                    SweepError::CorruptRecord(format!("non-integer thumbnail rowid '{rowid}'"))
                })?;
                tx.execute(&sql, params![rowid, bytes])?;
                outcome.restored += 1;
            }
        }

        tx.commit()?;
        // Known limitation inherited from the backup format: tensorhistorynode
        // row content is not captured at delete time, so it cannot be
        // resurrected here. Tensors and thumbnails are the recoverable state.
        log::warn!(
            "tensorhistorynode rows for project '{}' are not restored",
            project
        );
        Ok(outcome)
    }
}
