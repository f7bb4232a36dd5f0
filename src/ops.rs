//! Deletion operations for the three entity classes.
//!
//! Each operation backs its targets up before removing them and records the
//! outcome in the undo ledger. Passing `None` for the ledger is a hard
//! delete: no backups, no undo. Batch operations (models, projects) process
//! every identifier independently and return exactly the subset that was
//! actually removed; a bad identifier never aborts the rest of the batch.

use std::fs;
use std::path::PathBuf;

use rusqlite::{params_from_iter, Connection};

use crate::archive::{archive_rows, BackupPayload};
use crate::backup;
use crate::config::DataDirs;
use crate::error::{Result, SweepError};
use crate::schema::{self, ThumbnailTable};
use crate::undo::{UndoLedger, UndoRecord};

/// Extensions the host app uses for model weights. Anything else gets a
/// warning but is processed anyway.
const MODEL_EXTENSIONS: [&str; 2] = [".ckpt", ".safetensors"];

/// What an image deletion removed, plus the pre-delete count so callers can
/// implement their own "that was the last image" follow-up policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagesDeleted {
    pub deleted: usize,
    pub images_before: u64,
}

/// Delete model weight files by name. Returns the files actually removed;
/// missing files are reported and skipped.
pub fn delete_models(
    dirs: &DataDirs,
    ledger: Option<&mut UndoLedger>,
    files: &[String],
) -> Vec<String> {
    let mut deleted = Vec::new();

    for file in files {
        if !MODEL_EXTENSIONS.iter().any(|ext| file.ends_with(ext)) {
            log::warn!("{} may not be a valid model file, processing anyway", file);
        }

        let path = dirs.model_path(file);
        if !path.exists() {
            log::warn!("Model file not found: {}", file);
            continue;
        }

        if ledger.is_some() {
            if let Err(e) = backup::backup(&path) {
                log::error!("Failed to back up model {}, skipping: {}", file, e);
                continue;
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted model: {}", file);
                deleted.push(file.clone());
            }
            Err(e) => log::error!("Error deleting model {}: {}", file, e),
        }
    }

    if !deleted.is_empty() {
        if let Some(ledger) = ledger {
            ledger.record(UndoRecord::Models {
                files: deleted.clone(),
            });
        }
    }
    log::info!("Deleted {} of {} requested models", deleted.len(), files.len());
    deleted
}

/// Delete projects by name: the primary database plus whichever -shm/-wal
/// side files exist, treated as one unit. Returns the projects removed.
pub fn delete_projects(
    dirs: &DataDirs,
    ledger: Option<&mut UndoLedger>,
    names: &[String],
) -> Vec<String> {
    let mut deleted = Vec::new();

    'projects: for name in names {
        if !dirs.project_db_path(name).exists() {
            log::warn!("Project {} not found, skipping", name);
            continue;
        }

        let files: Vec<PathBuf> = dirs
            .project_file_paths(name)
            .into_iter()
            .filter(|p| p.exists())
            .collect();

        if ledger.is_some() {
            for path in &files {
                if let Err(e) = backup::backup(path) {
                    log::error!("Error backing up project {}, skipping: {}", name, e);
                    continue 'projects;
                }
            }
        }

        for path in &files {
            if let Err(e) = fs::remove_file(path) {
                log::error!("Error deleting {}: {}", path.display(), e);
                continue 'projects;
            }
        }

        log::info!("Deleted project: {}", name);
        deleted.push(name.clone());
    }

    if !deleted.is_empty() {
        if let Some(ledger) = ledger {
            ledger.record(UndoRecord::Projects {
                names: deleted.clone(),
            });
        }
    }
    log::info!("Deleted {} of {} requested projects", deleted.len(), names.len());
    deleted
}

/// Delete image rows from one project's database, archiving the affected
/// tensor and thumbnail blobs first. All reads and deletes happen in a
/// single transaction; the undo record is only written after commit, so a
/// database failure leaves both the project and the ledger untouched.
pub fn delete_images(
    dirs: &DataDirs,
    ledger: Option<&mut UndoLedger>,
    project: &str,
    rowids: &[i64],
) -> Result<ImagesDeleted> {
    let db_path = dirs.project_db_path(project);
    if !db_path.exists() {
        return Err(SweepError::ProjectNotFound(project.to_string()));
    }

    let mut conn = Connection::open(&db_path)?;
    let tx = conn.transaction()?;

    let images_before = schema::image_count(&tx)?;
    if rowids.is_empty() {
        return Ok(ImagesDeleted {
            deleted: 0,
            images_before,
        });
    }

    let tensor_keys: Vec<String> = rowids
        .iter()
        .map(|id| format!("tensor_history_{id}"))
        .collect();
    let key_marks = placeholders(tensor_keys.len());
    let id_marks = placeholders(rowids.len());

    let mut payload = BackupPayload::default();
    {
        let sql = format!("SELECT name, data FROM tensors WHERE name IN ({key_marks})");
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(&tensor_keys), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;
        let mut raw = Vec::new();
        for row in rows {
            raw.push(row?);
        }
        payload.tensors = archive_rows(raw);
    }

    for table in ThumbnailTable::PROBE_ORDER {
        if !schema::table_exists(&tx, table.table_name())? {
            continue;
        }
        let sql = format!(
            "SELECT rowid, p FROM {} WHERE rowid IN ({id_marks})",
            table.table_name()
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(rowids), |row| {
            Ok((row.get::<_, i64>(0)?.to_string(), row.get::<_, Vec<u8>>(1)?))
        })?;
        let mut raw = Vec::new();
        for row in rows {
            raw.push(row?);
        }
        *payload.bucket_mut(table) = archive_rows(raw);
    }

    if schema::table_exists(&tx, "tensorhistorynode")? {
        tx.execute(
            &format!("DELETE FROM tensorhistorynode WHERE rowid IN ({id_marks})"),
            params_from_iter(rowids),
        )?;
    }
    for table in ThumbnailTable::PROBE_ORDER {
        if schema::table_exists(&tx, table.table_name())? {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE rowid IN ({id_marks})",
                    table.table_name()
                ),
                params_from_iter(rowids),
            )?;
        }
    }
    tx.execute(
        &format!("DELETE FROM tensors WHERE name IN ({key_marks})"),
        params_from_iter(&tensor_keys),
    )?;

    tx.commit()?;

    if let Some(ledger) = ledger {
        ledger.record(UndoRecord::Images {
            project: project.to_string(),
            rowids: rowids.to_vec(),
            data: payload,
        });
    }

    log::info!("Deleted {} images from project '{}'", rowids.len(), project);
    Ok(ImagesDeleted {
        deleted: rowids.len(),
        images_before,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dirs() -> (tempfile::TempDir, DataDirs) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let documents = dir.path().join("Documents");
        fs::create_dir_all(documents.join("Models")).unwrap();
        let dirs = DataDirs::new(documents, dir.path().join("undo.json"));
        (dir, dirs)
    }

    fn write_models(dirs: &DataDirs, names: &[&str]) {
        for name in names {
            fs::write(dirs.model_path(name), format!("weights of {name}")).unwrap();
        }
    }

    /// Build a project database with tensors + half-node thumbnails for the
    /// given rowids, and a tensorhistorynode row per image.
    fn seed_project(dirs: &DataDirs, name: &str, rowids: &[i64]) {
        let conn = Connection::open(dirs.project_db_path(name)).unwrap();
        conn.execute_batch(
            "CREATE TABLE tensors (name TEXT, data BLOB);
             CREATE TABLE tensorhistorynode (note TEXT);
             CREATE TABLE thumbnailhistoryhalfnode (p BLOB);",
        )
        .unwrap();
        for id in rowids {
            conn.execute(
                "INSERT INTO tensors (name, data) VALUES (?1, ?2)",
                rusqlite::params![format!("tensor_history_{id}"), vec![*id as u8; 4]],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO tensorhistorynode (rowid, note) VALUES (?1, ?2)",
                rusqlite::params![id, "node"],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO thumbnailhistoryhalfnode (rowid, p) VALUES (?1, ?2)",
                rusqlite::params![id, vec![0xAB, *id as u8]],
            )
            .unwrap();
        }
    }

    fn thumb_rowids(dirs: &DataDirs, name: &str) -> Vec<i64> {
        let conn = Connection::open(dirs.project_db_path(name)).unwrap();
        let mut stmt = conn
            .prepare("SELECT rowid FROM thumbnailhistoryhalfnode ORDER BY rowid")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_delete_models_backs_up_and_removes() {
        let (_tmp, dirs) = test_dirs();
        write_models(&dirs, &["a.ckpt", "b.safetensors"]);
        let mut ledger = UndoLedger::load(dirs.clone());

        let deleted = delete_models(
            &dirs,
            Some(&mut ledger),
            &["a.ckpt".to_string(), "b.safetensors".to_string()],
        );
        assert_eq!(deleted, vec!["a.ckpt", "b.safetensors"]);
        assert!(!dirs.model_path("a.ckpt").exists());
        assert!(backup::backup_path_for(&dirs.model_path("a.ckpt")).exists());
        assert!(ledger.has_pending());
    }

    #[test]
    fn test_delete_models_then_undo_restores_everything() {
        let (_tmp, dirs) = test_dirs();
        write_models(&dirs, &["a.ckpt", "b.safetensors"]);
        let mut ledger = UndoLedger::load(dirs.clone());

        delete_models(
            &dirs,
            Some(&mut ledger),
            &["a.ckpt".to_string(), "b.safetensors".to_string()],
        );
        let outcome = ledger.consume_and_restore().unwrap();
        assert_eq!(outcome.restored, 2);
        assert_eq!(
            fs::read(dirs.model_path("a.ckpt")).unwrap(),
            b"weights of a.ckpt"
        );
        assert!(
            !backup::backup_path_for(&dirs.model_path("b.safetensors")).exists(),
            "restore must consume backups"
        );
        assert!(!ledger.has_pending());
    }

    #[test]
    fn test_delete_models_skips_missing_files() {
        let (_tmp, dirs) = test_dirs();
        write_models(&dirs, &["real.ckpt"]);
        let mut ledger = UndoLedger::load(dirs.clone());

        let deleted = delete_models(
            &dirs,
            Some(&mut ledger),
            &["ghost.ckpt".to_string(), "real.ckpt".to_string()],
        );
        assert_eq!(deleted, vec!["real.ckpt"]);
        assert!(
            !backup::backup_path_for(&dirs.model_path("ghost.ckpt")).exists(),
            "nothing to back up for a missing file"
        );
    }

    #[test]
    fn test_hard_delete_leaves_no_backup_or_record() {
        let (_tmp, dirs) = test_dirs();
        write_models(&dirs, &["a.ckpt"]);

        let deleted = delete_models(&dirs, None, &["a.ckpt".to_string()]);
        assert_eq!(deleted, vec!["a.ckpt"]);
        assert!(!backup::backup_path_for(&dirs.model_path("a.ckpt")).exists());
        assert!(!dirs.undo_file().exists());
    }

    #[test]
    fn test_second_deletion_replaces_undo_slot() {
        let (_tmp, dirs) = test_dirs();
        write_models(&dirs, &["first.ckpt", "second.ckpt"]);
        let mut ledger = UndoLedger::load(dirs.clone());

        delete_models(&dirs, Some(&mut ledger), &["first.ckpt".to_string()]);
        delete_models(&dirs, Some(&mut ledger), &["second.ckpt".to_string()]);
        ledger.consume_and_restore().unwrap();

        // Only the most recent deletion is reversible.
        assert!(dirs.model_path("second.ckpt").exists());
        assert!(!dirs.model_path("first.ckpt").exists());
    }

    #[test]
    fn test_delete_project_without_wal_side_file() {
        let (_tmp, dirs) = test_dirs();
        fs::write(dirs.project_db_path("trip"), b"db").unwrap();
        let [shm, _wal] = dirs.project_side_paths("trip");
        fs::write(&shm, b"shm").unwrap();
        let mut ledger = UndoLedger::load(dirs.clone());

        let deleted = delete_projects(&dirs, Some(&mut ledger), &["trip".to_string()]);
        assert_eq!(deleted, vec!["trip"]);
        assert!(!dirs.project_db_path("trip").exists());
        assert!(!shm.exists());

        let outcome = ledger.consume_and_restore().unwrap();
        assert_eq!(outcome.restored, 1);
        assert_eq!(fs::read(dirs.project_db_path("trip")).unwrap(), b"db");
        assert_eq!(fs::read(&shm).unwrap(), b"shm");
    }

    #[test]
    fn test_delete_projects_skips_unknown_names() {
        let (_tmp, dirs) = test_dirs();
        fs::write(dirs.project_db_path("kept"), b"db").unwrap();
        let deleted = delete_projects(
            &dirs,
            None,
            &["missing".to_string(), "kept".to_string()],
        );
        assert_eq!(deleted, vec!["kept"]);
    }

    #[test]
    fn test_delete_images_unknown_project_leaves_ledger_alone() {
        let (_tmp, dirs) = test_dirs();
        let mut ledger = UndoLedger::load(dirs.clone());
        let err = delete_images(&dirs, Some(&mut ledger), "nope", &[1, 2]).unwrap_err();
        assert!(matches!(err, SweepError::ProjectNotFound(_)));
        assert!(!ledger.has_pending());
    }

    #[test]
    fn test_delete_images_reports_pre_delete_count() {
        let (_tmp, dirs) = test_dirs();
        seed_project(&dirs, "trip", &[5, 7, 9]);
        let outcome = delete_images(&dirs, None, "trip", &[5, 7]).unwrap();
        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.images_before, 3);
        assert_eq!(thumb_rowids(&dirs, "trip"), vec![9]);
    }

    #[test]
    fn test_delete_images_then_undo_round_trips_blobs() {
        let (_tmp, dirs) = test_dirs();
        seed_project(&dirs, "trip", &[5, 7, 9]);
        let mut ledger = UndoLedger::load(dirs.clone());

        delete_images(&dirs, Some(&mut ledger), "trip", &[5, 7]).unwrap();
        assert_eq!(thumb_rowids(&dirs, "trip"), vec![9]);

        ledger.consume_and_restore().unwrap();
        assert_eq!(thumb_rowids(&dirs, "trip"), vec![5, 7, 9]);

        let conn = Connection::open(dirs.project_db_path("trip")).unwrap();
        let thumb: Vec<u8> = conn
            .query_row(
                "SELECT p FROM thumbnailhistoryhalfnode WHERE rowid = 5",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(thumb, vec![0xAB, 5]);
        let tensor: Vec<u8> = conn
            .query_row(
                "SELECT data FROM tensors WHERE name = 'tensor_history_7'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tensor, vec![7u8; 4]);
        assert!(!ledger.has_pending());
    }

    #[test]
    fn test_delete_images_tolerates_missing_thumbnail_tables() {
        let (_tmp, dirs) = test_dirs();
        let conn = Connection::open(dirs.project_db_path("old")).unwrap();
        conn.execute_batch("CREATE TABLE tensors (name TEXT, data BLOB);")
            .unwrap();
        conn.execute(
            "INSERT INTO tensors (name, data) VALUES ('tensor_history_3', x'03')",
            [],
        )
        .unwrap();
        drop(conn);

        let outcome = delete_images(&dirs, None, "old", &[3]).unwrap();
        assert_eq!(outcome.images_before, 0);

        let conn = Connection::open(dirs.project_db_path("old")).unwrap();
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM tensors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_delete_no_rowids_is_a_counted_noop() {
        let (_tmp, dirs) = test_dirs();
        seed_project(&dirs, "trip", &[1, 2]);
        let mut ledger = UndoLedger::load(dirs.clone());
        let outcome = delete_images(&dirs, Some(&mut ledger), "trip", &[]).unwrap();
        assert_eq!(outcome.deleted, 0);
        assert_eq!(outcome.images_before, 2);
        assert!(!ledger.has_pending());
    }
}
