//! Probing for the host app's thumbnail schema variants.
//!
//! Project databases store preview bytes in one of several historical
//! layouts; only one is active per database. Probes run in priority order,
//! newest layout first. The legacy `ZIMAGE` layout holds no tensor rows and
//! is never written by this tool, so it is not part of the probe list.

use rusqlite::Connection;

use crate::error::Result;

/// Thumbnail table layouts, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailTable {
    HalfNode,
    Node,
}

impl ThumbnailTable {
    pub const PROBE_ORDER: [ThumbnailTable; 2] = [ThumbnailTable::HalfNode, ThumbnailTable::Node];

    pub fn table_name(self) -> &'static str {
        match self {
            ThumbnailTable::HalfNode => "thumbnailhistoryhalfnode",
            ThumbnailTable::Node => "thumbnailhistorynode",
        }
    }
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// First thumbnail layout present in the database, if any.
pub fn detect_thumbnail_table(conn: &Connection) -> Result<Option<ThumbnailTable>> {
    for table in ThumbnailTable::PROBE_ORDER {
        if table_exists(conn, table.table_name())? {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// Image count per the active thumbnail layout; 0 when no layout exists.
pub fn image_count(conn: &Connection) -> Result<u64> {
    match detect_thumbnail_table(conn)? {
        Some(table) => {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table.table_name()),
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        }
        None => Ok(0),
    }
}
