//! Text-safe archiving of database row blobs.
//!
//! Rows are captured into a [`BackupPayload`] before deletion so the undo
//! record stays a plain JSON document. Encoding is standard base64 and must
//! round-trip byte-for-byte.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::ThumbnailTable;

/// Encoded row data captured before an image deletion, one bucket per table.
/// Thumbnail buckets are keyed by stringified rowid; empty ones are omitted
/// from the persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPayload {
    #[serde(default)]
    pub tensors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thumbnailhistorynode: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thumbnailhistoryhalfnode: BTreeMap<String, String>,
}

impl BackupPayload {
    pub fn bucket(&self, table: ThumbnailTable) -> &BTreeMap<String, String> {
        match table {
            ThumbnailTable::Node => &self.thumbnailhistorynode,
            ThumbnailTable::HalfNode => &self.thumbnailhistoryhalfnode,
        }
    }

    pub fn bucket_mut(&mut self, table: ThumbnailTable) -> &mut BTreeMap<String, String> {
        match table {
            ThumbnailTable::Node => &mut self.thumbnailhistorynode,
            ThumbnailTable::HalfNode => &mut self.thumbnailhistoryhalfnode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
            && self.thumbnailhistorynode.is_empty()
            && self.thumbnailhistoryhalfnode.is_empty()
    }
}

/// Encode raw rows into a text-safe bucket. Pure transform, no I/O.
pub fn archive_rows<I, K>(rows: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, Vec<u8>)>,
    K: Into<String>,
{
    rows.into_iter()
        .map(|(key, bytes)| (key.into(), STANDARD.encode(bytes)))
        .collect()
}

/// Decode a bucket back into raw rows. Fails if any entry is not valid
/// base64, which signals a corrupt undo record.
pub fn restore_rows(bucket: &BTreeMap<String, String>) -> Result<Vec<(String, Vec<u8>)>> {
    let mut rows = Vec::with_capacity(bucket.len());
    for (key, encoded) in bucket {
        rows.push((key.clone(), STANDARD.decode(encoded)?));
    }
    Ok(rows)
}
