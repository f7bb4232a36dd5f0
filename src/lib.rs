//! Undo-protected cleanup of an image-generation app's on-disk data: model
//! weight files, per-project SQLite databases, and the tensor/thumbnail
//! blobs embedded in them.
//!
//! Every destructive operation preserves what it removes (hidden-sibling
//! file backups, base64-archived database rows) and records a single-level
//! undo in a file-backed [`UndoLedger`]. Exactly the most recent deletion is
//! reversible; recording a new one replaces the slot wholesale.
//!
//! The GUI/CLI layer that selects what to delete and renders results lives
//! outside this crate; it drives the operations in [`ops`] and the ledger's
//! consume/clear surface.

pub mod archive;
pub mod backup;
pub mod config;
pub mod error;
pub mod ops;
pub mod schema;
pub mod undo;

pub use archive::BackupPayload;
pub use config::DataDirs;
pub use error::{Result, SweepError};
pub use ops::{delete_images, delete_models, delete_projects, ImagesDeleted};
pub use undo::{RestoreOutcome, UndoLedger, UndoRecord};
