use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("corrupt backup payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("corrupt undo record: {0}")]
    CorruptRecord(String),

    #[error("no undo operation available")]
    NoPendingUndo,

    #[error("project '{0}' not found")]
    ProjectNotFound(String),
}

impl SweepError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SweepError::Io {
            path: path.into(),
            source,
        }
    }
}
