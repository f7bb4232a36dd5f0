use std::path::{Path, PathBuf};

/// Extensions making up one project on disk: the primary database plus the
/// storage engine's optional side files.
pub const PROJECT_EXTENSIONS: [&str; 3] = [".sqlite3", ".sqlite3-shm", ".sqlite3-wal"];

/// Locations this tool operates on: the host app's Documents directory (which
/// holds project databases and the Models folder) and the per-user undo file.
#[derive(Debug, Clone)]
pub struct DataDirs {
    documents: PathBuf,
    undo_file: PathBuf,
}

impl DataDirs {
    /// Default per-user locations: the host app's sandbox container for data,
    /// a hidden dotfile in the home directory for undo state.
    pub fn discover() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            documents: home
                .join("Library/Containers/com.liuliu.draw-things/Data")
                .join("Documents"),
            undo_file: home.join(".studio_sweeper_undo.json"),
        }
    }

    /// Explicit locations, for tests and non-standard installs.
    pub fn new(documents: impl Into<PathBuf>, undo_file: impl Into<PathBuf>) -> Self {
        Self {
            documents: documents.into(),
            undo_file: undo_file.into(),
        }
    }

    pub fn documents(&self) -> &Path {
        &self.documents
    }

    pub fn undo_file(&self) -> &Path {
        &self.undo_file
    }

    pub fn models_dir(&self) -> PathBuf {
        self.documents.join("Models")
    }

    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.models_dir().join(file_name)
    }

    pub fn project_db_path(&self, name: &str) -> PathBuf {
        self.documents.join(format!("{name}.sqlite3"))
    }

    /// All on-disk paths belonging to one project (primary first). The side
    /// files may or may not exist.
    pub fn project_file_paths(&self, name: &str) -> [PathBuf; 3] {
        PROJECT_EXTENSIONS.map(|ext| self.documents.join(format!("{name}{ext}")))
    }

    /// The -shm and -wal side paths only.
    pub fn project_side_paths(&self, name: &str) -> [PathBuf; 2] {
        let [_, shm, wal] = self.project_file_paths(name);
        [shm, wal]
    }
}
