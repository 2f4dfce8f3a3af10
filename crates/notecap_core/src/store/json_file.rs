//! Single JSON file backend.

use super::{NoteStore, StoreResult};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const NOTES_FILE_NAME: &str = "notes.json";

/// Stores the collection as `<dir>/notes.json`.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the target, so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the store, creating `dir` when it does not exist yet.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(NOTES_FILE_NAME);
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NoteStore for JsonFileStore {
    fn kind(&self) -> &'static str {
        "json"
    }

    fn load_all(&self) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_all(&self, document: &str) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(document.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}
