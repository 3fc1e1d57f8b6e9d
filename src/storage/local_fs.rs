use super::{validate_id, Storage, StorageError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const INFO_EXTENSION: &str = "json";
const DATA_EXTENSION: &str = "cml";

/// Local filesystem storage
///
/// Layout: `<info_dir>/<id>.json` and `<data_dir>/<id>.cml`. Writes go to a
/// temp file that is renamed over the target (atomic on POSIX), so a crash
/// mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct LocalFsStorage {
    info_dir: PathBuf,
    data_dir: PathBuf,
}

impl LocalFsStorage {
    /// Create storage rooted at the given directories, creating them if needed
    pub fn new(info_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage = LocalFsStorage {
            info_dir: info_dir.into(),
            data_dir: data_dir.into(),
        };
        fs::create_dir_all(&storage.info_dir)?;
        fs::create_dir_all(&storage.data_dir)?;
        Ok(storage)
    }

    pub fn info_dir(&self) -> &Path {
        &self.info_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn info_path(&self, id: &str) -> PathBuf {
        self.info_dir.join(format!("{}.{}", id, INFO_EXTENSION))
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", id, DATA_EXTENSION))
    }

    fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()), // Already deleted
            Err(e) => Err(e.into()),
        }
    }
}

impl Storage for LocalFsStorage {
    fn create(&self, id: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        fs::create_dir_all(&self.info_dir)?;
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    fn save_info(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        validate_id(id)?;
        Self::write_atomic(&self.info_path(id), data)
    }

    fn load_info(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        validate_id(id)?;
        match fs::read(self.info_path(id)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn save_data(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        validate_id(id)?;
        Self::write_atomic(&self.data_path(id), data)
    }

    fn load_data(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_id(id)?;
        match fs::read(self.data_path(id)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        Self::remove_if_exists(&self.info_path(id))?;
        Self::remove_if_exists(&self.data_path(id))
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.info_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(INFO_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
