// rust/ckpt-core/src/storage/local.rs

//! Local filesystem storage backend.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::traits::{StorageBackend, StorageReader, StorageWriter};
use crate::error::{CkptError, Result};

/// Default buffer size for buffered I/O (64 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Local filesystem storage backend.
///
/// Paths are used as given; relative paths resolve against the process
/// working directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Buffer size for buffered I/O operations.
    buffer_size: usize,
}

impl LocalStorage {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CkptError::storage_with_source(parent, "failed to create parent directories", e)
                })?;
            }
        }
        Ok(())
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl StorageBackend for LocalStorage {
    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path.exists())
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let file = File::open(path)
            .map_err(|e| CkptError::storage_with_source(path, "failed to open file", e))?;

        let size = file
            .metadata()
            .map_err(|e| CkptError::storage_with_source(path, "failed to read file metadata", e))?
            .len();

        Ok(Box::new(LocalReader {
            reader: BufReader::with_capacity(self.buffer_size, file),
            size,
        }))
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>> {
        Self::ensure_parent(path)?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| CkptError::storage_with_source(path, "failed to create file", e))?;

        Ok(Box::new(LocalWriter {
            writer: BufWriter::with_capacity(self.buffer_size, file),
            path: path.to_path_buf(),
        }))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .map_err(|e| CkptError::storage_with_source(path, "failed to delete file", e))
    }

    fn list(&self, dir: &Path) -> Result<Vec<String>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        if !dir.is_dir() {
            return Err(CkptError::storage(dir, "path is not a directory"));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)
            .map_err(|e| CkptError::storage_with_source(dir, "failed to read directory", e))?
        {
            let entry = entry.map_err(|e| {
                CkptError::storage_with_source(dir, "failed to read directory entry", e)
            })?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }

        entries.sort();
        Ok(entries)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Self::ensure_parent(to)?;

        fs::rename(from, to).map_err(|e| {
            CkptError::storage_with_source(
                from,
                format!("failed to rename to {}", to.display()),
                e,
            )
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .map_err(|e| CkptError::storage_with_source(path, "failed to create directories", e))
    }
}

/// Buffered file reader for local storage.
struct LocalReader {
    reader: BufReader<File>,
    size: u64,
}

impl Read for LocalReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageReader for LocalReader {
    fn size(&self) -> u64 {
        self.size
    }
}

/// Buffered file writer for local storage.
struct LocalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageWriter for LocalWriter {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| CkptError::storage_with_source(&self.path, "failed to flush writer", e))?;

        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| {
                CkptError::storage_with_source(&self.path, "failed to sync file to disk", e)
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (LocalStorage, TempDir) {
        (LocalStorage::new(4096), TempDir::new().unwrap())
    }

    #[test]
    fn test_write_and_read_back() {
        let (storage, temp) = create_test_storage();
        let path = temp.path().join("file.bin");

        let mut writer = storage.open_write(&path).unwrap();
        writer.write_all(b"hello world").unwrap();
        writer.finish().unwrap();

        let mut reader = storage.open_read(&path).unwrap();
        assert_eq!(reader.size(), 11);
        let mut content = Vec::new();
        reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn test_open_write_truncates() {
        let (storage, temp) = create_test_storage();
        let path = temp.path().join("file.bin");

        let mut writer = storage.open_write(&path).unwrap();
        writer.write_all(b"a much longer first payload").unwrap();
        writer.finish().unwrap();

        let mut writer = storage.open_write(&path).unwrap();
        writer.write_all(b"short").unwrap();
        writer.finish().unwrap();

        assert_eq!(storage.open_read(&path).unwrap().size(), 5);
    }

    #[test]
    fn test_open_write_creates_parents() {
        let (storage, temp) = create_test_storage();
        let path = temp.path().join("a/b/c/file.bin");

        let writer = storage.open_write(&path).unwrap();
        writer.finish().unwrap();

        assert!(storage.exists(&path).unwrap());
    }

    #[test]
    fn test_open_read_missing_file() {
        let (storage, temp) = create_test_storage();
        let result = storage.open_read(&temp.path().join("missing.bin"));

        assert!(matches!(result, Err(CkptError::Storage { source: Some(_), .. })));
    }

    #[test]
    fn test_list_sorted_and_missing_dir() {
        let (storage, temp) = create_test_storage();

        for name in ["c.dat", "a.dat", "b.dat"] {
            storage.open_write(&temp.path().join(name)).unwrap().finish().unwrap();
        }

        assert_eq!(
            storage.list(temp.path()).unwrap(),
            vec!["a.dat", "b.dat", "c.dat"]
        );
        assert!(storage.list(&temp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_rename_and_delete() {
        let (storage, temp) = create_test_storage();
        let from = temp.path().join("from.tmp");
        let to = temp.path().join("sub/to.dat");

        storage.open_write(&from).unwrap().finish().unwrap();
        storage.rename(&from, &to).unwrap();

        assert!(!storage.exists(&from).unwrap());
        assert!(storage.exists(&to).unwrap());

        storage.delete(&to).unwrap();
        assert!(!storage.exists(&to).unwrap());
    }

    #[test]
    fn test_delete_refuses_directory() {
        let (storage, temp) = create_test_storage();
        let dir = temp.path().join("subdir");
        storage.create_dir_all(&dir).unwrap();

        assert!(storage.delete(&dir).is_err());
        assert!(dir.is_dir());
    }
}
