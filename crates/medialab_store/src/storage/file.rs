//! File-based storage backend.

use super::{StorageBackend, StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A storage backend over a single OS file.
///
/// `replace` writes a sibling `*.tmp` file, syncs it, and renames it over the
/// original so a crash leaves either the old or the new content.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: File,
    size: u64,
}

impl FileBackend {
    /// Opens or creates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(usize::try_from(self.size).unwrap_or(0));
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(data)?;
        self.size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size > self.size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size: self.size,
            });
        }

        self.file.set_len(new_size)?;
        self.file.sync_all()?;
        self.size = new_size;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp_path = self.temp_path();

        let mut temp = File::create(&temp_path)?;
        temp.write_all(data)?;
        temp.sync_all()?;
        drop(temp);

        fs::rename(&temp_path, &self.path)?;
        self.sync_parent()?;

        // The old handle still points at the unlinked inode.
        *self = Self::open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(path.exists());
        assert_eq!(backend.path(), path);
    }

    #[test]
    fn append_returns_offsets() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("a.bin")).unwrap();

        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.append(b"").unwrap(), 11);
        assert_eq!(backend.read_all().unwrap(), b"hello world");
    }

    #[test]
    fn content_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"persistent").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 10);
        assert_eq!(backend.read_all().unwrap(), b"persistent");
    }

    #[test]
    fn truncate_drops_tail() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("a.bin")).unwrap();
        backend.append(b"keep-drop").unwrap();

        backend.truncate(4).unwrap();
        assert_eq!(backend.read_all().unwrap(), b"keep");

        let err = backend.truncate(100).unwrap_err();
        assert!(matches!(err, StorageError::InvalidTruncate { .. }));
    }

    #[test]
    fn replace_swaps_content_and_keeps_appending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MANIFEST");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"old content").unwrap();

        backend.replace(b"new").unwrap();
        assert_eq!(backend.read_all().unwrap(), b"new");
        assert_eq!(backend.size().unwrap(), 3);
        assert!(!dir.path().join("MANIFEST.tmp").exists());

        assert_eq!(backend.append(b"!").unwrap(), 3);
        drop(backend);
        assert_eq!(fs::read(&path).unwrap(), b"new!");
    }
}
