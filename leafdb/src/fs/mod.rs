// File system capability - everything the queries and the write path touch on disk

use chrono::{DateTime, Utc};
use std::io::{self, Write};
use std::path::Path;

/// The file operations a store needs. `LocalFileSystem` is the real one;
/// tests substitute their own to control timestamps.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Names (not paths) of the entries directly inside `dir`.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the file at `path` with `bytes` so readers never observe a partial write.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn delete_file(&self, path: &Path) -> io::Result<()>;

    fn creation_timestamp(&self, path: &Path) -> Option<DateTime<Utc>>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = path.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no parent directory for {}", path.display()),
            )
        })?;

        // Temp files start with '.', which collection listings skip
        let mut tmp = tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn creation_timestamp(&self, path: &Path) -> Option<DateTime<Utc>> {
        let created = std::fs::metadata(path).and_then(|m| m.created()).ok()?;
        Some(DateTime::<Utc>::from(created))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Delete a file, treating "already gone" as success. Concurrent observers of
/// one collection may race to remove the same corrupt file.
pub fn remove_if_present(fs: &dyn FileSystem, path: &Path) -> io::Result<()> {
    match fs.delete_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
