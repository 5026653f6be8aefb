// Test doubles for the file system and watch capabilities

use crate::error::Result;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::watcher::{ChangeCallback, WatchHandle, WatchPrimitive};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A watch primitive driven by the test: `fire()` plays the part of the OS
/// delivering one notification to every open handle.
#[derive(Default)]
pub(crate) struct ManualWatch {
    state: Arc<ManualState>,
}

#[derive(Default)]
struct ManualState {
    opened: AtomicUsize,
    closed: AtomicUsize,
    next_id: AtomicUsize,
    callbacks: Mutex<Vec<(usize, ChangeCallback)>>,
}

impl ManualWatch {
    pub(crate) fn fire(&self) {
        let callbacks = self.state.callbacks.lock().unwrap();
        for (_, on_change) in callbacks.iter() {
            on_change();
        }
    }

    pub(crate) fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn open_handles(&self) -> usize {
        self.state.callbacks.lock().unwrap().len()
    }
}

impl WatchPrimitive for ManualWatch {
    fn open(&self, path: &Path, on_change: ChangeCallback) -> Result<Box<dyn WatchHandle>> {
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.callbacks.lock().unwrap().push((id, on_change));
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ManualHandle {
            id,
            path: path.to_path_buf(),
            state: self.state.clone(),
        }))
    }
}

struct ManualHandle {
    id: usize,
    path: PathBuf,
    state: Arc<ManualState>,
}

impl WatchHandle for ManualHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        if let Ok(mut callbacks) = self.state.callbacks.lock() {
            callbacks.retain(|(id, _)| *id != self.id);
        }
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// The local file system with creation times chosen by the test, keyed by
/// file name. Unstamped files report no creation time.
#[derive(Default)]
pub(crate) struct StampedFileSystem {
    stamps: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl StampedFileSystem {
    pub(crate) fn stamp(&self, name: &str, at: DateTime<Utc>) {
        self.stamps.lock().unwrap().insert(name.to_string(), at);
    }
}

impl FileSystem for StampedFileSystem {
    fn exists(&self, path: &Path) -> bool {
        LocalFileSystem.exists(path)
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        LocalFileSystem.list_entries(dir)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        LocalFileSystem.read_file(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        LocalFileSystem.write_file(path, bytes)
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        LocalFileSystem.delete_file(path)
    }

    fn creation_timestamp(&self, path: &Path) -> Option<DateTime<Utc>> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        self.stamps.lock().unwrap().get(&name).copied()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFileSystem.create_dir_all(path)
    }
}

/// The local file system, except that every delete fails.
pub(crate) struct UndeletableFileSystem;

impl FileSystem for UndeletableFileSystem {
    fn exists(&self, path: &Path) -> bool {
        LocalFileSystem.exists(path)
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        LocalFileSystem.list_entries(dir)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        LocalFileSystem.read_file(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        LocalFileSystem.write_file(path, bytes)
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("delete refused: {}", path.display()),
        ))
    }

    fn creation_timestamp(&self, path: &Path) -> Option<DateTime<Utc>> {
        LocalFileSystem.creation_timestamp(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFileSystem.create_dir_all(path)
    }
}
