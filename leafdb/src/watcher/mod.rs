use crate::error::Result;
use crate::fs::FileSystem;
use crate::logging::Logger;
use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

/// Invoked by a watch primitive once per underlying notification.
pub type ChangeCallback = Box<dyn Fn() + Send + 'static>;

/// Opens OS-level watches on a directory.
pub trait WatchPrimitive: Send + Sync {
    /// Start watching `path`, calling `on_change` for every relevant
    /// attribute or content change until the returned handle is dropped.
    fn open(&self, path: &Path, on_change: ChangeCallback) -> Result<Box<dyn WatchHandle>>;
}

/// An open watch. Dropping the handle closes the watch and releases `on_change`.
pub trait WatchHandle: Send {
    fn path(&self) -> &Path;
}

/// The platform watcher from `notify` (inotify, FSEvents, ReadDirectoryChangesW...).
#[derive(Debug, Clone, Default)]
pub struct NotifyWatch {
    logger: Logger,
}

impl NotifyWatch {
    pub fn new(logger: Logger) -> Self {
        NotifyWatch { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

struct NotifyHandle {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl WatchHandle for NotifyHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl WatchPrimitive for NotifyWatch {
    fn open(&self, path: &Path, on_change: ChangeCallback) -> Result<Box<dyn WatchHandle>> {
        let logger = self.logger.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_content_change(&event.kind) => on_change(),
                Ok(_) => {}
                Err(e) => logger.warn(format_args!("File watcher error: {e}")),
            },
            Config::default(),
        )?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        self.logger
            .debug(format_args!("Opened watch on {}", path.display()));
        Ok(Box::new(NotifyHandle {
            path: path.to_path_buf(),
            _watcher: watcher,
        }))
    }
}

/// Reads must not count as changes, otherwise every fetch a signal triggers
/// would trigger the next signal.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

/// Turns one directory's watch notifications into a sequence of unit signals.
pub struct DirectoryWatcher {
    path: PathBuf,
    primitive: Arc<dyn WatchPrimitive>,
}

impl DirectoryWatcher {
    /// Creates the directory (and any missing parents) if it does not exist yet.
    pub fn new(
        path: impl Into<PathBuf>,
        fs: &dyn FileSystem,
        primitive: Arc<dyn WatchPrimitive>,
    ) -> Result<Self> {
        let path = path.into();
        if !fs.exists(&path) {
            fs.create_dir_all(&path)?;
        }
        Ok(DirectoryWatcher { path, primitive })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new watch. Each call owns its own OS handle, released when the
    /// returned `Signals` is dropped.
    pub fn observe(&self) -> Result<Signals> {
        let (tx, rx) = mpsc::channel();
        let handle = self.primitive.open(
            &self.path,
            Box::new(move || {
                let _ = tx.send(());
            }),
        )?;
        Ok(Signals { rx, handle })
    }
}

/// One `()` per underlying notification, in arrival order, with no
/// coalescing. `next()` blocks until a notification arrives; the sequence
/// only ends if the primitive drops its callback.
pub struct Signals {
    rx: mpsc::Receiver<()>,
    handle: Box<dyn WatchHandle>,
}

impl Signals {
    pub fn path(&self) -> &Path {
        self.handle.path()
    }
}

impl Iterator for Signals {
    type Item = ();

    fn next(&mut self) -> Option<()> {
        self.rx.recv().ok()
    }
}
