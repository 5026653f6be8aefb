//! Collection and single-object queries.
//!
//! Both query kinds offer a one-shot `execute()` and a live `observe()`.
//! Observers open their own directory watch and re-run the fetch once per
//! signal, on the thread that consumes them, so fetches for one observer
//! never overlap. Dropping an observer closes its watch immediately.

mod change;
mod collection;
mod object;

pub use change::{ChangeEvent, FetchResult};
pub use collection::{CollectionObserver, CollectionQuery, Comparator, Predicate};
pub use object::{ObjectObserver, ObjectQuery};

use crate::codec::Format;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::logging::Logger;
use crate::watcher::{DirectoryWatcher, NotifyWatch, WatchPrimitive};
use std::path::PathBuf;
use std::sync::Arc;

/// The collaborators a query calls into: where bytes come from, how
/// directories are watched, how records are decoded and where logs go.
#[derive(Clone)]
pub struct QueryContext {
    pub(crate) fs: Arc<dyn FileSystem>,
    /// `None` means the platform watcher, built with the current logger.
    pub(crate) watch: Option<Arc<dyn WatchPrimitive>>,
    pub(crate) format: Format,
    pub(crate) logger: Logger,
}

impl Default for QueryContext {
    fn default() -> Self {
        QueryContext::new(Format::default(), Logger::default())
    }
}

impl QueryContext {
    /// The local file system and the platform watcher.
    pub fn new(format: Format, logger: Logger) -> Self {
        QueryContext {
            fs: Arc::new(LocalFileSystem),
            watch: None,
            format,
            logger,
        }
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_watch_primitive(mut self, watch: Arc<dyn WatchPrimitive>) -> Self {
        self.watch = Some(watch);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub(crate) fn notify_watch(&self) -> NotifyWatch {
        NotifyWatch::new(self.logger.scoped("watcher"))
    }

    pub(crate) fn watch_primitive(&self) -> Arc<dyn WatchPrimitive> {
        match &self.watch {
            Some(watch) => watch.clone(),
            None => Arc::new(self.notify_watch()),
        }
    }

    pub(crate) fn watcher(&self, directory: impl Into<PathBuf>) -> crate::Result<DirectoryWatcher> {
        DirectoryWatcher::new(directory, self.fs.as_ref(), self.watch_primitive())
    }
}

impl std::fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContext")
            .field("format", &self.format)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}
