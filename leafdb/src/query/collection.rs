use super::QueryContext;
use crate::error::Result;
use crate::fs::remove_if_present;
use crate::logging::Logger;
use crate::watcher::Signals;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// All decodable records of type `T` in one directory, oldest file first,
/// optionally filtered and re-sorted.
pub struct CollectionQuery<T> {
    directory: PathBuf,
    filter: Option<Predicate<T>>,
    sort: Option<Comparator<T>>,
    ctx: QueryContext,
    logger: Logger,
}

impl<T> Clone for CollectionQuery<T> {
    fn clone(&self) -> Self {
        CollectionQuery {
            directory: self.directory.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            ctx: self.ctx.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<T: DeserializeOwned> CollectionQuery<T> {
    pub fn new(directory: impl Into<PathBuf>, ctx: QueryContext) -> Self {
        let logger = ctx.logger.scoped("collection");
        CollectionQuery {
            directory: directory.into(),
            filter: None,
            sort: None,
            ctx,
            logger,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// A copy of this query that keeps only records matching `predicate`.
    /// Replaces any filter set before.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        CollectionQuery {
            filter: Some(Arc::new(predicate)),
            ..self.clone()
        }
    }

    /// A copy of this query ordered by `comparator` instead of creation time.
    /// Replaces any sort set before.
    pub fn sort<F>(&self, comparator: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        CollectionQuery {
            sort: Some(Arc::new(comparator)),
            ..self.clone()
        }
    }

    /// Read the collection now. Never fails: I/O and decode problems are
    /// logged and the affected records left out.
    pub fn execute(&self) -> Vec<T> {
        self.fetch_objects()
    }

    /// Watch the directory and produce a fresh, complete snapshot for every
    /// change signal. Nothing is emitted until the first signal arrives.
    ///
    /// Fails only if the directory cannot be created or watched.
    pub fn observe(&self) -> Result<CollectionObserver<T>> {
        let signals = self.ctx.watcher(&self.directory)?.observe()?;
        Ok(CollectionObserver {
            query: self.clone(),
            signals,
        })
    }

    fn fetch_objects(&self) -> Vec<T> {
        let names = match self.ctx.fs.list_entries(&self.directory) {
            Ok(names) => names,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.logger.info(format_args!(
                    "Collection directory does not exist: {}",
                    self.directory.display()
                ));
                return Vec::new();
            }
            Err(e) => {
                self.logger.fault(format_args!(
                    "Failed to list collection directory {}: {e}",
                    self.directory.display()
                ));
                return Vec::new();
            }
        };

        let mut stamped: Vec<(DateTime<Utc>, T)> = names
            .iter()
            .filter(|name| !name.starts_with('.'))
            .filter_map(|name| self.load(&self.directory.join(name)))
            .collect();
        stamped.sort_by_key(|(created, _)| *created);

        let mut objects: Vec<T> = stamped.into_iter().map(|(_, object)| object).collect();
        if let Some(filter) = &self.filter {
            objects.retain(|object| filter(object));
        }
        if let Some(sort) = &self.sort {
            objects.sort_by(|a, b| sort(a, b));
        }
        objects
    }

    /// Decode one entry together with its creation time. Entries that fail to
    /// decode are deleted so they are not read again.
    fn load(&self, path: &Path) -> Option<(DateTime<Utc>, T)> {
        let bytes = match self.ctx.fs.read_file(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.logger
                    .debug(format_args!("Removed before it was read: {}", path.display()));
                return None;
            }
            Err(e) => {
                self.logger.error(format_args!(
                    "Failed to read {}: {e}",
                    path.display()
                ));
                return None;
            }
        };

        match self.ctx.format.decode::<T>(&bytes) {
            Ok(object) => {
                let created = self
                    .ctx
                    .fs
                    .creation_timestamp(path)
                    .unwrap_or_else(Utc::now);
                Some((created, object))
            }
            Err(e) => {
                self.logger.error(format_args!(
                    "Failed to decode {}: {e}",
                    path.display()
                ));
                self.logger
                    .debug(format_args!("Deleting undecodable record {}", path.display()));
                if let Err(e) = remove_if_present(self.ctx.fs.as_ref(), path) {
                    self.logger.error(format_args!(
                        "Failed to delete undecodable record {}: {e}",
                        path.display()
                    ));
                }
                None
            }
        }
    }
}

/// Live snapshots of a [`CollectionQuery`]. Each `next()` waits for the next
/// directory signal and then re-reads the whole collection.
pub struct CollectionObserver<T> {
    query: CollectionQuery<T>,
    signals: Signals,
}

impl<T: DeserializeOwned> CollectionObserver<T> {
    pub fn query(&self) -> &CollectionQuery<T> {
        &self.query
    }
}

impl<T: DeserializeOwned> Iterator for CollectionObserver<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        self.signals.next()?;
        Some(self.query.fetch_objects())
    }
}
