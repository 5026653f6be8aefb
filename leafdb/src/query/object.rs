use super::{ChangeEvent, FetchResult, QueryContext};
use crate::error::{Error, Result};
use crate::fs::remove_if_present;
use crate::logging::Logger;
use crate::pairs::{Pairs, PairsExt};
use crate::record::valid_filename;
use crate::watcher::Signals;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single record, addressed by the string form of its identifier.
pub struct ObjectQuery<T> {
    directory: PathBuf,
    filename: String,
    ctx: QueryContext,
    logger: Logger,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for ObjectQuery<T> {
    fn clone(&self) -> Self {
        ObjectQuery {
            directory: self.directory.clone(),
            filename: self.filename.clone(),
            ctx: self.ctx.clone(),
            logger: self.logger.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> ObjectQuery<T> {
    pub fn new<Id: Display + ?Sized>(
        id: &Id,
        directory: impl Into<PathBuf>,
        ctx: QueryContext,
    ) -> Self {
        let logger = ctx.logger.scoped("object");
        ObjectQuery {
            directory: directory.into(),
            filename: id.to_string(),
            ctx,
            logger,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    /// The record as it is on disk now. Missing and undecodable records are
    /// both `None`; an undecodable file is deleted.
    pub fn execute(&self) -> Option<T> {
        self.fetch().ok()
    }

    /// Watch the record's directory and report each time the record is
    /// created, changed or deleted.
    ///
    /// The record's state at subscription time is the baseline: a record that
    /// already exists is not reported as created. Signals that leave the
    /// record equal to its previous state produce no event.
    pub fn observe(&self) -> Result<ObjectObserver<T>>
    where
        T: PartialEq + Clone,
    {
        self.check_id()?;
        let signals = self.ctx.watcher(&self.directory)?.observe()?;
        let baseline = self.fetch().map_err(Arc::new);
        Ok(ObjectObserver {
            pairs: Fetches {
                baseline: Some(baseline),
                signals,
                query: self.clone(),
            }
            .pairs(),
        })
    }

    /// Identifiers whose string form is not a plain file name would resolve
    /// outside the collection directory.
    fn check_id(&self) -> Result<()> {
        if valid_filename(&self.filename) {
            Ok(())
        } else {
            self.logger
                .error(format_args!("Invalid record id: {:?}", self.filename));
            Err(Error::InvalidId(self.filename.clone()))
        }
    }

    pub(crate) fn fetch(&self) -> Result<T> {
        self.check_id()?;
        let path = self.path();
        if !self.ctx.fs.exists(&path) {
            self.logger
                .info(format_args!("Record not found: {}", path.display()));
            return Err(Error::NotFound { path });
        }

        let bytes = match self.ctx.fs.read_file(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound { path });
            }
            Err(e) => {
                self.logger
                    .error(format_args!("Failed to read {}: {e}", path.display()));
                return Err(Error::Io(e));
            }
        };

        match self.ctx.format.decode(&bytes) {
            Ok(object) => Ok(object),
            Err(source) => {
                self.logger.error(format_args!(
                    "Failed to decode {}: {source}",
                    path.display()
                ));
                self.self_heal(&path)?;
                Err(Error::InvalidSchema { path, source })
            }
        }
    }

    fn self_heal(&self, path: &Path) -> Result<()> {
        self.logger
            .debug(format_args!("Deleting undecodable record {}", path.display()));
        remove_if_present(self.ctx.fs.as_ref(), path).map_err(|e| {
            self.logger.error(format_args!(
                "Failed to delete undecodable record {}: {e}",
                path.display()
            ));
            Error::Io(e)
        })
    }
}

/// The baseline fetch followed by one re-fetch per signal.
struct Fetches<T> {
    baseline: Option<FetchResult<T>>,
    signals: Signals,
    query: ObjectQuery<T>,
}

impl<T: DeserializeOwned> Iterator for Fetches<T> {
    type Item = FetchResult<T>;

    fn next(&mut self) -> Option<FetchResult<T>> {
        if let Some(baseline) = self.baseline.take() {
            return Some(baseline);
        }
        self.signals.next()?;
        Some(self.query.fetch().map_err(Arc::new))
    }
}

/// Change events for one record. Each `next()` blocks until a signal yields
/// a fetch that differs from the one before it.
pub struct ObjectObserver<T: DeserializeOwned> {
    pairs: Pairs<Fetches<T>>,
}

impl<T> Iterator for ObjectObserver<T>
where
    T: DeserializeOwned + PartialEq + Clone,
{
    type Item = ChangeEvent<T>;

    fn next(&mut self) -> Option<ChangeEvent<T>> {
        loop {
            let (previous, current) = self.pairs.next()?;
            if let Some(event) = ChangeEvent::between(&previous, current) {
                return Some(event);
            }
        }
    }
}
