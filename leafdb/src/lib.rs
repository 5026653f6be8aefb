//! File-backed storage for typed records with live queries.
//!
//! Each record type owns a directory under the store root and each record
//! is one file in it, named by the record's identifier. Queries read a whole
//! collection or a single record either once (`execute`) or continuously
//! (`observe`), re-reading whenever the directory changes.
//!
//! ```ignore
//! use leafdb::{ChangeEvent, Record, Store, StoreConfig};
//!
//! let store = Store::open(StoreConfig::new("./data"))?;
//! store.save(&Note { id: 1, body: "hello".into() })?;
//!
//! let recent = store.objects::<Note>().sort(|a, b| b.id.cmp(&a.id)).execute();
//!
//! for change in store.object::<Note>(&1).observe()? {
//!     match change {
//!         ChangeEvent::Created(note) | ChangeEvent::Changed(note) => println!("{note:?}"),
//!         ChangeEvent::Deleted => break,
//!     }
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod pairs;
pub mod query;
pub mod record;
pub mod store;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use codec::Format;
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use logging::Logger;
pub use pairs::{Pairs, PairsExt};
pub use query::{
    ChangeEvent, CollectionObserver, CollectionQuery, FetchResult, ObjectObserver, ObjectQuery,
    QueryContext,
};
pub use record::Record;
pub use store::Store;
pub use watcher::{DirectoryWatcher, NotifyWatch, Signals, WatchHandle, WatchPrimitive};
