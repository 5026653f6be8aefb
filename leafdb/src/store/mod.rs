use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::fs::remove_if_present;
use crate::logging::Logger;
use crate::query::{CollectionQuery, ObjectQuery, QueryContext};
use crate::record::{valid_filename, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// The main entry point: a data directory holding one subdirectory per
/// collection and one file per record.
///
/// Queries created from a store share its file system, watch primitive,
/// format and logger. Writes replace whole files; the last successful write
/// of a record wins.
pub struct Store {
    root: PathBuf,
    ctx: QueryContext,
    logger: Logger,
}

impl Store {
    /// Open a store, creating the data directory if it does not exist.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let ctx = QueryContext::new(config.format, config.logger());
        Self::with_context(config.root, ctx)
    }

    /// Open a store with custom collaborators.
    pub fn with_context(root: impl Into<PathBuf>, ctx: QueryContext) -> Result<Self> {
        let root = root.into();
        if !ctx.fs.exists(&root) {
            ctx.fs.create_dir_all(&root)?;
        }
        let logger = ctx.logger.scoped("store");
        logger.debug(format_args!("Opened store at {}", root.display()));
        Ok(Store { root, ctx, logger })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    // ── Typed API ──────────────────────────────────────────────────

    /// Query every record of type `T`.
    pub fn objects<T: Record>(&self) -> CollectionQuery<T> {
        CollectionQuery::new(self.collection_dir(T::COLLECTION), self.ctx.clone())
    }

    /// Query the record of type `T` with the given identifier.
    pub fn object<T: Record>(&self, id: &T::Id) -> ObjectQuery<T> {
        ObjectQuery::new(id, self.collection_dir(T::COLLECTION), self.ctx.clone())
    }

    pub fn save<T: Record>(&self, record: &T) -> Result<()> {
        self.put(T::COLLECTION, &record.id().to_string(), record)
    }

    /// Save each record in turn, stopping at the first failure.
    pub fn save_all<T: Record>(&self, records: &[T]) -> Result<()> {
        records.iter().try_for_each(|record| self.save(record))
    }

    /// Delete the record with the given identifier. Deleting a record that
    /// does not exist succeeds.
    pub fn delete<T: Record>(&self, id: &T::Id) -> Result<()> {
        self.remove(T::COLLECTION, &id.to_string())
    }

    pub fn delete_object<T: Record>(&self, record: &T) -> Result<()> {
        self.delete::<T>(&record.id())
    }

    /// Delete every record file of type `T`. The directory itself is kept.
    pub fn delete_all<T: Record>(&self) -> Result<()> {
        let dir = self.collection_dir(T::COLLECTION);
        for name in self.entries(&dir)? {
            remove_if_present(self.ctx.fs.as_ref(), &dir.join(&name))?;
        }
        self.logger
            .info(format_args!("Deleted all records in {}", dir.display()));
        Ok(())
    }

    /// Identifiers of the stored records of type `T`, in no particular order.
    /// File names that do not parse as an identifier are skipped.
    pub fn ids<T: Record>(&self) -> Result<Vec<T::Id>> {
        let dir = self.collection_dir(T::COLLECTION);
        let mut ids = Vec::new();
        for name in self.entries(&dir)? {
            match name.parse::<T::Id>() {
                Ok(id) => ids.push(id),
                Err(_) => self.logger.warn(format_args!(
                    "Ignoring file with unparsable id: {}",
                    dir.join(&name).display()
                )),
            }
        }
        Ok(ids)
    }

    // ── Dynamic (untyped) API for the CLI ──────────────────────────

    /// Query a collection by name. Names that are not a single plain path
    /// component are rejected with `InvalidId`.
    pub fn collection_query<V: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<CollectionQuery<V>> {
        let dir = self.checked_collection_dir(collection)?;
        Ok(CollectionQuery::new(dir, self.ctx.clone()))
    }

    pub fn object_query<V: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<ObjectQuery<V>> {
        self.record_path(collection, id)?;
        Ok(ObjectQuery::new(id, self.collection_dir(collection), self.ctx.clone()))
    }

    /// Write `value` as the record `id` of `collection`, replacing any
    /// existing file atomically.
    pub fn put<V: Serialize + ?Sized>(&self, collection: &str, id: &str, value: &V) -> Result<()> {
        let path = self.record_path(collection, id)?;
        let bytes = self.ctx.format.encode(value).map_err(Error::Encode)?;

        let dir = self.checked_collection_dir(collection)?;
        if !self.ctx.fs.exists(&dir) {
            self.ctx.fs.create_dir_all(&dir)?;
        }
        self.ctx.fs.write_file(&path, &bytes)?;
        self.logger
            .debug(format_args!("Wrote {}", path.display()));
        Ok(())
    }

    pub fn remove(&self, collection: &str, id: &str) -> Result<()> {
        let path = self.record_path(collection, id)?;
        remove_if_present(self.ctx.fs.as_ref(), &path)?;
        self.logger
            .debug(format_args!("Deleted {}", path.display()));
        Ok(())
    }

    fn checked_collection_dir(&self, collection: &str) -> Result<PathBuf> {
        if !valid_filename(collection) {
            return Err(Error::InvalidId(collection.to_string()));
        }
        Ok(self.collection_dir(collection))
    }

    fn record_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        if !valid_filename(id) {
            return Err(Error::InvalidId(id.to_string()));
        }
        Ok(self.checked_collection_dir(collection)?.join(id))
    }

    /// Record file names in `dir`; a missing directory has none.
    fn entries(&self, dir: &Path) -> Result<Vec<String>> {
        match self.ctx.fs.list_entries(dir) {
            Ok(names) => Ok(names.into_iter().filter(|n| !n.starts_with('.')).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Format;
    use crate::query::ChangeEvent;
    use crate::testing::ManualWatch;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        body: String,
        pinned: bool,
    }

    impl Record for Note {
        type Id = u32;
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn note(id: u32, body: &str, pinned: bool) -> Note {
        Note {
            id,
            body: body.to_string(),
            pinned,
        }
    }

    fn setup_test_store() -> (TempDir, Arc<ManualWatch>, Store) {
        let tmp = TempDir::new().unwrap();
        let watch = Arc::new(ManualWatch::default());
        let ctx = QueryContext::default().with_watch_primitive(watch.clone());
        let store = Store::with_context(tmp.path().join("data"), ctx).unwrap();
        (tmp, watch, store)
    }

    #[test]
    fn test_open_creates_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nested/data");
        let store = Store::open(StoreConfig::new(&root)).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
        assert_eq!(store.context().format(), Format::Json);
    }

    #[test]
    fn test_save_and_get() {
        let (_tmp, _watch, store) = setup_test_store();
        store.save(&note(1, "hello", false)).unwrap();

        assert!(store.collection_dir("notes").join("1").exists());
        assert_eq!(store.object::<Note>(&1).execute(), Some(note(1, "hello", false)));
        assert_eq!(store.object::<Note>(&2).execute(), None);
    }

    #[test]
    fn test_save_overwrites() {
        let (_tmp, _watch, store) = setup_test_store();
        store.save(&note(1, "draft", false)).unwrap();
        store.save(&note(1, "final", true)).unwrap();

        assert_eq!(store.objects::<Note>().execute(), vec![note(1, "final", true)]);
    }

    #[test]
    fn test_save_all_and_query() {
        let (_tmp, _watch, store) = setup_test_store();
        store
            .save_all(&[note(1, "b", true), note(2, "a", false), note(3, "c", true)])
            .unwrap();

        let pinned = store
            .objects::<Note>()
            .filter(|n| n.pinned)
            .sort(|a, b| b.body.cmp(&a.body))
            .execute();
        assert_eq!(pinned, vec![note(3, "c", true), note(1, "b", true)]);

        let mut ids = store.ids::<Note>().unwrap();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_delete() {
        let (_tmp, _watch, store) = setup_test_store();
        let n = note(1, "bye", false);
        store.save(&n).unwrap();

        store.delete_object(&n).unwrap();
        assert_eq!(store.object::<Note>(&1).execute(), None);

        // Deleting again is not an error
        store.delete::<Note>(&1).unwrap();
    }

    #[test]
    fn test_delete_all_keeps_directory() {
        let (_tmp, _watch, store) = setup_test_store();
        store.save_all(&[note(1, "a", false), note(2, "b", false)]).unwrap();

        store.delete_all::<Note>().unwrap();
        assert!(store.objects::<Note>().execute().is_empty());
        assert!(store.collection_dir("notes").is_dir());
    }

    #[test]
    fn test_delete_all_on_missing_collection() {
        let (_tmp, _watch, store) = setup_test_store();
        store.delete_all::<Note>().unwrap();
        assert!(store.ids::<Note>().unwrap().is_empty());
    }

    #[test]
    fn test_ids_skip_unparsable_names() {
        let (_tmp, _watch, store) = setup_test_store();
        store.save(&note(7, "x", false)).unwrap();
        store.put("notes", "not-a-number", &note(8, "y", false)).unwrap();

        assert_eq!(store.ids::<Note>().unwrap(), vec![7]);
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        let (_tmp, _watch, store) = setup_test_store();
        let value = serde_json::json!({ "x": 1 });

        for id in ["", ".hidden", "../escape", "a/b"] {
            let err = store.put("notes", id, &value).unwrap_err();
            assert!(matches!(err, Error::InvalidId(_)), "{id:?} should be rejected");
        }
    }

    #[test]
    fn test_dynamic_api() {
        let (_tmp, _watch, store) = setup_test_store();
        store
            .put("people", "ada", &serde_json::json!({ "name": "Ada", "born": 1815 }))
            .unwrap();

        let people: Vec<serde_json::Value> = store.collection_query("people").unwrap().execute();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0]["born"], 1815);

        let ada: Option<serde_json::Value> =
            store.object_query("people", "ada").unwrap().execute();
        assert_eq!(ada.unwrap()["name"], "Ada");

        store.remove("people", "ada").unwrap();
        assert!(store
            .object_query::<serde_json::Value>("people", "ada")
            .unwrap()
            .execute()
            .is_none());
    }

    #[test]
    fn test_dynamic_queries_stay_inside_root() {
        let (tmp, _watch, store) = setup_test_store();
        let outside = tmp.path().join("precious.txt");
        std::fs::write(&outside, "not a record").unwrap();
        std::fs::create_dir_all(store.collection_dir("notes")).unwrap();

        for collection in ["..", ".", "", "notes/..", "../data"] {
            let result = store.collection_query::<serde_json::Value>(collection);
            assert!(
                matches!(result, Err(Error::InvalidId(_))),
                "{collection:?} should be rejected"
            );
        }
        for id in ["../../precious.txt", "..", "a/b", ".hidden"] {
            let result = store.object_query::<serde_json::Value>("notes", id);
            assert!(matches!(result, Err(Error::InvalidId(_))), "{id:?} should be rejected");
        }
        assert!(matches!(
            store.put("..", "precious.txt", &serde_json::json!({})),
            Err(Error::InvalidId(_))
        ));
        assert!(matches!(store.remove("..", "precious.txt"), Err(Error::InvalidId(_))));

        assert_eq!(std::fs::read_to_string(&outside).unwrap(), "not a record");
    }

    #[test]
    fn test_yaml_store() {
        let tmp = TempDir::new().unwrap();
        let ctx = QueryContext::default().with_format(Format::Yaml);
        let store = Store::with_context(tmp.path(), ctx).unwrap();
        store.save(&note(1, "yaml body", true)).unwrap();

        let raw = std::fs::read_to_string(tmp.path().join("notes/1")).unwrap();
        assert!(raw.contains("body: yaml body"));
        assert_eq!(store.object::<Note>(&1).execute(), Some(note(1, "yaml body", true)));
    }

    #[test]
    fn test_observe_store_writes() {
        let (_tmp, watch, store) = setup_test_store();
        let mut snapshots = store.objects::<Note>().observe().unwrap();
        let mut changes = store.object::<Note>(&1).observe().unwrap();
        assert_eq!(watch.open_handles(), 2);

        store.save(&note(1, "first", false)).unwrap();
        watch.fire();
        assert_eq!(snapshots.next(), Some(vec![note(1, "first", false)]));
        assert_eq!(changes.next(), Some(ChangeEvent::Created(note(1, "first", false))));

        drop(snapshots);
        drop(changes);
        assert_eq!(watch.opened(), watch.closed());
    }
}
