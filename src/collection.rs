//! Binds a record kind to its store and a set of named indexes; the single
//! entry point for CRUD and query, and the sole holder of the per-collection
//! `RwLock` that disciplines concurrent access (see module docs in `lib.rs`).

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{CoreError, Result};
use crate::index::VectorIndex;
use crate::models::IndexType;
use crate::store::RecordStore;

/// Anything that can be embedded and indexed must expose its id and vector.
pub trait Embeddable {
    fn id(&self) -> &str;
    fn embedding(&self) -> &[f32];
}

struct Inner<T> {
    store: RecordStore,
    indexes: HashMap<IndexType, Box<dyn VectorIndex>>,
    dim: Option<usize>,
    _marker: std::marker::PhantomData<T>,
}

/// A named bundle of `{store, indexes}` for one record kind, guarded by a
/// single readers-writer lock covering both together.
pub struct Collection<T> {
    inner: RwLock<Inner<T>>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Clone + Embeddable,
{
    pub fn new(store: RecordStore) -> Self {
        Self {
            inner: RwLock::new(Inner {
                store,
                indexes: HashMap::new(),
                dim: None,
                _marker: std::marker::PhantomData,
            }),
        }
    }

    /// Attaches a named index. Exclusive: mutates the collection's index set.
    pub fn add_index(&self, ty: IndexType, index: Box<dyn VectorIndex>) -> Result<()> {
        let mut inner = self.inner.write()?;
        inner.indexes.insert(ty, index);
        Ok(())
    }

    /// Lists all store ids and rebuilds every attached index from scratch.
    /// Run once at process startup, and available as a maintenance op.
    pub fn startup_rebuild(&self) -> Result<()> {
        let mut inner = self.inner.write()?;
        let ids = inner.store.list()?;
        let mut items = Vec::with_capacity(ids.len());
        let mut dim = None;
        for id in &ids {
            let record: T = inner.store.get(id)?;
            if dim.is_none() && !record.embedding().is_empty() {
                dim = Some(record.embedding().len());
            }
            items.push((record.id().to_string(), record.embedding().to_vec()));
        }
        inner.dim = dim;
        for index in inner.indexes.values_mut() {
            index.rebuild(&items)?;
        }
        Ok(())
    }

    /// Validates dimension (when the record carries a non-empty embedding),
    /// writes via the store, then notifies every attached index with `add`.
    pub fn create(&self, record: T) -> Result<()> {
        let mut inner = self.inner.write()?;
        Self::check_dimension(&mut inner, record.embedding())?;
        inner.store.put(record.id(), &record)?;
        let id = record.id().to_string();
        let vector = record.embedding().to_vec();
        if !vector.is_empty() {
            for index in inner.indexes.values_mut() {
                index.add(&id, &vector)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<T> {
        let inner = self.inner.read()?;
        inner.store.get(id)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let inner = self.inner.read()?;
        inner.store.list()
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        let inner = self.inner.read()?;
        Ok(inner.store.exists(id))
    }

    /// Equivalent to `remove` on every index, rewrite in store, then `add`.
    pub fn update(&self, id: &str, record: T) -> Result<()> {
        let mut inner = self.inner.write()?;
        Self::check_dimension(&mut inner, record.embedding())?;
        for index in inner.indexes.values_mut() {
            index.remove(id);
        }
        inner.store.put(id, &record)?;
        let vector = record.embedding().to_vec();
        if !vector.is_empty() {
            for index in inner.indexes.values_mut() {
                index.add(id, &vector)?;
            }
        }
        Ok(())
    }

    /// Removes from the store; tolerates an id already absent from an index.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write()?;
        inner.store.delete(id)?;
        for index in inner.indexes.values_mut() {
            index.remove(id);
        }
        Ok(())
    }

    /// Looks up the requested index, searches it, resolves each hit against
    /// the store, applies `filter` as a post-result predicate (overfetching
    /// `2*k` to mitigate recall loss from post-filtering), then truncates.
    pub fn search(
        &self,
        ty: IndexType,
        query: &[f32],
        k: usize,
        filter: impl Fn(&T) -> bool,
    ) -> Result<Vec<(T, f32)>> {
        if k == 0 {
            return Err(CoreError::InvalidInput("k must be positive".to_string()));
        }
        let inner = self.inner.read()?;
        let index = inner
            .indexes
            .get(&ty)
            .ok_or_else(|| CoreError::UnknownIndex(ty.to_string()))?;

        let overfetch = 2 * k;
        let hits = index.search(query, overfetch);

        let mut results = Vec::with_capacity(k);
        for (id, score) in hits {
            if results.len() == k {
                break;
            }
            let record: T = match inner.store.get(&id) {
                Ok(r) => r,
                Err(CoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if filter(&record) {
                results.push((record, score));
            }
        }
        Ok(results)
    }

    /// Current embedding dimension established by the first indexed insert,
    /// if any has happened yet.
    pub fn dimension(&self) -> Result<Option<usize>> {
        Ok(self.inner.read()?.dim)
    }

    fn check_dimension(inner: &mut Inner<T>, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Ok(());
        }
        match inner.dim {
            None => {
                inner.dim = Some(embedding.len());
                Ok(())
            }
            Some(d) if d == embedding.len() => Ok(()),
            Some(d) => Err(CoreError::DimensionMismatch {
                expected: d,
                actual: embedding.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::exact::ExactCosineIndex;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Item {
        id: String,
        embedding: Vec<f32>,
    }

    impl Embeddable for Item {
        fn id(&self) -> &str {
            &self.id
        }
        fn embedding(&self) -> &[f32] {
            &self.embedding
        }
    }

    fn new_collection() -> (tempfile::TempDir, Collection<Item>) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let col = Collection::new(store);
        col.add_index(IndexType::Cosine, Box::new(ExactCosineIndex::new())).unwrap();
        (dir, col)
    }

    #[test]
    fn create_then_get_round_trips() {
        let (_dir, col) = new_collection();
        let item = Item { id: "a".into(), embedding: vec![1.0, 0.0] };
        col.create(item.clone()).unwrap();
        assert_eq!(col.get("a").unwrap(), item);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let (_dir, col) = new_collection();
        col.create(Item { id: "a".into(), embedding: vec![1.0, 0.0] }).unwrap();
        let err = col.create(Item { id: "b".into(), embedding: vec![1.0, 0.0, 0.0] }).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
        assert!(!col.exists("b").unwrap());
    }

    #[test]
    fn search_excludes_deleted_ids() {
        let (_dir, col) = new_collection();
        col.create(Item { id: "a".into(), embedding: vec![1.0, 0.0] }).unwrap();
        col.create(Item { id: "b".into(), embedding: vec![0.0, 1.0] }).unwrap();
        col.delete("a").unwrap();
        let hits = col.search(IndexType::Cosine, &[1.0, 0.0], 5, |_| true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "b");
    }

    #[test]
    fn unknown_index_type_errors() {
        let (_dir, col) = new_collection();
        let err = col.search(IndexType::Ivf, &[1.0, 0.0], 5, |_| true).unwrap_err();
        assert!(matches!(err, CoreError::UnknownIndex(_)));
    }

    #[test]
    fn startup_rebuild_restores_index_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        {
            let col = Collection::new(store.clone());
            col.add_index(IndexType::Cosine, Box::new(ExactCosineIndex::new())).unwrap();
            col.create(Item { id: "a".into(), embedding: vec![1.0, 0.0] }).unwrap();
        }
        let col2: Collection<Item> = Collection::new(store);
        col2.add_index(IndexType::Cosine, Box::new(ExactCosineIndex::new())).unwrap();
        col2.startup_rebuild().unwrap();
        let hits = col2.search(IndexType::Cosine, &[1.0, 0.0], 5, |_| true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "a");
    }

    #[test]
    fn delete_is_idempotent_on_the_collection() {
        let (_dir, col) = new_collection();
        col.create(Item { id: "a".into(), embedding: vec![1.0, 0.0] }).unwrap();
        col.delete("a").unwrap();
        assert!(matches!(col.delete("a").unwrap_err(), CoreError::NotFound(_)));
    }
}
