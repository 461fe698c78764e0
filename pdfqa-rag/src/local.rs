//! Persistent vector store keeping one JSON file per collection.
//!
//! Collections live at `{root}/{name}.json`. They are read lazily on first
//! use, cached in memory, and rewritten in full after every mutation via a
//! temporary file that is renamed into place, so a crash mid-write leaves
//! the previous version intact.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{StoredCollection, VectorStore, missing_collection};

const BACKEND: &str = "Local";

/// A [`VectorStore`] persisted under a directory on the local filesystem.
///
/// Collection names must consist of ASCII letters, digits, `_` and `-`,
/// which every name produced by [`PdfId::collection_name`](crate::PdfId::collection_name)
/// satisfies. Writes are serialised by an internal lock; several processes
/// sharing one directory are not coordinated.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{LocalVectorStore, VectorStore};
///
/// let store = LocalVectorStore::open("pdfqa_store").await?;
/// store.create_collection("pdf_abc", 1536).await?;
/// ```
#[derive(Debug)]
pub struct LocalVectorStore {
    root: PathBuf,
    cache: RwLock<HashMap<String, StoredCollection>>,
}

impl LocalVectorStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            store_error(format!("cannot create storage directory {}: {e}", root.display()))
        })?;
        debug!(root = %root.display(), "opened local vector store");
        Ok(Self { root, cache: RwLock::new(HashMap::new()) })
    }

    /// The directory holding the collection files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(store_error(format!("invalid collection name '{name}'")));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    async fn read_file(&self, name: &str) -> Result<Option<StoredCollection>> {
        let path = self.path_for(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error(format!("cannot read {}: {e}", path.display()))),
        };
        let collection = serde_json::from_slice(&bytes)
            .map_err(|e| store_error(format!("corrupt collection file {}: {e}", path.display())))?;
        debug!(collection = name, "loaded collection from disk");
        Ok(Some(collection))
    }

    async fn write_file(&self, name: &str, collection: &StoredCollection) -> Result<()> {
        let path = self.path_for(name)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(collection)
            .map_err(|e| store_error(format!("cannot serialize collection '{name}': {e}")))?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| store_error(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| store_error(format!("cannot replace {}: {e}", path.display())))?;
        debug!(collection = name, chunk_count = collection.chunks.len(), "persisted collection");
        Ok(())
    }

    /// Return the cached collection, loading it from disk on a miss.
    async fn cached<'a>(
        &self,
        cache: &'a mut HashMap<String, StoredCollection>,
        name: &str,
    ) -> Result<Option<&'a mut StoredCollection>> {
        if !cache.contains_key(name) {
            match self.read_file(name).await? {
                Some(collection) => {
                    cache.insert(name.to_string(), collection);
                }
                None => return Ok(None),
            }
        }
        Ok(cache.get_mut(name))
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut cache = self.cache.write().await;
        if let Some(existing) = self.cached(&mut cache, name).await? {
            return existing.check_dimensions(BACKEND, name, dimensions);
        }
        let collection = StoredCollection::new(dimensions);
        self.write_file(name, &collection).await?;
        cache.insert(name.to_string(), collection);
        debug!(collection = name, dimensions, "created local collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.remove(name);
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(collection = name, "deleted local collection");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error(format!("cannot delete {}: {e}", path.display()))),
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        if self.cache.read().await.contains_key(name) {
            return Ok(true);
        }
        let path = self.path_for(name)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| store_error(format!("cannot stat {}: {e}", path.display())))
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut cache = self.cache.write().await;
        let stored = self
            .cached(&mut cache, collection)
            .await?
            .ok_or_else(|| missing_collection(BACKEND, collection))?;
        let mut updated = stored.clone();
        updated.upsert(BACKEND, collection, chunks)?;
        self.write_file(collection, &updated).await?;
        *stored = updated;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        if let Some(stored) = self.cache.read().await.get(collection) {
            return Ok(stored.chunks.len());
        }
        let mut cache = self.cache.write().await;
        let stored = self
            .cached(&mut cache, collection)
            .await?
            .ok_or_else(|| missing_collection(BACKEND, collection))?;
        Ok(stored.chunks.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if let Some(stored) = self.cache.read().await.get(collection) {
            return stored.search(BACKEND, collection, embedding, top_k);
        }
        let mut cache = self.cache.write().await;
        let stored = self
            .cached(&mut cache, collection)
            .await?
            .ok_or_else(|| missing_collection(BACKEND, collection))?;
        stored.search(BACKEND, collection, embedding, top_k)
    }
}

fn store_error(message: String) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(id: usize, page: u32, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new("doc", id, page, format!("chunk {id}"));
        chunk.embedding = embedding;
        chunk
    }

    #[tokio::test]
    async fn collections_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalVectorStore::open(dir.path()).await.unwrap();
            store.create_collection("pdf_a", 2).await.unwrap();
            let chunks = [embedded(0, 3, vec![1.0, 0.0]), embedded(1, 4, vec![0.0, 1.0])];
            store.upsert("pdf_a", &chunks).await.unwrap();
        }

        let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
        assert!(reopened.collection_exists("pdf_a").await.unwrap());
        assert_eq!(reopened.count("pdf_a").await.unwrap(), 2);

        let results = reopened.search("pdf_a", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.chunk_id, 1);
        assert_eq!(results[0].chunk.page, 4);
        assert_eq!(results[0].chunk.embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn delete_collection_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("pdf_b", 2).await.unwrap();
        assert!(dir.path().join("pdf_b.json").exists());

        store.delete_collection("pdf_b").await.unwrap();
        assert!(!dir.path().join("pdf_b.json").exists());
        assert!(!store.collection_exists("pdf_b").await.unwrap());
        store.delete_collection("pdf_b").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        assert!(store.create_collection("../escape", 2).await.is_err());
        assert!(store.create_collection("", 2).await.is_err());
    }

    #[tokio::test]
    async fn failed_upsert_leaves_collection_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("pdf_c", 2).await.unwrap();
        store.upsert("pdf_c", &[embedded(0, 0, vec![1.0, 0.0])]).await.unwrap();

        assert!(store.upsert("pdf_c", &[embedded(1, 0, vec![1.0, 0.0, 0.0])]).await.is_err());
        assert_eq!(store.count("pdf_c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pdf_d.json"), b"{not json").unwrap();
        let store = LocalVectorStore::open(dir.path()).await.unwrap();

        let err = store.count("pdf_d").await.unwrap_err();
        assert!(err.to_string().contains("corrupt"), "{err}");
    }
}
