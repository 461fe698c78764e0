//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps every collection in a `HashMap` behind a
//! `tokio::sync::RwLock`. Nothing survives the process; use it for tests and
//! for short-lived sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;
use crate::vectorstore::{StoredCollection, VectorStore, missing_collection};

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("pdf_abc", 256).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(name) {
            Some(existing) => existing.check_dimensions(BACKEND, name, dimensions),
            None => {
                collections.insert(name.to_string(), StoredCollection::new(dimensions));
                Ok(())
            }
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store =
            collections.get_mut(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        store.upsert(BACKEND, collection, chunks)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        Ok(store.chunks.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        store.search(BACKEND, collection, embedding, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(id: usize, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new("doc", id, 0, format!("chunk {id}"));
        chunk.embedding = embedding;
        chunk
    }

    #[tokio::test]
    async fn search_returns_closest_first() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .upsert(
                "c",
                &[
                    embedded(0, vec![1.0, 0.0]),
                    embedded(1, vec![0.0, 1.0]),
                    embedded(2, vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let results = store.search("c", &[0.0, 1.0], 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, 1);
        assert_eq!(results[1].chunk.chunk_id, 2);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[embedded(0, vec![1.0, 0.0])]).await.unwrap();
        store.upsert("c", &[embedded(0, vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(!store.collection_exists("nope").await.unwrap());
        assert!(store.search("nope", &[1.0], 3).await.is_err());
        assert!(store.upsert("nope", &[]).await.is_err());
    }

    #[tokio::test]
    async fn recreating_with_other_dimensions_fails() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.create_collection("c", 2).await.unwrap();
        assert!(store.create_collection("c", 3).await.is_err());
    }

    #[tokio::test]
    async fn delete_collection_drops_its_chunks() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let chunks = [embedded(0, vec![1.0, 0.0]), embedded(1, vec![0.0, 1.0])];
        store.upsert("c", &chunks).await.unwrap();

        store.delete_collection("c").await.unwrap();
        assert!(!store.collection_exists("c").await.unwrap());
        assert!(store.count("c").await.is_err());

        store.create_collection("c", 2).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 0);
    }
}
