//! Vector store trait for storing and searching chunk embeddings.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// A storage backend for chunk embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s and support
/// upserting, deleting, and searching by vector similarity. Each PDF gets
/// its own collection.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("pdf_abc", 256).await?;
/// store.upsert("pdf_abc", &chunks).await?;
/// let results = store.search("pdf_abc", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists with the same
    /// dimensionality.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it is missing.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Whether a collection with this name exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// The contents of one collection, shared by the in-memory and local stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredCollection {
    pub(crate) dimensions: usize,
    pub(crate) chunks: BTreeMap<String, Chunk>,
}

impl StoredCollection {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self { dimensions, chunks: BTreeMap::new() }
    }

    pub(crate) fn check_dimensions(
        &self,
        backend: &str,
        name: &str,
        dimensions: usize,
    ) -> Result<()> {
        if self.dimensions != dimensions {
            return Err(RagError::VectorStoreError {
                backend: backend.to_string(),
                message: format!(
                    "collection '{name}' holds {}-dimensional vectors, got {dimensions}",
                    self.dimensions
                ),
            });
        }
        Ok(())
    }

    pub(crate) fn upsert(&mut self, backend: &str, name: &str, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            self.check_dimensions(backend, name, chunk.embedding.len())?;
        }
        for chunk in chunks {
            self.chunks.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    pub(crate) fn search(
        &self,
        backend: &str,
        name: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check_dimensions(backend, name, embedding.len())?;

        let mut scored: Vec<SearchResult> = self
            .chunks
            .values()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

pub(crate) fn missing_collection(backend: &str, name: &str) -> RagError {
    RagError::VectorStoreError {
        backend: backend.to_string(),
        message: format!("collection '{name}' does not exist"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn upsert_rejects_wrong_dimensions_atomically() {
        let mut collection = StoredCollection::new(2);
        let mut good = Chunk::new("doc", 0, 0, "a");
        good.embedding = vec![1.0, 0.0];
        let mut bad = Chunk::new("doc", 1, 0, "b");
        bad.embedding = vec![1.0, 0.0, 0.0];

        assert!(collection.upsert("test", "c", &[good, bad]).is_err());
        assert!(collection.chunks.is_empty());
    }
}
