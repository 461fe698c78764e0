//! Index-and-answer orchestrator.
//!
//! The [`PdfQaPipeline`] coordinates indexing (load → split → embed → store)
//! and answering (embed → search → verify → answer) by composing a
//! [`DocumentLoader`], a [`TextSplitter`], an [`EmbeddingProvider`], a
//! [`VectorStore`], and a [`ChatModel`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfqa_rag::{PdfQaPipeline, PdfId, LocalVectorStore};
//!
//! let pipeline = PdfQaPipeline::builder()
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(LocalVectorStore::open("pdfqa_store").await?))
//!     .chat_model(Arc::new(my_chat_model))
//!     .build()?;
//!
//! let pdf_id = PdfId::generate();
//! pipeline.index_pdf(Path::new("report.pdf"), &pdf_id).await?;
//! let answer = pipeline.answer("Who wrote the report?", &pdf_id).await?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::chat::ChatModel;
use crate::chunking::{RecursiveCharacterSplitter, TextSplitter};
use crate::config::RagConfig;
use crate::document::{Answer, NOT_FOUND, Page, SearchResult, format_source};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::id::PdfId;
use crate::loader::{DocumentLoader, PdfLoader};
use crate::prompt::{
    answer_prompt, build_context, is_affirmative, is_not_found_reply, verification_prompt,
};
use crate::vectorstore::VectorStore;

/// Chunk texts sent per embedding request.
const EMBED_BATCH_SIZE: usize = 64;

/// Summary of a completed indexing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexReport {
    /// The PDF that was indexed.
    pub pdf_id: PdfId,
    /// The collection its chunks were written to.
    pub collection: String,
    /// Number of pages the loader returned.
    pub page_count: usize,
    /// Number of chunks stored.
    pub chunk_count: usize,
}

/// How a question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Retrieval found no chunks at all.
    EmptyResult,
    /// The context did not support an answer, or the model declined.
    NotFound,
    /// The model answered from the retrieved context.
    Answered,
}

/// The PDF question-answering pipeline.
///
/// Every call takes the [`PdfId`] it operates on; the pipeline holds no
/// per-document state beyond short-lived indexing locks. Construct one via
/// [`PdfQaPipeline::builder()`].
pub struct PdfQaPipeline {
    config: RagConfig,
    loader: Arc<dyn DocumentLoader>,
    splitter: Arc<dyn TextSplitter>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chat_model: Arc<dyn ChatModel>,
    index_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PdfQaPipeline {
    /// Create a new [`PdfQaPipelineBuilder`].
    pub fn builder() -> PdfQaPipelineBuilder {
        PdfQaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    async fn collection_lock(&self, collection: &str) -> Arc<Mutex<()>> {
        self.index_locks.lock().await.entry(collection.to_string()).or_default().clone()
    }

    /// Drop the map entry for `collection` once no other task holds `lock`.
    async fn release_lock(&self, collection: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.index_locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(collection);
        }
    }

    /// Load, split, embed, and store a PDF under `pdf_id`.
    ///
    /// Any existing collection for `pdf_id` is replaced, but only once the
    /// new chunks have been embedded; a failure before that point leaves
    /// the previous index untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoaderError`] if the PDF cannot be read or has no
    /// text, and [`RagError::PipelineError`] if embedding or storage fails.
    pub async fn index_pdf(&self, path: &Path, pdf_id: &PdfId) -> Result<IndexReport> {
        let pages = self.loader.load(path).await.map_err(|e| {
            error!(pdf_id = %pdf_id, path = %path.display(), error = %e, "loading failed");
            e
        })?;
        self.index_pages(pdf_id, &pages).await
    }

    /// Index already-extracted pages under `pdf_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the pages contain no text or if
    /// embedding or storage fails.
    pub async fn index_pages(&self, pdf_id: &PdfId, pages: &[Page]) -> Result<IndexReport> {
        let collection = pdf_id.collection_name();
        let lock = self.collection_lock(&collection).await;
        let result = {
            let _guard = lock.lock().await;
            self.index_locked(pdf_id, collection.clone(), pages).await
        };
        self.release_lock(&collection, lock).await;
        result
    }

    async fn index_locked(
        &self,
        pdf_id: &PdfId,
        collection: String,
        pages: &[Page],
    ) -> Result<IndexReport> {
        let mut chunks = self.splitter.split_pages(pdf_id.as_str(), pages);
        if chunks.is_empty() {
            return Err(RagError::PipelineError(format!("PDF '{pdf_id}' has no text to index")));
        }
        debug!(pdf_id = %pdf_id, chunk_count = chunks.len(), "split pages");

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(pdf_id = %pdf_id, error = %e, "embedding failed during indexing");
                RagError::PipelineError(format!("embedding failed for PDF '{pdf_id}': {e}"))
            })?;
            embeddings.extend(vectors);
        }
        if embeddings.len() != chunks.len() {
            return Err(RagError::PipelineError(format!(
                "embedding provider '{}' returned {} vectors for {} chunks",
                self.embedding_provider.name(),
                embeddings.len(),
                chunks.len()
            )));
        }
        let dimensions = self.embedding_provider.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            error!(
                pdf_id = %pdf_id,
                expected = dimensions,
                got = bad.len(),
                "embedding size mismatch"
            );
            return Err(RagError::PipelineError(format!(
                "embedding provider '{}' returned a {}-dimension vector, expected {dimensions}",
                self.embedding_provider.name(),
                bad.len()
            )));
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let store_err = |e: RagError| {
            error!(pdf_id = %pdf_id, collection = %collection, error = %e, "storing chunks failed");
            RagError::PipelineError(format!("storing PDF '{pdf_id}' in '{collection}' failed: {e}"))
        };
        self.vector_store.delete_collection(&collection).await.map_err(store_err)?;
        self.vector_store.create_collection(&collection, dimensions).await.map_err(store_err)?;
        self.vector_store.upsert(&collection, &chunks).await.map_err(store_err)?;

        let report = IndexReport {
            pdf_id: pdf_id.clone(),
            collection,
            page_count: pages.len(),
            chunk_count: chunks.len(),
        };
        info!(
            pdf_id = %report.pdf_id,
            collection = %report.collection,
            page_count = report.page_count,
            chunk_count = report.chunk_count,
            "indexed pdf"
        );
        Ok(report)
    }

    /// Whether `pdf_id` has an index.
    pub async fn is_indexed(&self, pdf_id: &PdfId) -> Result<bool> {
        self.vector_store.collection_exists(&pdf_id.collection_name()).await
    }

    /// Drop the index for `pdf_id`. No-op if it was never indexed.
    pub async fn forget(&self, pdf_id: &PdfId) -> Result<()> {
        let collection = pdf_id.collection_name();
        let lock = self.collection_lock(&collection).await;
        let result = {
            let _guard = lock.lock().await;
            self.vector_store.delete_collection(&collection).await
        };
        self.release_lock(&collection, lock).await;
        result.map_err(|e| {
            error!(pdf_id = %pdf_id, error = %e, "failed to delete collection");
            RagError::PipelineError(format!("failed to forget PDF '{pdf_id}': {e}"))
        })?;
        info!(pdf_id = %pdf_id, collection = %collection, "forgot pdf");
        Ok(())
    }

    /// Embed `question` and fetch the `top_k` nearest chunks of `pdf_id`.
    ///
    /// A PDF that was never indexed yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn retrieve(&self, question: &str, pdf_id: &PdfId) -> Result<Vec<SearchResult>> {
        let collection = pdf_id.collection_name();
        let exists = self.vector_store.collection_exists(&collection).await.map_err(|e| {
            error!(collection = %collection, error = %e, "collection lookup failed");
            RagError::PipelineError(format!("lookup of '{collection}' failed: {e}"))
        })?;
        if !exists {
            debug!(pdf_id = %pdf_id, "no index for pdf");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("question embedding failed: {e}"))
        })?;

        let results = self
            .vector_store
            .search(&collection, &query_embedding, self.config.top_k)
            .await
            .map_err(|e| {
                error!(collection = %collection, error = %e, "vector store search failed");
                RagError::PipelineError(format!("search failed in collection '{collection}': {e}"))
            })?;

        Ok(match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        })
    }

    /// Ask the chat model whether `context` contains the answer.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the chat call fails.
    pub async fn verify(&self, question: &str, context: &str) -> Result<bool> {
        let reply = self.chat(&verification_prompt(question, context), "verification").await?;
        let verified = is_affirmative(&reply);
        debug!(verified, reply = %reply.trim(), "verification reply");
        Ok(verified)
    }

    /// Ask the chat model to answer from `context` alone.
    ///
    /// Empty replies and any spelling of the not-found sentence become
    /// exactly [`NOT_FOUND`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the chat call fails.
    pub async fn generate_answer(&self, question: &str, context: &str) -> Result<String> {
        let reply = self.chat(&answer_prompt(question, context), "answer").await?;
        let reply = reply.trim();
        if reply.is_empty() || is_not_found_reply(reply) {
            return Ok(NOT_FOUND.to_string());
        }
        Ok(reply.to_string())
    }

    async fn chat(&self, prompt: &str, step: &str) -> Result<String> {
        self.chat_model.complete(prompt).await.map_err(|e| {
            error!(step, model = self.chat_model.name(), error = %e, "chat call failed");
            RagError::PipelineError(format!("{step} call failed: {e}"))
        })
    }

    /// Answer `question` from the PDF identified by `pdf_id`, reporting how
    /// the question was resolved.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the question is blank or any
    /// provider call fails. "Not found" is never an error.
    pub async fn ask(&self, question: &str, pdf_id: &PdfId) -> Result<(QueryOutcome, Answer)> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::PipelineError("question must not be empty".to_string()));
        }

        let results = self.retrieve(question, pdf_id).await?;
        if results.is_empty() {
            info!(pdf_id = %pdf_id, outcome = "empty_result", "answered question");
            return Ok((QueryOutcome::EmptyResult, Answer::no_relevant_content()));
        }

        let retrieved = results.len();
        let context = build_context(&results);
        if !self.verify(question, &context).await? {
            info!(pdf_id = %pdf_id, retrieved, outcome = "not_found", "answered question");
            return Ok((QueryOutcome::NotFound, Answer::not_found()));
        }

        let answer = self.generate_answer(question, &context).await?;
        if answer == NOT_FOUND {
            info!(pdf_id = %pdf_id, retrieved, outcome = "not_found", "answered question");
            return Ok((QueryOutcome::NotFound, Answer::not_found()));
        }

        let source = format_source(results.iter().map(|r| &r.chunk));
        info!(
            pdf_id = %pdf_id,
            retrieved,
            source = %source,
            outcome = "answered",
            "answered question"
        );
        Ok((QueryOutcome::Answered, Answer { answer, source }))
    }

    /// Answer `question` from the PDF identified by `pdf_id`.
    ///
    /// # Errors
    ///
    /// See [`ask`](Self::ask).
    pub async fn answer(&self, question: &str, pdf_id: &PdfId) -> Result<Answer> {
        self.ask(question, pdf_id).await.map(|(_, answer)| answer)
    }
}

/// Builder for constructing a [`PdfQaPipeline`].
///
/// The embedding provider, vector store, and chat model are required. The
/// config defaults to [`RagConfig::default()`], the loader to [`PdfLoader`],
/// and the splitter to a [`RecursiveCharacterSplitter`] sized from the config.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = PdfQaPipeline::builder()
///     .config(RagConfig::builder().top_k(6).build()?)
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .chat_model(Arc::new(model))
///     .build()?;
/// ```
#[derive(Default)]
pub struct PdfQaPipelineBuilder {
    config: Option<RagConfig>,
    loader: Option<Arc<dyn DocumentLoader>>,
    splitter: Option<Arc<dyn TextSplitter>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chat_model: Option<Arc<dyn ChatModel>>,
}

impl PdfQaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the text splitter.
    pub fn splitter(mut self, splitter: Arc<dyn TextSplitter>) -> Self {
        self.splitter = Some(splitter);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the chat model used for verification and answering.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Build the [`PdfQaPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<PdfQaPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| RagError::ConfigError("chat_model is required".to_string()))?;
        let loader = self.loader.unwrap_or_else(|| Arc::new(PdfLoader::new()));
        let splitter = self
            .splitter
            .unwrap_or_else(|| Arc::new(RecursiveCharacterSplitter::from_config(&config)));

        Ok(PdfQaPipeline {
            config,
            loader,
            splitter,
            embedding_provider,
            vector_store,
            chat_model,
            index_locks: Mutex::new(HashMap::new()),
        })
    }
}
