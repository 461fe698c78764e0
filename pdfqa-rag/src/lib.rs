//! Question answering over PDF documents.
//!
//! A PDF is indexed once under a [`PdfId`]: its pages are extracted, split
//! into overlapping chunks, embedded, and written to a per-PDF collection in
//! a [`VectorStore`]. Questions about that PDF retrieve the nearest chunks,
//! ask a [`ChatModel`] whether they contain the answer, and only then ask it
//! to answer from that context alone. Answers cite the pages they came from;
//! questions the document cannot answer get [`NOT_FOUND`] instead of a guess.
//!
//! The [`PdfQaPipeline`] composes the pieces. [`index_pdf_to_store`] and
//! [`answer_question`] wire up the default OpenAI-backed pipeline over a
//! [`LocalVectorStore`].
//!
//! # Features
//!
//! - `openai` (default): [`OpenAIEmbeddingProvider`], [`OpenAIChatModel`],
//!   and the boundary functions

pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod id;
pub mod inmemory;
pub mod loader;
pub mod local;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

pub use chat::ChatModel;
pub use chunking::{RecursiveCharacterSplitter, TextSpan, TextSplitter};
pub use config::{ModelConfig, RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, NO_RELEVANT_CONTENT, NOT_FOUND, Page, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use id::PdfId;
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, PdfLoader};
pub use local::LocalVectorStore;
pub use mock::{ExtractiveChatModel, HashEmbeddingProvider, MockChatModel};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
pub use pipeline::{IndexReport, PdfQaPipeline, PdfQaPipelineBuilder, QueryOutcome};
pub use vectorstore::VectorStore;

#[cfg(feature = "openai")]
use std::{path::Path, sync::Arc};

/// Build the production pipeline: OpenAI embeddings and chat over a
/// [`LocalVectorStore`] rooted at `storage_dir`.
///
/// The API key is read from `OPENAI_API_KEY`.
///
/// # Errors
///
/// Returns [`RagError::EmbeddingError`] if the key is missing, and
/// [`RagError::VectorStoreError`] if `storage_dir` cannot be created.
#[cfg(feature = "openai")]
pub async fn openai_pipeline(
    storage_dir: impl AsRef<Path>,
    models: &ModelConfig,
    config: RagConfig,
) -> Result<PdfQaPipeline> {
    let embedder = OpenAIEmbeddingProvider::from_env()?.with_model(models.embedding_model.as_str());
    let chat = OpenAIChatModel::from_env()?
        .with_model(models.chat_model.as_str())
        .with_temperature(models.temperature);
    let store = LocalVectorStore::open(storage_dir.as_ref()).await?;

    PdfQaPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .chat_model(Arc::new(chat))
        .build()
}

/// Index the PDF at `pdf_path` under `pdf_id`, persisting to `storage_dir`.
///
/// Re-indexing an id replaces its previous chunks.
///
/// # Errors
///
/// Returns [`RagError::InvalidPdfId`] for a malformed id, and propagates
/// loader, provider, and storage failures.
///
/// # Example
///
/// ```rust,ignore
/// let pdf_id = pdfqa_rag::PdfId::generate();
/// let report = pdfqa_rag::index_pdf_to_store("report.pdf", pdf_id.as_str(), "pdfqa_store").await?;
/// println!("{} chunks", report.chunk_count);
/// ```
#[cfg(feature = "openai")]
pub async fn index_pdf_to_store(
    pdf_path: impl AsRef<Path>,
    pdf_id: &str,
    storage_dir: impl AsRef<Path>,
) -> Result<IndexReport> {
    let pdf_id = PdfId::new(pdf_id)?;
    let pipeline =
        openai_pipeline(storage_dir, &ModelConfig::default(), RagConfig::default()).await?;
    pipeline.index_pdf(pdf_path.as_ref(), &pdf_id).await
}

/// Answer `question` from the PDF indexed under `pdf_id` in `storage_dir`.
///
/// A question the PDF cannot answer is not an error: the returned
/// [`Answer`] carries [`NOT_FOUND`] (or [`NO_RELEVANT_CONTENT`] when nothing
/// was retrieved) with an empty source.
///
/// # Errors
///
/// Returns [`RagError::InvalidPdfId`] for a malformed id, and
/// [`RagError::PipelineError`] for a blank question or a provider failure.
#[cfg(feature = "openai")]
pub async fn answer_question(
    question: &str,
    pdf_id: &str,
    storage_dir: impl AsRef<Path>,
) -> Result<Answer> {
    let pdf_id = PdfId::new(pdf_id)?;
    if question.trim().is_empty() {
        return Err(RagError::PipelineError("question must not be empty".to_string()));
    }
    let pipeline =
        openai_pipeline(storage_dir, &ModelConfig::default(), RagConfig::default()).await?;
    pipeline.answer(question, &pdf_id).await
}
