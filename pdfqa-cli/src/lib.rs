//! The `pdfqa` command-line front end.

pub mod cli;
pub mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pdfqa_rag::{
    ExtractiveChatModel, HashEmbeddingProvider, LocalVectorStore, ModelConfig, PdfId,
    PdfQaPipeline, RagConfig, VectorStore, openai_pipeline,
};
use tracing::warn;

use crate::cli::{Cli, Command, GlobalArgs};
use crate::console::{print_answer, run_console};

/// Subdirectory of the storage dir used by `--offline`.
const OFFLINE_DIR: &str = "offline";

/// Directory holding the indexes for the selected mode.
pub fn storage_root(args: &GlobalArgs) -> PathBuf {
    if args.offline { args.storage_dir.join(OFFLINE_DIR) } else { args.storage_dir.clone() }
}

/// Build the pipeline selected by the global flags.
pub async fn build_pipeline(args: &GlobalArgs) -> Result<PdfQaPipeline> {
    let config = RagConfig::builder().top_k(args.top_k).build()?;

    if args.offline {
        let store = LocalVectorStore::open(storage_root(args)).await?;
        return Ok(PdfQaPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .vector_store(Arc::new(store))
            .chat_model(Arc::new(ExtractiveChatModel::new()))
            .build()?);
    }

    let models = ModelConfig {
        embedding_model: args.embedding_model.clone(),
        chat_model: args.chat_model.clone(),
        ..ModelConfig::default()
    };
    openai_pipeline(&args.storage_dir, &models, config)
        .await
        .context("cannot set up the OpenAI pipeline (use --offline to run without a key)")
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Index { pdf, id } => {
            let pipeline = build_pipeline(&cli.global).await?;
            let pdf_id = id.unwrap_or_else(PdfId::generate);
            let report = pipeline
                .index_pdf(&pdf, &pdf_id)
                .await
                .with_context(|| format!("failed to index {}", pdf.display()))?;
            println!("pdf_id: {}", report.pdf_id);
            println!("pages:  {}", report.page_count);
            println!("chunks: {}", report.chunk_count);
        }

        Command::Ask { pdf_id, question, json } => {
            let pipeline = build_pipeline(&cli.global).await?;
            warn_if_unindexed(&pipeline, &pdf_id).await?;
            let answer = pipeline.answer(&question, &pdf_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print_answer(&answer);
            }
        }

        Command::Chat { pdf_id } => {
            let pipeline = build_pipeline(&cli.global).await?;
            warn_if_unindexed(&pipeline, &pdf_id).await?;
            run_console(&pipeline, &pdf_id).await?;
        }

        // Only the store is opened, so no provider credentials are needed.
        Command::Forget { pdf_id } => {
            let store = LocalVectorStore::open(storage_root(&cli.global)).await?;
            store
                .delete_collection(&pdf_id.collection_name())
                .await
                .with_context(|| format!("failed to forget PDF {pdf_id}"))?;
            println!("Forgot PDF {pdf_id}");
        }
    }

    Ok(())
}

async fn warn_if_unindexed(pipeline: &PdfQaPipeline, pdf_id: &PdfId) -> Result<()> {
    if !pipeline.is_indexed(pdf_id).await? {
        warn!(pdf_id = %pdf_id, "no index found for this PDF id");
        eprintln!("warning: PDF {pdf_id} has not been indexed");
    }
    Ok(())
}
