//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pdfqa_rag::PdfId;
use pdfqa_rag::config::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};

/// Index PDFs and ask questions answered only from their pages.
#[derive(Debug, Parser)]
#[command(name = "pdfqa")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Directory holding one index file per PDF
    #[arg(long, global = true, env = "PDFQA_STORAGE_DIR", default_value = "pdfqa_store")]
    pub storage_dir: PathBuf,

    /// Use local hash embeddings and an extractive answerer instead of OpenAI.
    /// Offline indexes live in their own subdirectory of the storage dir.
    #[arg(long, global = true)]
    pub offline: bool,

    /// OpenAI chat model used for verification and answering
    #[arg(long, global = true, env = "PDFQA_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    /// OpenAI embedding model
    #[arg(
        long,
        global = true,
        env = "PDFQA_EMBEDDING_MODEL",
        default_value = DEFAULT_EMBEDDING_MODEL
    )]
    pub embedding_model: String,

    /// Chunks retrieved per question
    #[arg(long, global = true, default_value_t = 5)]
    pub top_k: usize,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a PDF so questions can be asked about it
    Index {
        /// PDF file to index
        #[arg(value_parser = parse_pdf_path)]
        pdf: PathBuf,

        /// Id to index under; a new UUID is generated when omitted.
        /// Re-using an id replaces its previous index.
        #[arg(long)]
        id: Option<PdfId>,
    },

    /// Ask one question about an indexed PDF
    Ask {
        /// Id printed by `pdfqa index`
        pdf_id: PdfId,

        /// The question
        #[arg(value_parser = parse_question)]
        question: String,

        /// Print `{"answer": ..., "source": ...}` instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Ask questions interactively until Ctrl-D
    Chat {
        /// Id printed by `pdfqa index`
        pdf_id: PdfId,
    },

    /// Delete the index of a PDF
    Forget {
        /// Id printed by `pdfqa index`
        pdf_id: PdfId,
    },
}

fn parse_pdf_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    let is_pdf = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(format!("'{value}' is not a .pdf file"));
    }
    Ok(path)
}

fn parse_question(value: &str) -> Result<String, String> {
    let question = value.trim();
    if question.is_empty() {
        return Err("question must not be empty".to_string());
    }
    Ok(question.to_string())
}
