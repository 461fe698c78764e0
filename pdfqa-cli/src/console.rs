//! Interactive question loop.

use anyhow::Result;
use pdfqa_rag::{Answer, PdfId, PdfQaPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

/// Print an answer and, when present, its source line.
pub fn print_answer(answer: &Answer) {
    println!("{}", answer.answer);
    if !answer.source.is_empty() {
        println!("{}", answer.source);
    }
}

/// Read questions from the terminal and answer each from `pdf_id` until
/// Ctrl-C or Ctrl-D. Blank lines are skipped; a failed question is reported
/// and the loop continues.
pub async fn run_console(pipeline: &PdfQaPipeline, pdf_id: &PdfId) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Asking about PDF {pdf_id}. Ctrl-D to quit.\n");

    loop {
        match editor.readline("question> ") {
            Ok(line) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if let Err(e) = editor.add_history_entry(question) {
                    debug!(error = %e, "history entry not recorded");
                }

                match pipeline.answer(question, pdf_id).await {
                    Ok(answer) => print_answer(&answer),
                    Err(e) => {
                        warn!(pdf_id = %pdf_id, error = %e, "question failed");
                        eprintln!("error: {e}");
                    }
                }
                println!();
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
