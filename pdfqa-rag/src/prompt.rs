//! Prompt templates for the verification and answer calls.

use crate::document::{NOT_FOUND, SearchResult};

/// Separator placed between chunk texts in the context string.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Header line introducing the context block in both prompts.
pub const CONTEXT_HEADER: &str = "Context:\n";

/// Prefix of the question line in both prompts.
pub const QUESTION_PREFIX: &str = "Question: ";

/// Closing line of the verification prompt.
pub const VERIFY_SUFFIX: &str = "Reply YES or NO:";

/// Concatenate retrieved chunk texts, most similar first.
pub fn build_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_DELIMITER)
}

/// The strict yes/no prompt asking whether `context` answers `question`.
pub fn verification_prompt(question: &str, context: &str) -> String {
    format!(
        "You check whether an excerpt from a PDF contains the answer to a question.\n\
         \n\
         Reply with exactly one word. Reply YES only if the context below explicitly \
         contains the information needed to answer the question. Otherwise reply NO. \
         Do not use outside knowledge.\n\
         \n\
         {CONTEXT_HEADER}{context}\n\
         \n\
         {QUESTION_PREFIX}{question}\n\
         \n\
         {VERIFY_SUFFIX}"
    )
}

/// The grounded answer prompt, issued only after verification passed.
pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "You answer questions using ONLY the context below, taken from a single PDF.\n\
         \n\
         Rules:\n\
         1. Use only facts stated in the context. Never use outside knowledge.\n\
         2. If the context does not contain the answer, reply with exactly: {NOT_FOUND}\n\
         3. Keep the answer concise, at most three sentences.\n\
         \n\
         {CONTEXT_HEADER}{context}\n\
         \n\
         {QUESTION_PREFIX}{question}\n\
         \n\
         Answer:"
    )
}

/// Whether a verification reply counts as a yes.
///
/// Only replies that begin with `YES`, ignoring leading whitespace and case,
/// are accepted. Anything else, including an empty reply, is a no.
pub fn is_affirmative(reply: &str) -> bool {
    reply.trim_start().get(..3).is_some_and(|head| head.eq_ignore_ascii_case("yes"))
}

/// Whether an answer reply is the model declining with the not-found
/// sentence. Case and a trailing period are ignored.
pub fn is_not_found_reply(reply: &str) -> bool {
    let sentence = |s: &str| s.trim().trim_end_matches('.').trim_end().to_owned();
    sentence(reply).eq_ignore_ascii_case(&sentence(NOT_FOUND))
}

/// Pull the context and question back out of a prompt built by this module.
///
/// Used by the offline chat model; returns `None` for foreign prompts.
pub fn parse_prompt(prompt: &str) -> Option<(&str, &str)> {
    let context_start = prompt.find(CONTEXT_HEADER)? + CONTEXT_HEADER.len();
    let question_marker = format!("\n\n{QUESTION_PREFIX}");
    let context_len = prompt[context_start..].rfind(&question_marker)?;
    let context = &prompt[context_start..context_start + context_len];
    let question_start = context_start + context_len + question_marker.len();
    let question = prompt[question_start..].split("\n\n").next()?;
    Some((context, question))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn result(text: &str) -> SearchResult {
        SearchResult { chunk: Chunk::new("doc", 0, 0, text), score: 1.0 }
    }

    #[test]
    fn context_joins_chunks_with_delimiter() {
        let context = build_context(&[result("first"), result("second")]);
        assert_eq!(context, "first\n\n---\n\nsecond");
    }

    #[test]
    fn not_found_reply_tolerates_period_and_case() {
        assert!(is_not_found_reply(NOT_FOUND));
        assert!(is_not_found_reply("Answer is not in this PDF"));
        assert!(is_not_found_reply("  answer is not in this pdf.\n"));
        assert!(!is_not_found_reply("The answer is not in this PDF, but see page 2."));
        assert!(!is_not_found_reply(""));
    }

    #[test]
    fn affirmative_requires_leading_yes() {
        assert!(is_affirmative("YES"));
        assert!(is_affirmative("  Yes, it does."));
        assert!(is_affirmative("yes"));
        assert!(!is_affirmative("NO"));
        assert!(!is_affirmative("The answer is YES"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("YE"));
    }

    #[test]
    fn answer_prompt_names_the_sentinel() {
        let prompt = answer_prompt("Who?", "Alice wrote it.");
        assert!(prompt.contains("Answer is not in this PDF."));
        assert!(prompt.contains("Alice wrote it."));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn prompts_parse_back_into_parts() {
        let context = build_context(&[result("Line one.\n\nLine two."), result("Other.")]);
        let prompts =
            [verification_prompt("What is it?", &context), answer_prompt("What is it?", &context)];
        for prompt in prompts {
            let (parsed_context, parsed_question) = parse_prompt(&prompt).unwrap();
            assert_eq!(parsed_context, context);
            assert_eq!(parsed_question, "What is it?");
        }
        assert!(parse_prompt("hello").is_none());
    }
}
