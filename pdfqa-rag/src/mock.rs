//! Offline providers for tests, demos, and the CLI's `--offline` mode.
//!
//! - [`HashEmbeddingProvider`]: deterministic bag-of-words feature hashing
//! - [`MockChatModel`]: replays scripted replies and records prompts
//! - [`ExtractiveChatModel`]: answers by quoting the best-matching sentence

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chat::ChatModel;
use crate::document::NOT_FOUND;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::prompt::{VERIFY_SUFFIX, parse_prompt};

/// Words too common to count as evidence of relevance.
const STOPWORDS: &[&str] = &[
    "about", "also", "been", "does", "from", "have", "into", "said", "than", "that", "their",
    "them", "then", "there", "these", "they", "this", "what", "when", "where", "which", "while",
    "whom", "whose", "will", "with", "would", "your",
];

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn keywords(text: &str) -> HashSet<String> {
    tokens(text).filter(|t| t.chars().count() >= 4 && !STOPWORDS.contains(&t.as_str())).collect()
}

/// 64-bit FNV-1a, stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Embeds text by hashing its lowercase tokens into a fixed number of buckets.
///
/// Texts sharing words end up with a positive cosine similarity, which is
/// enough for retrieval to find the right chunk without any API key.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// A chat model that returns scripted replies in order.
///
/// Every prompt is recorded so tests can assert how many calls were made
/// and what they contained. Running out of replies is an error.
#[derive(Debug, Default)]
pub struct MockChatModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockChatModel {
    /// Create a mock that will return `replies` one per call.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).push(prompt.to_string());
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).pop_front().ok_or_else(|| {
            RagError::ChatModelError {
                provider: "mock".to_string(),
                message: "no scripted reply left".to_string(),
            }
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A keyword-overlap stand-in for a real chat model.
///
/// Verification says YES when any significant question word appears in the
/// context. Answering quotes the context sentence sharing the most
/// significant words with the question, or the not-found sentinel when
/// nothing matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveChatModel;

impl ExtractiveChatModel {
    /// Create a new extractive model.
    pub fn new() -> Self {
        Self
    }

    fn best_sentence<'a>(context: &'a str, wanted: &HashSet<String>) -> Option<&'a str> {
        context
            .split(['.', '\n', '?', '!'])
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "---")
            .map(|s| (keywords(s).intersection(wanted).count(), s))
            .filter(|(score, _)| *score > 0)
            .fold(None, |best: Option<(usize, &str)>, (score, s)| match best {
                Some((top, _)) if top >= score => best,
                _ => Some((score, s)),
            })
            .map(|(_, s)| s)
    }
}

#[async_trait]
impl ChatModel for ExtractiveChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let Some((context, question)) = parse_prompt(prompt) else {
            return Ok(String::new());
        };
        let wanted = keywords(question);
        let found = Self::best_sentence(context, &wanted);

        if prompt.trim_end().ends_with(VERIFY_SUFFIX) {
            return Ok(if found.is_some() { "YES" } else { "NO" }.to_string());
        }
        Ok(found.map_or_else(|| NOT_FOUND.to_string(), |s| format!("{s}.")))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{answer_prompt, verification_prompt};

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn hash_embeddings_are_deterministic_and_normalized() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed("Rust ownership rules").await.unwrap();
        let b = provider.embed("Rust ownership rules").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_words_score_higher_than_unrelated_text() {
        let provider = HashEmbeddingProvider::default();
        let question = provider.embed("What is the boiling point of water?").await.unwrap();
        let related = provider.embed("Water has a boiling point of 100 degrees.").await.unwrap();
        let unrelated = provider.embed("Tokio schedules async tasks on threads.").await.unwrap();
        assert!(cosine(&question, &related) > cosine(&question, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let provider = HashEmbeddingProvider::new(8);
        assert_eq!(provider.embed("").await.unwrap(), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn mock_replays_in_order_then_errors() {
        let model = MockChatModel::new(["YES", "Forty-two."]);
        assert_eq!(model.complete("first").await.unwrap(), "YES");
        assert_eq!(model.complete("second").await.unwrap(), "Forty-two.");
        assert!(model.complete("third").await.is_err());
        assert_eq!(model.prompts(), vec!["first", "second", "third"]);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn extractive_model_verifies_and_quotes() {
        let context = "The treaty was signed in Vienna. Delegates arrived by train.";
        let model = ExtractiveChatModel::new();

        let verdict =
            model.complete(&verification_prompt("Where was the treaty signed?", context)).await;
        assert_eq!(verdict.unwrap(), "YES");

        let answer = model.complete(&answer_prompt("Where was the treaty signed?", context)).await;
        assert_eq!(answer.unwrap(), "The treaty was signed in Vienna.");
    }

    #[tokio::test]
    async fn extractive_model_rejects_unrelated_questions() {
        let context = "The treaty was signed in Vienna.";
        let model = ExtractiveChatModel::new();

        let question = "What is the capital of France?";
        let verdict = model.complete(&verification_prompt(question, context)).await;
        assert_eq!(verdict.unwrap(), "NO");

        let answer = model.complete(&answer_prompt(question, context)).await;
        assert_eq!(answer.unwrap(), NOT_FOUND);
    }
}
