//! Property tests for vector store search ordering.

use pdfqa_rag::document::Chunk;
use pdfqa_rag::inmemory::InMemoryVectorStore;
use pdfqa_rag::local::LocalVectorStore;
use pdfqa_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate chunks with sequential ids and normalized embeddings.
fn arb_chunks(dim: usize) -> impl Strategy<Value = Vec<Chunk>> {
    proptest::collection::vec(("[a-z ]{5,30}", 0u32..10, arb_normalized_embedding(dim)), 1..20)
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(chunk_id, (text, page, embedding))| {
                    let mut chunk = Chunk::new("doc", chunk_id, page, text);
                    chunk.embedding = embedding;
                    chunk
                })
                .collect()
        })
}

async fn search_all(
    store: &dyn VectorStore,
    chunks: &[Chunk],
    query: &[f32],
    top_k: usize,
    dim: usize,
) -> Vec<pdfqa_rag::SearchResult> {
    store.create_collection("test", dim).await.unwrap();
    store.upsert("test", chunks).await.unwrap();
    store.search("test", query, top_k).await.unwrap()
}

fn assert_ranked(
    results: &[pdfqa_rag::SearchResult],
    stored: usize,
    top_k: usize,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(results.len(), top_k.min(stored));
    for window in results.windows(2) {
        prop_assert!(
            window[0].score >= window[1].score,
            "results not in descending order: {} < {}",
            window[0].score,
            window[1].score,
        );
    }
    Ok(())
}

/// Searching any set of stored chunks returns `min(top_k, stored)` results
/// ordered by descending cosine similarity.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn in_memory_results_ordered_and_bounded(
            chunks in arb_chunks(DIM),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let store = InMemoryVectorStore::new();
            let results = rt.block_on(search_all(&store, &chunks, &query, top_k, DIM));
            assert_ranked(&results, chunks.len(), top_k)?;
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn local_results_match_in_memory(
            chunks in arb_chunks(DIM),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let dir = tempfile::tempdir().unwrap();
            let (local, memory) = rt.block_on(async {
                let local = LocalVectorStore::open(dir.path()).await.unwrap();
                let memory = InMemoryVectorStore::new();
                (
                    search_all(&local, &chunks, &query, top_k, DIM).await,
                    search_all(&memory, &chunks, &query, top_k, DIM).await,
                )
            });

            assert_ranked(&local, chunks.len(), top_k)?;
            let local_scores: Vec<f32> = local.iter().map(|r| r.score).collect();
            let memory_scores: Vec<f32> = memory.iter().map(|r| r.score).collect();
            prop_assert_eq!(local_scores, memory_scores);
        }
    }
}
