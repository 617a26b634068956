//! Property tests for in-memory vector store ordering and relevance filtering.

use proptest::prelude::*;
use tinyrag_core::inmemory::{DistanceMetric, InMemoryVectorStore};
use tinyrag_core::vectorstore::VectorStore;
use tinyrag_core::{ScoredDocument, filter_relevant};

/// Generate an embedding with finite components of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-10.0f32..10.0f32, dim)
}

fn arb_metric() -> impl Strategy<Value = DistanceMetric> {
    prop_oneof![Just(DistanceMetric::L2), Just(DistanceMetric::Cosine)]
}

fn arb_scored() -> impl Strategy<Value = ScoredDocument> {
    ("[a-z ]{1,20}", -5.0f32..5.0f32).prop_map(|(content, score)| ScoredDocument { content, score })
}

/// Querying an in-memory store returns at most `k` results ordered by
/// ascending distance, drawn from what was inserted.
mod prop_inmemory_query_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ascending_and_bounded_by_k(
            rows in proptest::collection::vec(("[a-z]{3,12}", arb_embedding(DIM)), 0..20),
            query in arb_embedding(DIM),
            k in 1usize..25,
            metric in arb_metric(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::with_metric(metric);
                store.create(DIM).await.unwrap();
                for (content, embedding) in &rows {
                    store.insert(content, embedding).await.unwrap();
                }
                store.query(&query, k).await.unwrap()
            });

            prop_assert!(results.len() <= k);
            prop_assert_eq!(results.len(), rows.len().min(k));

            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].distance <= pair[1].distance,
                    "distances not ascending: {} > {}",
                    pair[0].distance,
                    pair[1].distance
                );
            }

            for result in &results {
                prop_assert!(rows.iter().any(|(content, _)| content == &result.content));
            }
        }
    }
}

/// Filtering keeps exactly the documents at or above the threshold, in
/// their original order.
mod prop_filter_relevant {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn keeps_an_ordered_subsequence_of_relevant_documents(
            scored in proptest::collection::vec(arb_scored(), 0..15),
            threshold in -2.0f32..2.0f32,
        ) {
            let kept = filter_relevant(scored.clone(), threshold);

            prop_assert!(kept.iter().all(|d| d.score >= threshold));
            prop_assert_eq!(kept.len(), scored.iter().filter(|d| d.score >= threshold).count());

            let mut remaining = scored.iter();
            for doc in &kept {
                prop_assert!(
                    remaining.any(|candidate| candidate == doc),
                    "kept document out of order: {:?}",
                    doc
                );
            }
        }
    }
}
