//! Retrieval with relevance filtering.
//!
//! The caller embeds the query; [`retrieve`] asks the store for the top-`k`
//! nearest documents and drops everything at or below the similarity
//! threshold. The three outcomes are kept apart so the chat layer can give
//! a different reply for an empty knowledge base and an off-topic question.

use anyhow::Result;

use crate::models::ScoredDocument;
use crate::store::Store;

/// Retrieval tuning, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    /// Number of nearest documents to fetch.
    pub top_k: usize,
    /// Documents with `similarity <= threshold` are discarded.
    pub similarity_threshold: f64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_threshold: 0.3,
        }
    }
}

/// Outcome of a retrieval pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// The store returned nothing at all.
    EmptyKnowledgeBase,
    /// Candidates existed but none cleared the threshold.
    NoRelevantDocuments {
        /// Best similarity among the discarded candidates, if the index
        /// returned any.
        best_similarity: Option<f64>,
    },
    /// Candidates above the threshold, most similar first.
    Relevant(Vec<ScoredDocument>),
}

/// Fetch the nearest documents for `query_vec` and apply the threshold.
pub async fn retrieve<S: Store + ?Sized>(
    store: &S,
    query_vec: &[f32],
    params: &RetrievalParams,
) -> Result<Retrieval> {
    let candidates = store.query_nearest(query_vec, params.top_k).await?;
    if candidates.is_empty() && store.count().await? > 0 {
        // Approximate indexes can miss every row of a small table.
        return Ok(Retrieval::NoRelevantDocuments {
            best_similarity: None,
        });
    }
    Ok(classify(candidates, params))
}

/// Apply the relevance threshold to an already ranked candidate list.
pub fn classify(candidates: Vec<ScoredDocument>, params: &RetrievalParams) -> Retrieval {
    if candidates.is_empty() {
        return Retrieval::EmptyKnowledgeBase;
    }

    let best_similarity = candidates
        .iter()
        .map(|c| c.similarity)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut relevant = filter_relevant(candidates, params.similarity_threshold);
    if relevant.is_empty() {
        return Retrieval::NoRelevantDocuments {
            best_similarity: Some(best_similarity),
        };
    }
    relevant.truncate(params.top_k);
    Retrieval::Relevant(relevant)
}

/// Keep only documents strictly above `threshold`, preserving order.
pub fn filter_relevant(candidates: Vec<ScoredDocument>, threshold: f64) -> Vec<ScoredDocument> {
    candidates
        .into_iter()
        .filter(|c| c.similarity > threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIMS;
    use crate::models::Metadata;
    use crate::store::memory::InMemoryStore;

    fn scored(content: &str, similarity: f64) -> ScoredDocument {
        ScoredDocument {
            id: content.to_string(),
            content: content.to_string(),
            metadata: Metadata::new(),
            similarity,
        }
    }

    /// Unit vector at angle whose cosine with axis 0 equals `cos`.
    fn at_cosine(cos: f32) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIMS];
        v[0] = cos;
        v[1] = (1.0 - cos * cos).sqrt();
        v
    }

    fn query() -> Vec<f32> {
        at_cosine(1.0)
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let kept = filter_relevant(
            vec![scored("a", 0.9), scored("b", 0.3), scored("c", 0.31)],
            0.3,
        );
        let ids: Vec<&str> = kept.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_classify_empty() {
        let params = RetrievalParams::default();
        assert_eq!(classify(Vec::new(), &params), Retrieval::EmptyKnowledgeBase);
    }

    #[test]
    fn test_classify_all_below_threshold() {
        let params = RetrievalParams::default();
        let outcome = classify(vec![scored("a", 0.29), scored("b", 0.1)], &params);
        match outcome {
            Retrieval::NoRelevantDocuments {
                best_similarity: Some(best),
            } => assert!((best - 0.29).abs() < 1e-9),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retrieve_sorted_bounded_and_filtered() {
        let store = InMemoryStore::new();
        let m = Metadata::new();
        for (content, cos) in [
            ("low", 0.2f32),
            ("high", 0.95),
            ("edge", 0.3),
            ("mid", 0.6),
            ("good", 0.8),
        ] {
            store.insert(content, &at_cosine(cos), &m).await.unwrap();
        }

        for k in 1..=5 {
            let params = RetrievalParams {
                top_k: k,
                similarity_threshold: 0.3,
            };
            let docs = match retrieve(&store, &query(), &params).await.unwrap() {
                Retrieval::Relevant(docs) => docs,
                other => panic!("unexpected outcome: {:?}", other),
            };
            assert!(docs.len() <= k);
            assert!(docs.iter().all(|d| d.similarity > 0.3));
            assert!(docs
                .windows(2)
                .all(|w| w[0].similarity >= w[1].similarity));
        }
    }

    #[tokio::test]
    async fn test_retrieve_reports_empty_store() {
        let store = InMemoryStore::new();
        let outcome = retrieve(&store, &query(), &RetrievalParams::default())
            .await
            .unwrap();
        assert_eq!(outcome, Retrieval::EmptyKnowledgeBase);
    }

    #[tokio::test]
    async fn test_retrieve_reports_no_relevant() {
        let store = InMemoryStore::new();
        store
            .insert("unrelated", &at_cosine(0.05), &Metadata::new())
            .await
            .unwrap();
        let outcome = retrieve(&store, &query(), &RetrievalParams::default())
            .await
            .unwrap();
        assert!(matches!(outcome, Retrieval::NoRelevantDocuments { .. }));
    }

    /// A store whose nearest-neighbour index returns nothing even though
    /// rows exist.
    struct MissingIndexStore;

    #[async_trait::async_trait]
    impl Store for MissingIndexStore {
        async fn insert(&self, _: &str, _: &[f32], _: &Metadata) -> anyhow::Result<String> {
            Ok("1".to_string())
        }
        async fn query_nearest(
            &self,
            _: &[f32],
            _: usize,
        ) -> anyhow::Result<Vec<ScoredDocument>> {
            Ok(Vec::new())
        }
        async fn delete_all(&self) -> anyhow::Result<u64> {
            Ok(0)
        }
        async fn count(&self) -> anyhow::Result<u64> {
            Ok(8)
        }
    }

    #[tokio::test]
    async fn test_populated_store_with_no_candidates_is_not_empty() {
        let outcome = retrieve(&MissingIndexStore, &query(), &RetrievalParams::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Retrieval::NoRelevantDocuments {
                best_similarity: None
            }
        );
    }
}
