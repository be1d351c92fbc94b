//! Brute-force semantic search: cosine similarity of a query vector against
//! every stored chunk, ranked by a stable sort so equal scores keep scan order.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::KnowledgeError;
use crate::knowledge::embeddings::{load_embeddings, StoredEmbedding};
use crate::knowledge::types::{node_key, DocType, NodeType};

/// A single semantic search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Graph node id of the owning document (`doc_<id>`).
    pub node_id: String,
    pub document_id: i64,
    pub chunk_index: i64,
    pub score: f64,
    /// Document title.
    pub label: String,
    pub doc_type: String,
    pub preview: String,
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Errors instead of returning NaN when either vector has zero norm or the
/// dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, KnowledgeError> {
    if a.len() != b.len() {
        return Err(KnowledgeError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
            context: "cosine similarity".into(),
        });
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 {
        return Err(KnowledgeError::ZeroNormVector("left operand".into()));
    }
    if norm_b == 0.0 {
        return Err(KnowledgeError::ZeroNormVector("right operand".into()));
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Score every candidate against the query and return the top `k`, best first.
///
/// The sort is stable, so equal scores keep candidate order.
pub fn rank_candidates(
    query: &[f32],
    candidates: &[StoredEmbedding],
    k: usize,
) -> Result<Vec<(usize, f64)>, KnowledgeError> {
    if query.iter().all(|x| *x == 0.0) {
        return Err(KnowledgeError::ZeroNormVector("query".into()));
    }

    let mut scored = Vec::with_capacity(candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        if candidate.vector.len() != query.len() {
            return Err(KnowledgeError::DimensionMismatch {
                expected: query.len(),
                actual: candidate.vector.len(),
                context: format!("embedding {}", candidate.id),
            });
        }
        let score = cosine_similarity(query, &candidate.vector).map_err(|e| match e {
            KnowledgeError::ZeroNormVector(_) => {
                KnowledgeError::ZeroNormVector(format!("embedding {}", candidate.id))
            }
            other => other,
        })?;
        scored.push((i, score));
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    Ok(scored)
}

/// Brute-force cosine search over all stored vectors.
pub fn semantic_search(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
    doc_type: Option<DocType>,
) -> Result<Vec<SearchHit>> {
    let candidates = load_embeddings(conn, doc_type)?;
    tracing::debug!(candidates = candidates.len(), top_k, "scoring embeddings");

    let ranked = rank_candidates(query_embedding, &candidates, top_k)?;
    Ok(ranked
        .into_iter()
        .map(|(i, score)| {
            let c = &candidates[i];
            SearchHit {
                node_id: node_key(NodeType::Document, c.document_id),
                document_id: c.document_id,
                chunk_index: c.chunk_index,
                score,
                label: c.title.clone(),
                doc_type: c.doc_type.clone(),
                preview: truncate_preview(&c.chunk_text, 120),
            }
        })
        .collect())
}

/// Truncate content to max_chars, appending "..." if truncated.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((end, _)) => format!("{}...", &content[..end]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::knowledge::embeddings::store_embedding;
    use crate::knowledge::store::{insert_document, NewDocument};

    fn candidate(id: i64, vector: Vec<f32>) -> StoredEmbedding {
        StoredEmbedding {
            id,
            document_id: id,
            chunk_index: 0,
            chunk_text: String::new(),
            title: format!("doc {id}"),
            doc_type: "paper".into(),
            vector,
        }
    }

    #[test]
    fn test_self_similarity_is_one() {
        let v = [0.3f32, -1.2, 4.5, 0.01];
        let s = cosine_similarity(&v, &v).unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 2.0]).unwrap().abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_is_an_error() {
        let err = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, KnowledgeError::ZeroNormVector(_)));
        let err = rank_candidates(&[0.0, 0.0], &[candidate(1, vec![1.0, 0.0])], 5).unwrap_err();
        assert_eq!(err, KnowledgeError::ZeroNormVector("query".into()));
    }

    #[test]
    fn test_zero_candidate_names_the_row() {
        let err = rank_candidates(&[1.0, 0.0], &[candidate(7, vec![0.0, 0.0])], 5).unwrap_err();
        assert_eq!(err, KnowledgeError::ZeroNormVector("embedding 7".into()));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = rank_candidates(&[1.0, 0.0], &[candidate(3, vec![1.0, 0.0, 0.0])], 5).unwrap_err();
        assert!(matches!(err, KnowledgeError::DimensionMismatch { expected: 2, actual: 3, .. }));
    }

    #[test]
    fn test_ranking_orders_by_score_and_keeps_ties_stable() {
        let candidates = vec![
            candidate(1, vec![0.0, 1.0]),
            candidate(2, vec![1.0, 0.0]),
            candidate(3, vec![1.0, 1.0]),
            candidate(4, vec![2.0, 0.0]),
        ];
        let ranked = rank_candidates(&[1.0, 0.0], &candidates, 10).unwrap();
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        // candidates 2 and 4 tie at 1.0 and keep scan order
        assert_eq!(order, vec![1, 3, 2, 0]);
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_top_k_truncates() {
        let candidates: Vec<_> = (0..5).map(|i| candidate(i, vec![1.0, i as f32])).collect();
        assert_eq!(rank_candidates(&[1.0, 0.0], &candidates, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_semantic_search_returns_labelled_hits() {
        let conn = db::open_memory_database().unwrap();
        let mut ids = Vec::new();
        for (title, v) in [("Transport", [1.0f32, 0.0]), ("Diffusion", [0.0, 1.0])] {
            let id = insert_document(
                &conn,
                &NewDocument {
                    doc_type: DocType::Paper,
                    title,
                    date: None,
                    source_path: None,
                    content: title,
                    summary: None,
                    metadata: None,
                },
            )
            .unwrap()
            .id;
            store_embedding(&conn, id, 0, title, "m", &v).unwrap();
            ids.push(id);
        }

        let hits = semantic_search(&conn, &[0.9, 0.1], 5, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].label, "Transport");
        assert_eq!(hits[0].node_id, format!("doc_{}", ids[0]));
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("short", 80), "short");
        assert_eq!(
            truncate_preview("a".repeat(100).as_str(), 80),
            format!("{}...", "a".repeat(80))
        );
        assert_eq!(truncate_preview("ééé", 2), "éé...");
    }
}
