//! Advisory duplicate detection over entity names.
//!
//! Exact duplicates are names that collide after Unicode lowercasing. Fuzzy
//! duplicates are pairs whose character-level similarity ratio
//! (`2 * matches / total chars`) meets a threshold. Pairs scoring 1.0 are
//! exact duplicates and are left to the exact pass. The fuzzy scan is a full
//! pairwise comparison, O(n²) in the table size.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use similar::TextDiff;
use std::collections::HashMap;

use crate::knowledge::store::list_entities;
use crate::knowledge::types::EntityKind;

/// Names that are identical ignoring case.
#[derive(Debug, Clone, Serialize)]
pub struct ExactDuplicate {
    pub kind: EntityKind,
    pub normalized: String,
    pub names: Vec<String>,
    pub count: usize,
}

/// Two names that are similar but not identical ignoring case.
#[derive(Debug, Clone, Serialize)]
pub struct FuzzyDuplicate {
    pub kind: EntityKind,
    pub name_a: String,
    pub name_b: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct DuplicateReport {
    pub exact: Vec<ExactDuplicate>,
    pub fuzzy: Vec<FuzzyDuplicate>,
}

/// Similarity ratio of two strings, in `[0, 1]`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio() as f64
}

/// Group names case-insensitively; groups of two or more, largest first.
pub fn exact_duplicates(kind: EntityKind, names: &[String]) -> Vec<ExactDuplicate> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for name in names {
        let normalized = name.to_lowercase();
        let members = groups.entry(normalized.clone()).or_insert_with(|| {
            order.push(normalized);
            Vec::new()
        });
        members.push(name.clone());
    }

    let mut dupes: Vec<ExactDuplicate> = order
        .into_iter()
        .filter_map(|normalized| {
            let names = groups.remove(&normalized)?;
            (names.len() > 1).then(|| ExactDuplicate {
                kind,
                count: names.len(),
                normalized,
                names,
            })
        })
        .collect();
    dupes.sort_by(|a, b| b.count.cmp(&a.count));
    dupes
}

/// All name pairs with `threshold <= ratio < 1.0`, best first.
pub fn fuzzy_duplicates(kind: EntityKind, names: &[String], threshold: f64) -> Vec<FuzzyDuplicate> {
    let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    let mut pairs = Vec::new();

    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let score = similarity_ratio(&lowered[i], &lowered[j]);
            if score >= threshold && score < 1.0 {
                pairs.push(FuzzyDuplicate {
                    kind,
                    name_a: names[i].clone(),
                    name_b: names[j].clone(),
                    score,
                });
            }
        }
    }

    pairs.sort_by(|a, b| b.score.total_cmp(&a.score));
    pairs
}

/// Run both passes over the given entity kinds.
pub fn find_duplicates(
    conn: &Connection,
    kinds: &[EntityKind],
    fuzzy_threshold: f64,
) -> Result<DuplicateReport> {
    let mut exact = Vec::new();
    let mut fuzzy = Vec::new();

    for &kind in kinds {
        let names: Vec<String> = list_entities(conn, kind)?
            .into_iter()
            .map(|e| e.name)
            .collect();
        tracing::debug!(kind = %kind, names = names.len(), "checking duplicates");
        exact.extend(exact_duplicates(kind, &names));
        fuzzy.extend(fuzzy_duplicates(kind, &names, fuzzy_threshold));
    }

    fuzzy.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(DuplicateReport { exact, fuzzy })
}
