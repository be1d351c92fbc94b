//! Read-only queries over a built [`KnowledgeGraph`].
//!
//! Every traversal here ignores edge direction. Results are sorted with
//! explicit tie-breaks on node id so output is stable across runs.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{algo, KnowledgeGraph};
use crate::error::KnowledgeError;
use crate::knowledge::types::{EntityKind, NodeType};

/// A node reached from a starting node.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedNode {
    pub node_id: String,
    pub label: String,
    pub distance: usize,
    /// `1 / distance`
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollaborationPattern {
    pub person: String,
    pub name: String,
    pub document_count: usize,
    pub topics: Vec<String>,
    pub projects: Vec<String>,
    pub coauthors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarDocument {
    pub node_id: String,
    pub label: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicRecommendation {
    pub node_id: String,
    pub label: String,
    /// Number of similar documents linked to this topic.
    pub support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSuggestions {
    pub document: String,
    pub similar_documents: Vec<SimilarDocument>,
    pub recommended_topics: Vec<TopicRecommendation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedNode {
    pub node_id: String,
    pub label: String,
    pub node_type: NodeType,
    pub pagerank: f64,
    pub degree: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossDomainLink {
    pub topic_a: String,
    pub category_a: String,
    pub topic_b: String,
    pub category_b: String,
    pub shared_documents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Serialize)]
pub struct Neighbor {
    pub node_id: String,
    pub label: String,
    pub node_type: NodeType,
    pub relationship_type: String,
    pub direction: EdgeDirection,
    pub weight: f64,
}

fn is_kind(graph: &KnowledgeGraph, idx: NodeIndex, kind: EntityKind) -> bool {
    graph.inner()[idx].node_type == NodeType::Entity(kind)
}

fn is_document(graph: &KnowledgeGraph, idx: NodeIndex) -> bool {
    graph.inner()[idx].node_type == NodeType::Document
}

/// Distinct neighbours of a node, either direction.
fn neighbor_set(graph: &KnowledgeGraph, idx: NodeIndex) -> HashSet<NodeIndex> {
    graph.inner().neighbors_undirected(idx).collect()
}

/// Topics within `max_distance` hops of `node_id`, nearest first.
pub fn related_topics(
    graph: &KnowledgeGraph,
    node_id: &str,
    max_distance: usize,
) -> Result<Vec<RelatedNode>, KnowledgeError> {
    let start = graph.index_of(node_id)?;
    let inner = graph.inner();

    let mut related: Vec<RelatedNode> = algo::bfs_distances(inner, start, max_distance)
        .into_iter()
        .filter(|&(idx, d)| d > 0 && is_kind(graph, idx, EntityKind::Topic))
        .map(|(idx, distance)| RelatedNode {
            node_id: inner[idx].id.clone(),
            label: inner[idx].label.clone(),
            distance,
            strength: 1.0 / distance as f64,
        })
        .collect();
    related.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.node_id.cmp(&b.node_id)));
    Ok(related)
}

/// For every person: the topics and projects of their documents, and the other
/// people on those documents.
pub fn collaboration_patterns(graph: &KnowledgeGraph) -> Vec<CollaborationPattern> {
    let inner = graph.inner();
    let mut patterns = Vec::new();

    for person in inner.node_indices().filter(|&i| is_kind(graph, i, EntityKind::Person)) {
        let documents: BTreeSet<NodeIndex> = inner
            .neighbors_undirected(person)
            .filter(|&i| is_document(graph, i))
            .collect();

        let (mut topics, mut projects, mut coauthors) = (BTreeSet::new(), BTreeSet::new(), BTreeSet::new());
        for &doc in &documents {
            for n in inner.neighbors_undirected(doc) {
                let id = inner[n].id.clone();
                match inner[n].node_type {
                    NodeType::Entity(EntityKind::Topic) => {
                        topics.insert(id);
                    }
                    NodeType::Entity(EntityKind::Project) => {
                        projects.insert(id);
                    }
                    NodeType::Entity(EntityKind::Person) if n != person => {
                        coauthors.insert(id);
                    }
                    _ => {}
                }
            }
        }

        patterns.push(CollaborationPattern {
            person: inner[person].id.clone(),
            name: inner[person].label.clone(),
            document_count: documents.len(),
            topics: topics.into_iter().collect(),
            projects: projects.into_iter().collect(),
            coauthors: coauthors.into_iter().collect(),
        });
    }
    patterns
}

/// Documents whose neighbour sets overlap `document_id`'s by Jaccard similarity
/// strictly above `threshold`, and the topics those documents have that this
/// one lacks. Fails with [`KnowledgeError::NotADocument`] for any other node.
pub fn suggest_connections(
    graph: &KnowledgeGraph,
    document_id: &str,
    threshold: f64,
) -> Result<ConnectionSuggestions, KnowledgeError> {
    let start = graph.index_of(document_id)?;
    if !is_document(graph, start) {
        return Err(KnowledgeError::NotADocument(document_id.to_string()));
    }
    let inner = graph.inner();
    let own = neighbor_set(graph, start);

    let mut similar = Vec::new();
    for other in inner.node_indices() {
        if other == start || !is_document(graph, other) {
            continue;
        }
        let theirs = neighbor_set(graph, other);
        let similarity = algo::jaccard(&own, &theirs);
        if similarity > threshold {
            similar.push((other, similarity, theirs));
        }
    }
    similar.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| inner[a.0].id.cmp(&inner[b.0].id)));

    let mut support: HashMap<NodeIndex, usize> = HashMap::new();
    for (_, _, theirs) in &similar {
        for &n in theirs {
            if is_kind(graph, n, EntityKind::Topic) && !own.contains(&n) {
                *support.entry(n).or_insert(0) += 1;
            }
        }
    }
    let mut recommended_topics: Vec<TopicRecommendation> = support
        .into_iter()
        .map(|(idx, support)| TopicRecommendation {
            node_id: inner[idx].id.clone(),
            label: inner[idx].label.clone(),
            support,
        })
        .collect();
    recommended_topics.sort_by(|a, b| b.support.cmp(&a.support).then_with(|| a.node_id.cmp(&b.node_id)));

    Ok(ConnectionSuggestions {
        document: document_id.to_string(),
        similar_documents: similar
            .into_iter()
            .map(|(idx, similarity, _)| SimilarDocument {
                node_id: inner[idx].id.clone(),
                label: inner[idx].label.clone(),
                similarity,
            })
            .collect(),
        recommended_topics,
    })
}

/// Top `top_n` nodes by PageRank, optionally of one type.
pub fn important_nodes(graph: &KnowledgeGraph, top_n: usize, node_type: Option<NodeType>) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = graph
        .nodes()
        .filter(|n| node_type.map_or(true, |t| n.node_type == t))
        .map(|n| RankedNode {
            node_id: n.id.clone(),
            label: n.label.clone(),
            node_type: n.node_type,
            pagerank: n.pagerank,
            degree: n.degree,
        })
        .collect();
    ranked.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank).then_with(|| a.node_id.cmp(&b.node_id)));
    ranked.truncate(top_n);
    ranked
}

/// Fewest-hop path between two nodes as node ids, or `None` if unreachable.
pub fn shortest_path(graph: &KnowledgeGraph, from: &str, to: &str) -> Result<Option<Vec<String>>, KnowledgeError> {
    let (a, b) = (graph.index_of(from)?, graph.index_of(to)?);
    let inner = graph.inner();
    Ok(algo::shortest_path(inner, a, b).map(|path| path.into_iter().map(|i| inner[i].id.clone()).collect()))
}

/// Topic pairs in different categories that share at least one document, most
/// shared first. Topics without a category are skipped.
pub fn cross_domain_connections(graph: &KnowledgeGraph) -> Vec<CrossDomainLink> {
    let inner = graph.inner();
    let mut shared: BTreeMap<(NodeIndex, NodeIndex), usize> = BTreeMap::new();

    for doc in inner.node_indices().filter(|&i| is_document(graph, i)) {
        let topics: BTreeSet<NodeIndex> = inner
            .neighbors_undirected(doc)
            .filter(|&n| is_kind(graph, n, EntityKind::Topic) && inner[n].category.is_some())
            .collect();
        let topics: Vec<NodeIndex> = topics.into_iter().collect();
        for (i, &a) in topics.iter().enumerate() {
            for &b in &topics[i + 1..] {
                if inner[a].category != inner[b].category {
                    *shared.entry((a, b)).or_insert(0) += 1;
                }
            }
        }
    }

    let mut links: Vec<CrossDomainLink> = shared
        .into_iter()
        .map(|((a, b), count)| CrossDomainLink {
            topic_a: inner[a].id.clone(),
            category_a: inner[a].category.clone().unwrap_or_default(),
            topic_b: inner[b].id.clone(),
            category_b: inner[b].category.clone().unwrap_or_default(),
            shared_documents: count,
        })
        .collect();
    links.sort_by(|x, y| {
        y.shared_documents
            .cmp(&x.shared_documents)
            .then_with(|| (&x.topic_a, &x.topic_b).cmp(&(&y.topic_a, &y.topic_b)))
    });
    links
}

/// Direct neighbours of a node with the connecting edge, outgoing first.
pub fn neighbors(graph: &KnowledgeGraph, node_id: &str) -> Result<Vec<Neighbor>, KnowledgeError> {
    let idx = graph.index_of(node_id)?;
    let inner = graph.inner();

    let mut out = Vec::new();
    for (dir, label) in [(Direction::Outgoing, EdgeDirection::Outgoing), (Direction::Incoming, EdgeDirection::Incoming)] {
        let mut batch: Vec<Neighbor> = inner
            .edges_directed(idx, dir)
            .map(|e| {
                let other = if dir == Direction::Outgoing { e.target() } else { e.source() };
                Neighbor {
                    node_id: inner[other].id.clone(),
                    label: inner[other].label.clone(),
                    node_type: inner[other].node_type,
                    relationship_type: e.weight().relationship_type.clone(),
                    direction: label,
                    weight: e.weight().weight,
                }
            })
            .collect();
        batch.sort_by(|a, b| a.node_id.cmp(&b.node_id).then_with(|| a.relationship_type.cmp(&b.relationship_type)));
        out.extend(batch);
    }
    Ok(out)
}
