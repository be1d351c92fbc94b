//! Derive the knowledge graph from documents, entities and relationships.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use super::{algo, GraphEdge, GraphNode, KnowledgeGraph};
use crate::config::GraphConfig;
use crate::knowledge::store::{list_documents, list_entities, list_relationships};
use crate::knowledge::types::{EntityKind, NodeType};

pub const CO_OCCURS: &str = "co_occurs";

/// Counts from a graph build.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub nodes: usize,
    pub edges: usize,
    pub relationship_edges: usize,
    pub cooccurrence_edges: usize,
    /// Relationships with an endpoint that has no node.
    pub dangling_relationships: usize,
    /// Relationships that repeat an existing (source, target, type) edge.
    pub duplicate_edges: usize,
    pub components: usize,
}

/// Build the graph in memory. Nothing is written.
///
/// Nodes are added documents first, then each entity kind, each by row id, so
/// node order (and component numbering) is deterministic.
pub fn build_graph(conn: &Connection, config: &GraphConfig) -> Result<(KnowledgeGraph, BuildReport)> {
    let mut graph = KnowledgeGraph::new();
    let mut report = BuildReport::default();

    for doc in list_documents(conn)? {
        graph.add_node(
            GraphNode::new(NodeType::Document, doc.id, doc.title)
                .with_category(Some(doc.doc_type.as_str().to_string())),
        );
    }
    for kind in EntityKind::ALL {
        for entity in list_entities(conn, kind)? {
            graph.add_node(
                GraphNode::new(NodeType::Entity(kind), entity.id, entity.name)
                    .with_category(entity.category),
            );
        }
    }

    // source node -> entity targets it has an edge to
    let mut targets_by_source: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for rel in list_relationships(conn)? {
        let (source, target) = (rel.source_key(), rel.target_key());
        if !graph.contains(&source) || !graph.contains(&target) {
            warn!(
                relationship_id = rel.id,
                source = %source,
                target = %target,
                relationship_type = %rel.relationship_type,
                "dropping relationship with missing endpoint"
            );
            report.dangling_relationships += 1;
            continue;
        }

        let edge = GraphEdge {
            relationship_type: rel.relationship_type.clone(),
            weight: rel.confidence,
        };
        if graph.add_edge(&source, &target, edge).is_none() {
            report.duplicate_edges += 1;
            continue;
        }
        report.relationship_edges += 1;

        if matches!(rel.target_type, NodeType::Entity(_)) {
            targets_by_source.entry(source).or_default().insert(target);
        }
    }

    if config.min_cooccurrence > 0 {
        report.cooccurrence_edges = add_cooccurrence_edges(&mut graph, &targets_by_source, config.min_cooccurrence);
    }

    apply_statistics(&mut graph, config);

    report.nodes = graph.node_count();
    report.edges = graph.edge_count();
    report.components = algo::component_count(graph.inner());
    Ok((graph, report))
}

/// One `co_occurs` edge per entity pair that shares at least `min_shared`
/// sources. The smaller node id is the source; weight is the shared count.
/// PageRank treats these edges as undirected (see [`GraphEdge::is_symmetric`]).
fn add_cooccurrence_edges(
    graph: &mut KnowledgeGraph,
    targets_by_source: &BTreeMap<String, BTreeSet<String>>,
    min_shared: usize,
) -> usize {
    let mut shared: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for targets in targets_by_source.values() {
        let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
        for (i, a) in targets.iter().enumerate() {
            for b in &targets[i + 1..] {
                // BTreeSet iteration is sorted, so a < b
                *shared.entry((*a, *b)).or_insert(0) += 1;
            }
        }
    }

    let mut added = 0;
    for ((a, b), count) in shared {
        if count < min_shared {
            continue;
        }
        let edge = GraphEdge {
            relationship_type: CO_OCCURS.to_string(),
            weight: count as f64,
        };
        if graph.add_edge(a, b, edge).is_some() {
            added += 1;
        }
    }
    added
}

/// Compute degree, centrality, PageRank and component for every node.
pub fn apply_statistics(graph: &mut KnowledgeGraph, config: &GraphConfig) {
    let inner = graph.inner();
    let degrees = algo::degrees(inner);
    let centrality = algo::degree_centrality(&degrees);
    let pagerank = algo::pagerank(inner, config.damping, config.max_iterations, config.tolerance);
    let components = algo::components(inner);

    let inner = graph.inner_mut();
    for idx in inner.node_indices().collect::<Vec<_>>() {
        let i = idx.index();
        let node = &mut inner[idx];
        node.degree = degrees[i];
        node.centrality = centrality[i];
        node.pagerank = pagerank[i];
        node.component = components[i];
    }
}

/// Build the graph and replace the persisted copy in one transaction.
pub fn rebuild(conn: &mut Connection, config: &GraphConfig) -> Result<(KnowledgeGraph, BuildReport)> {
    let (graph, report) = build_graph(conn, config)?;
    graph.persist(conn)?;
    info!(
        nodes = report.nodes,
        edges = report.edges,
        cooccurrence_edges = report.cooccurrence_edges,
        dangling = report.dangling_relationships,
        components = report.components,
        "graph built"
    );
    Ok((graph, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::knowledge::store::{insert_document, store_relationship, upsert_entity, NewDocument, NewRelationship};
    use crate::knowledge::types::DocType;

    fn doc(conn: &Connection, title: &str) -> i64 {
        insert_document(
            conn,
            &NewDocument {
                doc_type: DocType::Paper,
                title,
                date: None,
                source_path: None,
                content: "",
                summary: None,
                metadata: None,
            },
        )
        .unwrap()
        .id
    }

    fn topic(conn: &Connection, name: &str) -> i64 {
        upsert_entity(conn, EntityKind::Topic, name, None, None).unwrap().id
    }

    fn mentions(conn: &Connection, doc_id: i64, topic_id: i64, confidence: f64) {
        store_relationship(
            conn,
            &NewRelationship {
                source_type: NodeType::Document,
                source_id: doc_id,
                target_type: NodeType::Entity(EntityKind::Topic),
                target_id: topic_id,
                relationship_type: "mentions",
                confidence,
                evidence: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_single_relationship_yields_single_edge() {
        let conn = db::open_memory_database().unwrap();
        let doc_id = doc(&conn, "Paper");
        let topic_id = topic(&conn, "Graphs");
        mentions(&conn, doc_id, topic_id, 0.8);
        // the same tuple again is a no-op in the store
        mentions(&conn, doc_id, topic_id, 0.8);

        let (graph, report) = build_graph(&conn, &GraphConfig::default()).unwrap();
        assert_eq!(report.relationship_edges, 1);
        assert_eq!(report.dangling_relationships, 0);
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges.len(), 1);
        let (source, target, edge) = edges[0];
        assert_eq!(source, format!("doc_{doc_id}"));
        assert_eq!(target, format!("topic_{topic_id}"));
        assert_eq!(edge.relationship_type, "mentions");
        assert_eq!(edge.weight, 0.8);
    }

    #[test]
    fn test_dangling_relationship_is_counted_not_fatal() {
        let conn = db::open_memory_database().unwrap();
        let d = doc(&conn, "Paper");
        let t = topic(&conn, "Graphs");
        mentions(&conn, d, t, 0.5);
        conn.execute("DELETE FROM topics WHERE id = ?1", [t]).unwrap();

        let (graph, report) = build_graph(&conn, &GraphConfig::default()).unwrap();
        assert_eq!(report.dangling_relationships, 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_cooccurrence_needs_min_shared_sources() {
        let conn = db::open_memory_database().unwrap();
        let a = topic(&conn, "A");
        let b = topic(&conn, "B");
        let c = topic(&conn, "C");
        let d1 = doc(&conn, "one");
        let d2 = doc(&conn, "two");
        for d in [d1, d2] {
            mentions(&conn, d, a, 1.0);
            mentions(&conn, d, b, 1.0);
        }
        mentions(&conn, d1, c, 1.0);

        let (graph, report) = build_graph(&conn, &GraphConfig::default()).unwrap();
        assert_eq!(report.cooccurrence_edges, 1);
        let co: Vec<_> = graph
            .edges()
            .filter(|(_, _, e)| e.relationship_type == CO_OCCURS)
            .collect();
        assert_eq!(co.len(), 1);
        assert_eq!((co[0].0, co[0].1, co[0].2.weight), ("topic_1", "topic_2", 2.0));

        let disabled = GraphConfig {
            min_cooccurrence: 0,
            ..GraphConfig::default()
        };
        let (_, report) = build_graph(&conn, &disabled).unwrap();
        assert_eq!(report.cooccurrence_edges, 0);
    }

    #[test]
    fn test_statistics_are_populated() {
        let conn = db::open_memory_database().unwrap();
        let d = doc(&conn, "Paper");
        let t = topic(&conn, "Graphs");
        topic(&conn, "Isolated");
        mentions(&conn, d, t, 1.0);

        let (graph, report) = build_graph(&conn, &GraphConfig::default()).unwrap();
        assert_eq!(report.components, 2);
        let total: f64 = graph.nodes().map(|n| n.pagerank).sum();
        assert!((total - 1.0).abs() < 1e-6);
        let doc_node = graph.node("doc_1").unwrap();
        assert_eq!(doc_node.degree, 1);
        assert_eq!(doc_node.centrality, 0.5);
        assert_eq!(doc_node.category.as_deref(), Some("paper"));
        assert_eq!(graph.node("topic_2").unwrap().component, 1);
    }

    #[test]
    fn test_rebuild_persists() {
        let mut conn = db::open_memory_database().unwrap();
        let d = doc(&conn, "Paper");
        let t = topic(&conn, "Graphs");
        mentions(&conn, d, t, 0.8);

        rebuild(&mut conn, &GraphConfig::default()).unwrap();
        let loaded = KnowledgeGraph::load_built(&conn).unwrap();
        assert_eq!(loaded.edge_count(), 1);
        assert!(loaded.node("topic_1").unwrap().pagerank > 0.0);
    }
}
