//! Knowledge graph derived from the relational store.
//!
//! [`KnowledgeGraph`] wraps a petgraph `DiGraph` with a string-id index. It is
//! a materialized view: [`builder::rebuild`] derives it from documents,
//! entities and relationships and rewrites `graph_nodes`/`graph_edges`;
//! [`KnowledgeGraph::load`] reads it back for queries.

pub mod algo;
pub mod builder;
pub mod export;
pub mod query;

use anyhow::Result;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::KnowledgeError;
use crate::knowledge::types::NodeType;

/// A node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Synthetic id, e.g. `doc_3` or `topic_12`.
    pub id: String,
    pub node_type: NodeType,
    /// Row id in the backing table.
    pub entity_id: i64,
    pub label: String,
    /// Entity category, or the document type for documents.
    pub category: Option<String>,
    pub degree: usize,
    pub pagerank: f64,
    pub centrality: f64,
    pub component: usize,
}

impl GraphNode {
    pub fn new(node_type: NodeType, entity_id: i64, label: impl Into<String>) -> Self {
        Self {
            id: crate::knowledge::types::node_key(node_type, entity_id),
            node_type,
            entity_id,
            label: label.into(),
            category: None,
            degree: 0,
            pagerank: 0.0,
            centrality: 0.0,
            component: 0,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }
}

/// Edge payload: relationship type and weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub relationship_type: String,
    pub weight: f64,
}

impl GraphEdge {
    /// Co-occurrence has no direction; it is stored once but ranks both ways.
    pub fn is_symmetric(&self) -> bool {
        self.relationship_type == builder::CO_OCCURS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub component_count: usize,
    pub nodes_by_type: HashMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    node_index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; a node with the same id is kept and its index returned.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        idx
    }

    /// Add an edge between two existing nodes.
    ///
    /// Returns `None` if either endpoint is missing or an edge with the same
    /// (source, target, relationship_type) already exists.
    pub fn add_edge(&mut self, source: &str, target: &str, edge: GraphEdge) -> Option<EdgeIndex> {
        let (&a, &b) = (self.node_index.get(source)?, self.node_index.get(target)?);
        let exists = self
            .graph
            .edges_connecting(a, b)
            .any(|e| e.weight().relationship_type == edge.relationship_type);
        if exists {
            return None;
        }
        Some(self.graph.add_edge(a, b, edge))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Result<NodeIndex, KnowledgeError> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| KnowledgeError::NodeNotFound(id.to_string()))
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// `(source id, target id, edge)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &GraphEdge)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                e.weight(),
            )
        })
    }

    pub(crate) fn inner(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    pub(crate) fn inner_mut(&mut self) -> &mut DiGraph<GraphNode, GraphEdge> {
        &mut self.graph
    }

    pub fn stats(&self) -> GraphStats {
        let mut nodes_by_type = HashMap::new();
        for node in self.nodes() {
            *nodes_by_type
                .entry(node.node_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            component_count: algo::component_count(&self.graph),
            nodes_by_type,
        }
    }

    /// Replace the persisted graph with this one, atomically.
    pub fn persist(&self, conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM graph_edges", [])?;
        tx.execute("DELETE FROM graph_nodes", [])?;
        {
            let mut insert_node = tx.prepare(
                "INSERT INTO graph_nodes \
                 (node_id, node_type, entity_id, label, category, degree, pagerank, centrality, component, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (position, node) in self.nodes().enumerate() {
                insert_node.execute(params![
                    node.id,
                    node.node_type.as_str(),
                    node.entity_id,
                    node.label,
                    node.category,
                    node.degree as i64,
                    node.pagerank,
                    node.centrality,
                    node.component as i64,
                    position as i64,
                ])?;
            }

            let mut insert_edge = tx.prepare(
                "INSERT INTO graph_edges (source_node, target_node, relationship_type, weight) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (source, target, edge) in self.edges() {
                insert_edge.execute(params![source, target, edge.relationship_type, edge.weight])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Read the persisted graph. An unbuilt graph loads as empty.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut graph = Self::new();

        let mut stmt = conn.prepare(
            "SELECT node_id, node_type, entity_id, label, category, degree, pagerank, centrality, component \
             FROM graph_nodes ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (id, node_type, entity_id, label, category, degree, pagerank, centrality, component) in rows {
            graph.add_node(GraphNode {
                id,
                node_type: node_type.parse()?,
                entity_id,
                label,
                category,
                degree: degree as usize,
                pagerank,
                centrality,
                component: component as usize,
            });
        }

        let mut stmt = conn.prepare(
            "SELECT source_node, target_node, relationship_type, weight FROM graph_edges ORDER BY id",
        )?;
        let edges = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (source, target, relationship_type, weight) in edges {
            graph.add_edge(&source, &target, GraphEdge { relationship_type, weight });
        }

        tracing::debug!(nodes = graph.node_count(), edges = graph.edge_count(), "graph loaded");
        Ok(graph)
    }

    /// Like [`load`](Self::load), but an empty graph is an error.
    pub fn load_built(conn: &Connection) -> Result<Self> {
        let graph = Self::load(conn)?;
        if graph.is_empty() {
            return Err(KnowledgeError::GraphNotBuilt.into());
        }
        Ok(graph)
    }
}
