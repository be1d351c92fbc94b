//! Node-link JSON import/export.
//!
//! ```json
//! {"directed": true, "multigraph": false, "graph": {},
//!  "nodes": [{"id": "doc_1", "type": "document", "label": "...", ...}],
//!  "links": [{"source": "doc_1", "target": "topic_5", "type": "mentions", "weight": 0.8}]}
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{GraphEdge, GraphNode, KnowledgeGraph};
use crate::error::KnowledgeError;
use crate::knowledge::types::NodeType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    #[serde(default = "default_true")]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    #[serde(default)]
    pub graph: serde_json::Map<String, serde_json::Value>,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub entity_id: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub degree: usize,
    #[serde(default)]
    pub pagerank: f64,
    #[serde(default)]
    pub centrality: f64,
    #[serde(default)]
    pub component: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

pub fn to_node_link(graph: &KnowledgeGraph) -> NodeLinkGraph {
    NodeLinkGraph {
        directed: true,
        multigraph: false,
        graph: serde_json::Map::new(),
        nodes: graph
            .nodes()
            .map(|n| NodeRecord {
                id: n.id.clone(),
                node_type: n.node_type,
                entity_id: n.entity_id,
                label: n.label.clone(),
                category: n.category.clone(),
                degree: n.degree,
                pagerank: n.pagerank,
                centrality: n.centrality,
                component: n.component,
            })
            .collect(),
        links: graph
            .edges()
            .map(|(source, target, e)| LinkRecord {
                source: source.to_string(),
                target: target.to_string(),
                relationship_type: e.relationship_type.clone(),
                weight: e.weight,
            })
            .collect(),
    }
}

/// Rebuild a graph from node-link records. A link naming an unknown node is an
/// error; repeated links collapse into one edge.
pub fn from_node_link(data: &NodeLinkGraph) -> Result<KnowledgeGraph, KnowledgeError> {
    let mut graph = KnowledgeGraph::new();
    for n in &data.nodes {
        graph.add_node(GraphNode {
            id: n.id.clone(),
            node_type: n.node_type,
            entity_id: n.entity_id,
            label: n.label.clone(),
            category: n.category.clone(),
            degree: n.degree,
            pagerank: n.pagerank,
            centrality: n.centrality,
            component: n.component,
        });
    }
    for link in &data.links {
        graph.index_of(&link.source)?;
        graph.index_of(&link.target)?;
        graph.add_edge(
            &link.source,
            &link.target,
            GraphEdge {
                relationship_type: link.relationship_type.clone(),
                weight: link.weight,
            },
        );
    }
    Ok(graph)
}

pub fn write_json(graph: &KnowledgeGraph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(&to_node_link(graph))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_json(path: impl AsRef<Path>) -> Result<KnowledgeGraph> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let data: NodeLinkGraph =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse node-link JSON in {}", path.display()))?;
    Ok(from_node_link(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::EntityKind;
    use std::collections::BTreeSet;

    fn sample() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new();
        g.add_node(GraphNode::new(NodeType::Document, 1, "Paper").with_category(Some("paper".into())));
        g.add_node(GraphNode::new(NodeType::Entity(EntityKind::Topic), 5, "Graphs"));
        g.add_edge(
            "doc_1",
            "topic_5",
            GraphEdge {
                relationship_type: "mentions".into(),
                weight: 0.8,
            },
        );
        g
    }

    fn edge_set(g: &KnowledgeGraph) -> BTreeSet<(String, String, String)> {
        g.edges()
            .map(|(s, t, e)| (s.to_string(), t.to_string(), e.relationship_type.clone()))
            .collect()
    }

    #[test]
    fn test_node_link_shape() {
        let value = serde_json::to_value(to_node_link(&sample())).unwrap();
        assert_eq!(value["directed"], true);
        assert_eq!(value["multigraph"], false);
        assert!(value["graph"].as_object().unwrap().is_empty());
        assert_eq!(value["nodes"][1]["type"], "topic");
        assert_eq!(value["links"][0]["source"], "doc_1");
        assert_eq!(value["links"][0]["type"], "mentions");
        assert_eq!(value["links"][0]["weight"], 0.8);
    }

    #[test]
    fn test_reconstruction_keeps_ids_and_edges() {
        let g = sample();
        let back = from_node_link(&to_node_link(&g)).unwrap();
        let ids: Vec<_> = back.nodes().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec!["doc_1", "topic_5"]);
        assert_eq!(edge_set(&back), edge_set(&g));
    }

    #[test]
    fn test_minimal_records_parse() {
        let json = r#"{"nodes": [{"id": "doc_1", "type": "document"}, {"id": "topic_2", "type": "topic"}],
                       "links": [{"source": "doc_1", "target": "topic_2", "type": "mentions"}]}"#;
        let data: NodeLinkGraph = serde_json::from_str(json).unwrap();
        let g = from_node_link(&data).unwrap();
        assert!(data.directed);
        assert_eq!(g.edges().next().unwrap().2.weight, 1.0);
    }

    #[test]
    fn test_unknown_link_endpoint_is_an_error() {
        let mut data = to_node_link(&sample());
        data.links[0].target = "topic_99".into();
        assert_eq!(
            from_node_link(&data).unwrap_err(),
            KnowledgeError::NodeNotFound("topic_99".into())
        );
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        write_json(&sample(), &path).unwrap();
        let back = read_json(&path).unwrap();
        assert_eq!(edge_set(&back), edge_set(&sample()));
        assert_eq!(back.node("doc_1").unwrap().category.as_deref(), Some("paper"));
    }
}
