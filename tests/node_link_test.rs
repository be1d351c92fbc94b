mod helpers;

use std::collections::BTreeSet;

use notegraph::config::GraphConfig;
use notegraph::graph::builder::rebuild;
use notegraph::graph::export::{read_json, write_json};
use notegraph::graph::KnowledgeGraph;
use tempfile::TempDir;

fn edge_set(graph: &KnowledgeGraph) -> BTreeSet<(String, String, String)> {
    graph
        .edges()
        .map(|(s, t, e)| (s.to_string(), t.to_string(), e.relationship_type.clone()))
        .collect()
}

#[test]
fn export_and_reimport_preserve_graph() {
    let mut conn = helpers::test_db();
    helpers::seed_corpus(&conn);
    let (graph, _) = rebuild(&mut conn, &GraphConfig::default()).unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("graph.json");
    write_json(&graph, &path).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["directed"], true);
    assert_eq!(raw["multigraph"], false);
    assert_eq!(raw["links"].as_array().unwrap().len(), graph.edge_count());

    let back = read_json(&path).unwrap();
    let ids = |g: &KnowledgeGraph| g.nodes().map(|n| n.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&back), ids(&graph));
    assert_eq!(edge_set(&back), edge_set(&graph));

    // persisting the imported graph into a fresh database round-trips too
    let mut other = helpers::test_db();
    back.persist(&mut other).unwrap();
    assert_eq!(edge_set(&KnowledgeGraph::load_built(&other).unwrap()), edge_set(&graph));
}

#[test]
fn malformed_file_reports_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = read_json(&path).unwrap_err();
    assert!(format!("{err:#}").contains("bad.json"));
}
