use anyhow::Result;
use std::path::Path;

use notegraph::config::NotegraphConfig;
use notegraph::graph::{export, KnowledgeGraph};

/// Export the built graph as node-link JSON, to a file or stdout.
pub fn export(config: &NotegraphConfig, output: Option<&Path>) -> Result<()> {
    let conn = super::open(config)?;
    let graph = KnowledgeGraph::load_built(&conn)?;

    match output {
        Some(path) => {
            export::write_json(&graph, path)?;
            eprintln!(
                "Exported {} nodes and {} edges to {}",
                graph.node_count(),
                graph.edge_count(),
                path.display()
            );
        }
        None => super::print_json(&export::to_node_link(&graph))?,
    }
    Ok(())
}
