use anyhow::Result;
use std::path::Path;

use notegraph::config::NotegraphConfig;
use notegraph::graph::export;
use notegraph::knowledge::import::{import_bundle, read_bundle};

/// Import documents, entities and relationships from a JSON bundle.
///
/// Documents already stored under the same `source_path` and relationships
/// already present are left untouched.
pub fn import(config: &NotegraphConfig, file: &Path, json: bool) -> Result<()> {
    let bundle = read_bundle(file)?;
    let mut conn = super::open(config)?;

    println!(
        "Importing {} documents, {} entities and {} relationships...",
        bundle.documents.len(),
        bundle.entities.len(),
        bundle.relationships.len()
    );

    let report = import_bundle(&mut conn, &bundle)?;
    if json {
        return super::print_json(&report);
    }

    println!("Import complete:");
    println!("  Documents imported:     {}", report.documents_imported);
    println!("  Documents skipped:      {} (already exist)", report.documents_existing);
    println!("  Entities created:       {}", report.entities_created);
    println!("  Entities existing:      {}", report.entities_existing);
    println!("  Relationships created:  {}", report.relationships_created);
    if report.relationships_existing > 0 {
        println!("  Relationships existing: {}", report.relationships_existing);
    }
    if report.relationships_skipped > 0 {
        println!("  Relationships skipped:  {} (unresolved endpoint)", report.relationships_skipped);
    }
    Ok(())
}

/// Replace the persisted graph with one read from node-link JSON.
pub fn import_graph(config: &NotegraphConfig, file: &Path) -> Result<()> {
    let graph = export::read_json(file)?;
    let mut conn = super::open(config)?;
    graph.persist(&mut conn)?;
    println!(
        "Loaded graph with {} nodes and {} edges from {}",
        graph.node_count(),
        graph.edge_count(),
        file.display()
    );
    Ok(())
}
