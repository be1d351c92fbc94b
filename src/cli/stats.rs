use anyhow::Result;

use notegraph::config::NotegraphConfig;
use notegraph::graph::KnowledgeGraph;
use notegraph::knowledge::types::EntityKind;

/// Display table and graph statistics in the terminal.
pub fn stats(config: &NotegraphConfig, json: bool) -> Result<()> {
    let conn = super::open(config)?;
    let health = notegraph::db::check_database_health(&conn)?;
    let graph = KnowledgeGraph::load(&conn)?.stats();

    let mut entities = Vec::new();
    for kind in EntityKind::ALL {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", kind.table()), [], |row| row.get(0))?;
        entities.push((kind, n));
    }

    if json {
        return super::print_json(&serde_json::json!({
            "documents": health.document_count,
            "relationships": health.relationship_count,
            "embeddings": health.embedding_count,
            "entities": entities.iter().map(|(k, n)| (k.as_str(), *n)).collect::<std::collections::BTreeMap<_, _>>(),
            "graph": graph,
        }));
    }

    println!("Knowledge Statistics");
    println!("{}", "=".repeat(40));
    println!("  Documents:           {}", health.document_count);
    println!("  Relationships:       {}", health.relationship_count);
    println!("  Embedded chunks:     {}", health.embedding_count);
    println!();

    println!("Entities:");
    for (kind, n) in &entities {
        println!("  {:<12} {}", kind.as_str(), n);
    }
    println!();

    println!("Graph:");
    if graph.node_count == 0 {
        println!("  (not built)");
        return Ok(());
    }
    println!("  Nodes:               {}", graph.node_count);
    println!("  Edges:               {}", graph.edge_count);
    println!("  Components:          {}", graph.component_count);
    let mut by_type: Vec<_> = graph.nodes_by_type.iter().collect();
    by_type.sort();
    for (t, n) in by_type {
        println!("    {:<12} {}", t, n);
    }
    Ok(())
}
