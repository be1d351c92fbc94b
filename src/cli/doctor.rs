//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use notegraph::config::NotegraphConfig;
use notegraph::db;

pub fn doctor(config: &NotegraphConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `notegraph init` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("notegraph Health Report");
    println!("=======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    if let Some(ref stored) = report.embedding_model {
        if stored != &config.embedding.model {
            println!("  WARNING: model mismatch! Run `notegraph embed --all` to update vectors.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Documents:       {}", report.document_count);
    println!("  Relationships:   {}", report.relationship_count);
    println!("  Embeddings:      {}", report.embedding_count);
    println!("  Graph nodes:     {}", report.graph_node_count);
    println!("  Graph edges:     {}", report.graph_edge_count);
    println!();
    if report.dangling_relationship_count > 0 {
        println!(
            "Dangling:          {} relationship(s) point at missing rows and are skipped by build-graph",
            report.dangling_relationship_count
        );
    }
    if report.graph_node_count == 0 && report.document_count > 0 {
        println!("Graph:             not built. Run `notegraph build-graph`.");
    }
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or re-import the source bundles into a fresh database.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
