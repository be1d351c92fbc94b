pub mod doctor;
pub mod embed;
pub mod export;
pub mod graph;
pub mod import;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

use notegraph::config::NotegraphConfig;
use notegraph::db;

/// Open the configured database, creating it if needed.
pub fn open(config: &NotegraphConfig) -> Result<Connection> {
    let db_path = config.resolved_db_path();
    db::open_database(&db_path).with_context(|| format!("failed to open database at {}", db_path.display()))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Create the database and schema.
pub fn init(config: &NotegraphConfig) -> Result<()> {
    let conn = open(config)?;
    let version = db::migrations::get_schema_version(&conn)?;
    println!("Initialized {} (schema v{version})", config.resolved_db_path().display());
    Ok(())
}

/// Report duplicate entity names.
pub fn dedup(config: &NotegraphConfig, kind: Option<&str>, threshold: Option<f64>, json: bool) -> Result<()> {
    use notegraph::knowledge::{dedup, types::EntityKind};

    let conn = open(config)?;
    let kinds = match kind {
        Some(k) => vec![k.parse::<EntityKind>()?],
        None => EntityKind::ALL.to_vec(),
    };
    let threshold = threshold.unwrap_or(config.dedup.fuzzy_threshold);
    let report = dedup::find_duplicates(&conn, &kinds, threshold)?;

    if json {
        return print_json(&report);
    }

    if report.exact.is_empty() && report.fuzzy.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }
    if !report.exact.is_empty() {
        println!("Exact duplicates (case-insensitive):");
        for d in &report.exact {
            println!("  [{}] {} x{}: {}", d.kind, d.normalized, d.count, d.names.join(" | "));
        }
    }
    if !report.fuzzy.is_empty() {
        println!("Possible duplicates (ratio >= {threshold:.2}):");
        for d in &report.fuzzy {
            println!("  [{}] {:.3}  {}  ~  {}", d.kind, d.score, d.name_a, d.name_b);
        }
    }
    Ok(())
}
