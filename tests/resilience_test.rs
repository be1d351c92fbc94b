mod helpers;

use notegraph::config::GraphConfig;
use notegraph::db;
use notegraph::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
use notegraph::graph::builder::rebuild;
use notegraph::knowledge::import::{import_bundle, read_bundle};
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");
    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();
    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn busy_timeout_and_wal_are_set() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("test.db")).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(mode, "wal");
}

#[test]
fn reopening_runs_migrations_once() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("test.db");
    drop(db::open_database(&path).unwrap());

    let conn = db::open_database(&path).unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn bundle_import_on_disk_then_build() {
    let tmp = TempDir::new().unwrap();
    let bundle_path = tmp.path().join("bundle.json");
    std::fs::write(
        &bundle_path,
        r#"{
            "documents": [{"key": "p", "doc_type": "paper", "title": "Sinkhorn", "content": "..."}],
            "entities": [{"kind": "topics", "name": "Optimal Transport"}],
            "relationships": [{"source": {"document": "p"},
                               "target": {"kind": "topic", "name": "Optimal Transport"},
                               "type": "mentions", "confidence": 0.8}]
        }"#,
    )
    .unwrap();

    let mut conn = db::open_database(tmp.path().join("kb.db")).unwrap();
    let bundle = read_bundle(&bundle_path).unwrap();
    let report = import_bundle(&mut conn, &bundle).unwrap();
    assert_eq!(report.relationships_created, 1);

    let (graph, build) = rebuild(&mut conn, &GraphConfig::default()).unwrap();
    assert_eq!(build.edges, 1);
    let (s, t, e) = graph.edges().next().unwrap();
    assert_eq!((s, t, e.weight), ("doc_1", "topic_1", 0.8));
}

#[test]
fn missing_bundle_reports_path() {
    let tmp = TempDir::new().unwrap();
    let err = read_bundle(&tmp.path().join("nope.json")).unwrap_err();
    assert!(format!("{err:#}").contains("nope.json"));
}

#[test]
fn health_report_counts_dangling() {
    let conn = helpers::test_db();
    helpers::seed_corpus(&conn);
    conn.execute("DELETE FROM people WHERE name = 'Martin Arjovsky'", []).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.document_count, 3);
    assert_eq!(report.dangling_relationship_count, 1);
}
