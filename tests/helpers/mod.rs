#![allow(dead_code)]

use notegraph::db;
use notegraph::knowledge::store::{
    insert_document, store_relationship, upsert_entity, NewDocument, NewRelationship,
};
use notegraph::knowledge::types::{DocType, EntityKind, NodeType};
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Deterministic embedding with a spike at position `seed`.
/// Distinct seeds give orthogonal vectors.
pub fn test_embedding(seed: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = 1.0;
    v
}

pub fn add_document(conn: &Connection, doc_type: DocType, title: &str, content: &str) -> i64 {
    insert_document(
        conn,
        &NewDocument {
            doc_type,
            title,
            date: None,
            source_path: None,
            content,
            summary: None,
            metadata: None,
        },
    )
    .unwrap()
    .id
}

pub fn add_paper(conn: &Connection, title: &str) -> i64 {
    add_document(conn, DocType::Paper, title, title)
}

pub fn add_entity(conn: &Connection, kind: EntityKind, name: &str, category: Option<&str>) -> i64 {
    upsert_entity(conn, kind, name, category, None).unwrap().id
}

pub fn relate(
    conn: &Connection,
    source: (NodeType, i64),
    target: (NodeType, i64),
    relationship_type: &str,
    confidence: f64,
) {
    store_relationship(
        conn,
        &NewRelationship {
            source_type: source.0,
            source_id: source.1,
            target_type: target.0,
            target_id: target.1,
            relationship_type,
            confidence,
            evidence: None,
        },
    )
    .unwrap();
}

pub fn doc(id: i64) -> (NodeType, i64) {
    (NodeType::Document, id)
}

pub fn topic(id: i64) -> (NodeType, i64) {
    (NodeType::Entity(EntityKind::Topic), id)
}

pub fn person(id: i64) -> (NodeType, i64) {
    (NodeType::Entity(EntityKind::Person), id)
}

/// A small research corpus:
///
/// - paper 1 "Sinkhorn Distances" by Cuturi: Optimal Transport (ml), Entropy (physics)
/// - paper 2 "Wasserstein GAN" by Arjovsky and Cuturi: Optimal Transport, GANs (ml)
/// - daily note: Optimal Transport, Entropy
pub fn seed_corpus(conn: &Connection) {
    let p1 = add_paper(conn, "Sinkhorn Distances");
    let p2 = add_paper(conn, "Wasserstein GAN");
    let n1 = add_document(conn, DocType::DailyNote, "2024-03-01", "notes on OT and entropy");

    let ot = add_entity(conn, EntityKind::Topic, "Optimal Transport", Some("ml"));
    let entropy = add_entity(conn, EntityKind::Topic, "Entropy", Some("physics"));
    let gans = add_entity(conn, EntityKind::Topic, "GANs", Some("ml"));
    let cuturi = add_entity(conn, EntityKind::Person, "Marco Cuturi", None);
    let arjovsky = add_entity(conn, EntityKind::Person, "Martin Arjovsky", None);

    relate(conn, doc(p1), topic(ot), "mentions", 0.9);
    relate(conn, doc(p1), topic(entropy), "mentions", 0.7);
    relate(conn, doc(p2), topic(ot), "mentions", 0.8);
    relate(conn, doc(p2), topic(gans), "mentions", 0.9);
    relate(conn, doc(n1), topic(ot), "mentions", 0.5);
    relate(conn, doc(n1), topic(entropy), "mentions", 0.5);
    relate(conn, person(cuturi), doc(p1), "authored", 1.0);
    relate(conn, person(cuturi), doc(p2), "authored", 1.0);
    relate(conn, person(arjovsky), doc(p2), "authored", 1.0);
}
