//! Write and read paths for documents, entities and relationships.
//!
//! Entities are unique by case-sensitive name within their table, so
//! [`upsert_entity`] returns the existing row when the name is already
//! present. [`store_relationship`] validates both endpoints and deduplicates on
//! the full (source, target, relationship_type) tuple.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::KnowledgeError;
use crate::knowledge::types::{DocType, Document, Entity, EntityKind, NodeType, Relationship};

/// Fields needed to create a document.
#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub doc_type: DocType,
    pub title: &'a str,
    pub date: Option<&'a str>,
    pub source_path: Option<&'a str>,
    pub content: &'a str,
    pub summary: Option<&'a str>,
    pub metadata: Option<&'a serde_json::Value>,
}

/// Fields needed to create a relationship.
#[derive(Debug, Clone)]
pub struct NewRelationship<'a> {
    pub source_type: NodeType,
    pub source_id: i64,
    pub target_type: NodeType,
    pub target_id: i64,
    pub relationship_type: &'a str,
    pub confidence: f64,
    pub evidence: Option<&'a str>,
}

/// Result of a write that may hit an existing row.
#[derive(Debug, Serialize)]
pub struct StoreResult {
    pub id: i64,
    /// `true` if the row already existed and nothing was written.
    pub existing: bool,
}

/// Insert a document. A document whose `source_path` is already stored is
/// returned as-is: content is immutable once imported.
pub fn insert_document(conn: &Connection, doc: &NewDocument<'_>) -> Result<StoreResult> {
    if let Some(path) = doc.source_path {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM documents WHERE source_path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(StoreResult { id, existing: true });
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let metadata_json = doc.metadata.map(serde_json::to_string).transpose()?;

    conn.execute(
        "INSERT INTO documents (doc_type, title, date, source_path, content, summary, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            doc.doc_type.as_str(),
            doc.title,
            doc.date,
            doc.source_path,
            doc.content,
            doc.summary,
            metadata_json,
            now,
        ],
    )?;

    Ok(StoreResult {
        id: conn.last_insert_rowid(),
        existing: false,
    })
}

/// Insert an entity, or return the id of the existing entity with the same name.
///
/// Category and description only fill in blanks on an existing row; they never
/// overwrite what is already there.
pub fn upsert_entity(
    conn: &Connection,
    kind: EntityKind,
    name: &str,
    category: Option<&str>,
    description: Option<&str>,
) -> Result<StoreResult> {
    let table = kind.table();
    let existing: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {table} WHERE name = ?1"),
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        conn.execute(
            &format!(
                "UPDATE {table} SET category = COALESCE(category, ?1), \
                 description = COALESCE(description, ?2) WHERE id = ?3"
            ),
            params![category, description, id],
        )?;
        return Ok(StoreResult { id, existing: true });
    }

    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO {table} (name, category, description, created_at) VALUES (?1, ?2, ?3, ?4)"
        ),
        params![name, category, description, now],
    )?;

    Ok(StoreResult {
        id: conn.last_insert_rowid(),
        existing: false,
    })
}

/// Look up an entity id by exact name.
pub fn find_entity(conn: &Connection, kind: EntityKind, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", kind.table()),
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Store a relationship after checking both endpoints exist.
///
/// Storing the same (source, target, relationship_type) tuple twice is
/// idempotent and returns the first row's id.
pub fn store_relationship(conn: &Connection, rel: &NewRelationship<'_>) -> Result<StoreResult> {
    validate_endpoint(conn, rel.source_type, rel.source_id, "source")?;
    validate_endpoint(conn, rel.target_type, rel.target_id, "target")?;

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM relationships \
             WHERE source_type = ?1 AND source_id = ?2 AND target_type = ?3 \
               AND target_id = ?4 AND relationship_type = ?5",
            params![
                rel.source_type.as_str(),
                rel.source_id,
                rel.target_type.as_str(),
                rel.target_id,
                rel.relationship_type,
            ],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(StoreResult { id, existing: true });
    }

    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO relationships \
         (source_type, source_id, target_type, target_id, relationship_type, confidence, evidence, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rel.source_type.as_str(),
            rel.source_id,
            rel.target_type.as_str(),
            rel.target_id,
            rel.relationship_type,
            rel.confidence.clamp(0.0, 1.0),
            rel.evidence,
            now,
        ],
    )?;

    Ok(StoreResult {
        id: conn.last_insert_rowid(),
        existing: false,
    })
}

/// Whether a row of the given type and id exists.
pub fn endpoint_exists(conn: &Connection, node_type: NodeType, id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        &format!("SELECT COUNT(*) > 0 FROM {} WHERE id = ?1", node_type.table()),
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn validate_endpoint(conn: &Connection, node_type: NodeType, id: i64, role: &'static str) -> Result<()> {
    if !endpoint_exists(conn, node_type, id)? {
        return Err(KnowledgeError::EndpointNotFound {
            role,
            node: crate::knowledge::types::node_key(node_type, id),
        }
        .into());
    }
    Ok(())
}

/// SQL boolean expression: does the endpoint `({type_col}, {id_col})` resolve to a row?
fn endpoint_exists_sql(type_col: &str, id_col: &str) -> String {
    let arms: String = NodeType::all()
        .map(|t| {
            format!(
                " WHEN '{}' THEN EXISTS(SELECT 1 FROM {} WHERE id = {id_col})",
                t.as_str(),
                t.table()
            )
        })
        .collect();
    format!("(CASE {type_col}{arms} ELSE 0 END)")
}

/// Count relationships whose source or target no longer resolves to a row.
pub fn count_dangling_relationships(conn: &Connection) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM relationships r WHERE NOT {} OR NOT {}",
        endpoint_exists_sql("r.source_type", "r.source_id"),
        endpoint_exists_sql("r.target_type", "r.target_id"),
    );
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

/// All documents, ordered by id.
pub fn list_documents(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, doc_type, title, date, source_path, content, summary, metadata, created_at \
         FROM documents ORDER BY id",
    )?;
    let docs = stmt
        .query_map([], |row| {
            let doc_type: String = row.get(1)?;
            let metadata: Option<String> = row.get(7)?;
            Ok(Document {
                id: row.get(0)?,
                doc_type: doc_type.parse().map_err(|e: KnowledgeError| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                title: row.get(2)?,
                date: row.get(3)?,
                source_path: row.get(4)?,
                content: row.get(5)?,
                summary: row.get(6)?,
                metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs)
}

/// All entities of one kind, ordered by id.
pub fn list_entities(conn: &Connection, kind: EntityKind) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, category, description FROM {} ORDER BY id",
        kind.table()
    ))?;
    let entities = stmt
        .query_map([], |row| {
            Ok(Entity {
                id: row.get(0)?,
                kind,
                name: row.get(1)?,
                category: row.get(2)?,
                description: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entities)
}

/// All relationships, ordered by id.
///
/// Rows with an endpoint type that is not a known document/entity type are
/// skipped with a warning.
pub fn list_relationships(conn: &Connection) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(
        "SELECT id, source_type, source_id, target_type, target_id, relationship_type, confidence, evidence \
         FROM relationships ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut relationships = Vec::with_capacity(rows.len());
    for (id, source_type, source_id, target_type, target_id, relationship_type, confidence, evidence) in rows {
        match (source_type.parse::<NodeType>(), target_type.parse::<NodeType>()) {
            (Ok(source_type), Ok(target_type)) => relationships.push(Relationship {
                id,
                source_type,
                source_id,
                target_type,
                target_id,
                relationship_type,
                confidence,
                evidence,
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(relationship_id = id, error = %e, "skipping relationship with unknown endpoint type");
            }
        }
    }
    Ok(relationships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn paper<'a>(title: &'a str, path: Option<&'a str>) -> NewDocument<'a> {
        NewDocument {
            doc_type: DocType::Paper,
            title,
            date: Some("2024-03-01"),
            source_path: path,
            content: "body",
            summary: None,
            metadata: None,
        }
    }

    fn mentions(doc: i64, topic: i64) -> NewRelationship<'static> {
        NewRelationship {
            source_type: NodeType::Document,
            source_id: doc,
            target_type: NodeType::Entity(EntityKind::Topic),
            target_id: topic,
            relationship_type: "mentions",
            confidence: 0.8,
            evidence: None,
        }
    }

    #[test]
    fn test_insert_document_skips_known_source_path() {
        let conn = db::open_memory_database().unwrap();
        let first = insert_document(&conn, &paper("A", Some("papers/a.md"))).unwrap();
        assert!(!first.existing);
        let again = insert_document(&conn, &paper("A again", Some("papers/a.md"))).unwrap();
        assert!(again.existing);
        assert_eq!(again.id, first.id);
        assert_eq!(list_documents(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_entity_is_case_sensitive() {
        let conn = db::open_memory_database().unwrap();
        let a = upsert_entity(&conn, EntityKind::Topic, "Optimal Transport", None, None).unwrap();
        let b = upsert_entity(&conn, EntityKind::Topic, "optimal transport", None, None).unwrap();
        let c = upsert_entity(&conn, EntityKind::Topic, "Optimal Transport", Some("math"), None).unwrap();
        assert_ne!(a.id, b.id);
        assert!(c.existing);
        assert_eq!(c.id, a.id);

        let topics = list_entities(&conn, EntityKind::Topic).unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].category.as_deref(), Some("math"));
    }

    #[test]
    fn test_store_relationship_dedup() {
        let conn = db::open_memory_database().unwrap();
        let doc = insert_document(&conn, &paper("A", None)).unwrap().id;
        let topic = upsert_entity(&conn, EntityKind::Topic, "Graphs", None, None).unwrap().id;

        let r1 = store_relationship(&conn, &mentions(doc, topic)).unwrap();
        assert!(!r1.existing);
        let r2 = store_relationship(&conn, &mentions(doc, topic)).unwrap();
        assert!(r2.existing);
        assert_eq!(r1.id, r2.id);
        assert_eq!(list_relationships(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_store_relationship_rejects_missing_endpoint() {
        let conn = db::open_memory_database().unwrap();
        let doc = insert_document(&conn, &paper("A", None)).unwrap().id;

        let err = store_relationship(&conn, &mentions(doc, 42)).unwrap_err();
        let typed = err.downcast_ref::<KnowledgeError>().unwrap();
        assert_eq!(
            typed,
            &KnowledgeError::EndpointNotFound {
                role: "target",
                node: "topic_42".to_string()
            }
        );
    }

    #[test]
    fn test_count_dangling_relationships() {
        let conn = db::open_memory_database().unwrap();
        let doc = insert_document(&conn, &paper("A", None)).unwrap().id;
        let topic = upsert_entity(&conn, EntityKind::Topic, "Graphs", None, None).unwrap().id;
        store_relationship(&conn, &mentions(doc, topic)).unwrap();
        assert_eq!(count_dangling_relationships(&conn).unwrap(), 0);

        conn.execute("DELETE FROM topics WHERE id = ?1", params![topic]).unwrap();
        assert_eq!(count_dangling_relationships(&conn).unwrap(), 1);
    }

    #[test]
    fn test_list_relationships_skips_unknown_types() {
        let conn = db::open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO relationships (source_type, source_id, target_type, target_id, relationship_type, confidence, created_at) \
             VALUES ('spaceship', 1, 'topic', 1, 'mentions', 1.0, 'now')",
            [],
        )
        .unwrap();
        assert!(list_relationships(&conn).unwrap().is_empty());
    }
}
