//! Bulk import of documents, entities and relationships from a JSON bundle.
//!
//! ```json
//! {
//!   "documents": [{"key": "ot-paper", "doc_type": "paper", "title": "...", "content": "..."}],
//!   "entities": [{"kind": "topic", "name": "Optimal Transport", "category": "ml"}],
//!   "relationships": [{"source": {"document": "ot-paper"},
//!                      "target": {"kind": "topic", "name": "Optimal Transport"},
//!                      "type": "mentions", "confidence": 0.8}]
//! }
//! ```
//!
//! Document keys are local to the bundle. Entity endpoints may also name
//! entities that are already in the database.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::knowledge::store::{
    find_entity, insert_document, store_relationship, upsert_entity, NewDocument, NewRelationship,
};
use crate::knowledge::types::{DocType, EntityKind, NodeType};

#[derive(Debug, Default, Deserialize)]
pub struct ImportBundle {
    #[serde(default)]
    pub documents: Vec<BundleDocument>,
    #[serde(default)]
    pub entities: Vec<BundleEntity>,
    #[serde(default)]
    pub relationships: Vec<BundleRelationship>,
}

#[derive(Debug, Deserialize)]
pub struct BundleDocument {
    pub key: String,
    pub doc_type: DocType,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BundleEntity {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EndpointRef {
    Document { document: String },
    Entity { kind: EntityKind, name: String },
}

#[derive(Debug, Deserialize)]
pub struct BundleRelationship {
    pub source: EndpointRef,
    pub target: EndpointRef,
    #[serde(rename = "type")]
    pub relationship_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub documents_imported: usize,
    pub documents_existing: usize,
    pub entities_created: usize,
    pub entities_existing: usize,
    pub relationships_created: usize,
    pub relationships_existing: usize,
    /// Relationships whose endpoint could not be resolved.
    pub relationships_skipped: usize,
}

pub fn read_bundle(path: &Path) -> Result<ImportBundle> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read import file: {}", path.display()))?;
    serde_json::from_str(&json).context("failed to parse import JSON")
}

/// Import a bundle in a single transaction.
pub fn import_bundle(conn: &mut Connection, bundle: &ImportBundle) -> Result<ImportReport> {
    let tx = conn.transaction()?;
    let mut report = ImportReport::default();
    let mut doc_ids: HashMap<&str, i64> = HashMap::new();

    for doc in &bundle.documents {
        let result = insert_document(
            &tx,
            &NewDocument {
                doc_type: doc.doc_type,
                title: &doc.title,
                date: doc.date.as_deref(),
                source_path: doc.source_path.as_deref(),
                content: &doc.content,
                summary: doc.summary.as_deref(),
                metadata: doc.metadata.as_ref(),
            },
        )?;
        if result.existing {
            report.documents_existing += 1;
        } else {
            report.documents_imported += 1;
        }
        doc_ids.insert(doc.key.as_str(), result.id);
    }

    for entity in &bundle.entities {
        let result = upsert_entity(
            &tx,
            entity.kind,
            &entity.name,
            entity.category.as_deref(),
            entity.description.as_deref(),
        )?;
        if result.existing {
            report.entities_existing += 1;
        } else {
            report.entities_created += 1;
        }
    }

    for rel in &bundle.relationships {
        let source = resolve(&tx, &doc_ids, &rel.source)?;
        let target = resolve(&tx, &doc_ids, &rel.target)?;
        let ((source_type, source_id), (target_type, target_id)) = match (source, target) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                warn!(
                    source = ?rel.source,
                    target = ?rel.target,
                    relationship_type = %rel.relationship_type,
                    "skipping relationship with unresolved endpoint"
                );
                report.relationships_skipped += 1;
                continue;
            }
        };

        let result = store_relationship(
            &tx,
            &NewRelationship {
                source_type,
                source_id,
                target_type,
                target_id,
                relationship_type: &rel.relationship_type,
                confidence: rel.confidence,
                evidence: rel.evidence.as_deref(),
            },
        )?;
        if result.existing {
            report.relationships_existing += 1;
        } else {
            report.relationships_created += 1;
        }
    }

    tx.commit()?;
    info!(
        documents = report.documents_imported,
        entities = report.entities_created,
        relationships = report.relationships_created,
        skipped = report.relationships_skipped,
        "import finished"
    );
    Ok(report)
}

fn resolve(
    conn: &Connection,
    doc_ids: &HashMap<&str, i64>,
    endpoint: &EndpointRef,
) -> Result<Option<(NodeType, i64)>> {
    Ok(match endpoint {
        EndpointRef::Document { document } => {
            doc_ids.get(document.as_str()).map(|&id| (NodeType::Document, id))
        }
        EndpointRef::Entity { kind, name } => {
            find_entity(conn, *kind, name)?.map(|id| (NodeType::Entity(*kind), id))
        }
    })
}
