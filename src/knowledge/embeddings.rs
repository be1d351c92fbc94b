//! Embedding storage: flat little-endian f32 blobs in `document_embeddings`.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::db::migrations::{get_embedding_model, set_embedding_model};
use crate::embedding::EmbeddingProvider;
use crate::error::KnowledgeError;
use crate::knowledge::store::list_documents;
use crate::knowledge::types::DocType;

/// Convert an f32 embedding slice to raw little-endian bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Inverse of [`embedding_to_bytes`].
pub fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        bail!("embedding blob length {} is not a multiple of 4", bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// One stored vector plus what search needs to label it.
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
    pub id: i64,
    pub document_id: i64,
    pub chunk_index: i64,
    pub chunk_text: String,
    pub title: String,
    pub doc_type: String,
    pub vector: Vec<f32>,
}

/// Insert or replace the vector for `(document_id, chunk_index)`.
pub fn store_embedding(
    conn: &Connection,
    document_id: i64,
    chunk_index: usize,
    chunk_text: &str,
    model: &str,
    embedding: &[f32],
) -> Result<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO document_embeddings \
         (document_id, chunk_index, chunk_text, model, dimension, embedding, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(document_id, chunk_index) DO UPDATE SET \
           chunk_text = excluded.chunk_text, model = excluded.model, \
           dimension = excluded.dimension, embedding = excluded.embedding, \
           created_at = excluded.created_at",
        params![
            document_id,
            chunk_index as i64,
            chunk_text,
            model,
            embedding.len() as i64,
            embedding_to_bytes(embedding),
            now,
        ],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM document_embeddings WHERE document_id = ?1 AND chunk_index = ?2",
        params![document_id, chunk_index as i64],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Load every stored vector in scan order (embedding row id), optionally
/// restricted to one document type.
pub fn load_embeddings(conn: &Connection, doc_type: Option<DocType>) -> Result<Vec<StoredEmbedding>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.document_id, e.chunk_index, e.chunk_text, d.title, d.doc_type, e.embedding \
         FROM document_embeddings e JOIN documents d ON d.id = e.document_id \
         WHERE ?1 IS NULL OR d.doc_type = ?1 \
         ORDER BY e.id",
    )?;
    let rows = stmt
        .query_map(params![doc_type.map(|t| t.as_str())], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Vec<u8>>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, document_id, chunk_index, chunk_text, title, doc_type, blob)| {
            Ok(StoredEmbedding {
                id,
                document_id,
                chunk_index,
                chunk_text,
                title,
                doc_type,
                vector: bytes_to_embedding(&blob)?,
            })
        })
        .collect()
}

/// Documents with no stored embedding yet: `(id, title, content)`.
pub fn documents_without_embeddings(conn: &Connection) -> Result<Vec<(i64, String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.title, d.content FROM documents d \
         WHERE NOT EXISTS (SELECT 1 FROM document_embeddings e WHERE e.document_id = d.id) \
         ORDER BY d.id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Remove every stored chunk of one document. Returns the number removed.
pub fn delete_document_embeddings(conn: &Connection, document_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM document_embeddings WHERE document_id = ?1", [document_id])?)
}

/// Counts from an [`embed_documents`] run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EmbedReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Chunk, embed and store documents.
///
/// Without `all`, only documents that have no vectors are embedded, and the
/// run is refused when the stored model differs from the provider's. With
/// `all`, every document is re-embedded and its previous chunks are replaced,
/// so a store never mixes models or dimensions.
///
/// Each batch is written in its own transaction. `progress` is called with
/// the number of chunks stored after every batch.
pub fn embed_documents(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    all: bool,
    mut progress: impl FnMut(usize),
) -> Result<EmbedReport> {
    let model = provider.model().to_string();
    if let Some(stored) = get_embedding_model(conn)? {
        if stored != model && !all {
            return Err(KnowledgeError::EmbeddingModelChanged {
                stored,
                configured: model,
            }
            .into());
        }
    }

    let documents: Vec<(i64, String, String)> = if all {
        list_documents(conn)?
            .into_iter()
            .map(|d| (d.id, d.title, d.content))
            .collect()
    } else {
        documents_without_embeddings(conn)?
    };

    // (document id, chunk index, chunk text)
    let mut chunks: Vec<(i64, usize, String)> = Vec::new();
    let mut empty = Vec::new();
    for (id, title, content) in &documents {
        let text = if content.trim().is_empty() { title.as_str() } else { content.as_str() };
        let pieces = chunk_text(text, config.chunk_size, config.chunk_overlap);
        if pieces.is_empty() {
            empty.push(*id);
        }
        chunks.extend(pieces.into_iter().enumerate().map(|(i, chunk)| (*id, i, chunk)));
    }

    if all && !empty.is_empty() {
        let tx = conn.transaction()?;
        for id in &empty {
            delete_document_embeddings(&tx, *id)?;
        }
        tx.commit()?;
    }

    let mut report = EmbedReport {
        documents: documents.len() - empty.len(),
        chunks: 0,
    };
    if chunks.is_empty() {
        return Ok(report);
    }

    for batch in chunks.chunks(config.batch_size.max(1)) {
        let texts: Vec<&str> = batch.iter().map(|(_, _, text)| text.as_str()).collect();
        let vectors = provider.embed_batch(&texts).context("embedding batch failed")?;
        if vectors.len() != batch.len() {
            bail!("provider returned {} vectors for {} chunks", vectors.len(), batch.len());
        }

        let tx = conn.transaction()?;
        for ((document_id, chunk_index, text), vector) in batch.iter().zip(&vectors) {
            // a document's chunks arrive in order, so chunk 0 clears the old set
            if *chunk_index == 0 {
                delete_document_embeddings(&tx, *document_id)?;
            }
            store_embedding(&tx, *document_id, *chunk_index, text, &model, vector)?;
        }
        tx.commit()?;

        report.chunks += batch.len();
        debug!(stored = report.chunks, total = chunks.len(), "embedding batch stored");
        progress(batch.len());
    }

    set_embedding_model(conn, &model)?;
    info!(documents = report.documents, chunks = report.chunks, model = %model, "documents embedded");
    Ok(report)
}

/// Split text into overlapping windows of `size` characters.
///
/// Empty input yields no chunks. `overlap` is clamped below `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }
    let step = size - overlap.min(size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
