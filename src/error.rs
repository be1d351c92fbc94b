//! Typed failures of the knowledge core.
//!
//! Command-level code works with `anyhow::Result`; these variants exist so
//! callers and tests can match on the conditions that matter.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KnowledgeError {
    #[error("zero-norm vector: {0}")]
    ZeroNormVector(String),

    #[error("dimension mismatch: expected {expected}, got {actual} ({context})")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("graph node not found: {0}")]
    NodeNotFound(String),

    #[error("unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("unknown document type: {0}")]
    UnknownDocType(String),

    #[error("graph has not been built yet; run `notegraph build-graph` first")]
    GraphNotBuilt,

    #[error("{role} endpoint not found: {node}")]
    EndpointNotFound { role: &'static str, node: String },

    #[error("not a document node: {0}")]
    NotADocument(String),

    #[error("stored vectors use model '{stored}' but '{configured}' is configured; run `notegraph embed --all`")]
    EmbeddingModelChanged { stored: String, configured: String },
}
