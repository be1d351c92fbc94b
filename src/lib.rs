//! Personal knowledge graph over documents, entities and relationships.
//!
//! notegraph keeps research papers and periodic notes, the entities they
//! mention (topics, people, projects, institutions, methods, applications) and
//! typed relationships between them in one SQLite database. From that store it
//! derives a directed, weighted graph for traversal queries and ranks document
//! chunks by cosine similarity for semantic search.
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL) with forward-only migrations; vectors are stored
//!   as little-endian f32 blobs and searched by brute-force scan
//! - **Graph**: petgraph `DiGraph` rebuilt from the store and persisted to
//!   `graph_nodes`/`graph_edges`, with degree, PageRank and component stats
//! - **Embeddings**: any OpenAI-compatible `/embeddings` endpoint
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: database initialization, schema, migrations and health checks
//! - [`embedding`]: text-to-vector providers
//! - [`error`]: typed failures of the core
//! - [`graph`]: graph construction, algorithms, queries and node-link JSON
//! - [`knowledge`]: documents, entities, relationships, search and dedup

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod knowledge;
