pub mod dedup;
pub mod embeddings;
pub mod import;
pub mod search;
pub mod store;
pub mod types;
