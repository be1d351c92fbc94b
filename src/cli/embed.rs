//! CLI `embed` command: chunk documents and store their vectors.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use notegraph::config::NotegraphConfig;
use notegraph::embedding;
use notegraph::knowledge::embeddings::embed_documents;

/// Embed documents that have no vectors yet, or every document with `all`.
///
/// The HTTP provider blocks, so the whole run happens on the blocking pool.
pub async fn embed(config: &NotegraphConfig, all: bool) -> Result<()> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || embed_blocking(&config, all)).await?
}

fn embed_blocking(config: &NotegraphConfig, all: bool) -> Result<()> {
    let mut conn = super::open(config)?;
    let provider = embedding::create_provider(&config.embedding).context("failed to create embedding provider")?;

    println!("Embedding with model '{}'...", provider.model());
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("  {spinner} {pos} chunk(s) embedded ({elapsed})")?);

    let report = embed_documents(&mut conn, provider.as_ref(), &config.embedding, all, |n| pb.inc(n as u64));
    pb.finish_and_clear();
    let report = report?;

    if report.chunks == 0 {
        println!("No documents to embed.");
    } else {
        println!("Embedded {} chunk(s) from {} document(s).", report.chunks, report.documents);
    }
    Ok(())
}
