use anyhow::Result;

use notegraph::config::NotegraphConfig;
use notegraph::embedding;
use notegraph::knowledge::search::semantic_search;
use notegraph::knowledge::types::DocType;

/// Embed the query and print the closest document chunks.
pub async fn search(
    config: &NotegraphConfig,
    query: &str,
    top_k: Option<usize>,
    doc_type: Option<&str>,
    json: bool,
) -> Result<()> {
    let doc_type = doc_type.map(str::parse::<DocType>).transpose()?;
    let conn = super::open(config)?;

    // The blocking HTTP client must be created and dropped off the async runtime.
    let embedding_config = config.embedding.clone();
    let query_text = query.to_string();
    let query_embedding = tokio::task::spawn_blocking(move || {
        embedding::create_provider(&embedding_config)?.embed(&query_text)
    })
    .await??;

    let top_k = top_k.unwrap_or(config.search.default_top_k);
    let hits = semantic_search(&conn, &query_embedding, top_k, doc_type)?;

    if json {
        return super::print_json(&hits);
    }
    if hits.is_empty() {
        println!("No results found. Have documents been embedded (`notegraph embed`)?");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({}, chunk {}, score: {:.4})",
            i + 1,
            hit.doc_type,
            hit.label,
            hit.node_id,
            hit.chunk_index,
            hit.score
        );
        println!("     {}", hit.preview.replace('\n', " "));
    }
    Ok(())
}
