//! CLI graph commands: build the graph and run traversal queries over it.

use anyhow::Result;

use notegraph::config::NotegraphConfig;
use notegraph::graph::{builder, query, KnowledgeGraph};
use notegraph::knowledge::types::NodeType;

use super::{open, print_json};

pub fn build(config: &NotegraphConfig, json: bool) -> Result<()> {
    let mut conn = open(config)?;
    let (_, report) = builder::rebuild(&mut conn, &config.graph)?;
    if json {
        return print_json(&report);
    }

    println!("Graph built:");
    println!("  Nodes:                  {}", report.nodes);
    println!("  Edges:                  {}", report.edges);
    println!("    from relationships:   {}", report.relationship_edges);
    println!("    co-occurrence:        {}", report.cooccurrence_edges);
    println!("  Components:             {}", report.components);
    if report.dangling_relationships > 0 {
        println!("  Dangling (dropped):     {}", report.dangling_relationships);
    }
    Ok(())
}

fn load(config: &NotegraphConfig) -> Result<KnowledgeGraph> {
    let conn = open(config)?;
    KnowledgeGraph::load_built(&conn)
}

pub fn related(config: &NotegraphConfig, node: &str, max_distance: Option<usize>, json: bool) -> Result<()> {
    let graph = load(config)?;
    let max_distance = max_distance.unwrap_or(config.graph.related_max_distance);
    let related = query::related_topics(&graph, node, max_distance)?;
    if json {
        return print_json(&related);
    }
    if related.is_empty() {
        println!("No topics within {max_distance} hop(s) of {node}.");
    }
    for r in &related {
        println!("  {:<16} d={} strength={:.3}  {}", r.node_id, r.distance, r.strength, r.label);
    }
    Ok(())
}

pub fn collaborations(config: &NotegraphConfig, json: bool) -> Result<()> {
    let graph = load(config)?;
    let patterns = query::collaboration_patterns(&graph);
    if json {
        return print_json(&patterns);
    }
    for p in patterns.iter().filter(|p| p.document_count > 0) {
        println!("{} ({}), {} document(s)", p.name, p.person, p.document_count);
        if !p.topics.is_empty() {
            println!("  topics:     {}", p.topics.join(", "));
        }
        if !p.projects.is_empty() {
            println!("  projects:   {}", p.projects.join(", "));
        }
        if !p.coauthors.is_empty() {
            println!("  co-authors: {}", p.coauthors.join(", "));
        }
    }
    Ok(())
}

pub fn suggest(config: &NotegraphConfig, document: &str, threshold: Option<f64>, json: bool) -> Result<()> {
    let graph = load(config)?;
    let threshold = threshold.unwrap_or(config.graph.similarity_threshold);
    let suggestions = query::suggest_connections(&graph, document, threshold)?;
    if json {
        return print_json(&suggestions);
    }

    println!("Similar documents (jaccard > {threshold}):");
    if suggestions.similar_documents.is_empty() {
        println!("  (none)");
    }
    for d in &suggestions.similar_documents {
        println!("  {:<12} {:.3}  {}", d.node_id, d.similarity, d.label);
    }
    println!("Recommended topics:");
    if suggestions.recommended_topics.is_empty() {
        println!("  (none)");
    }
    for t in &suggestions.recommended_topics {
        println!("  {:<12} support={}  {}", t.node_id, t.support, t.label);
    }
    Ok(())
}

pub fn important(config: &NotegraphConfig, top_n: Option<usize>, node_type: Option<&str>, json: bool) -> Result<()> {
    let node_type = node_type.map(str::parse::<NodeType>).transpose()?;
    let graph = load(config)?;
    let ranked = query::important_nodes(&graph, top_n.unwrap_or(config.graph.top_n), node_type);
    if json {
        return print_json(&ranked);
    }
    for (i, n) in ranked.iter().enumerate() {
        println!("  {:>3}. {:<16} pagerank={:.5} degree={:<4} {}", i + 1, n.node_id, n.pagerank, n.degree, n.label);
    }
    Ok(())
}

pub fn path(config: &NotegraphConfig, from: &str, to: &str, json: bool) -> Result<()> {
    let graph = load(config)?;
    let path = query::shortest_path(&graph, from, to)?;
    if json {
        return print_json(&path);
    }
    match path {
        Some(nodes) => println!("{} ({} hop(s))", nodes.join(" -> "), nodes.len().saturating_sub(1)),
        None => println!("No path between {from} and {to}."),
    }
    Ok(())
}

pub fn cross_domain(config: &NotegraphConfig, json: bool) -> Result<()> {
    let graph = load(config)?;
    let links = query::cross_domain_connections(&graph);
    if json {
        return print_json(&links);
    }
    if links.is_empty() {
        println!("No cross-domain topic pairs.");
    }
    for l in &links {
        println!(
            "  {} [{}] <-> {} [{}]  shared documents: {}",
            l.topic_a, l.category_a, l.topic_b, l.category_b, l.shared_documents
        );
    }
    Ok(())
}

pub fn neighbors(config: &NotegraphConfig, node: &str, json: bool) -> Result<()> {
    let graph = load(config)?;
    let neighbors = query::neighbors(&graph, node)?;
    if json {
        return print_json(&neighbors);
    }
    for n in &neighbors {
        let arrow = match n.direction {
            query::EdgeDirection::Outgoing => "-->",
            query::EdgeDirection::Incoming => "<--",
        };
        println!("  {arrow} [{}] {:<16} w={:.2}  {}", n.relationship_type, n.node_id, n.weight, n.label);
    }
    Ok(())
}
