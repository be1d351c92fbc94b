mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use notegraph::config::NotegraphConfig;

#[derive(Parser)]
#[command(name = "notegraph", version, about = "Personal knowledge graph over documents, entities and relationships")]
struct Cli {
    /// Config file (default: ~/.notegraph/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and schema
    Init,
    /// Import documents, entities and relationships from a JSON bundle
    Import { file: PathBuf },
    /// Embed documents for semantic search
    Embed {
        /// Re-embed every document, not just new ones
        #[arg(long)]
        all: bool,
    },
    /// Rebuild the knowledge graph from the relational store
    BuildGraph,
    /// Semantic search over embedded documents
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// paper, daily_note, weekly_note or monthly_note
        #[arg(long)]
        doc_type: Option<String>,
    },
    /// Topics within N hops of a node
    Related {
        node: String,
        #[arg(long)]
        max_distance: Option<usize>,
    },
    /// Topics, projects and co-authors per person
    Collaborations,
    /// Similar documents and topics to add for a document node
    Suggest {
        document: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Highest-PageRank nodes
    Important {
        #[arg(long)]
        top_n: Option<usize>,
        /// Restrict to one node type (document, topic, person, ...)
        #[arg(long)]
        node_type: Option<String>,
    },
    /// Shortest path between two nodes
    Path { from: String, to: String },
    /// Topic pairs from different categories that share documents
    CrossDomain,
    /// Direct neighbours of a node
    Neighbors { node: String },
    /// Report duplicate entity names
    Dedup {
        /// Entity kind to check (default: all)
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Export the graph as node-link JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the graph with one read from node-link JSON
    ImportGraph { file: PathBuf },
    /// Show counts for tables and the graph
    Stats,
    /// Check database health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NotegraphConfig::load_required(path)?,
        None => NotegraphConfig::load()?,
    };

    // Log to stderr so stdout carries command output.
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    match cli.command {
        Command::Init => cli::init(&config)?,
        Command::Import { file } => cli::import::import(&config, &file, json)?,
        Command::Embed { all } => cli::embed::embed(&config, all).await?,
        Command::BuildGraph => cli::graph::build(&config, json)?,
        Command::Search { query, top_k, doc_type } => {
            cli::search::search(&config, &query, top_k, doc_type.as_deref(), json).await?
        }
        Command::Related { node, max_distance } => cli::graph::related(&config, &node, max_distance, json)?,
        Command::Collaborations => cli::graph::collaborations(&config, json)?,
        Command::Suggest { document, threshold } => cli::graph::suggest(&config, &document, threshold, json)?,
        Command::Important { top_n, node_type } => {
            cli::graph::important(&config, top_n, node_type.as_deref(), json)?
        }
        Command::Path { from, to } => cli::graph::path(&config, &from, &to, json)?,
        Command::CrossDomain => cli::graph::cross_domain(&config, json)?,
        Command::Neighbors { node } => cli::graph::neighbors(&config, &node, json)?,
        Command::Dedup { kind, threshold } => cli::dedup(&config, kind.as_deref(), threshold, json)?,
        Command::Export { output } => cli::export::export(&config, output.as_deref())?,
        Command::ImportGraph { file } => cli::import::import_graph(&config, &file)?,
        Command::Stats => cli::stats::stats(&config, json)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
