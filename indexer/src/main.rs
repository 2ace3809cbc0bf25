use anyhow::Result;
use clap::{Parser, Subcommand};
use mbsearch_core::{Corpus, Document, Indexer, MemoryIndexer, PostScoringCriteria, RankedHit};
use mbsearch_indexer::build_index;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Ingest crawled microblog posts into an in-memory search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full ingestion pass and report what was indexed
    Stats {
        /// Directory of crawler output files
        #[arg(long)]
        input: PathBuf,
    },
    /// Index the corpus, then run one query and print the ranked hits
    Search {
        /// Directory of crawler output files
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// One JSON line per ranked hit: id, score vector and unhighlighted text.
fn hit_line(hit: &RankedHit, doc: &Document) -> serde_json::Value {
    serde_json::json!({ "id": hit.doc_id, "scores": hit.scores, "text": doc.text })
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let corpus = Corpus::new();
    let engine = MemoryIndexer::new();
    match cli.command {
        Commands::Stats { input } => {
            let report = build_index(&input, &corpus, &engine)?;
            let stats = serde_json::json!({
                "files_read": report.files_read,
                "files_skipped": report.files_skipped,
                "records_seen": report.records_seen,
                "records_dropped": report.records_dropped,
                "documents": report.documents_indexed,
                "terms": engine.num_terms(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Search { input, query, limit } => {
            build_index(&input, &corpus, &engine)?;
            let out = engine.search(&query, &PostScoringCriteria, 0, limit);
            for hit in &out.docs {
                println!("{}", hit_line(hit, &corpus.get_or_default(hit.doc_id)));
            }
        }
    }
    Ok(())
}
