use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use ragdb_core::config::{resolve_with_base, BackendPreference, Config, Settings};
use ragdb_core::loader::FsDocumentSource;
use ragdb_core::logging;
use ragdb_core::traits::{Embedder, VectorBackend};
use ragdb_core::{Error, TextChunker};
use ragdb_embed::get_default_embedder;
use ragdb_retrieve::{chapter_filter, Ingestor, Retrieval, Retriever, NO_RELEVANT_CONTENT};
use ragdb_vector::{BackendKind, VectorStore};

/// Document retrieval over a vector store
#[derive(Parser)]
#[command(name = "ragdb", version = env!("CARGO_PKG_VERSION"), about = "Chunk, embed and search documents")]
struct Cli {
    /// Vector store engine: auto, memory or qdrant (overrides store.backend)
    #[arg(long, global = true)]
    backend: Option<BackendPreference>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, chunk, embed and store documents
    Ingest {
        /// File or directory to ingest (defaults to ingest.docs_dir)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Retrieve the chunks most relevant to a question
    Query {
        text: String,

        /// Maximum number of results (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum similarity score (defaults to retrieval.score_threshold)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Payload filter as JSON, e.g. '{"metadata.chapter": {"in": ["chapter-1"]}}'
        #[arg(long, conflicts_with = "chapter")]
        filter: Option<String>,

        /// Restrict results to a chapter (repeatable)
        #[arg(long)]
        chapter: Vec<String>,

        /// Ingest PATH first, in the same process
        #[arg(long, value_name = "PATH")]
        ingest: Option<PathBuf>,
    },

    /// Show collection statistics
    Info,

    /// Delete the collection and recreate it empty
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let mut settings = config.settings()?;
    if let Some(backend) = cli.backend {
        settings.store.backend = backend;
    }
    logging::init(&settings.logging);

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let store = Arc::new(VectorStore::connect(&settings.store).await?);
    println!("🗄️  Vector store: {} (collection '{}')", store.kind(), store.collection());

    match cli.command {
        Commands::Ingest { path } => {
            let path = match path {
                Some(p) => p,
                None => resolve_with_base(&env::current_dir()?, &settings.ingest.docs_dir),
            };
            ingest(&settings, &store, &embedder, &path).await?;
            if store.kind() == BackendKind::Memory {
                println!("\n💡 The in-memory store lives only as long as this process.");
                println!("💡 To load and search in one run, use: ragdb query --ingest <PATH> '<question>'");
            }
        }
        Commands::Query { text, top_k, threshold, filter, chapter, ingest: ingest_path } => {
            match ingest_path {
                Some(path) => ingest(&settings, &store, &embedder, &path).await?,
                None if store.kind() == BackendKind::Memory => store.ensure_collection(embedder.dim()).await?,
                None => {}
            }
            let top_k = top_k.unwrap_or(settings.retrieval.top_k);
            let threshold = threshold.unwrap_or(settings.retrieval.score_threshold);
            let retriever = Retriever::new(store.clone(), embedder.clone());
            let retrieval = match filter {
                Some(raw) => {
                    let filter: Value = serde_json::from_str(&raw).context("--filter is not valid JSON")?;
                    retriever.retrieve(&text, top_k, threshold, Some(&filter)).await
                }
                None => retriever.retrieve_with(&text, top_k, threshold, chapter_filter(&chapter).as_ref()).await,
            };
            print_retrieval(&text, retrieval.map_err(not_found_hint)?);
        }
        Commands::Info => match store.collection_info().await {
            Ok(info) => {
                println!("\n📊 Collection statistics");
                println!("   Name:    {}", info.name);
                println!("   Points:  {}", info.point_count);
                println!("   Vectors: {}", info.vector_count);
                println!("   Status:  {}", info.status);
            }
            Err(Error::NotFound(what)) => println!("⚠️  {what} does not exist yet; run `ragdb ingest` first"),
            Err(e) => return Err(e.into()),
        },
        Commands::Reset => {
            store.delete_collection().await?;
            store.ensure_collection(embedder.dim()).await?;
            println!("✅ Collection '{}' reset ({} dimensions)", store.collection(), embedder.dim());
        }
    }
    Ok(())
}

async fn ingest(settings: &Settings, store: &Arc<VectorStore>, embedder: &Arc<dyn Embedder>, path: &Path) -> anyhow::Result<()> {
    println!("📂 Ingesting from {}", path.display());
    let chunker = TextChunker::new(settings.chunking.clone())?;
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let ingestor = Ingestor::new(store.clone(), embedder.clone(), chunker, settings.ingest.concurrency).with_progress(bar.clone());
    let report = ingestor.ingest_path(&FsDocumentSource::new(), path).await?;
    bar.finish_with_message("✅ Ingestion completed!");

    println!("📊 Ingested {} documents into {} chunks ({} points written)", report.documents, report.chunks, report.points);
    for failure in &report.failures {
        println!("⚠️  Skipped {}: {}", failure.source, failure.error);
    }
    Ok(())
}

fn not_found_hint(error: Error) -> anyhow::Error {
    match error {
        Error::NotFound(what) => anyhow::anyhow!("{what} does not exist; run `ragdb ingest` first"),
        other => other.into(),
    }
}

fn print_retrieval(query: &str, retrieval: Retrieval) {
    let Retrieval::Relevant(ctx) = retrieval else {
        println!("\n🤷 {NO_RELEVANT_CONTENT}");
        return;
    };
    println!("\n🔍 Found {} results for: \"{}\"", ctx.results.len(), query);
    for (i, (result, source)) in ctx.results.iter().zip(&ctx.sources).enumerate() {
        println!(
            "\n  {}. score={:.4}  id={}  source={}  chunk={}/{}",
            i + 1,
            source.score,
            source.id,
            source.source,
            source.chunk_index + 1,
            source.total_chunks
        );
        println!("     📝 Content: {}", result.content());
    }
    println!("\n📚 Context ({} characters) ready for answer generation", ctx.context.chars().count());
}
