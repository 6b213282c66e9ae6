//! RAG subset pipeline CLI
//!
//! Runs the five-stage subset pipeline end to end, or any single stage.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rag_subset_pipeline::{
    config::PipelineConfig,
    dataset,
    pipeline::Pipeline,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// RAG subset pipeline - prepare and evaluate a retrieval test subset
#[derive(Parser)]
#[command(name = "rag-pipeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML config file (overrides the default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working root against which artifact paths are resolved
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all five stages: chunk, select, reset, ingest, eval
    Run,

    /// Stage 1: invoke the external chunker
    Chunk,

    /// Stage 2: select the 5-document sample and filter the chunk file
    Select,

    /// Stage 3: drop the vector database collection (best-effort)
    Reset,

    /// Stage 4: invoke the external ingestion CLI on the filtered subset
    Ingest,

    /// Stage 5: invoke the external evaluation CLI
    Eval,

    /// Build the embedding-samples JSONL from the NQ simplified train set
    BuildSamples {
        /// Path to the NQ simplified train JSONL
        input: PathBuf,

        /// Output path for the embedding-samples file
        #[arg(short, long, default_value = "original_text/embedding_samples.jsonl")]
        output: PathBuf,

        /// Number of records to take from the head of the train set
        #[arg(short, long, default_value_t = dataset::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Build the golden request file with contextual gold passages
    BuildRequests {
        /// Path to the NQ simplified train JSONL
        input: PathBuf,

        /// Output path for the request file
        #[arg(short, long, default_value = "requests/requests.json")]
        output: PathBuf,

        /// Number of records to take from the head of the train set
        #[arg(short, long, default_value_t = dataset::DEFAULT_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::load().context("Failed to load configuration")?,
    };

    if let Some(root) = &cli.root {
        config.root = root.clone();
    }

    config.validate().context("Invalid configuration")?;

    let pipeline = Pipeline::new(config);

    match cli.command {
        Commands::Run => cmd_run(&pipeline).await,
        Commands::Chunk => cmd_chunk(&pipeline).await,
        Commands::Select => cmd_select(&pipeline),
        Commands::Reset => cmd_reset(&pipeline).await,
        Commands::Ingest => cmd_ingest(&pipeline).await,
        Commands::Eval => cmd_eval(&pipeline).await,
        Commands::BuildSamples {
            input,
            output,
            limit,
        } => cmd_build_samples(&pipeline, input, output, limit),
        Commands::BuildRequests {
            input,
            output,
            limit,
        } => cmd_build_requests(&pipeline, input, output, limit),
    }
}

async fn cmd_run(pipeline: &Pipeline) -> Result<()> {
    let start = Instant::now();

    pipeline.run().await.context("Pipeline aborted")?;

    println!("\nPipeline finished in {:.2?}", start.elapsed());
    println!(
        "Retrieval details: {}",
        pipeline
            .config()
            .resolve(&pipeline.config().paths.retrieval_details)
            .display()
    );

    Ok(())
}

async fn cmd_chunk(pipeline: &Pipeline) -> Result<()> {
    println!("Running chunker...");
    pipeline.chunk().await.context("Chunk stage failed")?;

    let chunks_all = pipeline.config().resolve(&pipeline.config().paths.chunks_all);
    println!("Chunk file ready: {}", chunks_all.display());

    Ok(())
}

fn cmd_select(pipeline: &Pipeline) -> Result<()> {
    let report = pipeline.select().context("Select stage failed")?;
    report.print_summary();

    let subset = pipeline.config().resolve(&pipeline.config().paths.chunks_subset);
    println!("Subset written to: {}", subset.display());

    Ok(())
}

async fn cmd_reset(pipeline: &Pipeline) -> Result<()> {
    pipeline.reset().await;
    Ok(())
}

async fn cmd_ingest(pipeline: &Pipeline) -> Result<()> {
    println!("Running ingestion...");
    pipeline.ingest().await.context("Ingest stage failed")
}

async fn cmd_eval(pipeline: &Pipeline) -> Result<()> {
    println!("Running evaluation...");
    pipeline.evaluate().await.context("Eval stage failed")
}

fn cmd_build_samples(
    pipeline: &Pipeline,
    input: PathBuf,
    output: PathBuf,
    limit: usize,
) -> Result<()> {
    let output = pipeline.config().resolve(&output);

    let written = dataset::build_samples(&input, &output, limit)
        .context("Failed to build embedding samples")?;

    println!("Wrote {} records to {}", written, output.display());

    Ok(())
}

fn cmd_build_requests(
    pipeline: &Pipeline,
    input: PathBuf,
    output: PathBuf,
    limit: usize,
) -> Result<()> {
    let output = pipeline.config().resolve(&output);

    let written = dataset::build_requests(&input, &output, limit)
        .context("Failed to build requests")?;

    println!("Wrote {} entries to {}", written, output.display());

    Ok(())
}
