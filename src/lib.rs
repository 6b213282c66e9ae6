//! RAG subset pipeline - batch orchestration for a retrieval test subset.
//!
//! Coordinates five sequential stages that prepare and evaluate a small
//! retrieval-augmented-generation test set:
//! 1. Chunk the full corpus (external chunker tool)
//! 2. Select a deterministic 5-document sample aligned with the golden queries
//! 3. Reset the vector database collection (best-effort)
//! 4. Ingest the filtered chunks (external ingestion CLI)
//! 5. Compute retrieval metrics (external evaluation CLI)
//!
//! The chunker, ingestion CLI, vector search, and evaluator are external
//! collaborators; this crate sequences them and performs the one reconciliation
//! step in between (mapping golden queries back to their source doc_ids and
//! filtering the chunk file accordingly).
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_subset_pipeline::{config::PipelineConfig, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::load()?;
//!     config.validate()?;
//!
//!     let pipeline = Pipeline::new(config);
//!     pipeline.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **PipelineConfig**: artifact paths, Qdrant endpoint, external command lines
//! - **Pipeline**: sequential stage orchestration
//! - **selector**: the query-to-doc_id reconciliation and chunk filtering
//! - **ExternalStage**: spawn-and-wait wrapper for the delegated tools
//! - **dataset**: Natural Questions preprocessing for the pipeline's inputs

pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod selector;
pub mod stage;
pub mod vector;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use selector::{SelectionReport, SAMPLE_SIZE};
pub use stage::ExternalStage;
