//! Flat-file record types shared between pipeline stages.
//!
//! All records are ephemeral: read once per run from JSONL/JSON artifacts,
//! never persisted by this process.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Metadata attached to a chunk by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// String identifier of the source document.
    #[serde(default)]
    pub doc_id: Option<String>,

    /// Remaining chunker-owned fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One unit of indexed text, as emitted by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub metadata: Option<ChunkMetadata>,
}

impl ChunkRecord {
    /// The chunk's source document id, if the chunker supplied one.
    pub fn doc_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.doc_id.as_deref())
    }
}

/// One evaluation query from the golden request file.
///
/// Only `query` is consumed here; the golden-answer fields are the
/// evaluator's business and ride along opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(default)]
    pub query: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One line of the embedding-samples side file.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSample {
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub example_id: Option<Value>,
}

impl EmbeddingSample {
    /// Stringified example_id, or None when absent/null.
    pub fn doc_id(&self) -> Option<String> {
        match self.example_id.as_ref() {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Load the golden request file (a JSON array of request objects).
pub fn load_requests(path: &Path) -> Result<Vec<RequestRecord>> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

    serde_json::from_str(&content).map_err(|e| PipelineError::parse(path, e))
}

/// Parse a single JSONL line, surfacing the 1-indexed line number on failure.
pub fn parse_jsonl_line<T: serde::de::DeserializeOwned>(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<T> {
    serde_json::from_str(line).map_err(|e| PipelineError::malformed_line(path, line_number, e))
}
