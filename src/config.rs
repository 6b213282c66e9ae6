//! Configuration for the subset pipeline.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Filesystem artifacts, relative to the working root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Full chunked corpus emitted by the chunker.
    #[serde(default = "default_chunks_all")]
    pub chunks_all: PathBuf,

    /// Filtered chunk subset consumed by the ingestion CLI.
    #[serde(default = "default_chunks_subset")]
    pub chunks_subset: PathBuf,

    /// Golden request file (JSON array of evaluation queries).
    #[serde(default = "default_requests")]
    pub requests: PathBuf,

    /// Embedding-samples file mapping query text to example_id.
    #[serde(default = "default_embedding_samples")]
    pub embedding_samples: PathBuf,

    /// Per-query retrieval details written by the evaluator.
    #[serde(default = "default_retrieval_details")]
    pub retrieval_details: PathBuf,
}

fn default_chunks_all() -> PathBuf {
    PathBuf::from("data/chunks_all.jsonl")
}

fn default_chunks_subset() -> PathBuf {
    PathBuf::from("data/chunks_first5.jsonl")
}

fn default_requests() -> PathBuf {
    PathBuf::from("requests/requests_first5.json")
}

fn default_embedding_samples() -> PathBuf {
    PathBuf::from("original_text/embedding_samples.jsonl")
}

fn default_retrieval_details() -> PathBuf {
    PathBuf::from("output/retrieval_details.json")
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            chunks_all: default_chunks_all(),
            chunks_subset: default_chunks_subset(),
            requests: default_requests(),
            embedding_samples: default_embedding_samples(),
            retrieval_details: default_retrieval_details(),
        }
    }
}

/// Vector database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant endpoint URL (e.g., "http://localhost:6334").
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Collection to reset before ingestion.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Command lines for the three external tools (program followed by fixed args).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCommands {
    #[serde(default = "default_chunker_cmd")]
    pub chunker: Vec<String>,

    #[serde(default = "default_ingest_cmd")]
    pub ingest: Vec<String>,

    #[serde(default = "default_eval_cmd")]
    pub eval: Vec<String>,
}

fn default_chunker_cmd() -> Vec<String> {
    vec!["rag-chunker".to_string()]
}

fn default_ingest_cmd() -> Vec<String> {
    vec!["rag-ingest".to_string()]
}

fn default_eval_cmd() -> Vec<String> {
    vec!["rag-eval".to_string()]
}

impl Default for ExternalCommands {
    fn default() -> Self {
        Self {
            chunker: default_chunker_cmd(),
            ingest: default_ingest_cmd(),
            eval: default_eval_cmd(),
        }
    }
}

/// Ranking parameters passed through to the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalParams {
    /// Retrieval depth per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Cutoffs at which the evaluator computes metrics.
    #[serde(default = "default_k_values")]
    pub k_values: Vec<usize>,
}

fn default_top_k() -> usize {
    10
}

fn default_k_values() -> Vec<usize> {
    vec![1, 3, 5, 10]
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            k_values: default_k_values(),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Working root against which artifact paths are resolved. Empty means
    /// the current directory.
    #[serde(default)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: ArtifactPaths,

    #[serde(default)]
    pub qdrant: QdrantConfig,

    #[serde(default)]
    pub commands: ExternalCommands,

    #[serde(default)]
    pub eval: EvalParams,
}

impl PipelineConfig {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (PIPELINE_ROOT, QDRANT_URL, QDRANT_COLLECTION,
    ///    CHUNKER_CMD, INGEST_CMD, EVAL_CMD)
    /// 2. Config file (~/.config/rag-subset-pipeline/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = PipelineConfig::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        if let Ok(root) = env::var("PIPELINE_ROOT") {
            config.root = PathBuf::from(root);
        }

        if let Ok(url) = env::var("QDRANT_URL") {
            config.qdrant.url = url;
        }

        if let Ok(collection) = env::var("QDRANT_COLLECTION") {
            config.qdrant.collection = collection;
        }

        if let Ok(cmd) = env::var("CHUNKER_CMD") {
            config.commands.chunker = split_command(&cmd);
        }

        if let Ok(cmd) = env::var("INGEST_CMD") {
            config.commands.ingest = split_command(&cmd);
        }

        if let Ok(cmd) = env::var("EVAL_CMD") {
            config.commands.eval = split_command(&cmd);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-subset-pipeline")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.commands.chunker.is_empty() {
            return Err(PipelineError::Config(
                "Chunker command is empty. Set CHUNKER_CMD or add commands.chunker to the config file.".to_string(),
            ));
        }

        if self.commands.ingest.is_empty() {
            return Err(PipelineError::Config(
                "Ingest command is empty. Set INGEST_CMD or add commands.ingest to the config file.".to_string(),
            ));
        }

        if self.commands.eval.is_empty() {
            return Err(PipelineError::Config(
                "Eval command is empty. Set EVAL_CMD or add commands.eval to the config file.".to_string(),
            ));
        }

        if self.qdrant.url.is_empty() {
            return Err(PipelineError::Config(
                "Qdrant URL is empty. Set QDRANT_URL or add qdrant.url to the config file.".to_string(),
            ));
        }

        if self.qdrant.collection.is_empty() {
            return Err(PipelineError::Config("Qdrant collection name is empty.".to_string()));
        }

        if self.eval.top_k == 0 {
            return Err(PipelineError::Config("eval.top_k must be positive.".to_string()));
        }

        if self.eval.k_values.is_empty() {
            return Err(PipelineError::Config("eval.k_values must not be empty.".to_string()));
        }

        Ok(())
    }

    /// Resolve an artifact path against the working root.
    pub fn resolve(&self, artifact: &Path) -> PathBuf {
        if artifact.is_absolute() || self.root.as_os_str().is_empty() {
            artifact.to_path_buf()
        } else {
            self.root.join(artifact)
        }
    }
}

/// Split a command string on whitespace into program + args.
fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.paths.chunks_all, PathBuf::from("data/chunks_all.jsonl"));
        assert_eq!(config.paths.chunks_subset, PathBuf::from("data/chunks_first5.jsonl"));
        assert_eq!(config.paths.requests, PathBuf::from("requests/requests_first5.json"));
        assert_eq!(config.qdrant.collection, "documents");
        assert_eq!(config.eval.top_k, 10);
        assert_eq!(config.eval.k_values, vec![1, 3, 5, 10]);
    }

    #[test]
    fn test_default_config_validates() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config = PipelineConfig::default();
        config.commands.ingest.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = PipelineConfig::default();
        config.eval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_against_root() {
        let mut config = PipelineConfig::default();
        config.root = PathBuf::from("/work");
        assert_eq!(
            config.resolve(&config.paths.chunks_all),
            PathBuf::from("/work/data/chunks_all.jsonl")
        );
        assert_eq!(
            config.resolve(Path::new("/abs/file.json")),
            PathBuf::from("/abs/file.json")
        );
    }

    #[test]
    fn test_load_from_file_partial_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "qdrant:\n  url: http://qdrant:6334\ncommands:\n  chunker: [docker, compose, run, chunker]\n",
        )
        .unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.qdrant.url, "http://qdrant:6334");
        assert_eq!(config.qdrant.collection, "documents");
        assert_eq!(
            config.commands.chunker,
            vec!["docker", "compose", "run", "chunker"]
        );
        // Untouched sections keep defaults.
        assert_eq!(config.eval.top_k, 10);
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("python3 scripts/chunk.py --all"),
            vec!["python3", "scripts/chunk.py", "--all"]
        );
        assert!(split_command("").is_empty());
    }
}
