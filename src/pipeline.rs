//! Sequential orchestration of the five pipeline stages.
//!
//! Each stage runs to completion (or fatal failure) before the next begins.
//! Only the index-reset stage is best-effort; every other failure aborts.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::selector::{self, SelectionReport};
use crate::stage::ExternalStage;
use crate::vector;
use tracing::info;

/// The five-stage subset pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all five stages in order, aborting on the first fatal failure.
    pub async fn run(&self) -> Result<()> {
        self.chunk().await?;
        let report = self.select()?;
        report.print_summary();
        self.reset().await;
        self.ingest().await?;
        self.evaluate().await?;
        info!("pipeline complete");
        Ok(())
    }

    /// Stage 1: invoke the chunker; it must leave the full chunk file behind.
    pub async fn chunk(&self) -> Result<()> {
        ExternalStage::new("chunk", &self.config.commands.chunker)?
            .run(&self.config.root)
            .await?;

        // Downstream stages only care that the file exists.
        let chunks_all = self.config.resolve(&self.config.paths.chunks_all);
        if !chunks_all.exists() {
            return Err(PipelineError::InputNotFound(chunks_all));
        }

        Ok(())
    }

    /// Stage 2: reconcile requests against embedding samples and filter.
    pub fn select(&self) -> Result<SelectionReport> {
        selector::select_subset(
            &self.config.resolve(&self.config.paths.embedding_samples),
            &self.config.resolve(&self.config.paths.requests),
            &self.config.resolve(&self.config.paths.chunks_all),
            &self.config.resolve(&self.config.paths.chunks_subset),
        )
    }

    /// Stage 3: best-effort collection reset. Never aborts the pipeline.
    pub async fn reset(&self) {
        vector::reset_collection(&self.config.qdrant).await;
    }

    /// Stage 4: invoke the ingestion CLI on the filtered subset.
    pub async fn ingest(&self) -> Result<()> {
        let subset = self.config.resolve(&self.config.paths.chunks_subset);

        ExternalStage::new("ingest", &self.config.commands.ingest)?
            .arg(subset.display().to_string())
            .run(&self.config.root)
            .await
    }

    /// Stage 5: invoke the evaluation CLI with ranking parameters.
    pub async fn evaluate(&self) -> Result<()> {
        let requests = self.config.resolve(&self.config.paths.requests);
        let details = self.config.resolve(&self.config.paths.retrieval_details);

        let k_values = self
            .config
            .eval
            .k_values
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(",");

        ExternalStage::new("eval", &self.config.commands.eval)?
            .arg("--requests")
            .arg(requests.display().to_string())
            .arg("--top-k")
            .arg(self.config.eval.top_k.to_string())
            .arg("--k-values")
            .arg(k_values)
            .arg("--output")
            .arg(details.display().to_string())
            .run(&self.config.root)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn test_config(dir: &TempDir) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.root = dir.path().to_path_buf();
        // Point the reset at a port nothing listens on: the stage must
        // tolerate it.
        config.qdrant.url = "http://127.0.0.1:1".to_string();
        config.qdrant.connect_timeout_secs = 1;
        config
    }

    fn seed_inputs(dir: &TempDir) {
        let root = dir.path();
        fs::create_dir_all(root.join("requests")).unwrap();
        fs::create_dir_all(root.join("original_text")).unwrap();
        fs::create_dir_all(root.join("data")).unwrap();

        fs::write(
            root.join("requests/requests_first5.json"),
            r#"[{"query":"q1"},{"query":"q2"},{"query":"q3"},{"query":"q4"},{"query":"q5"}]"#,
        )
        .unwrap();

        let samples: String = (1..=5)
            .map(|i| format!(r#"{{"query":"q{}","example_id":{}}}"#, i, i))
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(root.join("original_text/embedding_samples.jsonl"), samples).unwrap();

        let chunks: String = (1..=6)
            .map(|i| format!(r#"{{"text":"t","metadata":{{"doc_id":"{}"}}}}"#, i))
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(root.join("data/chunks_all.jsonl"), chunks).unwrap();
    }

    #[tokio::test]
    async fn test_run_aborts_on_chunker_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.commands.chunker = sh("exit 3");

        let pipeline = Pipeline::new(config);
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageFailed { stage: "chunk", .. }
        ));
    }

    #[tokio::test]
    async fn test_chunk_requires_output_file() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.commands.chunker = sh("true");

        let pipeline = Pipeline::new(config);
        let err = pipeline.chunk().await.unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));
    }

    #[tokio::test]
    async fn test_run_continues_past_failed_reset() {
        let dir = TempDir::new().unwrap();
        seed_inputs(&dir);

        let mut config = test_config(&dir);
        // Chunker is a no-op: inputs are pre-seeded.
        config.commands.chunker = sh("true");
        // Ingest proves it ran (i.e. the unreachable reset did not abort).
        config.commands.ingest = sh("touch ingest_ran");
        config.commands.eval = sh("true");

        let pipeline = Pipeline::new(config);
        pipeline.run().await.unwrap();

        assert!(dir.path().join("ingest_ran").exists());
        assert!(dir.path().join("data/chunks_first5.jsonl").exists());
    }

    #[tokio::test]
    async fn test_ingest_receives_subset_path() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        // sh -c binds the first extra arg to $0.
        config.commands.ingest = sh(r#"echo "$0" > ingest_arg"#);

        let pipeline = Pipeline::new(config);
        pipeline.ingest().await.unwrap();

        let arg = fs::read_to_string(dir.path().join("ingest_arg")).unwrap();
        assert!(arg.trim().ends_with("data/chunks_first5.jsonl"));
    }

    #[tokio::test]
    async fn test_eval_receives_ranking_parameters() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        // sh -c binds the first extra arg to $0, the rest to $@.
        config.commands.eval = sh(r#"echo "$0" "$@" > eval_args"#);

        let pipeline = Pipeline::new(config);
        pipeline.evaluate().await.unwrap();

        let args = fs::read_to_string(dir.path().join("eval_args")).unwrap();
        assert!(args.contains("--top-k 10"));
        assert!(args.contains("--k-values 1,3,5,10"));
        assert!(args.contains("requests_first5.json"));
        assert!(args.contains("retrieval_details.json"));
    }
}
