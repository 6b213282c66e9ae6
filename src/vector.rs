//! Vector database collection reset.
//!
//! The only direct vector-database operation in this pipeline: dropping the
//! target collection so ingestion starts from an empty index. Best-effort by
//! design — a collection that does not exist is not a setup failure, so every
//! delete error is logged and swallowed.

use crate::config::QdrantConfig;
use crate::error::{PipelineError, Result};
use qdrant_client::Qdrant;
use std::time::Duration;
use tracing::{info, warn};

/// Drop the configured collection, tolerating any failure.
///
/// Never returns an error: success and "collection did not exist" (or any
/// other delete failure) are both acceptable outcomes for this stage.
pub async fn reset_collection(config: &QdrantConfig) {
    match try_delete(config).await {
        Ok(true) => {
            info!(collection = %config.collection, "dropped existing collection");
            println!("Dropped collection '{}'", config.collection);
        }
        Ok(false) => {
            info!(collection = %config.collection, "collection was not present");
            println!("Collection '{}' was not present", config.collection);
        }
        Err(e) => {
            warn!(collection = %config.collection, error = %e, "collection reset failed, continuing");
        }
    }
}

/// Issue the delete. Returns whether the server reported a deletion.
async fn try_delete(config: &QdrantConfig) -> Result<bool> {
    let client = Qdrant::from_url(&config.url)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| PipelineError::VectorStore(e.to_string()))?;

    let response = client
        .delete_collection(config.collection.as_str())
        .await
        .map_err(|e| PipelineError::VectorStore(e.to_string()))?;

    Ok(response.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reset_tolerates_unreachable_server() {
        let config = QdrantConfig {
            url: "http://127.0.0.1:1".to_string(),
            collection: "documents".to_string(),
            connect_timeout_secs: 1,
        };

        // Must not panic or propagate: the pipeline continues past a failed
        // reset regardless of cause.
        reset_collection(&config).await;
    }
}
