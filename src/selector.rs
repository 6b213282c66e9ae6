//! Sample selector: reconcile the golden requests against the
//! embedding-samples file and filter the chunked corpus down to the
//! doc_ids backing the first few requests.

use crate::error::{PipelineError, Result};
use crate::records::{parse_jsonl_line, ChunkRecord, EmbeddingSample, RequestRecord};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Number of golden requests the subset is aligned with.
pub const SAMPLE_SIZE: usize = 5;

/// Outcome of a selection run.
#[derive(Debug, Clone)]
pub struct SelectionReport {
    /// Resolved doc_ids, de-duplicated, first-seen order.
    pub keep_ids: Vec<String>,
    /// Number of chunk lines written to the subset file.
    pub lines_written: usize,
    /// Whether the corpus-order fallback replaced the request-driven result.
    pub fallback_used: bool,
}

impl SelectionReport {
    /// Print the resolved ids and written-line count to stdout.
    pub fn print_summary(&self) {
        println!("keep_ids: {:?}", self.keep_ids);
        if self.fallback_used {
            println!("(request reconciliation fell short; ids taken from corpus order)");
        }
        println!("Wrote {} chunk lines", self.lines_written);
    }
}

/// Build a trimmed-query -> doc_id map from the embedding-samples file.
///
/// Later duplicate queries overwrite earlier entries; file order determines
/// precedence. Lines without a usable `example_id` contribute nothing.
pub fn build_query_map(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut map = HashMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let sample: EmbeddingSample = parse_jsonl_line(path, idx + 1, &line)?;
        if let Some(doc_id) = sample.doc_id() {
            map.insert(sample.query.trim().to_string(), doc_id);
        }
    }

    Ok(map)
}

/// Collect the doc_ids backing the first `limit` requests, de-duplicated,
/// preserving first-seen order. A request whose trimmed query is empty or
/// has no mapping entry contributes nothing.
pub fn resolve_keep_ids(
    requests: &[RequestRecord],
    query_map: &HashMap<String, String>,
    limit: usize,
) -> Vec<String> {
    let mut keep_ids: Vec<String> = Vec::new();

    for request in requests.iter().take(limit) {
        let query = request.query.trim();
        if query.is_empty() {
            continue;
        }
        if let Some(doc_id) = query_map.get(query) {
            if !keep_ids.contains(doc_id) {
                keep_ids.push(doc_id.clone());
            }
        }
    }

    keep_ids
}

/// Scan the full chunk file in order, collecting the first `limit` distinct
/// `metadata.doc_id` values (or fewer if the file is exhausted).
pub fn fallback_scan(chunks_path: &Path, limit: usize) -> Result<Vec<String>> {
    if !chunks_path.exists() {
        return Err(PipelineError::InputNotFound(chunks_path.to_path_buf()));
    }

    let file = File::open(chunks_path).map_err(|e| PipelineError::io(chunks_path, e))?;
    let reader = BufReader::new(file);

    let mut ids: Vec<String> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(chunks_path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ChunkRecord = parse_jsonl_line(chunks_path, idx + 1, &line)?;
        if let Some(doc_id) = record.doc_id() {
            if !ids.iter().any(|id| id == doc_id) {
                ids.push(doc_id.to_string());
                if ids.len() >= limit {
                    break;
                }
            }
        }
    }

    Ok(ids)
}

/// Stream the full chunk file, writing each line byte-verbatim to the subset
/// file iff its `metadata.doc_id` is in `keep`. Returns the written-line
/// count. Lines missing `metadata` or `doc_id` are skipped.
pub fn filter_chunks(input: &Path, output: &Path, keep: &HashSet<String>) -> Result<usize> {
    if !input.exists() {
        return Err(PipelineError::InputNotFound(input.to_path_buf()));
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }

    let file = File::open(input).map_err(|e| PipelineError::io(input, e))?;
    let reader = BufReader::new(file);

    let out = File::create(output).map_err(|e| PipelineError::io(output, e))?;
    let mut writer = BufWriter::new(out);

    let mut written = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(input, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ChunkRecord = parse_jsonl_line(input, idx + 1, &line)?;
        let keep_line = record.doc_id().is_some_and(|id| keep.contains(id));
        if keep_line {
            // Write the original line, not a re-serialization.
            writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| PipelineError::io(output, e))?;
            written += 1;
        }
    }

    writer.flush().map_err(|e| PipelineError::io(output, e))?;

    Ok(written)
}

/// Run the whole selection stage: reconcile, fall back if needed, filter.
pub fn select_subset(
    embedding_samples: &Path,
    requests_path: &Path,
    chunks_all: &Path,
    chunks_out: &Path,
) -> Result<SelectionReport> {
    let query_map = build_query_map(embedding_samples)?;
    debug!(entries = query_map.len(), "built query -> doc_id map");

    let requests = crate::records::load_requests(requests_path)?;
    let mut keep_ids = resolve_keep_ids(&requests, &query_map, SAMPLE_SIZE);

    // Fewer than SAMPLE_SIZE reconciled ids (including zero) abandons the
    // request-driven result entirely: the fallback replaces the partial
    // list rather than topping it up.
    let fallback_used = keep_ids.len() < SAMPLE_SIZE;
    if fallback_used {
        info!(
            matched = keep_ids.len(),
            "request reconciliation fell short, scanning corpus for doc_ids"
        );
        keep_ids = fallback_scan(chunks_all, SAMPLE_SIZE)?;
    }

    let keep_set: HashSet<String> = keep_ids.iter().cloned().collect();
    let lines_written = filter_chunks(chunks_all, chunks_out, &keep_set)?;

    Ok(SelectionReport {
        keep_ids,
        lines_written,
        fallback_used,
    })
}
