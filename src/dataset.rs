//! Dataset preparation from the Natural Questions simplified train set.
//!
//! Two builders feed the pipeline's pre-supplied inputs:
//! - `build_samples`: the embedding-samples JSONL keeping full document text
//!   for retrieval (query/example_id/source/text).
//! - `build_requests`: the golden request file with contextual gold passages
//!   extracted around the annotated answer spans.

use crate::error::{PipelineError, Result};
use crate::records::parse_jsonl_line;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// How many NQ records to take from the head of the train set.
pub const DEFAULT_LIMIT: usize = 100;

/// Tokens to extend before/after an annotated span for evidence. Keeps gold
/// snippets close to paragraph-chunk length (the chunker caps at ~512 tokens).
const WINDOW: usize = 80;

/// Cap on answer length, in whitespace tokens.
const ANSWER_MAX_WORDS: usize = 20;

/// Gold fallback size when a record carries no usable annotation.
const FALLBACK_TOKENS: usize = 200;

/// One record of the NQ simplified train JSONL (only the fields we read).
#[derive(Debug, Deserialize)]
struct NqRecord {
    #[serde(default)]
    question_text: String,

    #[serde(default)]
    example_id: Option<Value>,

    #[serde(default)]
    document_url: String,

    #[serde(default)]
    document_text: String,

    #[serde(default)]
    annotations: Vec<NqAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
struct NqAnnotation {
    #[serde(default)]
    short_answers: Vec<NqSpan>,

    #[serde(default)]
    long_answer: Option<NqSpan>,
}

/// A token span. NQ marks absent spans with -1, which span extraction rejects.
#[derive(Debug, Clone, Copy, Deserialize)]
struct NqSpan {
    #[serde(default = "absent_token")]
    start_token: i64,

    #[serde(default = "absent_token")]
    end_token: i64,
}

fn absent_token() -> i64 {
    -1
}

/// One line of the embedding-samples output.
#[derive(Debug, Serialize)]
struct SampleRecord {
    query: String,
    example_id: Option<Value>,
    source: String,
    text: String,
}

/// One gold evidence item attached to a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldItem {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of the golden request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEntry {
    pub query: String,
    pub answer: String,
    pub source: String,
    pub gold: Vec<GoldItem>,
}

/// Build the embedding-samples JSONL from the NQ train set, keeping full
/// document text. Returns the number of records written.
pub fn build_samples(src: &Path, dst: &Path, limit: usize) -> Result<usize> {
    if !src.exists() {
        return Err(PipelineError::InputNotFound(src.to_path_buf()));
    }

    ensure_parent(dst)?;

    let reader = BufReader::new(File::open(src).map_err(|e| PipelineError::io(src, e))?);
    let out = File::create(dst).map_err(|e| PipelineError::io(dst, e))?;
    let mut writer = BufWriter::new(out);

    let mut written = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        if written >= limit {
            break;
        }

        let line = line.map_err(|e| PipelineError::io(src, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: NqRecord = parse_jsonl_line(src, idx + 1, &line)?;
        let sample = SampleRecord {
            query: record.question_text.trim().to_string(),
            example_id: record.example_id,
            source: record.document_url,
            text: record.document_text,
        };

        let json = serde_json::to_string(&sample).map_err(|e| PipelineError::parse(dst, e))?;
        writer
            .write_all(json.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| PipelineError::io(dst, e))?;
        written += 1;
    }

    writer.flush().map_err(|e| PipelineError::io(dst, e))?;

    Ok(written)
}

/// Build the golden request file (pretty-printed JSON array) from the NQ
/// train set. Returns the number of entries written.
pub fn build_requests(src: &Path, dst: &Path, limit: usize) -> Result<usize> {
    if !src.exists() {
        return Err(PipelineError::InputNotFound(src.to_path_buf()));
    }

    ensure_parent(dst)?;

    let reader = BufReader::new(File::open(src).map_err(|e| PipelineError::io(src, e))?);

    let mut entries: Vec<RequestEntry> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if entries.len() >= limit {
            break;
        }

        let line = line.map_err(|e| PipelineError::io(src, e))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: NqRecord = parse_jsonl_line(src, idx + 1, &line)?;
        entries.push(build_entry(&record));
    }

    let json = serde_json::to_string_pretty(&entries).map_err(|e| PipelineError::parse(dst, e))?;
    fs::write(dst, json).map_err(|e| PipelineError::io(dst, e))?;

    Ok(entries.len())
}

/// Build one request entry: answer text plus gold context windows.
fn build_entry(record: &NqRecord) -> RequestEntry {
    let tokens: Vec<&str> = record.document_text.split_whitespace().collect();
    let default_annotation = NqAnnotation::default();
    let annotation = record.annotations.first().unwrap_or(&default_annotation);

    // Answer: first short-answer span, else the long-answer span.
    let answer_span = annotation
        .short_answers
        .first()
        .copied()
        .or(annotation.long_answer)
        .and_then(|span| validate_span(span, tokens.len()));

    let mut answer = answer_span
        .map(|(start, end)| tokens[start..end].join(" "))
        .unwrap_or_default();
    answer = truncate_words(&answer, ANSWER_MAX_WORDS);

    // Gold evidence: long-answer window first, then each short-answer window,
    // de-duplicated by cleaned text.
    let mut gold: Vec<GoldItem> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    fn add_context(ctx: Option<String>, gold: &mut Vec<GoldItem>, seen: &mut Vec<String>) {
        if let Some(raw) = ctx {
            let cleaned = strip_html(&raw);
            if !cleaned.is_empty() && !seen.contains(&cleaned) {
                seen.push(cleaned.clone());
                gold.push(GoldItem {
                    content: cleaned,
                    kind: "TEXT".to_string(),
                });
            }
        }
    }

    if let Some(span) = annotation.long_answer {
        add_context(extract_window(&tokens, span), &mut gold, &mut seen);
    }

    for span in &annotation.short_answers {
        add_context(extract_window(&tokens, *span), &mut gold, &mut seen);
    }

    if gold.is_empty() {
        let head = tokens.iter().take(FALLBACK_TOKENS).copied().collect::<Vec<_>>().join(" ");
        add_context(Some(head), &mut gold, &mut seen);
    }

    // An empty answer borrows the head of the first gold snippet.
    if answer.is_empty() {
        if let Some(first) = gold.first() {
            answer = truncate_words(&first.content, ANSWER_MAX_WORDS);
        }
    }

    RequestEntry {
        query: record.question_text.trim().to_string(),
        answer,
        source: record.document_url.clone(),
        gold,
    }
}

/// Reject absent (-1), inverted, or out-of-bounds spans; clip the end.
fn validate_span(span: NqSpan, token_count: usize) -> Option<(usize, usize)> {
    if span.start_token < 0 || span.end_token <= span.start_token {
        return None;
    }

    let start = span.start_token as usize;
    if start >= token_count {
        return None;
    }

    let end = (span.end_token as usize).min(token_count);
    Some((start, end))
}

/// Return a context window of ±WINDOW tokens around the span, if valid.
fn extract_window(tokens: &[&str], span: NqSpan) -> Option<String> {
    let (start, end) = validate_span(span, tokens.len())?;
    let a = start.saturating_sub(WINDOW);
    let b = (end + WINDOW).min(tokens.len());
    Some(tokens[a..b].join(" "))
}

/// Strip HTML tags, keeping space-separated text with normalized whitespace.
pub fn strip_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let fragment = Html::parse_document(text);
    let joined = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");

    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap a string at `max` whitespace-separated words.
fn truncate_words(text: &str, max: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max {
        words[..max].join(" ")
    } else {
        words.join(" ")
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn nq_line(question: &str, example_id: u64, text: &str, annotations: &str) -> String {
        format!(
            r#"{{"question_text":"{}","example_id":{},"document_url":"http://example.com","document_text":"{}","annotations":{}}}"#,
            question, example_id, text, annotations
        )
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b></p><ul><li>one</li><li>two</li></ul>"),
            "Hello world one two"
        );
        assert_eq!(strip_html("  plain   text  "), "plain text");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_validate_span_rejects_absent_and_inverted() {
        assert!(validate_span(NqSpan { start_token: -1, end_token: -1 }, 10).is_none());
        assert!(validate_span(NqSpan { start_token: 5, end_token: 5 }, 10).is_none());
        assert!(validate_span(NqSpan { start_token: 12, end_token: 14 }, 10).is_none());
        assert_eq!(
            validate_span(NqSpan { start_token: 8, end_token: 15 }, 10),
            Some((8, 10))
        );
    }

    #[test]
    fn test_extract_window_clips_to_bounds() {
        let text: Vec<String> = (0..300).map(|i| format!("w{}", i)).collect();
        let tokens: Vec<&str> = text.iter().map(String::as_str).collect();

        let window = extract_window(&tokens, NqSpan { start_token: 150, end_token: 152 }).unwrap();
        let words: Vec<&str> = window.split_whitespace().collect();
        assert_eq!(words.first(), Some(&"w70"));
        assert_eq!(words.last(), Some(&"w231"));

        // Near the start the window clips at token zero.
        let window = extract_window(&tokens, NqSpan { start_token: 2, end_token: 4 }).unwrap();
        assert!(window.starts_with("w0 "));
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b c d", 2), "a b");
        assert_eq!(truncate_words("a b", 5), "a b");
    }

    #[test]
    fn test_build_entry_short_answer_preferred() {
        let doc: Vec<String> = (0..50).map(|i| format!("t{}", i)).collect();
        let record = NqRecord {
            question_text: " who is it ".to_string(),
            example_id: Some(serde_json::json!(1)),
            document_url: "http://example.com".to_string(),
            document_text: doc.join(" "),
            annotations: vec![NqAnnotation {
                short_answers: vec![NqSpan { start_token: 10, end_token: 12 }],
                long_answer: Some(NqSpan { start_token: 5, end_token: 20 }),
            }],
        };

        let entry = build_entry(&record);
        assert_eq!(entry.query, "who is it");
        assert_eq!(entry.answer, "t10 t11");
        // Long-answer window first, short-answer window second.
        assert_eq!(entry.gold.len(), 2);
        assert!(entry.gold[0].content.starts_with("t0 "));
        assert_eq!(entry.gold[0].kind, "TEXT");
    }

    #[test]
    fn test_build_entry_no_annotation_falls_back() {
        let doc: Vec<String> = (0..300).map(|i| format!("t{}", i)).collect();
        let record = NqRecord {
            question_text: "q".to_string(),
            example_id: None,
            document_url: String::new(),
            document_text: doc.join(" "),
            annotations: vec![],
        };

        let entry = build_entry(&record);
        assert_eq!(entry.gold.len(), 1);
        assert_eq!(entry.gold[0].content.split_whitespace().count(), 200);
        // The answer borrows the head of the gold snippet.
        assert_eq!(entry.answer.split_whitespace().count(), ANSWER_MAX_WORDS);
    }

    #[test]
    fn test_build_samples_limit_and_trim() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("nq.jsonl");
        let dst = dir.path().join("out/embedding_samples.jsonl");

        let lines: Vec<String> = (0..5)
            .map(|i| nq_line(&format!(" question {} ", i), i as u64, "body text", "[]"))
            .collect();
        fs::write(&src, lines.join("\n")).unwrap();

        let written = build_samples(&src, &dst, 3).unwrap();
        assert_eq!(written, 3);

        let content = fs::read_to_string(&dst).unwrap();
        let out_lines: Vec<&str> = content.lines().collect();
        assert_eq!(out_lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(out_lines[0]).unwrap();
        assert_eq!(first["query"], "question 0");
        assert_eq!(first["example_id"], 0);
        assert_eq!(first["text"], "body text");
    }

    #[test]
    fn test_build_requests_writes_array() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("nq.jsonl");
        let dst = dir.path().join("requests/requests.json");

        let annotations =
            r#"[{"short_answers":[{"start_token":1,"end_token":2}],"long_answer":{"start_token":0,"end_token":4}}]"#;
        fs::write(
            &src,
            nq_line("who", 7, "alpha beta gamma delta epsilon", annotations),
        )
        .unwrap();

        let written = build_requests(&src, &dst, DEFAULT_LIMIT).unwrap();
        assert_eq!(written, 1);

        let entries: Vec<RequestEntry> =
            serde_json::from_str(&fs::read_to_string(&dst).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].answer, "beta");
        assert!(!entries[0].gold.is_empty());
    }
}
