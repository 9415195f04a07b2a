//! Bulk extraction over saved emails

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::coupon::{CouponRecord, ExtractionInput};
use crate::extract::EmailCouponPipeline;
use crate::inbound::ParseEmailRequest;

/// One email read from disk, tagged with where it came from
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub source: String,
    pub input: ExtractionInput,
}

/// Output line of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub source: String,
    pub strategy: String,
    pub coupon: CouponRecord,
}

/// Directory of `.txt`/`.eml` files, or a JSONL file of parse requests
pub fn load_batch<P: AsRef<Path>>(path: P) -> Result<Vec<BatchItem>> {
    let path = path.as_ref();
    if path.is_dir() {
        load_email_dir(path)
    } else {
        load_requests_jsonl(path)
    }
}

/// Walk a directory for saved emails; the first `Subject:` line is the subject
pub fn load_email_dir(dir: &Path) -> Result<Vec<BatchItem>> {
    let mut files: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "txt" || ext == "eml")
                .unwrap_or(false)
        })
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));

    let mut items = Vec::new();
    for entry in files {
        let text = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read email: {:?}", entry.path()))?;
        let subject = subject_line(&text);

        match ExtractionInput::new(Some(&text), subject) {
            Ok(input) => items.push(BatchItem {
                source: entry.path().display().to_string(),
                input,
            }),
            Err(_) => tracing::warn!("Skipping empty email file {:?}", entry.path()),
        }
    }

    Ok(items)
}

fn subject_line(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.strip_prefix("Subject:"))
        .map(str::trim)
}

/// One `{"content": .., "subject": ..}` object per line
pub fn load_requests_jsonl(path: &Path) -> Result<Vec<BatchItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {:?}", path))?;

    let mut items = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let request: ParseEmailRequest = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse request on line {}", line_no + 1))?;

        match request.to_input() {
            Ok(input) => items.push(BatchItem {
                source: format!("{}:{}", path.display(), line_no + 1),
                input,
            }),
            Err(_) => tracing::warn!("Skipping empty request on line {}", line_no + 1),
        }
    }

    Ok(items)
}

/// Run the pipeline over every item with at most `concurrency` in flight.
/// Results keep input order.
pub async fn run_batch(
    pipeline: &EmailCouponPipeline,
    items: Vec<BatchItem>,
    concurrency: usize,
) -> Vec<BatchResult> {
    stream::iter(items)
        .map(|item| async move {
            let outcome = pipeline.run(&item.input).await;
            BatchResult {
                source: item.source,
                strategy: outcome.strategy,
                coupon: outcome.record,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

pub fn write_results_jsonl<P: AsRef<Path>>(path: P, results: &[BatchResult]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    for result in results {
        writeln!(file, "{}", serde_json::to_string(result)?)?;
    }

    tracing::info!("Wrote {} coupons to {:?}", results.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HeuristicExtractor;
    use tempfile::TempDir;

    #[test]
    fn test_subject_line() {
        assert_eq!(subject_line("From: a\nSubject: Nike: $20 off\n\nbody"), Some("Nike: $20 off"));
        assert_eq!(subject_line("no headers"), None);
    }

    #[test]
    fn test_load_email_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.eml"), "Subject: Gap: 10% off\n\nShop now").unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "Use code SAVE20").unwrap();
        std::fs::write(temp_dir.path().join("ignored.pdf"), "binary").unwrap();
        std::fs::write(temp_dir.path().join("empty.txt"), "").unwrap();

        let items = load_batch(temp_dir.path()).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items[0].source.ends_with("a.txt"));
        assert_eq!(items[0].input.subject, "");
        assert_eq!(items[1].input.subject, "Gap: 10% off");
    }

    #[test]
    fn test_load_requests_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("emails.jsonl");
        std::fs::write(
            &path,
            "{\"content\": \"Use code A1\", \"subject\": \"Nike: sale\"}\n\n{}\n{\"subject\": \"Target: $5 off\"}\n",
        )
        .unwrap();

        let items = load_batch(&path).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items[1].source.ends_with(":4"));
    }

    #[tokio::test]
    async fn test_run_batch_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = EmailCouponPipeline::new(HeuristicExtractor::new());
        let items = vec![
            BatchItem {
                source: "one".to_string(),
                input: ExtractionInput::new(None, Some("Nike: $20 off")).unwrap(),
            },
            BatchItem {
                source: "two".to_string(),
                input: ExtractionInput::new(None, Some("Gap: 10% off")).unwrap(),
            },
        ];

        let results = run_batch(&pipeline, items, 8).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].coupon.brand, "Nike");
        assert_eq!(results[1].coupon.savings, "10% off");
        assert!(results.iter().all(|r| r.strategy == "heuristic"));

        let out = temp_dir.path().join("out").join("coupons.jsonl");
        write_results_jsonl(&out, &results).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 2);
    }
}
