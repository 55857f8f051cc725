//! Dead-letter sink for batches that exhausted their retry budget.

use std::path::PathBuf;

use log::{error, warn};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error_handling::{ErrorType, ProcessingStats};
use crate::models::Batch;

/// Records batches dropped after the retry ceiling.
///
/// Always logs the drop so operators see it; optionally appends the
/// documents as NDJSON to a side file for later replay. Appends are
/// serialized so concurrent delivery workers cannot interleave lines.
pub struct DeadLetter {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl DeadLetter {
    pub fn new(path: Option<PathBuf>) -> Self {
        DeadLetter {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Records one dropped batch and returns how many documents it held.
    ///
    /// A write failure is counted and logged but never propagated: by this
    /// point the batch is already out of the pipeline, and failing the
    /// worker would not bring it back.
    pub async fn record(&self, batch: &Batch, stats: &ProcessingStats) -> u64 {
        warn!(
            "dead-lettering batch after {} failed attempts ({} docs): prefixes {:?}",
            batch.retry_count,
            batch.documents.len(),
            batch.prefixes()
        );

        if let Some(path) = &self.path {
            let _guard = self.write_lock.lock().await;
            if let Err(e) = self.append(path, batch).await {
                error!("failed to write dead-letter file {}: {e}", path.display());
                stats.increment_error(ErrorType::DeadLetterWrite);
            }
        }

        batch.documents.len() as u64
    }

    async fn append(&self, path: &PathBuf, batch: &Batch) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let mut buf = String::new();
        for doc in &batch.documents {
            match serde_json::to_string(doc) {
                Ok(line) => {
                    buf.push_str(&line);
                    buf.push('\n');
                }
                Err(e) => error!(
                    "failed to serialize dead-letter document {}: {e}",
                    doc.prefix
                ),
            }
        }
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }
}
