//! Bulk actions over a media selection.
//!
//! Every item in a batch is settled on its own: one failed request never hides
//! the outcome of its siblings.
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::api::ConsoleApi;
use crate::errors::{ApiError, ApiResult};
use crate::model::{CustomerId, MediaId};

#[derive(Debug)]
pub struct BatchFailure<K> {
    pub id: K,
    pub error: ApiError,
}

/// Per-item outcome of a batch, each list in input order.
#[derive(Debug)]
pub struct BatchReport<K> {
    pub succeeded: Vec<K>,
    pub failed: Vec<BatchFailure<K>>,
}

impl<K> Default for BatchReport<K> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K: Copy> BatchReport<K> {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<K> {
        self.failed.iter().map(|f| f.id).collect()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Run `op` for every id with at most `concurrency` requests in flight and
/// collect every outcome.
pub async fn settle_all<K, F, Fut>(ids: &[K], concurrency: usize, op: F) -> BatchReport<K>
where
    K: Copy,
    F: Fn(K) -> Fut,
    Fut: Future<Output = ApiResult<()>>,
{
    let mut outcomes: Vec<(usize, K, ApiResult<()>)> = stream::iter(ids.iter().copied().enumerate())
        .map(|(idx, id)| {
            let fut = op(id);
            async move { (idx, id, fut.await) }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(idx, _, _)| *idx);

    let mut report = BatchReport::default();
    for (_, id, outcome) in outcomes {
        match outcome {
            Ok(()) => report.succeeded.push(id),
            Err(error) => report.failed.push(BatchFailure { id, error }),
        }
    }
    report
}

#[instrument(skip(api, media_ids), fields(count = media_ids.len()))]
pub async fn delete_media(
    api: &dyn ConsoleApi,
    customer_id: CustomerId,
    media_ids: &[MediaId],
    concurrency: usize,
) -> BatchReport<MediaId> {
    let report = settle_all(media_ids, concurrency, |id| api.delete_media(customer_id, id)).await;
    for failure in &report.failed {
        warn!(customer_id, media_id = failure.id, error = %failure.error, "media delete failed");
    }
    info!(
        customer_id,
        deleted = report.succeeded.len(),
        failed = report.failed.len(),
        "bulk media delete finished"
    );
    report
}

/// Fetch a ZIP of the given media and write it into `dir`. Returns the path
/// of the written archive.
#[instrument(skip(api, media_ids, dir), fields(count = media_ids.len()))]
pub async fn download_zip(
    api: &dyn ConsoleApi,
    customer_id: CustomerId,
    media_ids: &[MediaId],
    dir: &Path,
) -> ApiResult<PathBuf> {
    if media_ids.is_empty() {
        return Err(ApiError::InvalidInput("nothing selected to download".to_string()));
    }
    let download = api.download_media_zip(customer_id, media_ids).await?;
    if download.bytes.is_empty() {
        return Err(ApiError::Shape("ZIP download was empty".to_string()));
    }
    let file_name = download
        .file_name
        .unwrap_or_else(|| default_zip_name(customer_id));

    fs::create_dir_all(dir).await?;
    let target = unique_path(dir, &file_name).await;
    write_then_rename(&target, &download.bytes).await?;
    info!(customer_id, path = %target.display(), bytes = download.bytes.len(), "ZIP saved");
    Ok(target)
}

/// Write `bytes` next to `target` and move them into place. A failed write or
/// rename removes the partial file.
async fn write_then_rename(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = target.with_extension("zip.part");
    let written = match fs::write(&partial, bytes).await {
        Ok(()) => fs::rename(&partial, target).await,
        Err(err) => Err(err),
    };
    if let Err(err) = &written {
        if let Err(cleanup) = fs::remove_file(&partial).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), error = %cleanup, "could not remove partial download");
            }
        }
        warn!(path = %target.display(), error = %err, "saving download failed");
    }
    written
}

pub fn default_zip_name(customer_id: CustomerId) -> String {
    format!(
        "media-{}-{}.zip",
        customer_id,
        Utc::now().format("%Y%m%d%H%M%S")
    )
}

/// `dir/name`, or `dir/stem-N.ext` for the first N that does not exist yet.
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("download");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("zip");
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{}-{}.{}", stem, n, ext));
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn settle_all_keeps_input_order_and_failures() {
        let report = settle_all(&[1, 2, 3, 4], 2, |id| async move {
            // Later ids finish first.
            tokio::time::sleep(Duration::from_millis(40 - id * 10)).await;
            if id % 2 == 0 {
                Err(ApiError::Rejected(format!("no {}", id)))
            } else {
                Ok(())
            }
        })
        .await;
        assert_eq!(report.succeeded, vec![1, 3]);
        assert_eq!(report.failed_ids(), vec![2, 4]);
        assert_eq!(report.total(), 4);
        assert!(!report.is_complete_success());
    }

    #[tokio::test]
    async fn settle_all_respects_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ids: Vec<u64> = (0..8).collect();
        let report = settle_all(&ids, 3, |_| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;
        assert_eq!(report.succeeded.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn unique_path_avoids_overwrites() {
        let td = tempdir().unwrap();
        let first = unique_path(td.path(), "media.zip").await;
        assert_eq!(first, td.path().join("media.zip"));
        std::fs::write(&first, b"x").unwrap();
        let second = unique_path(td.path(), "media.zip").await;
        assert_eq!(second, td.path().join("media-1.zip"));
    }

    #[tokio::test]
    async fn failed_rename_removes_partial_file() {
        let td = tempdir().unwrap();
        // A non-empty directory in the way makes the final rename fail.
        let target = td.path().join("media.zip");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        assert!(write_then_rename(&target, b"PK").await.is_err());
        assert!(!td.path().join("media.zip.part").exists());
        assert!(target.is_dir());

        let ok = td.path().join("other.zip");
        write_then_rename(&ok, b"PK").await.unwrap();
        assert_eq!(std::fs::read(&ok).unwrap(), b"PK");
        assert!(!td.path().join("other.zip.part").exists());
    }

    #[test]
    fn default_zip_name_mentions_customer() {
        let name = default_zip_name(42);
        assert!(name.starts_with("media-42-"));
        assert!(name.ends_with(".zip"));
    }
}
