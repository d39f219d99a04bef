use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of the download stage
pub struct FetchSummary {
    pub expected: usize,
    pub succeeded: usize,
}

/// One transfer. Implementations report success per URL so the stage can
/// tolerate partial batches; only a batch with zero successes is fatal.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> bool;
}

/// Downloads with wget, using the flags the pipeline has always used
pub struct WgetFetcher;

#[async_trait]
impl Fetcher for WgetFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> bool {
        let mut cmd = Command::new("wget");
        cmd.arg("-q")
            .arg(format!("--directory-prefix={}", dest.display()))
            .arg("--continue")
            .arg("--no-clobber")
            .arg("--tries=10")
            .arg("--no-check-certificate")
            .arg(url)
            .kill_on_drop(true);

        match cmd.status().await {
            Ok(status) => status.success(),
            Err(err) => {
                warn!("Can't spawn wget for {url}: {err}");
                false
            }
        }
    }
}

/// Fetch every URL with at most `workers` transfers in flight.
///
/// Individual failures are logged and counted, never propagated; the
/// caller decides what a partial batch means.
pub async fn download_all(
    fetcher: Arc<dyn Fetcher>,
    urls: &[String],
    dest: &Path,
    workers: usize,
) -> FetchSummary {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut transfers = JoinSet::new();

    for url in urls {
        let fetcher = Arc::clone(&fetcher);
        let semaphore = Arc::clone(&semaphore);
        let url = url.clone();
        let dest: PathBuf = dest.to_path_buf();
        transfers.spawn(async move {
            let _permit = semaphore.acquire().await.expect("Semaphore open");
            let ok = fetcher.fetch(&url, &dest).await;
            if !ok {
                warn!("Download failed: {url}");
            }
            ok
        });
    }

    let mut succeeded = 0;
    while let Some(joined) = transfers.join_next().await {
        match joined {
            Ok(true) => succeeded += 1,
            Ok(false) => {}
            Err(err) => warn!("Download task panicked: {err}"),
        }
    }

    FetchSummary { expected: urls.len(), succeeded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many transfers run at once
    struct CountingFetcher {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _url: &str, _dest: &Path) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            true
        }
    }

    /// Fails every URL containing "bad"
    struct FlakyFetcher;

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, url: &str, _dest: &Path) -> bool {
            !url.contains("bad")
        }
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn parallelism_is_bounded_by_the_worker_count() {
        let fetcher = Arc::new(CountingFetcher {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let dest = tempfile::tempdir().unwrap();

        let summary = download_all(
            fetcher.clone(),
            &urls(&["a", "b", "c", "d", "e", "f"]),
            dest.path(),
            2,
        )
        .await;

        assert_eq!(summary.succeeded, 6);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn failures_are_counted_not_propagated() {
        let dest = tempfile::tempdir().unwrap();
        let summary = download_all(
            Arc::new(FlakyFetcher),
            &urls(&["http://ok/1", "http://bad/2", "http://ok/3"]),
            dest.path(),
            4,
        )
        .await;

        assert_eq!(summary.expected, 3);
        assert_eq!(summary.succeeded, 2);
    }

    #[tokio::test]
    async fn empty_url_set_reports_zero_expected() {
        let dest = tempfile::tempdir().unwrap();
        let summary = download_all(Arc::new(FlakyFetcher), &[], dest.path(), 4).await;
        assert_eq!(summary.expected, 0);
        assert_eq!(summary.succeeded, 0);
    }
}
