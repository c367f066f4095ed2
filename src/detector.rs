use crate::extractor::PostExtractor;
use crate::notifier::Notifier;
use crate::store::PostStore;
use crate::types::{MonitorError, Result};
use tracing::{debug, error, info, warn};

/// Outcome counts for one full pass over the watchlist.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Urls iterated, including ones that failed.
    pub checked: usize,
    /// Urls for which a new post was detected and recorded.
    pub new_posts: usize,
    /// Urls whose check failed (fetch or extraction error).
    pub failures: usize,
}

enum UrlOutcome {
    NewPost,
    Unchanged,
    NothingFound,
}

/// The change-detection loop: per watched url, fetch and extract the
/// latest post, compare its link against the persisted last-known value
/// and alert-then-record when it differs.
pub struct ChangeDetector<E, N> {
    store: PostStore,
    extractor: E,
    notifier: N,
}

impl<E: PostExtractor, N: Notifier> ChangeDetector<E, N> {
    pub fn new(store: PostStore, extractor: E, notifier: N) -> Self {
        Self {
            store,
            extractor,
            notifier,
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    /// Runs one pass over `urls` in order. Fetch and extraction failures
    /// are isolated to their url; store failures abort the pass.
    pub async fn run_pass(&self, urls: &[String]) -> Result<PassSummary> {
        let mut summary = PassSummary::default();

        for url in urls {
            summary.checked += 1;
            match self.check_url(url).await {
                Ok(UrlOutcome::NewPost) => summary.new_posts += 1,
                Ok(UrlOutcome::Unchanged) => debug!("No change for {}", url),
                Ok(UrlOutcome::NothingFound) => debug!("No post marker found on {}", url),
                Err(e @ MonitorError::Database(_)) => {
                    error!("Store failure during pass, aborting: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Check failed for {}: {}", url, e);
                    summary.failures += 1;
                }
            }
        }

        info!(
            "Pass complete: {} checked, {} new, {} failed",
            summary.checked, summary.new_posts, summary.failures
        );
        Ok(summary)
    }

    async fn check_url(&self, url: &str) -> Result<UrlOutcome> {
        // "Nothing found" skips the url entirely: no store read or write.
        let Some(post) = self.extractor.extract_latest(url).await? else {
            return Ok(UrlOutcome::NothingFound);
        };

        // New iff never seen, or the link differs. Comparison is on the
        // link only; a retitled post with the same link stays quiet.
        let last_known = self.store.get_last_known(url).await?;
        if last_known.as_deref() == Some(post.link.as_str()) {
            return Ok(UrlOutcome::Unchanged);
        }

        info!("New post at {}: {} ({})", url, post.title, post.link);

        // The record is updated even when the alert fails to send, so a
        // post can be marked seen without a delivered email. Accepted
        // inconsistency; see DESIGN.md.
        if let Err(e) = self.notifier.notify(url, &post.title, &post.link).await {
            error!("Alert for {} failed, recording post as seen anyway: {}", url, e);
        }
        self.store.set_last_known(url, &post.link).await?;

        Ok(UrlOutcome::NewPost)
    }
}
