use anyhow::Context;
use async_trait::async_trait;
use post_monitor::{
    ChangeDetector, ExtractedPost, MonitorError, Notifier, PostExtractor, PostStore, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted extractor: each url is mapped to a fixed response, which the
/// test can reprogram between passes.
#[derive(Clone, Default)]
struct MockExtractor {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
}

#[derive(Clone)]
enum MockResponse {
    Post(&'static str, &'static str),
    Nothing,
    FetchError,
}

impl MockExtractor {
    fn set(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }
}

#[async_trait]
impl PostExtractor for MockExtractor {
    async fn extract_latest(&self, url: &str) -> Result<Option<ExtractedPost>> {
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(MockResponse::Nothing);

        match response {
            MockResponse::Post(title, link) => Ok(Some(ExtractedPost {
                title: title.to_string(),
                link: link.to_string(),
            })),
            MockResponse::Nothing => Ok(None),
            MockResponse::FetchError => Err(MonitorError::HttpStatus {
                url: url.to_string(),
                status: 503,
            }),
        }
    }
}

/// Records every alert; can be told to fail each send.
#[derive(Clone, Default)]
struct MockNotifier {
    sent: Arc<Mutex<Vec<(String, String, String)>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, url: &str, title: &str, link: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MonitorError::Config("smtp down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), title.to_string(), link.to_string()));
        Ok(())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    detector: ChangeDetector<MockExtractor, MockNotifier>,
    extractor: MockExtractor,
    notifier: MockNotifier,
}

async fn harness() -> anyhow::Result<Harness> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("monitor.db");
    let store = PostStore::connect(db_path.to_str().context("db path not utf-8")?).await?;
    store.initialize().await?;

    let extractor = MockExtractor::default();
    let notifier = MockNotifier::default();
    let detector = ChangeDetector::new(store, extractor.clone(), notifier.clone());

    Ok(Harness {
        _dir: dir,
        detector,
        extractor,
        notifier,
    })
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

const BLOG: &str = "https://a.example/blog";

#[tokio::test]
async fn first_extraction_notifies_and_records() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));

    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;
    assert_eq!(summary.new_posts, 1);
    assert_eq!(summary.failures, 0);

    assert_eq!(
        h.notifier.sent(),
        vec![(
            BLOG.to_string(),
            "Post 1".to_string(),
            "https://a.example/blog/p1".to_string()
        )]
    );
    assert_eq!(
        h.detector.store().get_last_known(BLOG).await?,
        Some("https://a.example/blog/p1".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn unchanged_link_is_silent() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));

    h.detector.run_pass(&urls(&[BLOG])).await?;
    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;

    assert_eq!(summary.new_posts, 0);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.detector.store().all_records().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn changed_link_notifies_and_overwrites() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));
    h.detector.run_pass(&urls(&[BLOG])).await?;

    h.extractor
        .set(BLOG, MockResponse::Post("Post 2", "https://a.example/blog/p2"));
    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;

    assert_eq!(summary.new_posts, 1);
    assert_eq!(h.notifier.sent().len(), 2);
    assert_eq!(h.notifier.sent()[1].1, "Post 2");

    let records = h.detector.store().all_records().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].last_known_post, "https://a.example/blog/p2");
    Ok(())
}

#[tokio::test]
async fn retitled_post_with_same_link_is_silent() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));
    h.detector.run_pass(&urls(&[BLOG])).await?;

    h.extractor.set(
        BLOG,
        MockResponse::Post("Post 1 (updated)", "https://a.example/blog/p1"),
    );
    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;

    assert_eq!(summary.new_posts, 0);
    assert_eq!(h.notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn nothing_found_touches_nothing() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor.set(BLOG, MockResponse::Nothing);

    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;

    assert_eq!(summary.new_posts, 0);
    assert_eq!(summary.failures, 0);
    assert!(h.notifier.sent().is_empty());
    assert!(h.detector.store().all_records().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn nothing_found_leaves_existing_record_alone() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));
    h.detector.run_pass(&urls(&[BLOG])).await?;

    h.extractor.set(BLOG, MockResponse::Nothing);
    h.detector.run_pass(&urls(&[BLOG])).await?;

    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(
        h.detector.store().get_last_known(BLOG).await?,
        Some("https://a.example/blog/p1".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn fetch_failure_is_isolated_to_its_url() -> anyhow::Result<()> {
    let h = harness().await?;
    let broken = "https://broken.example/blog";
    h.extractor.set(broken, MockResponse::FetchError);
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));

    // Failing url comes first in file order.
    let summary = h.detector.run_pass(&urls(&[broken, BLOG])).await?;

    assert_eq!(summary.checked, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.new_posts, 1);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.notifier.sent()[0].0, BLOG);

    let records = h.detector.store().all_records().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, BLOG);
    Ok(())
}

#[tokio::test]
async fn failed_alert_still_records_the_post() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));
    h.notifier.fail.store(true, Ordering::SeqCst);

    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;

    assert_eq!(summary.new_posts, 1);
    assert!(h.notifier.sent().is_empty());
    assert_eq!(
        h.detector.store().get_last_known(BLOG).await?,
        Some("https://a.example/blog/p1".to_string())
    );

    // The post is already marked seen, so a later healthy pass stays
    // quiet: the alert is lost for good.
    h.notifier.fail.store(false, Ordering::SeqCst);
    let summary = h.detector.run_pass(&urls(&[BLOG])).await?;
    assert_eq!(summary.new_posts, 0);
    assert!(h.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_urls_are_tolerated() -> anyhow::Result<()> {
    let h = harness().await?;
    h.extractor
        .set(BLOG, MockResponse::Post("Post 1", "https://a.example/blog/p1"));

    let summary = h.detector.run_pass(&urls(&[BLOG, BLOG])).await?;

    // The first occurrence records the link, the second sees it as known.
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.new_posts, 1);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.detector.store().all_records().await?.len(), 1);
    Ok(())
}
