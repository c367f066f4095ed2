use crate::types::{ExtractedPost, MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Fetches a watched page and extracts its latest post, or signals that
/// the marker was not found. `Ok(None)` is "nothing found", never an error.
#[async_trait]
pub trait PostExtractor: Send + Sync {
    async fn extract_latest(&self, url: &str) -> Result<Option<ExtractedPost>>;
}

/// Extractor that GETs the page and applies a single CSS extraction rule:
/// the first element matching the configured heading selector is the
/// latest post's title, and the nearest enclosing anchor provides the link.
///
/// The same rule is applied to every watched url. Sites rarely share
/// markup, so multi-site lists likely need per-url rules; see DESIGN.md.
pub struct HttpExtractor {
    client: Client,
    heading_selector: Selector,
}

impl HttpExtractor {
    pub fn new(heading_selector: &str) -> Result<Self> {
        let heading_selector = Selector::parse(heading_selector).map_err(|e| {
            MonitorError::Config(format!("invalid selector {heading_selector:?}: {e}"))
        })?;

        // No request timeout: an unresponsive endpoint stalls the pass.
        // Accepted limitation of the sequential design.
        let client = Client::builder()
            .user_agent("post-monitor/0.1")
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            heading_selector,
        })
    }

    /// Applies the extraction rule to already-fetched HTML.
    pub fn extract_from_html(&self, page_url: &str, html: &str) -> Result<Option<ExtractedPost>> {
        let document = Html::parse_document(html);

        let Some(heading) = document.select(&self.heading_selector).next() else {
            return Ok(None);
        };

        let title = heading.text().collect::<String>().trim().to_string();

        let Some(href) = enclosing_link(heading) else {
            debug!("Matched heading on {} has no enclosing link", page_url);
            return Ok(None);
        };

        // Stored and compared as the resolved absolute form so a site
        // switching between relative and absolute hrefs does not re-alert.
        let link = Url::parse(page_url)?.join(&href)?.to_string();

        Ok(Some(ExtractedPost { title, link }))
    }
}

#[async_trait]
impl PostExtractor for HttpExtractor {
    async fn extract_latest(&self, url: &str) -> Result<Option<ExtractedPost>> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        self.extract_from_html(url, &body)
    }
}

/// Walks up from the matched heading to the nearest `<a>` ancestor and
/// returns its href, if any.
fn enclosing_link(element: ElementRef<'_>) -> Option<String> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a")
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}
