// ABOUTME: Generic HTTP crawler: fetches a configured start URL and extracts links/titles

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::sync::RwLock;
use url::Url;

use crate::{Crawler, CrawlResult, GlobalParams, ScrapeMode, ScrapeOptions};

/// Fetches `start_url`, walks anchor tags found on the page, and for `ContentOnly`/`FullScrape`
/// fetches each linked page's `<title>` as a stand-in for full article extraction. No site-config
/// format is specified beyond a start URL, so richer per-site scraping is left to future crawlers
/// registered under their own `module_name`.
pub struct HttpCrawler {
    module_name: String,
    start_url: Url,
    client: reqwest::Client,
    cancelled: Arc<RwLock<bool>>,
}

impl HttpCrawler {
    pub fn new(module_name: impl Into<String>, start_url: Url) -> Self {
        Self {
            module_name: module_name.into(),
            start_url,
            client: reqwest::Client::new(),
            cancelled: Arc::new(RwLock::new(false)),
        }
    }

    async fn is_cancelled(&self) -> bool {
        *self.cancelled.read().await
    }

    fn extract_links(base: &Url, body: &str) -> Vec<Url> {
        let document = Html::parse_document(body);
        let selector = Selector::parse("a[href]").expect("static selector is valid");
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| base.join(href).ok())
            .collect()
    }

    async fn fetch_title(&self, url: &Url) -> Option<String> {
        let body = self.client.get(url.clone()).send().await.ok()?.text().await.ok()?;
        let document = Html::parse_document(&body);
        let selector = Selector::parse("title").ok()?;
        document.select(&selector).next().map(|el| el.text().collect::<String>())
    }
}

#[async_trait]
impl Crawler for HttpCrawler {
    fn module_name(&self) -> &str {
        &self.module_name
    }

    async fn execute_task(&self, task_id: i64, options: &ScrapeOptions) -> tc_core::Result<CrawlResult> {
        *self.cancelled.write().await = false;

        let client = self
            .client
            .get(self.start_url.clone())
            .timeout(Duration::from_secs(options.timeout_secs));

        let response = client.send().await.map_err(|e| {
            tc_core::Error::Crawler(format!("task {task_id}: failed to fetch {}: {e}", self.start_url))
        })?;

        if !response.status().is_success() {
            return Ok(CrawlResult::failed(format!(
                "task {task_id}: {} returned status {}",
                self.start_url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| tc_core::Error::Crawler(format!("task {task_id}: failed to read body: {e}")))?;

        let links = Self::extract_links(&self.start_url, &body);
        let page_links: Vec<Url> = links.into_iter().take(options.max_pages as usize).collect();

        if options.mode == ScrapeMode::LinksOnly {
            return Ok(CrawlResult::ok(
                format!("collected {} links", page_links.len()),
                0,
            ));
        }

        let mut articles_count = 0i64;
        for link in page_links.iter().take(options.num_articles as usize) {
            if self.is_cancelled().await {
                return Ok(CrawlResult::ok(
                    format!("cancelled after {articles_count} articles"),
                    articles_count,
                ));
            }
            if self.fetch_title(link).await.is_some() {
                articles_count += 1;
            }
        }

        Ok(CrawlResult::ok(
            format!("fetched {articles_count} articles in {:?} mode", options.mode),
            articles_count,
        ))
    }

    async fn cancel_task(&self, _task_id: i64, _params: GlobalParams) -> bool {
        let mut cancelled = self.cancelled.write().await;
        if *cancelled {
            return false;
        }
        *cancelled = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_links_resolves_relative_hrefs_against_base() {
        let base = Url::parse("https://example.com/index.html").unwrap();
        let body = r#"<html><body><a href="/a">a</a><a href="https://other.com/b">b</a></body></html>"#;
        let links = HttpCrawler::extract_links(&base, body);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].as_str(), "https://example.com/a");
        assert_eq!(links[1].as_str(), "https://other.com/b");
    }

    #[tokio::test]
    async fn cancel_task_is_idempotent() {
        let crawler = HttpCrawler::new("http_demo", Url::parse("https://example.com").unwrap());
        assert!(crawler.cancel_task(1, GlobalParams::default()).await);
        assert!(!crawler.cancel_task(1, GlobalParams::default()).await);
    }
}
