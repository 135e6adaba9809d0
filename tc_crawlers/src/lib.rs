// ABOUTME: Crawler trait consumed by the Executor, plus a startup-time registry
// ABOUTME: Ships an HTTP-backed crawler and a deterministic mock used by tests/TestCrawler

mod http_crawler;
mod mock_crawler;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http_crawler::HttpCrawler;
pub use mock_crawler::MockCrawler;

/// Mirrors the DB's `task_status`/`scrape_mode` string columns so crawlers never see raw
/// strings. `tc_db` keeps its own `String` columns; conversion happens at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrapeMode {
    LinksOnly,
    ContentOnly,
    FullScrape,
}

impl ScrapeMode {
    pub fn as_db_str(self) -> &'static str {
        match self {
            ScrapeMode::LinksOnly => "LINKS_ONLY",
            ScrapeMode::ContentOnly => "CONTENT_ONLY",
            ScrapeMode::FullScrape => "FULL_SCRAPE",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "LINKS_ONLY" => Some(ScrapeMode::LinksOnly),
            "CONTENT_ONLY" => Some(ScrapeMode::ContentOnly),
            "FULL_SCRAPE" => Some(ScrapeMode::FullScrape),
            _ => None,
        }
    }
}

/// Replaces the opaque `task_args`/`**kwargs` dict the original executor passed through to
/// crawlers. Every field the distilled operations (`CollectLinksOnly`, `FetchContentOnly`,
/// `FetchFullArticle`, `TestCrawler`) set is named here instead of stringly-keyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOptions {
    pub mode: ScrapeMode,
    pub max_pages: u32,
    pub num_articles: u32,
    pub ai_only: bool,
    pub save_to_csv: bool,
    pub save_to_database: bool,
    pub save_partial_results_on_cancel: bool,
    pub save_partial_to_database: bool,
    pub timeout_secs: u64,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            mode: ScrapeMode::FullScrape,
            max_pages: 10,
            num_articles: 20,
            ai_only: false,
            save_to_csv: false,
            save_to_database: true,
            save_partial_results_on_cancel: false,
            save_partial_to_database: false,
            timeout_secs: 120,
        }
    }
}

impl ScrapeOptions {
    pub fn links_only() -> Self {
        Self {
            mode: ScrapeMode::LinksOnly,
            ..Self::default()
        }
    }

    pub fn content_only() -> Self {
        Self {
            mode: ScrapeMode::ContentOnly,
            ..Self::default()
        }
    }

    pub fn full_article() -> Self {
        Self {
            mode: ScrapeMode::FullScrape,
            ..Self::default()
        }
    }

    /// Forced dry-run shape for `TestCrawler`: links-only, capped pages/articles, no persistence,
    /// bounded timeout. Mirrors `task_executor_service.py::test_crawler`'s parameter clamping.
    pub fn test_dry_run() -> Self {
        Self {
            mode: ScrapeMode::LinksOnly,
            max_pages: 1,
            num_articles: 5,
            ai_only: false,
            save_to_csv: false,
            save_to_database: false,
            save_partial_results_on_cancel: false,
            save_partial_to_database: false,
            timeout_secs: 30,
        }
    }
}

/// Cancellation-time hints a crawler reads out of its own `global_params`. The executor writes
/// these just before calling `cancel_task` so an in-flight crawler can decide whether to persist
/// whatever it already collected.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GlobalParams {
    pub save_partial_results_on_cancel: bool,
    pub save_partial_to_database: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub success: bool,
    pub message: String,
    pub articles_count: i64,
}

impl CrawlResult {
    pub fn ok(message: impl Into<String>, articles_count: i64) -> Self {
        Self {
            success: true,
            message: message.into(),
            articles_count,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            articles_count: 0,
        }
    }
}

/// The interface the Executor consumes (SPEC_FULL §4.2 Crawler Interface). Implementations are
/// registered by `module_name` at startup — there is no runtime class-loading, unlike the Python
/// original's `__import__`-based `CrawlerFactory`.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Stable name this crawler is registered under (matches `crawlers.module_name` in the DB).
    fn module_name(&self) -> &str;

    async fn execute_task(&self, task_id: i64, options: &ScrapeOptions) -> tc_core::Result<CrawlResult>;

    /// Best-effort cooperative cancellation. Returns `true` if cancellation was accepted
    /// (the crawler will stop at its next checkpoint), `false` if there was nothing to cancel.
    async fn cancel_task(&self, task_id: i64, params: GlobalParams) -> bool;

    /// Optional point-in-time progress readout, 0-100. Crawlers that don't track sub-progress
    /// return `None` and the Executor falls back to the elapsed-time heuristic (SPEC_FULL §4.2).
    async fn progress(&self, _task_id: i64) -> Option<u8> {
        None
    }
}

/// Startup-registered table of crawlers keyed by `module_name`, replacing the Python original's
/// dynamic `__import__(module_name)` dispatch (`crawler_factory.py::CrawlerFactory`).
#[derive(Clone, Default)]
pub struct CrawlerRegistry {
    crawlers: HashMap<String, Arc<dyn Crawler>>,
}

impl CrawlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, crawler: Arc<dyn Crawler>) {
        self.crawlers.insert(crawler.module_name().to_string(), crawler);
    }

    pub fn get(&self, module_name: &str) -> Option<Arc<dyn Crawler>> {
        self.crawlers.get(module_name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.crawlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_mode_round_trips_through_db_string() {
        for mode in [ScrapeMode::LinksOnly, ScrapeMode::ContentOnly, ScrapeMode::FullScrape] {
            assert_eq!(ScrapeMode::from_db_str(mode.as_db_str()), Some(mode));
        }
        assert_eq!(ScrapeMode::from_db_str("NONSENSE"), None);
    }

    #[test]
    fn test_dry_run_clamps_pages_and_disables_persistence() {
        let opts = ScrapeOptions::test_dry_run();
        assert_eq!(opts.mode, ScrapeMode::LinksOnly);
        assert_eq!(opts.max_pages, 1);
        assert_eq!(opts.num_articles, 5);
        assert!(!opts.save_to_csv);
        assert!(!opts.save_to_database);
        assert_eq!(opts.timeout_secs, 30);
    }

    #[tokio::test]
    async fn registry_looks_up_by_module_name() {
        let mut registry = CrawlerRegistry::new();
        registry.register(Arc::new(MockCrawler::new("demo_crawler")));

        assert!(registry.get("demo_crawler").is_some());
        assert!(registry.get("missing_crawler").is_none());
        assert_eq!(registry.names(), vec!["demo_crawler".to_string()]);
    }
}
