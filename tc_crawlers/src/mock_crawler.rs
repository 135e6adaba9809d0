// ABOUTME: Deterministic crawler used by TestCrawler and by executor/scheduler integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{Crawler, CrawlResult, GlobalParams, ScrapeOptions};

/// Never hits the network. Always succeeds unless `fail_with` is set, and honors cancellation
/// via a shared flag so executor tests can exercise the cancel path deterministically.
pub struct MockCrawler {
    module_name: String,
    fail_with: Option<String>,
    cancelled: Arc<AtomicBool>,
    last_global_params: Mutex<GlobalParams>,
}

impl MockCrawler {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            fail_with: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            last_global_params: Mutex::new(GlobalParams::default()),
        }
    }

    pub fn failing(module_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new(module_name)
        }
    }

    pub async fn last_global_params(&self) -> GlobalParams {
        *self.last_global_params.lock().await
    }
}

#[async_trait]
impl Crawler for MockCrawler {
    fn module_name(&self) -> &str {
        &self.module_name
    }

    async fn execute_task(&self, _task_id: i64, options: &ScrapeOptions) -> tc_core::Result<CrawlResult> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Ok(CrawlResult::ok("cancelled before start", 0));
        }
        if let Some(message) = &self.fail_with {
            return Ok(CrawlResult::failed(message.clone()));
        }
        let articles_count = match options.mode {
            crate::ScrapeMode::LinksOnly => 0,
            crate::ScrapeMode::ContentOnly | crate::ScrapeMode::FullScrape => {
                options.num_articles.min(options.max_pages) as i64
            }
        };
        Ok(CrawlResult::ok("mock crawl complete", articles_count))
    }

    async fn cancel_task(&self, _task_id: i64, params: GlobalParams) -> bool {
        *self.last_global_params.lock().await = params;
        self.cancelled.store(true, Ordering::SeqCst);
        true
    }
}
