// ABOUTME: Validated CRUD services over tasks/crawlers/history plus the process composition root
// ABOUTME: Replaces the Python ServiceContainer singleton registry with one struct built at startup

mod composition;
mod crawler_service;
mod task_service;

pub use composition::AppServices;
pub use crawler_service::{CrawlerConfig, CrawlerService};
pub use task_service::{TaskHistoryView, TaskService, TaskWithCrawler};
