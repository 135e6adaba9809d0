// ABOUTME: Validated crawler-definition CRUD plus the on-disk crawler-config JSON contract
// ABOUTME: Config shape mirrors the crawler-config-on-disk contract: site_name/base_url/categories/...

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tc_core::{Error, Result};
use tc_db::repositories::crawlers;
use tc_db::{CrawlerRecord, CreateCrawlerRequest, Db, UpdateCrawlerRequest};
use tracing::instrument;

/// The crawler config-on-disk shape: `site_name`, `base_url`, `list_url_template`, a non-empty
/// `categories` map, `crawler_settings`, and an opaque `content_extraction` blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub site_name: String,
    pub base_url: String,
    pub list_url_template: String,
    pub categories: serde_json::Map<String, Value>,
    pub crawler_settings: CrawlerSettings,
    #[serde(default)]
    pub content_extraction: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerSettings {
    pub max_retries: i64,
    pub retry_delay: i64,
    pub timeout: i64,
}

/// Validates a crawler config document against the on-disk contract before it is persisted.
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<()> {
    if config.site_name.trim().is_empty() {
        return Err(Error::Validation("site_name must not be empty".into()));
    }
    if config.base_url.trim().is_empty() {
        return Err(Error::Validation("base_url must not be empty".into()));
    }
    if config.categories.is_empty() {
        return Err(Error::Validation("categories must not be empty".into()));
    }
    if config.crawler_settings.max_retries < 0 {
        return Err(Error::Validation("crawler_settings.max_retries must be >= 0".into()));
    }
    Ok(())
}

pub struct CrawlerService {
    db: Db,
}

impl CrawlerService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request, config))]
    pub async fn create_crawler(
        &self,
        request: CreateCrawlerRequest,
        config: &CrawlerConfig,
    ) -> Result<CrawlerRecord> {
        validate_crawler_config(config)?;
        crawlers::create(self.db.pool(), request).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_crawler(
        &self,
        crawler_id: i64,
        request: UpdateCrawlerRequest,
    ) -> Result<CrawlerRecord> {
        crawlers::update(self.db.pool(), crawler_id, request).await
    }

    /// Deleting a crawler cascades to the tasks that reference it only by database foreign-key
    /// constraint (ON DELETE RESTRICT by default) — callers must retire dependent tasks first.
    #[instrument(skip(self))]
    pub async fn delete_crawler(&self, crawler_id: i64) -> Result<()> {
        let in_use: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE crawler_id = ?")
            .bind(crawler_id)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        if in_use.0 > 0 {
            return Err(Error::Validation(format!(
                "crawler {crawler_id} is still referenced by {} task(s)",
                in_use.0
            )));
        }
        crawlers::delete(self.db.pool(), crawler_id).await
    }

    pub async fn get_crawler(&self, crawler_id: i64) -> Result<CrawlerRecord> {
        crawlers::find_by_id(self.db.pool(), crawler_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("crawler {crawler_id} not found")))
    }

    pub async fn list_crawlers(&self) -> Result<Vec<CrawlerRecord>> {
        crawlers::list(self.db.pool()).await
    }

    pub async fn list_active_crawlers(&self) -> Result<Vec<CrawlerRecord>> {
        crawlers::find_active(self.db.pool()).await
    }

    pub async fn toggle_active(&self, crawler_id: i64, is_active: bool) -> Result<CrawlerRecord> {
        crawlers::update(
            self.db.pool(),
            crawler_id,
            UpdateCrawlerRequest {
                is_active: Some(is_active),
                ..Default::default()
            },
        )
        .await
    }
}
