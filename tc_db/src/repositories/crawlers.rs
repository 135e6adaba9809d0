//! ABOUTME: Crawler definition repository: validated CRUD plus active-crawler lookup
//! ABOUTME: A crawler's `module_name` is the registry key resolved by the Executor at dispatch

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};
use tc_core::{time::now_iso8601, Error, Result};

/// A named, versioned crawler definition. The on-disk config file is a sibling artifact
/// keyed by `config_file_name` (see the crawler-config-on-disk contract).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CrawlerRecord {
    pub id: i64,
    pub crawler_name: String,
    pub crawler_type: String,
    pub module_name: String,
    pub base_url: String,
    pub config_file_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCrawlerRequest {
    pub crawler_name: String,
    pub crawler_type: String,
    pub module_name: String,
    pub base_url: String,
    pub config_file_name: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCrawlerRequest {
    pub crawler_name: Option<String>,
    pub crawler_type: Option<String>,
    pub module_name: Option<String>,
    pub base_url: Option<String>,
    pub config_file_name: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_create(request: &CreateCrawlerRequest) -> Result<()> {
    if request.crawler_name.trim().is_empty() {
        return Err(Error::Validation("crawler_name must not be empty".into()));
    }
    if request.base_url.trim().is_empty() {
        return Err(Error::Validation("base_url must not be empty".into()));
    }
    if request.module_name.trim().is_empty() {
        return Err(Error::Validation("module_name must not be empty".into()));
    }
    Ok(())
}

pub async fn create<'e, E>(exec: E, request: CreateCrawlerRequest) -> Result<CrawlerRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    validate_create(&request)?;
    let now = now_iso8601();

    sqlx::query_as::<_, CrawlerRecord>(
        r#"
        INSERT INTO crawlers (crawler_name, crawler_type, module_name, base_url, config_file_name, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&request.crawler_name)
    .bind(&request.crawler_type)
    .bind(&request.module_name)
    .bind(&request.base_url)
    .bind(&request.config_file_name)
    .bind(request.is_active.unwrap_or(true))
    .bind(&now)
    .bind(&now)
    .fetch_one(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to create crawler: {e}")))
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> Result<Option<CrawlerRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CrawlerRecord>("SELECT * FROM crawlers WHERE id = ?")
        .bind(id)
        .fetch_optional(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to find crawler {id}: {e}")))
}

pub async fn find_by_name<'e, E>(exec: E, name: &str) -> Result<Option<CrawlerRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CrawlerRecord>("SELECT * FROM crawlers WHERE crawler_name = ?")
        .bind(name)
        .fetch_optional(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to find crawler '{name}': {e}")))
}

pub async fn list<'e, E>(exec: E) -> Result<Vec<CrawlerRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CrawlerRecord>("SELECT * FROM crawlers ORDER BY id")
        .fetch_all(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to list crawlers: {e}")))
}

pub async fn find_active<'e, E>(exec: E) -> Result<Vec<CrawlerRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, CrawlerRecord>("SELECT * FROM crawlers WHERE is_active = 1 ORDER BY id")
        .fetch_all(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to find active crawlers: {e}")))
}

pub async fn delete<'e, E>(exec: E, id: i64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM crawlers WHERE id = ?")
        .bind(id)
        .execute(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to delete crawler {id}: {e}")))?;
    Ok(())
}

pub async fn update<'e, E>(exec: E, id: i64, request: UpdateCrawlerRequest) -> Result<CrawlerRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let mut set_clauses: Vec<&str> = Vec::new();
    let mut query = String::from("UPDATE crawlers SET ");

    if request.crawler_name.is_some() {
        set_clauses.push("crawler_name = ?");
    }
    if request.crawler_type.is_some() {
        set_clauses.push("crawler_type = ?");
    }
    if request.module_name.is_some() {
        set_clauses.push("module_name = ?");
    }
    if request.base_url.is_some() {
        set_clauses.push("base_url = ?");
    }
    if request.config_file_name.is_some() {
        set_clauses.push("config_file_name = ?");
    }
    if request.is_active.is_some() {
        set_clauses.push("is_active = ?");
    }

    if set_clauses.is_empty() {
        return find_by_id(exec, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("crawler {id} not found")));
    }

    set_clauses.push("updated_at = ?");
    query.push_str(&set_clauses.join(", "));
    query.push_str(" WHERE id = ? RETURNING *");

    let mut q = sqlx::query_as::<_, CrawlerRecord>(&query);
    if let Some(v) = request.crawler_name {
        q = q.bind(v);
    }
    if let Some(v) = request.crawler_type {
        q = q.bind(v);
    }
    if let Some(v) = request.module_name {
        q = q.bind(v);
    }
    if let Some(v) = request.base_url {
        q = q.bind(v);
    }
    if let Some(v) = request.config_file_name {
        q = q.bind(v);
    }
    if let Some(v) = request.is_active {
        q = q.bind(v);
    }
    q = q.bind(now_iso8601());
    q = q.bind(id);

    q.fetch_one(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to update crawler {id}: {e}")))
}

pub struct CrawlerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CrawlerRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: CreateCrawlerRequest) -> Result<CrawlerRecord> {
        create(self.pool, request).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CrawlerRecord>> {
        find_by_id(self.pool, id).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<CrawlerRecord>> {
        find_by_name(self.pool, name).await
    }

    pub async fn list(&self) -> Result<Vec<CrawlerRecord>> {
        list(self.pool).await
    }

    pub async fn find_active(&self) -> Result<Vec<CrawlerRecord>> {
        find_active(self.pool).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        delete(self.pool, id).await
    }

    pub async fn update(&self, id: i64, request: UpdateCrawlerRequest) -> Result<CrawlerRecord> {
        update(self.pool, id, request).await
    }
}
