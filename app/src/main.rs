// ABOUTME: Process entrypoint: load config, open the database, wire the registry and
// ABOUTME: composition root, then serve the REST surface until shutdown is requested

use std::process;
use std::sync::Arc;

use actix_web::HttpServer;
use tc_config::Config;
use tc_core::telemetry;
use tc_crawlers::{CrawlerRegistry, HttpCrawler};
use tc_db::Db;
use tc_service::AppServices;
use tc_web::AppState;

#[tokio::main]
async fn main() {
    telemetry::init_tracing("development", "crate-orchestrator");

    let config = match Config::load() {
        Ok(config) => {
            tracing::debug!(?config, "configuration loaded");
            config
        }
        Err(e) => {
            tracing::error!("failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let db = match Db::new(&config.database.path).await {
        Ok(db) => {
            tracing::info!("database initialized");
            db
        }
        Err(e) => {
            tracing::error!("failed to initialize database: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = db.health_check().await {
        tracing::error!("database health check failed: {e}");
        process::exit(1);
    }

    let registry = match build_registry(&db).await {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("failed to build crawler registry: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(config, db, registry).await {
        tracing::error!("server exited with error: {e}");
        process::exit(1);
    }
}

/// Registers one `HttpCrawler` per known crawler definition, keyed by `module_name`. A
/// definition whose `base_url` doesn't parse is skipped rather than aborting startup,
/// since a single bad row shouldn't take the whole process down.
async fn build_registry(db: &Db) -> tc_core::Result<CrawlerRegistry> {
    let mut registry = CrawlerRegistry::new();
    let crawlers = tc_db::repositories::crawlers::list(db.pool()).await?;

    for crawler in crawlers {
        match url::Url::parse(&crawler.base_url) {
            Ok(start_url) => {
                tracing::info!(module_name = %crawler.module_name, "registering crawler");
                registry.register(Arc::new(HttpCrawler::new(crawler.module_name, start_url)));
            }
            Err(e) => {
                tracing::warn!(
                    module_name = %crawler.module_name,
                    base_url = %crawler.base_url,
                    "skipping crawler with unparsable base_url: {e}"
                );
            }
        }
    }

    Ok(registry)
}

async fn run(config: Config, db: Db, registry: CrawlerRegistry) -> tc_core::Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let services = Arc::new(AppServices::build(&config, db, registry).await?);
    services.start().await?;
    tracing::info!(%bind_addr, "crate-orchestrator starting");

    let state = AppState::new(services.clone());
    let server = HttpServer::new(move || tc_web::create_app(state.clone()))
        .bind(&bind_addr)
        .map_err(tc_core::Error::Io)?
        .run();

    let result = tokio::select! {
        res = server => res.map_err(tc_core::Error::Io),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    };

    services.shutdown().await?;
    result
}
