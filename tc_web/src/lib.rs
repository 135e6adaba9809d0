// ABOUTME: Thin REST surface over tc_service: AppState + route/handler wiring
// ABOUTME: Scoped to crawler/task/scheduler CRUD, execution control, and health checks

pub mod error;
pub mod models;
pub mod routes;
pub mod routing;


use std::sync::Arc;
use tc_service::AppServices;

/// Shared state every handler receives via `web::Data`. One `AppState` per process, cloned
/// cheaply (an `Arc` around the composition root) into each worker thread actix-web spawns.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<AppServices>,
}

impl AppState {
    pub fn new(services: Arc<AppServices>) -> Self {
        Self { services }
    }
}

pub use routing::create_app;
