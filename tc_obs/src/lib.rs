//! ABOUTME: Health and readiness endpoints
//! ABOUTME: Ambient observability surface, carried regardless of domain Non-goals

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App, HttpResponse, HttpServer, Result as ActixResult,
};
use serde_json::json;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tc_core::Result;

/// Readiness gate the composition root flips once the Scheduler and Executor are wired up.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state for observability endpoints.
#[derive(Debug, Clone, Default)]
pub struct ObsState {
    pub readiness: ReadinessGate,
}

impl ObsState {
    pub fn new() -> Self {
        Self {
            readiness: ReadinessGate::new(),
        }
    }
}

async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

async fn readiness(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    if state.readiness.is_ready() {
        Ok(HttpResponse::Ok().json(json!({ "status": "ready" })))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(json!({ "status": "not ready" })))
    }
}

/// Builds the observability `App` factory, mountable standalone or merged into the main server.
pub fn create_service(
    state: ObsState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Logger::default())
        .route("/healthz", web::get().to(health))
        .route("/readyz", web::get().to(readiness))
}

/// Runs a standalone observability server, used when the REST surface is disabled.
pub async fn start_server(bind_addr: &str, state: ObsState) -> Result<()> {
    tracing::info!(bind_addr, "starting observability server");

    HttpServer::new(move || create_service(state.clone()))
        .bind(bind_addr)
        .map_err(|e| tc_core::Error::Config(format!("failed to bind server: {e}")))?
        .run()
        .await
        .map_err(|e| tc_core::Error::Config(format!("server error: {e}")))?;

    Ok(())
}
