// ABOUTME: Scheduler control handlers — status/start/stop/reload/jobs
// ABOUTME: A thin pass-through onto tc_scheduler::TaskScheduler; no domain logic lives here

use actix_web::{web, HttpResponse};

use crate::{error::ApiResult, models::ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/scheduler/status",
    responses((status = 200, description = "Scheduler status")),
    tag = "scheduler"
)]
pub async fn status(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let status = state.services.scheduler.status().await;
    Ok(HttpResponse::Ok().json(ApiResponse::success("scheduler status", status)))
}

pub async fn start(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let report = state.services.scheduler.start().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("scheduler started", report)))
}

pub async fn stop(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    state.services.scheduler.stop().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok("scheduler stopped")))
}

pub async fn reload(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let report = state.services.scheduler.reload().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("scheduler reloaded", report)))
}

pub async fn jobs(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let jobs = state.services.scheduler.persisted_jobs().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("persisted jobs", jobs)))
}
