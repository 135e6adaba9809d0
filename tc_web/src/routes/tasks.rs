// ABOUTME: Task CRUD plus execute/cancel/status/history handlers — the Executor-facing surface
// ABOUTME: execute builds ScrapeOptions from the request body, defaulting to the task's own scrape_mode

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tc_crawlers::{ScrapeMode, ScrapeOptions};
use tc_db::{CreateTaskRequest, UpdateTaskRequest};

use crate::{error::ApiResult, models::ApiResponse, AppState};

#[utoipa::path(
    get,
    path = "/api/tasks",
    responses((status = 200, description = "Tasks listed")),
    tag = "tasks"
)]
pub async fn list_tasks(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let tasks = state.services.tasks.list_tasks().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("tasks listed", tasks)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task found"),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn get_task(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let task = state.services.tasks.get_task(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("task found", task)))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    responses(
        (status = 201, description = "Task created"),
        (status = 400, description = "Invalid task data"),
    ),
    tag = "tasks"
)]
pub async fn create_task(
    state: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let task = state.services.tasks.create_task(payload.into_inner()).await?;

    if task.is_auto && task.is_active {
        state.services.scheduler.add_or_update(task.id).await?;
    }

    Ok(HttpResponse::Created().json(ApiResponse::success("task created", task)))
}

pub async fn update_task(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<UpdateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let task = state.services.tasks.update_task(*id, payload.into_inner()).await?;

    if task.is_auto && task.is_active {
        state.services.scheduler.add_or_update(task.id).await?;
    } else {
        state.services.scheduler.remove(task.id).await?;
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success("task updated", task)))
}

pub async fn delete_task(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    state.services.scheduler.remove(*id).await.ok();
    state.services.tasks.delete_task(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok("task deleted")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteTaskPayload {
    /// Overrides the task's own `scrape_mode` for this one run. Defaults to the task's mode.
    pub mode: Option<String>,
    /// Fire-and-forget when `true` (the default); wait for the crawler's result when `false`.
    pub is_async: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/execute",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Execution started or completed"),
        (status = 409, description = "Task already running"),
    ),
    tag = "tasks"
)]
pub async fn execute_task(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: Option<web::Json<ExecuteTaskPayload>>,
) -> ApiResult<HttpResponse> {
    let task_id = *id;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();

    let mode = match payload.mode {
        Some(raw) => ScrapeMode::from_db_str(&raw).unwrap_or(ScrapeMode::FullScrape),
        None => {
            let task = state.services.tasks.get_task(task_id).await?;
            ScrapeMode::from_db_str(&task.task.scrape_mode).unwrap_or(ScrapeMode::FullScrape)
        }
    };
    let is_async = payload.is_async.unwrap_or(true);
    let options = ScrapeOptions { mode, ..ScrapeOptions::default() };

    let result = state.services.executor.execute(task_id, options, is_async).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("task execution started", result)))
}

pub async fn cancel_task(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let cancelled = state.services.executor.cancel(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("cancellation processed", cancelled)))
}

pub async fn task_status(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let status = state.services.executor.status(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("status fetched", status)))
}

pub async fn task_history(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let history = state.services.tasks.get_task_history(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("history fetched", history)))
}
