// ABOUTME: Crawler definition CRUD handlers — list/get/active/create/update/delete/toggle
// ABOUTME: Crawler definition CRUD plus the active-list and toggle-active endpoints

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tc_db::{CreateCrawlerRequest, UpdateCrawlerRequest};
use tc_service::CrawlerService;
use tracing::info;

use crate::{error::ApiResult, models::ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateCrawlerPayload {
    #[serde(flatten)]
    pub crawler: CreateCrawlerRequest,
    pub config: tc_service::CrawlerConfig,
}

#[utoipa::path(
    get,
    path = "/api/crawlers",
    responses((status = 200, description = "Crawlers listed")),
    tag = "crawlers"
)]
pub async fn list_crawlers(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let crawlers = service(&state).list_crawlers().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("crawlers listed", crawlers)))
}

pub async fn list_active_crawlers(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let crawlers = service(&state).list_active_crawlers().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("active crawlers listed", crawlers)))
}

#[utoipa::path(
    get,
    path = "/api/crawlers/{id}",
    params(("id" = i64, Path, description = "Crawler id")),
    responses(
        (status = 200, description = "Crawler found"),
        (status = 404, description = "Crawler not found"),
    ),
    tag = "crawlers"
)]
pub async fn get_crawler(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let crawler = service(&state).get_crawler(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("crawler found", crawler)))
}

#[utoipa::path(
    post,
    path = "/api/crawlers",
    responses(
        (status = 201, description = "Crawler created"),
        (status = 400, description = "Invalid crawler config"),
    ),
    tag = "crawlers"
)]
pub async fn create_crawler(
    state: web::Data<AppState>,
    payload: web::Json<CreateCrawlerPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    info!(crawler_name = %payload.crawler.crawler_name, "creating crawler");
    let crawler = service(&state)
        .create_crawler(payload.crawler, &payload.config)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("crawler created", crawler)))
}

pub async fn update_crawler(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<UpdateCrawlerRequest>,
) -> ApiResult<HttpResponse> {
    let crawler = service(&state).update_crawler(*id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("crawler updated", crawler)))
}

pub async fn delete_crawler(state: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    service(&state).delete_crawler(*id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok("crawler deleted")))
}

#[derive(Debug, Deserialize)]
pub struct ToggleCrawlerPayload {
    pub is_active: bool,
}

pub async fn toggle_crawler(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    payload: web::Json<ToggleCrawlerPayload>,
) -> ApiResult<HttpResponse> {
    let crawler = service(&state).toggle_active(*id, payload.is_active).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("crawler toggled", crawler)))
}

fn service(state: &AppState) -> &CrawlerService {
    &state.services.crawlers
}
