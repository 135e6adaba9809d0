// ABOUTME: App factory: mounts /api/{crawlers,tasks,scheduler} plus /healthz, /readyz, /docs
// ABOUTME: App factory wires routes, OpenAPI docs, and health/readiness onto one App

use actix_web::{dev::{ServiceFactory, ServiceRequest, ServiceResponse}, middleware::Logger, web, App, HttpResponse};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{routes, AppState};

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::crawlers::list_crawlers,
        routes::crawlers::get_crawler,
        routes::crawlers::create_crawler,
        routes::tasks::list_tasks,
        routes::tasks::get_task,
        routes::tasks::create_task,
        routes::tasks::execute_task,
        routes::scheduler::status,
    ),
    tags(
        (name = "crawlers", description = "Crawler definition CRUD"),
        (name = "tasks", description = "Task CRUD and execution control"),
        (name = "scheduler", description = "Persistent scheduling control"),
    )
)]
struct ApiDoc;

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    if state.services.readiness.is_ready() {
        HttpResponse::Ok().json(json!({ "status": "ready" }))
    } else {
        HttpResponse::ServiceUnavailable().json(json!({ "status": "not ready" }))
    }
}

pub fn create_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
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
        .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/crawlers")
                        .route("", web::get().to(routes::crawlers::list_crawlers))
                        .route("", web::post().to(routes::crawlers::create_crawler))
                        .route("/active", web::get().to(routes::crawlers::list_active_crawlers))
                        .route("/{id}", web::get().to(routes::crawlers::get_crawler))
                        .route("/{id}", web::put().to(routes::crawlers::update_crawler))
                        .route("/{id}", web::delete().to(routes::crawlers::delete_crawler))
                        .route("/{id}/toggle", web::post().to(routes::crawlers::toggle_crawler)),
                )
                .service(
                    web::scope("/tasks")
                        .route("", web::get().to(routes::tasks::list_tasks))
                        .route("", web::post().to(routes::tasks::create_task))
                        .route("/{id}", web::get().to(routes::tasks::get_task))
                        .route("/{id}", web::put().to(routes::tasks::update_task))
                        .route("/{id}", web::delete().to(routes::tasks::delete_task))
                        .route("/{id}/execute", web::post().to(routes::tasks::execute_task))
                        .route("/{id}/cancel", web::post().to(routes::tasks::cancel_task))
                        .route("/{id}/status", web::get().to(routes::tasks::task_status))
                        .route("/{id}/history", web::get().to(routes::tasks::task_history)),
                )
                .service(
                    web::scope("/scheduler")
                        .route("/status", web::get().to(routes::scheduler::status))
                        .route("/start", web::post().to(routes::scheduler::start))
                        .route("/stop", web::post().to(routes::scheduler::stop))
                        .route("/reload", web::post().to(routes::scheduler::reload))
                        .route("/jobs", web::get().to(routes::scheduler::jobs)),
                ),
        )
}
