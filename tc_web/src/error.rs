// ABOUTME: Maps tc_core::Error onto the {success,message} envelope and an HTTP status code
// ABOUTME: Maps tc_core::Error into an HTTP status code plus the flat JSON envelope

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::models::ApiResponse;

/// Wraps a `tc_core::Error` with the status code the REST surface should report for it.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, detail)
    }

    pub fn unsupported_media_type(detail: impl Into<String>) -> Self {
        Self::new(415, detail)
    }

    pub fn internal_server_error(detail: impl Into<String>) -> Self {
        Self::new(500, detail)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.status_code)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(self.message.clone()))
    }
}

impl From<tc_core::Error> for ApiError {
    fn from(error: tc_core::Error) -> Self {
        use tc_core::Error::*;
        match error {
            NotFound(msg) => Self::not_found(msg),
            Validation(msg) => Self::bad_request(msg),
            AlreadyRunning(msg) => Self::new(409, msg),
            NotRunning(msg) => Self::bad_request(msg),
            Database(msg) => Self::internal_server_error(format!("database error: {msg}")),
            Config(msg) => Self::internal_server_error(format!("configuration error: {msg}")),
            Scheduler(msg) => Self::internal_server_error(format!("scheduler error: {msg}")),
            Crawler(msg) => Self::internal_server_error(format!("crawler error: {msg}")),
            Transient(msg) => Self::internal_server_error(format!("transient error: {msg}")),
            Io(e) => Self::internal_server_error(format!("io error: {e}")),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = tc_core::Error::NotFound("task 1".into()).into();
        assert_eq!(err.status_code, 404);
    }

    #[test]
    fn already_running_maps_to_409() {
        let err: ApiError = tc_core::Error::AlreadyRunning("task 1".into()).into();
        assert_eq!(err.status_code, 409);
    }

    #[test]
    fn validation_maps_to_400() {
        let err: ApiError = tc_core::Error::Validation("bad cron".into()).into();
        assert_eq!(err.status_code, 400);
    }
}
