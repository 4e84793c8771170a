use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::error::ApiError;
use crate::models::ApiResponse;

pub mod admin;
pub mod public;

/// Request bodies are small JSON documents.
const JSON_BODY_LIMIT: usize = 64 * 1024;

/// Registers the whole API under `/api`, plus the JSON error shape for
/// undecodable bodies and query strings, and the catch-all 404.
pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(json_error_handler),
    )
    .app_data(web::QueryConfig::default().error_handler(query_error_handler))
    .service(
        web::scope("/api")
            .configure(public::config_api)
            .configure(admin::config_api),
    )
    .default_service(web::to(route_not_found));
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected request body: {}", err);
    ApiError::validation(format!("Invalid request body: {}", err)).into()
}

fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(format!("Invalid query string: {}", err)).into()
}

pub async fn route_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::failure("Route not found."))
}
