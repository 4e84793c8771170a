use actix_web::{web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::error::ApiResult;
use crate::helper::feedback_helpers;
use crate::helper::validation_helpers::{validate_feedback_submission, FeedbackSubmission};
use crate::middleware::SubmissionRateLimit;
use crate::models::feedback_filter::FeedbackListParams;
use crate::models::{ApiResponse, FeedbackReceipt};
use crate::routes::route_not_found;
use crate::AppContext;

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(
            web::resource("/feedback")
                .wrap(SubmissionRateLimit)
                .route(web::post().to(submit_feedback))
                .route(web::get().to(list_feedback))
                .default_service(web::to(route_not_found)),
        )
        .route("/feedback/{id}", web::get().to(get_feedback));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "WhisperWall API is running.",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn submit_feedback(
    ctx: web::Data<AppContext>,
    body: web::Json<FeedbackSubmission>,
) -> ApiResult<HttpResponse> {
    let submission = validate_feedback_submission(&body)?;
    let record = feedback_helpers::create_feedback(&ctx.pool, submission).await?;
    Ok(HttpResponse::Created().json(ApiResponse::data_with_message(
        "Feedback submitted successfully.",
        FeedbackReceipt::from(&record),
    )))
}

async fn list_feedback(
    ctx: web::Data<AppContext>,
    query: web::Query<FeedbackListParams>,
) -> ApiResult<HttpResponse> {
    let page = feedback_helpers::list_public_feedback(&ctx.pool, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(page)))
}

async fn get_feedback(ctx: web::Data<AppContext>, id: web::Path<String>) -> ApiResult<HttpResponse> {
    let feedback = feedback_helpers::get_public_feedback(&ctx.pool, &id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(feedback)))
}
