use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::helper::validation_helpers::{
    validate_reply, validate_status_update, LoginRequest, ReplyRequest, StatusUpdateRequest,
};
use crate::helper::{auth_helpers, feedback_helpers};
use crate::middleware::AuthenticatedAdmin;
use crate::models::feedback_filter::FeedbackListParams;
use crate::models::ApiResponse;
use crate::AppContext;

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/auth/login", web::post().to(login))
            .route("/feedback", web::get().to(list_feedback))
            .route("/feedback/{id}", web::get().to(get_feedback))
            .route("/feedback/{id}", web::delete().to(delete_feedback))
            .route("/feedback/{id}/status", web::put().to(update_status))
            .route("/feedback/{id}/reply", web::post().to(add_reply)),
    );
}

async fn login(ctx: web::Data<AppContext>, body: web::Json<LoginRequest>) -> ApiResult<HttpResponse> {
    let response = auth_helpers::login(ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data_with_message("Login successful.", response)))
}

// --- Feedback management (bearer token required) ---

async fn list_feedback(
    _admin: AuthenticatedAdmin,
    ctx: web::Data<AppContext>,
    query: web::Query<FeedbackListParams>,
) -> ApiResult<HttpResponse> {
    let page = feedback_helpers::list_admin_feedback(&ctx.pool, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(page)))
}

async fn get_feedback(
    _admin: AuthenticatedAdmin,
    ctx: web::Data<AppContext>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let feedback = feedback_helpers::get_admin_feedback(&ctx.pool, &id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(feedback)))
}

async fn update_status(
    admin: AuthenticatedAdmin,
    ctx: web::Data<AppContext>,
    id: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> ApiResult<HttpResponse> {
    let status = validate_status_update(&body)?;
    let feedback = feedback_helpers::update_feedback_status(&ctx.pool, &id, status).await?;
    log::info!("Status of {} set to {} by {}", feedback.id, status, admin.0.email);
    Ok(HttpResponse::Ok().json(ApiResponse::data_with_message(
        "Feedback status updated successfully.",
        feedback,
    )))
}

async fn add_reply(
    admin: AuthenticatedAdmin,
    ctx: web::Data<AppContext>,
    id: web::Path<String>,
    body: web::Json<ReplyRequest>,
) -> ApiResult<HttpResponse> {
    let (message, public) = validate_reply(&body)?;
    let feedback = feedback_helpers::add_reply(&ctx.pool, &id, message, public).await?;
    log::info!("Reply on {} posted by {}", feedback.id, admin.0.email);
    Ok(HttpResponse::Created().json(ApiResponse::data_with_message("Reply added successfully.", feedback)))
}

async fn delete_feedback(
    admin: AuthenticatedAdmin,
    ctx: web::Data<AppContext>,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    feedback_helpers::delete_feedback(&ctx.pool, &id).await?;
    log::info!("Feedback {} deleted by {}", id, admin.0.email);
    Ok(HttpResponse::Ok().json(ApiResponse::message("Feedback deleted successfully.")))
}
