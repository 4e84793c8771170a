//! 500 responses as clients see them in production and development mode.

mod common;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use actix_web::web;
use serde_json::{json, Value};

use common::{development_context, feedback, test_app, test_context};
use whisperwall_backend::AppContext;

/// Breaks the store underneath the app so the next listing query fails.
fn drop_feedback_table(ctx: &AppContext) {
    let conn = ctx.pool.get().expect("connection");
    conn.execute("DROP TABLE feedback", []).expect("drop table");
}

async fn list_feedback_body(ctx: web::Data<AppContext>) -> (StatusCode, Value) {
    let app = actix_test::init_service(test_app(ctx)).await;
    let request = actix_test::TestRequest::get().uri("/api/feedback").to_request();
    let response = actix_test::call_service(&app, request).await;
    let status = response.status();
    let body = serde_json::from_slice(&actix_test::read_body(response).await).unwrap();
    (status, body)
}

#[actix_web::test]
async fn production_hides_internal_error_detail() {
    let ctx = test_context();
    drop_feedback_table(&ctx);

    let (status, body) = list_feedback_body(ctx).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "success": false, "message": "Internal server error." }));
}

#[actix_web::test]
async fn development_adds_internal_error_detail() {
    let ctx = development_context();
    drop_feedback_table(&ctx);

    let (status, body) = list_feedback_body(ctx).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Internal server error.");
    let detail = body["error"].as_str().expect("error detail");
    assert!(detail.contains("no such table: feedback"), "{}", detail);
}

#[actix_web::test]
async fn development_leaves_client_errors_alone() {
    let ctx = development_context();
    let record = feedback("Hidden Item").hidden().insert(&ctx);
    let app = actix_test::init_service(test_app(ctx)).await;

    let request = actix_test::TestRequest::get().uri(&format!("/api/feedback/{}", record.id)).to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = serde_json::from_slice(&actix_test::read_body(response).await).unwrap();
    assert_eq!(body, json!({ "success": false, "message": "This feedback is not publicly available." }));
}
