//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlers;
use actix_web::{web, App};
use serde_json::Value;
use uuid::Uuid;

use whisperwall_backend::helper::auth_helpers::{hash_password, TokenAuthority};
use whisperwall_backend::middleware::add_internal_error_detail;
use whisperwall_backend::middleware::rate_limiter::SlidingWindowLimiter;
use whisperwall_backend::models::db_operations::{admin_db_operations, feedback_db_operations, now};
use whisperwall_backend::models::{AdminRole, AdminUser, Category, FeedbackRecord, FeedbackStatus, Reply};
use whisperwall_backend::setup::db_setup;
use whisperwall_backend::{open_memory_pool, routes, AppContext};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ADMIN_EMAIL: &str = "admin@college.edu";
pub const ADMIN_PASSWORD: &str = "password123";

/// Cheapest bcrypt cost, to keep the suite fast.
const TEST_BCRYPT_COST: u32 = 4;

pub fn test_context() -> web::Data<AppContext> {
    context_with_error_details(false)
}

/// Same as [`test_context`], but 500 responses carry the internal error text
/// the way a development server does.
pub fn development_context() -> web::Data<AppContext> {
    context_with_error_details(true)
}

fn context_with_error_details(expose_error_details: bool) -> web::Data<AppContext> {
    let pool = open_memory_pool().expect("in-memory pool");
    {
        let mut conn = pool.get().expect("connection");
        db_setup::setup_database(&mut conn).expect("schema");
    }

    web::Data::new(AppContext {
        pool,
        tokens: TokenAuthority::new(TEST_SECRET.as_bytes()),
        submission_limiter: SlidingWindowLimiter::for_submissions(),
        trust_proxy_headers: false,
        expose_error_details,
        bcrypt_cost: TEST_BCRYPT_COST,
        decoy_password_hash: hash_password("decoy", TEST_BCRYPT_COST).expect("decoy hash"),
    })
}

/// The application as `main` assembles it, minus CORS and access logging.
pub fn test_app(
    ctx: web::Data<AppContext>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, add_internal_error_detail))
        .app_data(ctx)
        .configure(routes::config_app)
}

pub fn create_admin(ctx: &AppContext, email: &str, password: &str) -> AdminUser {
    let admin = AdminUser {
        id: Uuid::new_v4(),
        name: "Admin User".to_string(),
        email: email.to_string(),
        password_hash: hash_password(password, TEST_BCRYPT_COST).expect("hash"),
        role: AdminRole::Admin,
        created_at: now(),
    };
    let conn = ctx.pool.get().expect("connection");
    admin_db_operations::create_admin(&conn, &admin).expect("insert admin");
    admin
}

/// A valid `Authorization` header value for a freshly created admin.
pub fn bearer(ctx: &AppContext) -> String {
    let admin = create_admin(ctx, ADMIN_EMAIL, ADMIN_PASSWORD);
    format!("Bearer {}", ctx.tokens.issue(&admin).expect("token"))
}

pub struct FeedbackBuilder {
    record: FeedbackRecord,
}

pub fn feedback(title: &str) -> FeedbackBuilder {
    let created_at = now();
    FeedbackBuilder {
        record: FeedbackRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: format!("Details about {}.", title.to_lowercase()),
            category: Category::Other,
            tags: Vec::new(),
            contact_email: Some("student@college.edu".to_string()),
            status: FeedbackStatus::Open,
            is_public: true,
            replies: Vec::new(),
            created_at,
            updated_at: created_at,
        },
    }
}

impl FeedbackBuilder {
    pub fn category(mut self, category: Category) -> Self {
        self.record.category = category;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.record.is_public = false;
        self
    }

    pub fn reply(mut self, message: &str, public: bool) -> Self {
        self.record.replies.push(Reply { message: message.to_string(), public, created_at: now() });
        self
    }

    pub fn created_minutes_ago(mut self, minutes: i64) -> Self {
        self.record.created_at = now() - chrono::Duration::minutes(minutes);
        self.record.updated_at = self.record.created_at;
        self
    }

    pub fn insert(self, ctx: &AppContext) -> FeedbackRecord {
        let conn = ctx.pool.get().expect("connection");
        feedback_db_operations::insert_feedback(&conn, &self.record).expect("insert feedback");
        self.record
    }
}

pub fn read_feedback(ctx: &AppContext, id: Uuid) -> Option<FeedbackRecord> {
    let conn = ctx.pool.get().expect("connection");
    feedback_db_operations::read_feedback(&conn, &id).expect("read feedback")
}

pub fn message(body: &Value) -> Option<&str> {
    body.get("message").and_then(Value::as_str)
}
