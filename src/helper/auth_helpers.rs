use actix_web::web;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::helper::validation_helpers::{validate_login, LoginRequest};
use crate::models::db_operations::admin_db_operations;
use crate::models::{AdminProfile, AdminRole, AdminUser};
use crate::AppContext;

pub const TOKEN_TTL_HOURS: i64 = 24;
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token.";

/// Identity carried inside an admin bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub id: Uuid,
    pub email: String,
    pub role: AdminRole,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 admin tokens with the server secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &[u8]) -> Self {
        TokenAuthority {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    pub fn issue(&self, admin: &AdminUser) -> ApiResult<String> {
        self.issue_at(admin, Utc::now())
    }

    pub fn issue_at(&self, admin: &AdminUser, issued_at: DateTime<Utc>) -> ApiResult<String> {
        let claims = AdminClaims {
            id: admin.id,
            email: admin.email.clone(),
            role: admin.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(ApiError::TokenSigning)
    }

    /// Any decode failure (bad signature, expiry, garbage) is reported the
    /// same way to the client.
    pub fn verify(&self, token: &str) -> ApiResult<AdminClaims> {
        decode::<AdminClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected admin token: {}", e);
                ApiError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string())
            })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminProfile,
}

pub fn hash_password(password: &str, cost: u32) -> ApiResult<String> {
    Ok(bcrypt::hash(password, cost)?)
}

fn password_matches(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or_else(|e| {
        log::error!("Stored password hash could not be checked: {}", e);
        false
    })
}

/// Checks credentials and issues a token. Unknown emails still pay for one
/// bcrypt verification so both failure paths take the same time.
pub async fn login(ctx: web::Data<AppContext>, request: LoginRequest) -> ApiResult<LoginResponse> {
    let (email, password) = validate_login(&request)?;

    web::block(move || -> ApiResult<LoginResponse> {
        let admin = {
            let conn = ctx.pool.get()?;
            admin_db_operations::read_admin_by_email(&conn, &email)?
        };

        let admin = match admin {
            Some(admin) if password_matches(&password, &admin.password_hash) => admin,
            Some(_) => {
                log::warn!("Failed admin login for '{}'", email);
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()));
            }
            None => {
                let _ = password_matches(&password, &ctx.decoy_password_hash);
                log::warn!("Admin login attempted for unknown email '{}'", email);
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()));
            }
        };

        let token = ctx.tokens.issue(&admin)?;
        log::info!("Admin '{}' logged in", admin.email);
        Ok(LoginResponse { token, admin: AdminProfile::from(&admin) })
    })
    .await?
}
