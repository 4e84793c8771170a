use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::helper::auth_helpers::TokenAuthority;
use crate::middleware::rate_limiter::SlidingWindowLimiter;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Plaintext behind the decoy hash used when a login names an unknown email.
const DECOY_PASSWORD: &str = "whisperwall-decoy-password";

/// Shared state handed to every handler and middleware via `web::Data`.
pub struct AppContext {
    pub pool: DbPool,
    pub tokens: TokenAuthority,
    pub submission_limiter: SlidingWindowLimiter,
    /// Only honour `X-Forwarded-For` when running behind a trusted proxy.
    pub trust_proxy_headers: bool,
    /// Adds the internal error text to 500 responses. Development only.
    pub expose_error_details: bool,
    pub bcrypt_cost: u32,
    pub decoy_password_hash: String,
}

impl AppContext {
    pub fn from_config(pool: DbPool, config: &Config) -> Result<Self, bcrypt::BcryptError> {
        Ok(AppContext {
            pool,
            tokens: TokenAuthority::new(config.jwt_secret.as_bytes()),
            submission_limiter: SlidingWindowLimiter::for_submissions(),
            trust_proxy_headers: config.trust_proxy_headers,
            expose_error_details: config.is_development(),
            bcrypt_cost: config.bcrypt_cost,
            decoy_password_hash: bcrypt::hash(DECOY_PASSWORD, config.bcrypt_cost)?,
        })
    }
}

/// Per-connection setup: busy timeout, foreign keys and the SQL functions
/// the queries rely on.
pub fn configure_connection(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    models::db_operations::register_functions(conn)
}

/// Opens a pooled SQLite database file, creating it if needed.
pub fn open_pool(path: &Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path).with_init(configure_connection);
    Pool::builder().build(manager)
}

/// Single-connection in-memory pool, used by tests. Every checkout sees the
/// same database, so callers must not hold two connections at once.
pub fn open_memory_pool() -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::memory().with_init(configure_connection);
    Pool::builder().max_size(1).build(manager)
}

pub mod config;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
