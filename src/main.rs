use actix_cors::Cors;
use actix_web::{
    http::{header, StatusCode},
    middleware::{DefaultHeaders, ErrorHandlers, Logger},
    web, App, HttpServer,
};
use clap::Parser;
use std::path::PathBuf;
use whisperwall_backend::{
    config::Config,
    middleware::add_internal_error_detail,
    open_pool, routes,
    setup::db_setup,
    AppContext,
};

#[derive(Parser, Debug)]
#[command(name = "whisperwall_server", author, version, about = "Starts the WhisperWall API server.")]
struct Cli {
    /// Path to the .env configuration file. Defaults to ./.env when present.
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![
            header::RETRY_AFTER,
            header::HeaderName::from_static("ratelimit-limit"),
            header::HeaderName::from_static("ratelimit-remaining"),
        ])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env(cli.env_file.as_deref())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Invalid configuration: {}", e)))?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let db_path = config.database_path();
    if let Some(parent_dir) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent_dir)?;
    }

    let pool = open_pool(&db_path).map_err(|e| {
        log::error!("Failed to create SQLite connection pool: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    {
        let mut conn = pool
            .get()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        db_setup::setup_database(&mut conn)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    }
    log::info!("Database schema ready at '{}'", db_path.display());

    let context = AppContext::from_config(pool, &config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let context = web::Data::new(context);

    if config.is_development() {
        log::warn!("Running in development mode: internal error details are sent to clients.");
    }
    if config.allowed_origins.trim().is_empty() {
        log::info!("ALLOWED_ORIGINS is empty; cross-origin requests will be refused.");
    }

    let server_address = config.server_address();
    log::info!("WhisperWall API starting at http://{}", server_address);
    log::info!("Health check: http://{}/api/health", server_address);

    let allowed_origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, add_internal_error_detail))
            .wrap(build_cors(&allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "no-referrer")),
            )
            .app_data(context.clone())
            .configure(routes::config_app)
    })
    .bind(server_address)?
    .run()
    .await
}
