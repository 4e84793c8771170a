use clap::{Parser, Subcommand};
use rand::RngCore;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;
use whisperwall_backend::config::{Config, MIN_JWT_SECRET_LEN};
use whisperwall_backend::helper::auth_helpers::hash_password;
use whisperwall_backend::helper::validation_helpers::is_valid_email;
use whisperwall_backend::models::db_operations::{admin_db_operations, now};
use whisperwall_backend::models::{AdminRole, AdminUser};
use whisperwall_backend::setup::{db_setup, seed_data};
use whisperwall_backend::configure_connection;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "Provisioning CLI for the WhisperWall backend.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file. Defaults to ./.env when present.
    #[arg(long, global = true, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Create the schema. Existing tables are left alone.
    Setup,
    /// Insert the sample feedback set.
    Seed {
        /// Delete all existing feedback first.
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "admin")]
        role: AdminRole,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Print a random hex string suitable for JWT_SECRET.
    Generate {
        #[arg(long, default_value_t = 48)]
        bytes: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    // Generating a secret must work before any .env exists.
    if let Commands::Secret { action: SecretAction::Generate { bytes } } = &cli.command {
        generate_secret(*bytes);
        return;
    }

    let config = match Config::from_env(cli.env_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_database(&config),
            DbAction::Seed { reset } => seed_database(&config, *reset),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { name, email, password, role } => {
                create_admin_user(&config, name, email, password, *role);
            }
            AdminAction::List => list_admin_users(&config),
            AdminAction::ChangePassword { email, new_password } => {
                change_admin_password(&config, email, new_password);
            }
        },
        Commands::Secret { .. } => {}
    }
}

fn generate_secret(bytes: usize) {
    if bytes < MIN_JWT_SECRET_LEN {
        eprintln!("❌ Error: A secret needs at least {} bytes.", MIN_JWT_SECRET_LEN);
        return;
    }
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    println!("{}", hex::encode(buf));
}

/// Opens the configured database. When `create` is false a missing file is
/// reported instead of silently creating an empty database.
fn open_database(config: &Config, create: bool) -> Option<Connection> {
    let db_path = config.database_path();
    if !create && !db_path.exists() {
        eprintln!(
            "❌ Error: Database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }

    if let Some(parent_dir) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Error: Could not create database directory '{}': {}", parent_dir.display(), e);
            return None;
        }
    }

    let opened = Connection::open(&db_path).and_then(|mut conn| {
        configure_connection(&mut conn)?;
        Ok(conn)
    });
    match opened {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening database '{}': {}", db_path.display(), e);
            None
        }
    }
}

fn setup_database(config: &Config) {
    println!("\nSetting up database at '{}'...", config.database_path().display());
    let Some(mut conn) = open_database(config, true) else { return };
    match db_setup::setup_database(&mut conn) {
        Ok(_) => println!("✅ Database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up database: {}", e),
    }
}

fn seed_database(config: &Config, reset: bool) {
    let Some(mut conn) = open_database(config, false) else { return };
    match seed_data::seed_feedback(&mut conn, reset) {
        Ok(count) => println!("✅ Created {} sample feedback entries.", count),
        Err(e) => eprintln!("❌ Error seeding database: {}", e),
    }
}

fn create_admin_user(config: &Config, name: &str, email: &str, password: &str, role: AdminRole) {
    if name.trim().is_empty() || password.is_empty() {
        eprintln!("❌ Error: Name and password must not be empty.");
        return;
    }
    if !is_valid_email(email.trim()) {
        eprintln!("❌ Error: '{}' is not a valid email address.", email);
        return;
    }

    let Some(conn) = open_database(config, false) else { return };
    let password_hash = match hash_password(password, config.bcrypt_cost) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("❌ Error hashing password: {}", e);
            return;
        }
    };

    let admin = AdminUser {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash,
        role,
        created_at: now(),
    };
    match admin_db_operations::create_admin(&conn, &admin) {
        Ok(_) => println!("✅ Admin user '{}' created successfully with role '{}'.", email.trim().to_lowercase(), role),
        Err(e) => eprintln!("❌ Error creating admin user: {}. It might be because the email already exists.", e),
    }
}

fn list_admin_users(config: &Config) {
    let Some(conn) = open_database(config, false) else { return };
    match admin_db_operations::read_all_admins(&conn) {
        Ok(admins) => {
            println!("Listing Admin Users:");
            for admin in admins {
                println!("- {} <{}> ({})", admin.name, admin.email, admin.role);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, email: &str, new_password: &str) {
    if new_password.is_empty() {
        eprintln!("❌ Error: The new password must not be empty.");
        return;
    }
    let Some(conn) = open_database(config, false) else { return };
    let password_hash = match hash_password(new_password, config.bcrypt_cost) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("❌ Error hashing password: {}", e);
            return;
        }
    };
    match admin_db_operations::update_admin_password(&conn, email, &password_hash) {
        Ok(0) => eprintln!("❌ Error: No admin user with email '{}' found.", email),
        Ok(_) => println!("✅ Password for admin user '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
