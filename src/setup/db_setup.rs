use rusqlite::Connection;
use thiserror::Error;

use crate::models::db_operations::DbError;
use crate::models::{AdminRole, Category, FeedbackStatus, MAX_TITLE_CHARS};

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// `'a', 'b', 'c'` for a CHECK (... IN (...)) constraint.
fn sql_choices<T: Copy>(all: &[T], as_str: fn(T) -> &'static str) -> String {
    all.iter()
        .map(|v| format!("'{}'", as_str(*v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Creates the WhisperWall schema. Safe to run against an existing database.
pub fn setup_database(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    log::debug!("Creating 'feedback' table");
    tx.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL CHECK(length(title) <= {max_title}),
                content TEXT NOT NULL,
                category TEXT NOT NULL CHECK(category IN ({categories})),
                tags TEXT NOT NULL DEFAULT '[]',
                contact_email TEXT,
                status TEXT NOT NULL DEFAULT 'open' CHECK(status IN ({statuses})),
                is_public INTEGER NOT NULL DEFAULT 1,
                replies TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                CHECK(updated_at >= created_at)
            )",
            max_title = MAX_TITLE_CHARS,
            categories = sql_choices(&Category::ALL, Category::as_str),
            statuses = sql_choices(&FeedbackStatus::ALL, FeedbackStatus::as_str),
        ),
        [],
    )?;

    log::debug!("Creating feedback indexes");
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_feedback_created_at ON feedback (created_at DESC)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_feedback_public_created ON feedback (is_public, created_at DESC)",
        [],
    )?;

    log::debug!("Creating 'admin_users' table");
    tx.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS admin_users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'admin' CHECK(role IN ({roles})),
                created_at INTEGER NOT NULL
            )",
            roles = sql_choices(&AdminRole::ALL, AdminRole::as_str),
        ),
        [],
    )?;

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0)).unwrap().map(Result::unwrap).collect()
    }

    #[test]
    fn creates_both_tables_and_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&mut conn).unwrap();
        setup_database(&mut conn).unwrap();
        assert_eq!(table_names(&conn), vec!["admin_users", "feedback"]);
    }

    #[test]
    fn check_constraints_reject_unknown_values() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&mut conn).unwrap();

        let insert = |category: &str, status: &str| {
            conn.execute(
                "INSERT INTO feedback (id, title, content, category, status, created_at, updated_at)
                 VALUES (lower(hex(randomblob(16))), 't', 'c', ?1, ?2, 0, 0)",
                [category, status],
            )
        };
        assert!(insert("Hostel", "in-progress").is_ok());
        assert!(insert("Library", "open").is_err());
        assert!(insert("Hostel", "archived").is_err());
    }

    #[test]
    fn updated_at_cannot_precede_created_at() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&mut conn).unwrap();
        let result = conn.execute(
            "INSERT INTO feedback (id, title, content, category, created_at, updated_at)
             VALUES ('x', 't', 'c', 'Other', 10, 5)",
            [],
        );
        assert!(result.is_err());
    }
}
