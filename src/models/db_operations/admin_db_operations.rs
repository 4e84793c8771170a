use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{conversion_error, from_millis, to_millis, DbError};
use crate::models::{normalize_email, AdminUser};

fn row_to_admin(row: &Row<'_>) -> rusqlite::Result<AdminUser> {
    let id: String = row.get(0)?;
    Ok(AdminUser {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, Type::Text, e))?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: from_millis(5, row.get(5)?)?,
    })
}

/// Inserts an administrator. The email is normalized before storage; a
/// duplicate email fails with a UNIQUE constraint error.
pub fn create_admin(conn: &Connection, admin: &AdminUser) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO admin_users (id, name, email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            admin.id.to_string(),
            admin.name.trim(),
            normalize_email(&admin.email),
            admin.password_hash,
            admin.role,
            to_millis(&admin.created_at),
        ],
    )?;
    Ok(())
}

pub fn read_admin_by_email(conn: &Connection, email: &str) -> Result<Option<AdminUser>, DbError> {
    let admin = conn
        .query_row(
            "SELECT id, name, email, password_hash, role, created_at FROM admin_users WHERE email = ?1",
            [normalize_email(email)],
            row_to_admin,
        )
        .optional()?;
    Ok(admin)
}

pub fn read_all_admins(conn: &Connection) -> Result<Vec<AdminUser>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password_hash, role, created_at FROM admin_users ORDER BY created_at, email",
    )?;
    let rows = stmt.query_map([], row_to_admin)?;

    let mut admins = Vec::new();
    for admin in rows {
        admins.push(admin?);
    }
    Ok(admins)
}

pub fn update_admin_password(conn: &Connection, email: &str, password_hash: &str) -> Result<usize, DbError> {
    Ok(conn.execute(
        "UPDATE admin_users SET password_hash = ?1 WHERE email = ?2",
        params![password_hash, normalize_email(email)],
    )?)
}
