use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use super::{conversion_error, from_millis, to_millis, DbError};
use crate::models::feedback_filter::{PageRequest, SqlFilter};
use crate::models::{FeedbackRecord, FeedbackStatus, Reply};

const FEEDBACK_COLUMNS: &str =
    "id, title, content, category, tags, contact_email, status, is_public, replies, created_at, updated_at";

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<FeedbackRecord> {
    let id: String = row.get(0)?;
    let tags: String = row.get(4)?;
    let replies: String = row.get(8)?;

    Ok(FeedbackRecord {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(0, Type::Text, e))?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        tags: serde_json::from_str(&tags).map_err(|e| conversion_error(4, Type::Text, e))?,
        contact_email: row.get(5)?,
        status: row.get(6)?,
        is_public: row.get(7)?,
        replies: serde_json::from_str(&replies).map_err(|e| conversion_error(8, Type::Text, e))?,
        created_at: from_millis(9, row.get(9)?)?,
        updated_at: from_millis(10, row.get(10)?)?,
    })
}

pub fn insert_feedback(conn: &Connection, record: &FeedbackRecord) -> Result<(), DbError> {
    let tags_json = serde_json::to_string(&record.tags)?;
    let replies_json = serde_json::to_string(&record.replies)?;
    conn.execute(
        "INSERT INTO feedback (id, title, content, category, tags, contact_email, status, is_public, replies, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.id.to_string(),
            record.title,
            record.content,
            record.category,
            tags_json,
            record.contact_email,
            record.status,
            record.is_public,
            replies_json,
            to_millis(&record.created_at),
            to_millis(&record.updated_at),
        ],
    )?;
    Ok(())
}

pub fn read_feedback(conn: &Connection, id: &Uuid) -> Result<Option<FeedbackRecord>, DbError> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM feedback WHERE id = ?1", FEEDBACK_COLUMNS),
            [id.to_string()],
            row_to_feedback,
        )
        .optional()?;
    Ok(record)
}

/// Newest first; ties keep insertion order, newest first.
pub fn read_feedback_page(
    conn: &Connection,
    filter: &SqlFilter,
    page: &PageRequest,
) -> Result<Vec<FeedbackRecord>, DbError> {
    let sql = format!(
        "SELECT {} FROM feedback {} ORDER BY created_at DESC, rowid DESC LIMIT {} OFFSET {}",
        FEEDBACK_COLUMNS,
        filter.where_clause,
        page.limit,
        page.offset()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.params.iter()), row_to_feedback)?;

    let mut records = Vec::new();
    for record in rows {
        records.push(record?);
    }
    Ok(records)
}

pub fn count_feedback(conn: &Connection, filter: &SqlFilter) -> Result<u64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM feedback {}", filter.where_clause);
    let count: i64 = conn.query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Sets the status and refreshes `updated_at`. Returns the updated record, or
/// `None` if no feedback has this id.
pub fn update_feedback_status(
    conn: &mut Connection,
    id: &Uuid,
    status: FeedbackStatus,
    updated_at: DateTime<Utc>,
) -> Result<Option<FeedbackRecord>, DbError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let changed = tx.execute(
        "UPDATE feedback SET status = ?1, updated_at = MAX(updated_at, ?2) WHERE id = ?3",
        params![status, to_millis(&updated_at), id.to_string()],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    let record = read_feedback(&tx, id)?;
    tx.commit()?;
    Ok(record)
}

/// Appends a reply inside one write transaction so concurrent appends to the
/// same record are not lost.
pub fn append_reply(
    conn: &mut Connection,
    id: &Uuid,
    reply: Reply,
    updated_at: DateTime<Utc>,
) -> Result<Option<FeedbackRecord>, DbError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut record = match read_feedback(&tx, id)? {
        Some(record) => record,
        None => return Ok(None),
    };

    record.replies.push(reply);
    record.updated_at = updated_at.max(record.updated_at);

    let replies_json = serde_json::to_string(&record.replies)?;
    tx.execute(
        "UPDATE feedback SET replies = ?1, updated_at = ?2 WHERE id = ?3",
        params![replies_json, to_millis(&record.updated_at), id.to_string()],
    )?;
    tx.commit()?;
    Ok(Some(record))
}

pub fn delete_feedback(conn: &Connection, id: &Uuid) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM feedback WHERE id = ?1", [id.to_string()])?)
}

pub fn delete_all_feedback(conn: &Connection) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM feedback", [])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::now;
    use crate::models::feedback_filter::FeedbackFilter;
    use crate::models::Category;
    use crate::setup::db_setup;
    use chrono::Duration;

    fn open_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::configure_connection(&mut conn).unwrap();
        db_setup::setup_database(&mut conn).unwrap();
        conn
    }

    fn record(title: &str, created_at: DateTime<Utc>) -> FeedbackRecord {
        FeedbackRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: format!("{} content", title),
            category: Category::Canteen,
            tags: vec!["food".to_string()],
            contact_email: Some("someone@college.edu".to_string()),
            status: FeedbackStatus::Open,
            is_public: true,
            replies: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn insert_then_read_returns_same_record() {
        let conn = open_db();
        let original = record("Canteen Menu Diversity", now());
        insert_feedback(&conn, &original).unwrap();

        let stored = read_feedback(&conn, &original.id).unwrap().unwrap();
        assert_eq!(stored.title, original.title);
        assert_eq!(stored.tags, original.tags);
        assert_eq!(stored.contact_email, original.contact_email);
        assert_eq!(stored.created_at, original.created_at);
    }

    #[test]
    fn read_unknown_id_is_none() {
        let conn = open_db();
        assert!(read_feedback(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn page_is_ordered_newest_first() {
        let conn = open_db();
        let base = now();
        for (i, title) in ["oldest", "middle", "newest"].iter().enumerate() {
            insert_feedback(&conn, &record(title, base + Duration::minutes(i as i64))).unwrap();
        }

        let filter = FeedbackFilter::default().to_sql();
        let page = read_feedback_page(&conn, &filter, &PageRequest { page: 1, limit: 2 }).unwrap();
        let titles: Vec<_> = page.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle"]);
        assert_eq!(count_feedback(&conn, &filter).unwrap(), 3);
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let conn = open_db();
        insert_feedback(&conn, &record("Café Menu Prices", now())).unwrap();
        let mut by_content = record("Dormitory heating", now());
        by_content.content = "DIE HEIZUNG IM ÜBUNGSRAUM IST KAPUTT".to_string();
        insert_feedback(&conn, &by_content).unwrap();
        insert_feedback(&conn, &record("Cafeteria queue", now())).unwrap();

        for (term, expected) in [("CAFÉ", "Café Menu Prices"), ("übungsraum", "Dormitory heating")] {
            let filter = FeedbackFilter { search: Some(term.to_string()), ..Default::default() }.to_sql();
            let found = read_feedback_page(&conn, &filter, &PageRequest::default()).unwrap();
            let titles: Vec<_> = found.iter().map(|r| r.title.as_str()).collect();
            assert_eq!(titles, vec![expected], "search for {}", term);
        }
    }

    #[test]
    fn title_longer_than_limit_violates_schema() {
        let conn = open_db();
        let too_long = record(&"x".repeat(151), now());
        assert!(insert_feedback(&conn, &too_long).is_err());
    }

    #[test]
    fn status_update_refreshes_timestamp() {
        let mut conn = open_db();
        let created = now() - Duration::hours(1);
        let original = record("Bus Service Timing Issues", created);
        insert_feedback(&conn, &original).unwrap();

        let when = now();
        let updated = update_feedback_status(&mut conn, &original.id, FeedbackStatus::Resolved, when)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, FeedbackStatus::Resolved);
        assert_eq!(updated.updated_at, when);
        assert_eq!(updated.created_at, created);
    }

    #[test]
    fn status_update_on_missing_record_is_none() {
        let mut conn = open_db();
        let result = update_feedback_status(&mut conn, &Uuid::new_v4(), FeedbackStatus::Closed, now()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn replies_accumulate_in_order() {
        let mut conn = open_db();
        let original = record("Hostel Water Supply Problem", now());
        insert_feedback(&conn, &original).unwrap();

        for (message, public) in [("first", false), ("second", true)] {
            let reply = Reply { message: message.to_string(), public, created_at: now() };
            append_reply(&mut conn, &original.id, reply, now()).unwrap().unwrap();
        }

        let stored = read_feedback(&conn, &original.id).unwrap().unwrap();
        let messages: Vec<_> = stored.replies.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(stored.replies[1].public);
    }

    #[test]
    fn delete_reports_affected_rows() {
        let conn = open_db();
        let original = record("Parking Space Insufficient", now());
        insert_feedback(&conn, &original).unwrap();

        assert_eq!(delete_feedback(&conn, &original.id).unwrap(), 1);
        assert_eq!(delete_feedback(&conn, &original.id).unwrap(), 0);
    }
}
