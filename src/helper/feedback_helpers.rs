use actix_web::web;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::db_operations::{feedback_db_operations, now};
use crate::models::feedback_filter::{FeedbackFilter, FeedbackListParams, PageRequest};
use crate::models::{
    FeedbackPage, FeedbackRecord, FeedbackStatus, NewFeedback, Pagination, PublicFeedback, Reply,
};
use crate::DbPool;

/// Parses a path id. Anything that is not a UUID is a malformed id, never a
/// miss.
pub fn parse_feedback_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::MalformedId)
}

/// Stores a validated submission. New records are always public and open,
/// whatever the client asked for.
pub async fn create_feedback(pool: &DbPool, submission: NewFeedback) -> ApiResult<FeedbackRecord> {
    let pool = pool.clone();
    web::block(move || -> ApiResult<FeedbackRecord> {
        let created_at = now();
        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            title: submission.title,
            content: submission.content,
            category: submission.category,
            tags: submission.tags,
            contact_email: submission.contact_email,
            status: FeedbackStatus::Open,
            is_public: true,
            replies: Vec::new(),
            created_at,
            updated_at: created_at,
        };

        let conn = pool.get()?;
        feedback_db_operations::insert_feedback(&conn, &record)?;
        log::info!("Stored feedback {} in category {}", record.id, record.category);
        Ok(record)
    })
    .await?
}

async fn load_page(pool: &DbPool, filter: FeedbackFilter, page: PageRequest) -> ApiResult<FeedbackPage<FeedbackRecord>> {
    let pool = pool.clone();
    web::block(move || -> ApiResult<FeedbackPage<FeedbackRecord>> {
        let sql = filter.to_sql();
        let conn = pool.get()?;
        let total = feedback_db_operations::count_feedback(&conn, &sql)?;
        let feedback = feedback_db_operations::read_feedback_page(&conn, &sql, &page)?;
        Ok(FeedbackPage { feedback, pagination: Pagination::new(page.page, page.limit, total) })
    })
    .await?
}

pub async fn list_public_feedback(
    pool: &DbPool,
    params: &FeedbackListParams,
) -> ApiResult<FeedbackPage<PublicFeedback>> {
    let (filter, page) = FeedbackFilter::public_from_params(params)?;
    let FeedbackPage { feedback, pagination } = load_page(pool, filter, page).await?;
    Ok(FeedbackPage {
        feedback: feedback.into_iter().map(PublicFeedback::from).collect(),
        pagination,
    })
}

pub async fn list_admin_feedback(
    pool: &DbPool,
    params: &FeedbackListParams,
) -> ApiResult<FeedbackPage<FeedbackRecord>> {
    let (filter, page) = FeedbackFilter::admin_from_params(params)?;
    load_page(pool, filter, page).await
}

async fn find_feedback(pool: &DbPool, id: Uuid) -> ApiResult<FeedbackRecord> {
    let pool = pool.clone();
    web::block(move || -> ApiResult<Option<FeedbackRecord>> {
        let conn = pool.get()?;
        Ok(feedback_db_operations::read_feedback(&conn, &id)?)
    })
    .await??
    .ok_or_else(ApiError::feedback_not_found)
}

pub async fn get_public_feedback(pool: &DbPool, raw_id: &str) -> ApiResult<PublicFeedback> {
    let id = parse_feedback_id(raw_id)?;
    let record = find_feedback(pool, id).await?;
    if !record.is_public {
        return Err(ApiError::Forbidden("This feedback is not publicly available.".to_string()));
    }
    Ok(PublicFeedback::from(record))
}

pub async fn get_admin_feedback(pool: &DbPool, raw_id: &str) -> ApiResult<FeedbackRecord> {
    let id = parse_feedback_id(raw_id)?;
    find_feedback(pool, id).await
}

pub async fn update_feedback_status(pool: &DbPool, raw_id: &str, status: FeedbackStatus) -> ApiResult<FeedbackRecord> {
    let id = parse_feedback_id(raw_id)?;
    let pool = pool.clone();
    web::block(move || -> ApiResult<Option<FeedbackRecord>> {
        let mut conn = pool.get()?;
        Ok(feedback_db_operations::update_feedback_status(&mut conn, &id, status, now())?)
    })
    .await??
    .ok_or_else(ApiError::feedback_not_found)
}

pub async fn add_reply(pool: &DbPool, raw_id: &str, message: String, public: bool) -> ApiResult<FeedbackRecord> {
    let id = parse_feedback_id(raw_id)?;
    let pool = pool.clone();
    web::block(move || -> ApiResult<Option<FeedbackRecord>> {
        let created_at = now();
        let reply = Reply { message, public, created_at };
        let mut conn = pool.get()?;
        Ok(feedback_db_operations::append_reply(&mut conn, &id, reply, created_at)?)
    })
    .await??
    .ok_or_else(ApiError::feedback_not_found)
}

pub async fn delete_feedback(pool: &DbPool, raw_id: &str) -> ApiResult<()> {
    let id = parse_feedback_id(raw_id)?;
    let pool = pool.clone();
    let removed = web::block(move || -> ApiResult<usize> {
        let conn = pool.get()?;
        Ok(feedback_db_operations::delete_feedback(&conn, &id)?)
    })
    .await??;

    if removed == 0 {
        return Err(ApiError::feedback_not_found());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::setup::db_setup;

    fn pool() -> DbPool {
        let pool = crate::open_memory_pool().unwrap();
        {
            let mut conn = pool.get().unwrap();
            db_setup::setup_database(&mut conn).unwrap();
        }
        pool
    }

    fn submission(title: &str) -> NewFeedback {
        NewFeedback {
            title: title.to_string(),
            content: "Needs attention.".to_string(),
            category: Category::Transport,
            tags: Vec::new(),
            contact_email: Some("rider@college.edu".to_string()),
        }
    }

    #[test]
    fn malformed_ids_are_rejected_before_lookup() {
        assert!(matches!(parse_feedback_id("123"), Err(ApiError::MalformedId)));
        assert!(parse_feedback_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[actix_web::test]
    async fn new_feedback_is_public_and_open() {
        let pool = pool();
        let record = create_feedback(&pool, submission("Bus Service Timing Issues")).await.unwrap();
        assert!(record.is_public);
        assert_eq!(record.status, FeedbackStatus::Open);
        assert!(record.replies.is_empty());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[actix_web::test]
    async fn hidden_feedback_is_forbidden_publicly() {
        let pool = pool();
        let record = create_feedback(&pool, submission("Hidden")).await.unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute("UPDATE feedback SET is_public = 0 WHERE id = ?1", [record.id.to_string()]).unwrap();
        }

        let err = get_public_feedback(&pool, &record.id.to_string()).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(get_admin_feedback(&pool, &record.id.to_string()).await.is_ok());
    }

    #[actix_web::test]
    async fn private_replies_stay_out_of_public_view() {
        let pool = pool();
        let record = create_feedback(&pool, submission("Parking")).await.unwrap();
        let id = record.id.to_string();

        add_reply(&pool, &id, "internal".to_string(), false).await.unwrap();
        let updated = add_reply(&pool, &id, "We are adding spaces.".to_string(), true).await.unwrap();
        assert_eq!(updated.replies.len(), 2);
        assert!(updated.updated_at >= record.updated_at);

        let public = get_public_feedback(&pool, &id).await.unwrap();
        assert_eq!(public.replies.len(), 1);
        assert_eq!(public.replies[0].message, "We are adding spaces.");
    }

    #[actix_web::test]
    async fn operations_on_missing_feedback_are_not_found() {
        let pool = pool();
        let id = Uuid::new_v4().to_string();
        assert!(matches!(get_admin_feedback(&pool, &id).await, Err(ApiError::NotFound(_))));
        assert!(matches!(update_feedback_status(&pool, &id, FeedbackStatus::Closed).await, Err(ApiError::NotFound(_))));
        assert!(matches!(add_reply(&pool, &id, "hi".to_string(), true).await, Err(ApiError::NotFound(_))));
        assert!(matches!(delete_feedback(&pool, &id).await, Err(ApiError::NotFound(_))));
    }

    #[actix_web::test]
    async fn delete_then_lookup_is_not_found() {
        let pool = pool();
        let record = create_feedback(&pool, submission("Library Hours")).await.unwrap();
        let id = record.id.to_string();

        delete_feedback(&pool, &id).await.unwrap();
        assert!(matches!(get_public_feedback(&pool, &id).await, Err(ApiError::NotFound(_))));
    }

    #[actix_web::test]
    async fn public_listing_counts_only_visible_feedback() {
        let pool = pool();
        for title in ["one", "two", "three"] {
            create_feedback(&pool, submission(title)).await.unwrap();
        }
        {
            let conn = pool.get().unwrap();
            conn.execute("UPDATE feedback SET is_public = 0 WHERE title = 'two'", []).unwrap();
        }

        let page = list_public_feedback(&pool, &FeedbackListParams::default()).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.feedback.len(), 2);

        let admin = list_admin_feedback(&pool, &FeedbackListParams::default()).await.unwrap();
        assert_eq!(admin.pagination.total, 3);
    }
}
