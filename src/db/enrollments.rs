use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::models::{Enrollment, EnrollmentStatus};

const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, season_id, status, created_at, \
     decided_at, decided_by, rejection_reason";

/// Inserts a pending enrollment while the season is open. Returns `None`
/// when the season is missing or archived, and fails with a unique
/// violation when the pair already has an active enrollment.
pub async fn insert_enrollment(
    db: &SqlitePool,
    student_id: &str,
    course_id: &str,
    season_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO enrollments (id, student_id, course_id, season_id, status, created_at)
        SELECT ?1, ?2, ?3, ?4, 'pending', ?5
        FROM seasons WHERE id = ?4 AND archived = 0
        "#,
    )
    .bind(&id)
    .bind(student_id)
    .bind(course_id)
    .bind(season_id)
    .bind(now)
    .execute(db)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(None);
    }

    Ok(Some(Enrollment {
        id,
        student_id: student_id.to_string(),
        course_id: course_id.to_string(),
        season_id: season_id.to_string(),
        status: EnrollmentStatus::Pending,
        created_at: now,
        decided_at: None,
        decided_by: None,
        rejection_reason: None,
    }))
}

pub async fn find_enrollment<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?");
    sqlx::query_as::<_, Enrollment>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

/// `pending → approved`, conditional on the row still being pending.
pub async fn mark_approved<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: &str,
    admin_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = 'approved', decided_at = ?2, decided_by = ?3
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .bind(admin_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// `pending → rejected`, only while the season is open.
pub async fn mark_rejected(
    db: &SqlitePool,
    id: &str,
    admin_id: &str,
    reason: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = 'rejected', decided_at = ?2, decided_by = ?3, rejection_reason = ?4
        WHERE id = ?1 AND status = 'pending'
            AND EXISTS (
                SELECT 1 FROM seasons s
                WHERE s.id = enrollments.season_id AND s.archived = 0
            )
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .bind(admin_id)
    .bind(reason)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// `pending → cancelled`, only while the season is open.
pub async fn mark_cancelled(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = 'cancelled', decided_at = ?2
        WHERE id = ?1 AND status = 'pending'
            AND EXISTS (
                SELECT 1 FROM seasons s
                WHERE s.id = enrollments.season_id AND s.archived = 0
            )
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_pending(db: &SqlitePool) -> Result<Vec<Enrollment>, sqlx::Error> {
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE status = 'pending' ORDER BY created_at, id"
    );
    sqlx::query_as::<_, Enrollment>(&sql).fetch_all(db).await
}

/// Approved enrollments of a course: the roster attendance is taken against.
pub async fn fetch_roster(db: &SqlitePool, course_id: &str) -> Result<Vec<Enrollment>, sqlx::Error> {
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
         WHERE course_id = ? AND status = 'approved' ORDER BY student_id"
    );
    sqlx::query_as::<_, Enrollment>(&sql)
        .bind(course_id)
        .fetch_all(db)
        .await
}

pub async fn enrollment_ids_for_season(
    db: &SqlitePool,
    season_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM enrollments WHERE season_id = ? ORDER BY id")
        .bind(season_id)
        .fetch_all(db)
        .await
}
