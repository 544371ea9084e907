use chrono::Utc;
use sqlx::types::Json;
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::models::{Course, NewCourseRequest};

const COURSE_COLUMNS: &str = "id, season_id, title, instructor, category, level, room, \
     capacity, enrolled, schedule, created_at, updated_at";

/// Inserts only while the season is open. The season check is part of the
/// statement, so an archival either sees the new course or rejects it.
/// Returns `None` when the season is missing or archived.
pub async fn insert_course<'e, E: SqliteExecutor<'e>>(
    db: E,
    season_id: &str,
    req: NewCourseRequest,
) -> Result<Option<Course>, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO courses
            (id, season_id, title, instructor, category, level, room,
            capacity, enrolled, schedule, created_at, updated_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?10
        FROM seasons WHERE id = ?2 AND archived = 0
        "#,
    )
    .bind(&id)
    .bind(season_id)
    .bind(&req.title)
    .bind(&req.instructor)
    .bind(req.category)
    .bind(req.level)
    .bind(&req.room)
    .bind(req.capacity)
    .bind(Json(&req.schedule))
    .bind(now)
    .execute(db)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Ok(None);
    }

    Ok(Some(Course {
        id,
        season_id: season_id.to_string(),
        title: req.title,
        instructor: req.instructor,
        category: req.category,
        level: req.level,
        room: req.room,
        capacity: req.capacity,
        enrolled: 0,
        schedule: req.schedule,
        created_at: now,
        updated_at: now,
    }))
}

pub async fn find_course<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?");
    sqlx::query_as::<_, Course>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_courses_by_season(
    db: &SqlitePool,
    season_id: &str,
) -> Result<Vec<Course>, sqlx::Error> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE season_id = ? ORDER BY title, id");
    sqlx::query_as::<_, Course>(&sql)
        .bind(season_id)
        .fetch_all(db)
        .await
}

/// Writes every non-counter field of `course`. The capacity and open-season
/// guards are part of the statement so a concurrent approval or archival
/// cannot slip in between. Returns false when the course is gone, its season
/// is archived, or `capacity` is below `enrolled`.
pub async fn update_course(db: &SqlitePool, course: &Course) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = ?2,
            instructor = ?3,
            category = ?4,
            level = ?5,
            room = ?6,
            capacity = ?7,
            schedule = ?8,
            updated_at = ?9
        WHERE id = ?1 AND enrolled <= ?7
            AND EXISTS (
                SELECT 1 FROM seasons s
                WHERE s.id = courses.season_id AND s.archived = 0
            )
        "#,
    )
    .bind(&course.id)
    .bind(&course.title)
    .bind(&course.instructor)
    .bind(course.category)
    .bind(course.level)
    .bind(&course.room)
    .bind(course.capacity)
    .bind(Json(&course.schedule))
    .bind(course.updated_at)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Increment-if-below-capacity. The check and the increment are one
/// statement; false means the course had no seat left.
pub async fn take_seat<'e, E: SqliteExecutor<'e>>(db: E, course_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET enrolled = enrolled + 1
        WHERE id = ?1 AND enrolled < capacity
        "#,
    )
    .bind(course_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Recounts `enrolled` from the approved enrollments that still exist.
pub async fn recount_enrolled<'e, E: SqliteExecutor<'e>>(db: E) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET enrolled = (
            SELECT COUNT(*) FROM enrollments e
            WHERE e.course_id = courses.id AND e.status = 'approved'
        )
        "#,
    )
    .execute(db)
    .await?
    .rows_affected();

    Ok(result)
}

pub async fn course_ids_for_season(
    db: &SqlitePool,
    season_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM courses WHERE season_id = ? ORDER BY id")
        .bind(season_id)
        .fetch_all(db)
        .await
}
