use chrono::{NaiveDate, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::models::{AttendanceRecord, AttendanceStatus};

const ATTENDANCE_COLUMNS: &str =
    "id, course_id, student_id, session_date, status, note, recorded_by, updated_at";

pub async fn fetch_for_date(
    db: &SqlitePool,
    course_id: &str,
    date: NaiveDate,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
         WHERE course_id = ? AND session_date = ? ORDER BY student_id"
    );
    sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(course_id)
        .bind(date)
        .fetch_all(db)
        .await
}

/// Status and date of every record of a course, for aggregation.
pub async fn fetch_statuses(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<(AttendanceStatus, NaiveDate)>, sqlx::Error> {
    sqlx::query_as::<_, (AttendanceStatus, NaiveDate)>(
        "SELECT status, session_date FROM attendance_records WHERE course_id = ?",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

/// Insert, or overwrite the record already held for (course, student, date).
pub async fn upsert_record<'e, E: SqliteExecutor<'e>>(
    db: E,
    course_id: &str,
    student_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
    note: Option<&str>,
    admin_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attendance_records
            (id, course_id, student_id, session_date, status, note, recorded_by, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (course_id, student_id, session_date) DO UPDATE SET
            status = excluded.status,
            note = excluded.note,
            recorded_by = excluded.recorded_by,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(course_id)
    .bind(student_id)
    .bind(date)
    .bind(status)
    .bind(note)
    .bind(admin_id)
    .bind(Utc::now())
    .execute(db)
    .await?;

    Ok(())
}

pub async fn attendance_ids_for_season(
    db: &SqlitePool,
    season_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT a.id FROM attendance_records a
        JOIN courses c ON c.id = a.course_id
        WHERE c.season_id = ?
        ORDER BY a.id
        "#,
    )
    .bind(season_id)
    .fetch_all(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_course, seed_season, setup_test_db};

    #[tokio::test]
    async fn test_upsert_overwrites_same_day() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 5).await;
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        upsert_record(&pool, &course.id, "stu-1", date, AttendanceStatus::Absent, None, "admin-1")
            .await
            .unwrap();
        upsert_record(
            &pool,
            &course.id,
            "stu-1",
            date,
            AttendanceStatus::Late,
            Some("bus delay"),
            "admin-2",
        )
        .await
        .unwrap();

        let records = fetch_for_date(&pool, &course.id, date).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Late);
        assert_eq!(records[0].note.as_deref(), Some("bus delay"));
        assert_eq!(records[0].recorded_by, "admin-2");

        let ids = attendance_ids_for_season(&pool, &season.id).await.unwrap();
        assert_eq!(ids.len(), 1);
    }
}
