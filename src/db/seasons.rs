use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewSeasonRequest, Season, SeasonRow, SeasonState, SeasonStats};

const SEASON_COLUMNS: &str = "id, name, start_date, end_date, active, archived, archived_at, \
     data_deleted, stats_total_courses, stats_total_students, stats_approved_enrollments, created_at";

pub async fn insert_season(db: &SqlitePool, req: NewSeasonRequest) -> Result<Season, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO seasons (id, name, start_date, end_date, active, archived, data_deleted, created_at)
        VALUES (?1, ?2, ?3, ?4, 1, 0, 0, ?5)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(now)
    .execute(db)
    .await?;

    Ok(Season {
        id,
        name: req.name,
        start_date: req.start_date,
        end_date: req.end_date,
        state: SeasonState::Open { active: true },
        created_at: now,
    })
}

pub async fn find_season<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: &str,
) -> Result<Option<Season>, AppError> {
    let sql = format!("SELECT {SEASON_COLUMNS} FROM seasons WHERE id = ?");
    let row = sqlx::query_as::<_, SeasonRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;

    row.map(Season::try_from).transpose()
}

pub async fn list_seasons(db: &SqlitePool, include_archived: bool) -> Result<Vec<Season>, AppError> {
    let filter = if include_archived { "" } else { "WHERE archived = 0" };
    let sql = format!("SELECT {SEASON_COLUMNS} FROM seasons {filter} ORDER BY start_date DESC");
    let rows = sqlx::query_as::<_, SeasonRow>(&sql).fetch_all(db).await?;

    rows.into_iter().map(Season::try_from).collect()
}

/// Returns false when the season is missing or already archived.
pub async fn set_active(db: &SqlitePool, id: &str, active: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE seasons SET active = ?2 WHERE id = ?1 AND archived = 0")
        .bind(id)
        .bind(active)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn compute_stats<'e, E: SqliteExecutor<'e>>(
    db: E,
    season_id: &str,
) -> Result<SeasonStats, sqlx::Error> {
    let (total_courses, total_students, approved_enrollments) =
        sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM courses WHERE season_id = ?1),
                (SELECT COUNT(DISTINCT student_id) FROM enrollments
                    WHERE season_id = ?1 AND status = 'approved'),
                (SELECT COUNT(*) FROM enrollments
                    WHERE season_id = ?1 AND status = 'approved')
            "#,
        )
        .bind(season_id)
        .fetch_one(db)
        .await?;

    Ok(SeasonStats {
        total_courses,
        total_students,
        approved_enrollments,
    })
}

/// Freezes the stats and flips the season to archived in one statement, so
/// the figures match the data at the instant of archival. Returns false when
/// the season is missing or already archived.
pub async fn mark_archived<'e, E: SqliteExecutor<'e>>(
    db: E,
    id: &str,
    archived_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE seasons
        SET archived = 1,
            active = 0,
            archived_at = ?2,
            stats_total_courses =
                (SELECT COUNT(*) FROM courses WHERE season_id = ?1),
            stats_total_students =
                (SELECT COUNT(DISTINCT student_id) FROM enrollments
                    WHERE season_id = ?1 AND status = 'approved'),
            stats_approved_enrollments =
                (SELECT COUNT(*) FROM enrollments
                    WHERE season_id = ?1 AND status = 'approved')
        WHERE id = ?1 AND archived = 0
        "#,
    )
    .bind(id)
    .bind(archived_at)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn mark_data_deleted(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE seasons SET data_deleted = 1 WHERE id = ?1 AND archived = 1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_course, seed_season, setup_test_db};

    #[tokio::test]
    async fn test_insert_and_fetch_season() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;

        let fetched = find_season(&pool, &season.id)
            .await
            .expect("Failed to fetch season")
            .expect("Season not found");
        assert_eq!(fetched.name, "2025 Spring");
        assert!(fetched.is_active());
    }

    #[tokio::test]
    async fn test_archived_seasons_hidden_by_default() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        seed_course(&pool, &season.id, 5).await;

        let stats = compute_stats(&pool, &season.id).await.unwrap();
        assert_eq!(stats.total_courses, 1);
        assert!(mark_archived(&pool, &season.id, Utc::now()).await.unwrap());
        assert!(!mark_archived(&pool, &season.id, Utc::now()).await.unwrap());

        let archived = find_season(&pool, &season.id).await.unwrap().unwrap();
        assert_eq!(archived.stats(), Some(stats));

        assert!(list_seasons(&pool, false).await.unwrap().is_empty());
        assert_eq!(list_seasons(&pool, true).await.unwrap().len(), 1);

        // archived seasons cannot be toggled
        assert!(!set_active(&pool, &season.id, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_data_deleted_requires_archive() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        assert!(!mark_data_deleted(&pool, &season.id).await.unwrap());
    }
}
