use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::db::{Collection, attendance, courses, enrollments, seasons};
use crate::error::{AppError, Conflict};
use crate::models::{NewSeasonRequest, Principal, Season, SeasonStats};
use crate::services::batch_delete::{BatchDeleter, DeletionSummary};
use crate::services::pending_feed::PendingFeed;

/// Records a purge would remove, reported before the caller confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgePreview {
    pub courses: usize,
    pub enrollments: usize,
    pub attendance: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub season: Season,
    pub deletion: DeletionSummary,
}

/// Open (active or inactive) → archived → purged. Both arrows are one-way.
pub struct SeasonLifecycleManager {
    db: SqlitePool,
    feed: PendingFeed,
    deleter: BatchDeleter,
}

impl SeasonLifecycleManager {
    pub fn new(db: SqlitePool, feed: PendingFeed, group_size: usize) -> Self {
        Self {
            deleter: BatchDeleter::new(db.clone(), group_size),
            db,
            feed,
        }
    }

    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create(&self, mut req: NewSeasonRequest) -> Result<Season, AppError> {
        req.name = req.name.trim().to_string();
        if req.name.is_empty() {
            return Err(AppError::validation("season name is required"));
        }
        if req.start_date > req.end_date {
            return Err(AppError::validation(format!(
                "season starts on {} but ends on {}",
                req.start_date, req.end_date
            )));
        }

        let season = seasons::insert_season(&self.db, req).await?;
        info!(season_id = %season.id, "season created");
        Ok(season)
    }

    pub async fn list(&self, include_archived: bool) -> Result<Vec<Season>, AppError> {
        seasons::list_seasons(&self.db, include_archived).await
    }

    pub async fn get(&self, season_id: &str) -> Result<Season, AppError> {
        seasons::find_season(&self.db, season_id)
            .await?
            .ok_or(AppError::NotFound("season"))
    }

    /// Frozen figures once archived, live counts before that.
    pub async fn stats(&self, season_id: &str) -> Result<SeasonStats, AppError> {
        match self.get(season_id).await?.stats() {
            Some(frozen) => Ok(frozen),
            None => Ok(seasons::compute_stats(&self.db, season_id).await?),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, season_id: &str, active: bool) -> Result<Season, AppError> {
        if !seasons::set_active(&self.db, season_id, active).await? {
            // distinguish a missing season from an archived one
            self.get(season_id).await?.ensure_mutable()?;
        }
        self.get(season_id).await
    }

    /// Freezes the stats and makes the season read-only.
    #[instrument(skip(self, principal), fields(admin = %principal.admin_id))]
    pub async fn archive(&self, season_id: &str, principal: &Principal) -> Result<Season, AppError> {
        if !seasons::mark_archived(&self.db, season_id, Utc::now()).await? {
            self.get(season_id).await?.ensure_mutable()?;
        }

        let season = self.get(season_id).await?;
        if let Some(stats) = season.stats() {
            info!(
                courses = stats.total_courses,
                students = stats.total_students,
                approved = stats.approved_enrollments,
                "season archived"
            );
        }
        Ok(season)
    }

    pub async fn purge_preview(&self, season_id: &str) -> Result<PurgePreview, AppError> {
        self.get(season_id).await?;
        let plan = self.purge_plan(season_id).await?;
        let count = |c: Collection| {
            plan.iter()
                .find(|(collection, _)| *collection == c)
                .map_or(0, |(_, ids)| ids.len())
        };

        Ok(PurgePreview {
            courses: count(Collection::Courses),
            enrollments: count(Collection::Enrollments),
            attendance: count(Collection::Attendance),
        })
    }

    /// Deletes every course, enrollment and attendance record of an archived
    /// season, then marks it purged. The frozen stats are left alone.
    ///
    /// A failure part way leaves earlier groups deleted and the season not yet
    /// marked purged; calling again finishes the job.
    #[instrument(skip(self, principal), fields(admin = %principal.admin_id))]
    pub async fn purge_data(&self, season_id: &str, principal: &Principal) -> Result<PurgeReport, AppError> {
        principal.require_superadmin()?;

        let season = self.get(season_id).await?;
        if !season.is_archived() {
            return Err(Conflict::SeasonNotArchived.into());
        }
        if season.is_purged() {
            info!("season already purged, nothing to delete");
            return Ok(PurgeReport {
                season,
                deletion: DeletionSummary::default(),
            });
        }

        let plan = self.purge_plan(season_id).await?;
        let deletion = self.deleter.delete_plan(plan).await?;

        seasons::mark_data_deleted(&self.db, season_id).await?;
        info!(deleted = deletion.total_deleted, "season data purged");

        if let Err(e) = self.feed.refresh(&self.db).await {
            warn!("pending feed refresh failed: {}", e);
        }

        Ok(PurgeReport {
            season: self.get(season_id).await?,
            deletion,
        })
    }

    async fn purge_plan(&self, season_id: &str) -> Result<Vec<(Collection, Vec<String>)>, AppError> {
        Ok(vec![
            (
                Collection::Attendance,
                attendance::attendance_ids_for_season(&self.db, season_id).await?,
            ),
            (
                Collection::Enrollments,
                enrollments::enrollment_ids_for_season(&self.db, season_id).await?,
            ),
            (
                Collection::Courses,
                courses::course_ids_for_season(&self.db, season_id).await?,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{course_request, seed_course, seed_season, setup_test_db};
    use crate::db::count_collection;
    use crate::models::Role;
    use crate::services::course::CourseService;
    use crate::services::enrollment::EnrollmentWorkflow;
    use chrono::NaiveDate;

    fn superadmin() -> Principal {
        Principal::new("root", Role::Superadmin)
    }

    fn manager(pool: &SqlitePool) -> SeasonLifecycleManager {
        SeasonLifecycleManager::new(pool.clone(), PendingFeed::new(), 2)
    }

    #[tokio::test]
    async fn test_create_validates_dates() {
        let pool = setup_test_db().await;
        let result = manager(&pool)
            .create(NewSeasonRequest {
                name: "Backwards".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_archive_freezes_stats_and_blocks_courses() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 5).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());
        for student in ["stu-1", "stu-2"] {
            let e = workflow.submit(student, &course.id).await.unwrap();
            workflow.approve(&e.id, &superadmin()).await.unwrap();
        }
        workflow.submit("stu-3", &course.id).await.unwrap();

        let manager = manager(&pool);
        let live = manager.stats(&season.id).await.unwrap();
        let archived = manager.archive(&season.id, &superadmin()).await.unwrap();
        let stats = archived.stats().unwrap();
        assert_eq!(stats, live);
        assert_eq!(stats.total_courses, 1);
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.approved_enrollments, 2);
        assert!(!archived.is_active());

        let create = CourseService::new(pool.clone())
            .create_course(&season.id, course_request("Geometry", 5), &superadmin())
            .await;
        assert!(matches!(create, Err(AppError::Conflict(Conflict::SeasonArchived))));

        let again = manager.archive(&season.id, &superadmin()).await;
        assert!(matches!(again, Err(AppError::Conflict(Conflict::SeasonArchived))));

        let toggle = manager.set_active(&season.id, true).await;
        assert!(matches!(toggle, Err(AppError::Conflict(Conflict::SeasonArchived))));
    }

    #[tokio::test]
    async fn test_purge_requires_archive_and_superadmin() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let manager = manager(&pool);

        let open = manager.purge_data(&season.id, &superadmin()).await;
        assert!(matches!(open, Err(AppError::Conflict(Conflict::SeasonNotArchived))));

        manager.archive(&season.id, &superadmin()).await.unwrap();
        let admin = Principal::new("admin-1", Role::Admin);
        let forbidden = manager.purge_data(&season.id, &admin).await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_purge_keeps_stats_and_removes_data() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let other = seed_season(&pool).await;
        let keep = seed_course(&pool, &other.id, 5).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());
        for _ in 0..3 {
            let course = seed_course(&pool, &season.id, 5).await;
            let e = workflow.submit("stu-1", &course.id).await.unwrap();
            workflow.approve(&e.id, &superadmin()).await.unwrap();
        }

        let manager = manager(&pool);
        let archived = manager.archive(&season.id, &superadmin()).await.unwrap();

        let preview = manager.purge_preview(&season.id).await.unwrap();
        assert_eq!(preview, PurgePreview { courses: 3, enrollments: 3, attendance: 0 });

        let report = manager.purge_data(&season.id, &superadmin()).await.unwrap();
        assert_eq!(report.deletion.total_deleted, 6);
        assert!(report.season.is_purged());
        assert_eq!(report.season.stats(), archived.stats());

        assert_eq!(count_collection(&pool, Collection::Courses).await.unwrap(), 1);
        assert!(courses::find_course(&pool, &keep.id).await.unwrap().is_some());

        // a second purge is a no-op
        let again = manager.purge_data(&season.id, &superadmin()).await.unwrap();
        assert_eq!(again.deletion.total_deleted, 0);
        assert_eq!(again.season.stats(), archived.stats());
    }
}
