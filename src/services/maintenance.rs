use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::db::{self, Collection, courses};
use crate::error::AppError;
use crate::models::Principal;
use crate::services::batch_delete::{BatchDeleter, DeletionSummary};
use crate::services::pending_feed::PendingFeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub courses: i64,
    pub enrollments: i64,
    pub attendance: i64,
}

/// Collections removed when `target` is reset, children first. `None`
/// means every data collection. Courses take their enrollments and
/// attendance with them.
pub fn reset_plan(target: Option<Collection>) -> Vec<Collection> {
    match target {
        None | Some(Collection::Courses) => Collection::DELETION_ORDER.to_vec(),
        Some(collection) => vec![collection],
    }
}

/// Whole-collection wipes. Seasons and admins are never touched.
pub struct MaintenanceService {
    db: SqlitePool,
    feed: PendingFeed,
    deleter: BatchDeleter,
}

impl MaintenanceService {
    pub fn new(db: SqlitePool, feed: PendingFeed, group_size: usize) -> Self {
        Self {
            deleter: BatchDeleter::new(db.clone(), group_size),
            db,
            feed,
        }
    }

    pub async fn counts(&self) -> Result<CollectionCounts, AppError> {
        Ok(CollectionCounts {
            courses: db::count_collection(&self.db, Collection::Courses).await?,
            enrollments: db::count_collection(&self.db, Collection::Enrollments).await?,
            attendance: db::count_collection(&self.db, Collection::Attendance).await?,
        })
    }

    #[instrument(skip(self, principal), fields(admin = %principal.admin_id))]
    pub async fn reset(
        &self,
        target: Option<Collection>,
        principal: &Principal,
    ) -> Result<DeletionSummary, AppError> {
        principal.require_superadmin()?;

        let collections = reset_plan(target);
        let touches_enrollments = collections.contains(&Collection::Enrollments);
        let mut plan = Vec::new();
        for collection in collections {
            plan.push((collection, db::collection_ids(&self.db, collection).await?));
        }

        let result = self.deleter.delete_plan(plan).await;

        // seats follow whatever enrollments survived, even after a failed group
        let recount = if touches_enrollments {
            courses::recount_enrolled(&self.db).await.map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = self.feed.refresh(&self.db).await {
            warn!("pending feed refresh failed: {}", e);
        }

        let summary = match result {
            Ok(summary) => summary,
            Err(interrupted) => {
                if let Err(e) = recount {
                    warn!("enrolled recount failed: {}", e);
                }
                return Err(interrupted.into());
            }
        };
        recount?;

        info!(deleted = summary.total_deleted, "collections reset");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_course, seed_season, setup_test_db};
    use crate::models::Role;
    use crate::services::enrollment::EnrollmentWorkflow;

    fn root() -> Principal {
        Principal::new("root", Role::Superadmin)
    }

    #[test]
    fn test_reset_plan_cascades_from_courses() {
        assert_eq!(reset_plan(Some(Collection::Courses)), Collection::DELETION_ORDER.to_vec());
        assert_eq!(reset_plan(None), Collection::DELETION_ORDER.to_vec());
        assert_eq!(reset_plan(Some(Collection::Attendance)), vec![Collection::Attendance]);
    }

    #[tokio::test]
    async fn test_reset_enrollments_frees_seats() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 2).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());
        let e = workflow.submit("stu-1", &course.id).await.unwrap();
        workflow.approve(&e.id, &root()).await.unwrap();

        let service = MaintenanceService::new(pool.clone(), PendingFeed::new(), 450);
        let summary = service.reset(Some(Collection::Enrollments), &root()).await.unwrap();
        assert_eq!(summary.total_deleted, 1);

        let counts = service.counts().await.unwrap();
        assert_eq!(counts, CollectionCounts { courses: 1, enrollments: 0, attendance: 0 });
        let course = courses::find_course(&pool, &course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled, 0);
    }

    #[tokio::test]
    async fn test_interrupted_reset_still_recounts_seats() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 3).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());
        for student in ["stu-1", "stu-2"] {
            let e = workflow.submit(student, &course.id).await.unwrap();
            workflow.approve(&e.id, &root()).await.unwrap();
        }

        // sorts after every uuid, so its group runs last and fails
        sqlx::query(
            "INSERT INTO enrollments (id, student_id, course_id, season_id, status, created_at) \
             VALUES ('zzz-held', 'stu-held', ?1, ?2, 'pending', '2025-03-01T00:00:00Z')",
        )
        .bind(&course.id)
        .bind(&season.id)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TRIGGER hold_enrollment BEFORE DELETE ON enrollments \
             WHEN old.id = 'zzz-held' BEGIN SELECT RAISE(ABORT, 'held'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let service = MaintenanceService::new(pool.clone(), PendingFeed::new(), 1);
        let result = service.reset(Some(Collection::Enrollments), &root()).await;
        assert!(matches!(result, Err(AppError::PartialDeletion { deleted: 2, .. })));

        let course = courses::find_course(&pool, &course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled, 0);
        assert_eq!(db::count_collection(&pool, Collection::Enrollments).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reset_all_requires_superadmin() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        seed_course(&pool, &season.id, 2).await;
        let service = MaintenanceService::new(pool.clone(), PendingFeed::new(), 450);

        let denied = service.reset(None, &Principal::new("a1", Role::Admin)).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let summary = service.reset(None, &root()).await.unwrap();
        assert_eq!(summary.total_deleted, 1);
        assert_eq!(summary.collections.len(), 3);
        assert!(crate::db::seasons::find_season(&pool, &season.id).await.unwrap().is_some());
    }
}
