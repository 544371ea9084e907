use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::db::{courses, enrollments, seasons};
use crate::error::{AppError, Conflict, is_unique_violation};
use crate::models::{BatchReport, Enrollment, ItemOutcome, Principal};
use crate::services::pending_feed::{PendingFeed, PendingSubscription};

/// Enrollment lifecycle: `pending → approved | rejected | cancelled`, all
/// three terminal. Seats are only taken on approval.
pub struct EnrollmentWorkflow {
    db: SqlitePool,
    feed: PendingFeed,
}

impl EnrollmentWorkflow {
    pub fn new(db: SqlitePool, feed: PendingFeed) -> Self {
        Self { db, feed }
    }

    /// Capacity is not checked here; it is enforced when an admin approves.
    #[instrument(skip(self))]
    pub async fn submit(&self, student_id: &str, course_id: &str) -> Result<Enrollment, AppError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(AppError::validation("student id is required"));
        }

        let course = courses::find_course(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let inserted =
            enrollments::insert_enrollment(&self.db, student_id, &course.id, &course.season_id)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::Conflict(Conflict::DuplicateActiveEnrollment)
                    } else {
                        AppError::Database(e)
                    }
                })?;
        let Some(enrollment) = inserted else {
            return Err(self.closed_season(&course.season_id).await);
        };

        info!(enrollment_id = %enrollment.id, "enrollment submitted");
        self.publish().await;
        Ok(enrollment)
    }

    /// Approves and takes a seat in one transaction. The status change and
    /// the seat increment are both conditional writes, so concurrent
    /// approvals can never push `enrolled` past `capacity`.
    #[instrument(skip(self, principal), fields(admin = %principal.admin_id))]
    pub async fn approve(&self, enrollment_id: &str, principal: &Principal) -> Result<Enrollment, AppError> {
        let mut tx = self.db.begin().await?;

        // write first so the transaction holds the write lock from the start
        if !enrollments::mark_approved(&mut *tx, enrollment_id, &principal.admin_id).await? {
            tx.rollback().await?;
            return Err(self.refusal(enrollment_id).await);
        }

        let enrollment = enrollments::find_enrollment(&mut *tx, enrollment_id)
            .await?
            .ok_or(AppError::NotFound("enrollment"))?;

        let season = seasons::find_season(&mut *tx, &enrollment.season_id)
            .await?
            .ok_or(AppError::NotFound("season"))?;
        if season.is_archived() {
            tx.rollback().await?;
            return Err(Conflict::SeasonArchived.into());
        }

        if !courses::take_seat(&mut *tx, &enrollment.course_id).await? {
            tx.rollback().await?;
            info!(course_id = %enrollment.course_id, "approval refused, course is full");
            return Err(Conflict::CourseFull.into());
        }

        tx.commit().await?;

        info!(course_id = %enrollment.course_id, "enrollment approved");
        self.publish().await;
        Ok(enrollment)
    }

    #[instrument(skip(self, principal, reason), fields(admin = %principal.admin_id))]
    pub async fn reject(
        &self,
        enrollment_id: &str,
        principal: &Principal,
        reason: &str,
    ) -> Result<Enrollment, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("a rejection reason is required"));
        }

        if !enrollments::mark_rejected(&self.db, enrollment_id, &principal.admin_id, reason).await? {
            return Err(self.refusal(enrollment_id).await);
        }

        info!("enrollment rejected");
        self.publish().await;
        self.get_enrollment(enrollment_id).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, enrollment_id: &str) -> Result<Enrollment, AppError> {
        if !enrollments::mark_cancelled(&self.db, enrollment_id).await? {
            return Err(self.refusal(enrollment_id).await);
        }

        info!("enrollment cancelled");
        self.publish().await;
        self.get_enrollment(enrollment_id).await
    }

    /// Approves each id on its own, in order. Earlier successes stay in place
    /// when a later id fails.
    #[instrument(skip(self, enrollment_ids, principal), fields(count = enrollment_ids.len()))]
    pub async fn batch_approve(&self, enrollment_ids: &[String], principal: &Principal) -> BatchReport {
        let mut report = BatchReport::default();
        for id in enrollment_ids {
            let result = self.approve(id, principal).await;
            if let Err(e) = &result {
                warn!(enrollment_id = %id, "batch approval item failed: {}", e);
            }
            report.push(ItemOutcome::from_result(id.clone(), &result));
        }

        info!(
            "Batch approval finished - {} approved, {} failed",
            report.succeeded, report.failed
        );
        report
    }

    pub async fn get_enrollment(&self, enrollment_id: &str) -> Result<Enrollment, AppError> {
        enrollments::find_enrollment(&self.db, enrollment_id)
            .await?
            .ok_or(AppError::NotFound("enrollment"))
    }

    pub async fn list_pending(&self) -> Result<Vec<Enrollment>, AppError> {
        Ok(enrollments::fetch_pending(&self.db).await?)
    }

    /// Live view of the review queue, primed with the current pending set.
    pub async fn subscribe_pending(&self) -> Result<PendingSubscription, AppError> {
        self.feed.refresh(&self.db).await?;
        Ok(self.feed.subscribe())
    }

    /// Approved enrollees of a course.
    pub async fn roster(&self, course_id: &str) -> Result<Vec<Enrollment>, AppError> {
        courses::find_course(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound("course"))?;
        Ok(enrollments::fetch_roster(&self.db, course_id).await?)
    }

    /// A guarded insert only misses when the season is gone or archived.
    async fn closed_season(&self, season_id: &str) -> AppError {
        match seasons::find_season(&self.db, season_id).await {
            Ok(Some(_)) => Conflict::SeasonArchived.into(),
            Ok(None) => AppError::NotFound("season"),
            Err(e) => e,
        }
    }

    /// Why a status transition touched no row. An archived season wins over
    /// a status that is no longer pending.
    async fn refusal(&self, enrollment_id: &str) -> AppError {
        match enrollments::find_enrollment(&self.db, enrollment_id).await {
            Ok(Some(enrollment)) => match seasons::find_season(&self.db, &enrollment.season_id).await {
                Ok(Some(season)) if season.is_archived() => Conflict::SeasonArchived.into(),
                Ok(_) => Conflict::NotPending.into(),
                Err(e) => e,
            },
            Ok(None) => AppError::NotFound("enrollment"),
            Err(e) => AppError::Database(e),
        }
    }

    async fn publish(&self) {
        if let Err(e) = self.feed.refresh(&self.db).await {
            warn!("pending feed refresh failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_course, seed_season, setup_test_db};
    use crate::models::{EnrollmentStatus, Role};
    use chrono::Utc;

    fn admin() -> Principal {
        Principal::new("admin-1", Role::Admin)
    }

    #[tokio::test]
    async fn test_approve_takes_a_seat() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 1).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());

        let enrollment = workflow.submit("stu-1", &course.id).await.unwrap();
        let approved = workflow.approve(&enrollment.id, &admin()).await.unwrap();
        assert_eq!(approved.status, EnrollmentStatus::Approved);
        assert_eq!(approved.decided_by.as_deref(), Some("admin-1"));

        let course = courses::find_course(&pool, &course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled, 1);

        let again = workflow.approve(&enrollment.id, &admin()).await;
        assert!(matches!(again, Err(AppError::Conflict(Conflict::NotPending))));
    }

    #[tokio::test]
    async fn test_full_course_leaves_enrollment_pending() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 1).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());

        let first = workflow.submit("stu-1", &course.id).await.unwrap();
        let second = workflow.submit("stu-2", &course.id).await.unwrap();
        workflow.approve(&first.id, &admin()).await.unwrap();

        let result = workflow.approve(&second.id, &admin()).await;
        assert!(matches!(result, Err(AppError::Conflict(Conflict::CourseFull))));

        let second = workflow.get_enrollment(&second.id).await.unwrap();
        assert_eq!(second.status, EnrollmentStatus::Pending);
        assert!(second.decided_by.is_none());
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 3).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());
        let enrollment = workflow.submit("stu-1", &course.id).await.unwrap();

        let blank = workflow.reject(&enrollment.id, &admin(), "   ").await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let rejected = workflow
            .reject(&enrollment.id, &admin(), "prerequisite missing")
            .await
            .unwrap();
        assert_eq!(rejected.status, EnrollmentStatus::Rejected);

        let course = courses::find_course(&pool, &course.id).await.unwrap().unwrap();
        assert_eq!(course.enrolled, 0);
    }

    #[tokio::test]
    async fn test_unknown_enrollment_is_not_found() {
        let pool = setup_test_db().await;
        let workflow = EnrollmentWorkflow::new(pool, PendingFeed::new());
        let result = workflow.approve("missing", &admin()).await;
        assert!(matches!(result, Err(AppError::NotFound("enrollment"))));
    }

    #[tokio::test]
    async fn test_archived_season_blocks_decisions() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 3).await;
        let workflow = EnrollmentWorkflow::new(pool.clone(), PendingFeed::new());
        let enrollment = workflow.submit("stu-1", &course.id).await.unwrap();

        seasons::mark_archived(&pool, &season.id, Utc::now()).await.unwrap();

        let approve = workflow.approve(&enrollment.id, &admin()).await;
        assert!(matches!(approve, Err(AppError::Conflict(Conflict::SeasonArchived))));
        let cancel = workflow.cancel(&enrollment.id).await;
        assert!(matches!(cancel, Err(AppError::Conflict(Conflict::SeasonArchived))));
        let submit = workflow.submit("stu-2", &course.id).await;
        assert!(matches!(submit, Err(AppError::Conflict(Conflict::SeasonArchived))));

        // the failed approval was rolled back
        let enrollment = workflow.get_enrollment(&enrollment.id).await.unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_feed_follows_decisions() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let course = seed_course(&pool, &season.id, 3).await;
        let feed = PendingFeed::new();
        let workflow = EnrollmentWorkflow::new(pool.clone(), feed.clone());

        let mut sub = workflow.subscribe_pending().await.unwrap();
        assert!(sub.current().is_empty());

        let enrollment = workflow.submit("stu-1", &course.id).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        workflow.cancel(&enrollment.id).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());
    }
}
