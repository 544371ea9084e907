use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::db::{courses, seasons};
use crate::error::{AppError, Conflict};
use crate::models::{Course, NewCourseRequest, Principal, Season, UpdateCourseRequest};
use crate::services::schedule::validate_schedule;

/// Trims text fields and checks everything a course needs before it is stored.
pub fn validate_course(mut req: NewCourseRequest) -> Result<NewCourseRequest, AppError> {
    req.title = req.title.trim().to_string();
    req.instructor = req.instructor.trim().to_string();
    req.room = req
        .room
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    if req.title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if req.instructor.is_empty() {
        return Err(AppError::validation("instructor is required"));
    }
    if req.capacity < 1 {
        return Err(AppError::validation(format!(
            "capacity must be a positive number, got {}",
            req.capacity
        )));
    }
    validate_schedule(&req.schedule)?;

    Ok(req)
}

pub struct CourseService {
    db: SqlitePool,
}

impl CourseService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn mutable_season(&self, season_id: &str) -> Result<Season, AppError> {
        let season = seasons::find_season(&self.db, season_id)
            .await?
            .ok_or(AppError::NotFound("season"))?;
        season.ensure_mutable()?;
        Ok(season)
    }

    /// Why a season-guarded write touched no row: the season is missing or
    /// was archived before the write landed.
    async fn closed_season(&self, season_id: &str) -> AppError {
        match self.mutable_season(season_id).await {
            Err(e) => e,
            Ok(_) => Conflict::SeasonArchived.into(),
        }
    }

    #[instrument(skip(self, req, principal), fields(admin = %principal.admin_id))]
    pub async fn create_course(
        &self,
        season_id: &str,
        req: NewCourseRequest,
        principal: &Principal,
    ) -> Result<Course, AppError> {
        let req = validate_course(req)?;

        let Some(course) = courses::insert_course(&self.db, season_id, req).await? else {
            return Err(self.closed_season(season_id).await);
        };
        info!(course_id = %course.id, title = %course.title, "course created");
        Ok(course)
    }

    /// Last write wins on every field except the `enrolled` counter.
    #[instrument(skip(self, req, principal), fields(admin = %principal.admin_id))]
    pub async fn update_course(
        &self,
        course_id: &str,
        req: UpdateCourseRequest,
        principal: &Principal,
    ) -> Result<Course, AppError> {
        let current = self.get_course(course_id).await?;
        self.mutable_season(&current.season_id).await?;

        let merged = validate_course(NewCourseRequest {
            title: req.title.unwrap_or(current.title),
            instructor: req.instructor.unwrap_or(current.instructor),
            category: req.category.unwrap_or(current.category),
            level: req.level.unwrap_or(current.level),
            room: req.room.or(current.room),
            capacity: req.capacity.unwrap_or(current.capacity),
            schedule: req.schedule.unwrap_or(current.schedule),
        })?;

        let updated = Course {
            id: current.id,
            season_id: current.season_id,
            title: merged.title,
            instructor: merged.instructor,
            category: merged.category,
            level: merged.level,
            room: merged.room,
            capacity: merged.capacity,
            enrolled: current.enrolled,
            schedule: merged.schedule,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };

        if !courses::update_course(&self.db, &updated).await? {
            let latest = self.get_course(course_id).await?;
            self.mutable_season(&latest.season_id).await?;
            return Err(AppError::validation(format!(
                "capacity {} is below the {} seats already taken",
                updated.capacity, latest.enrolled
            )));
        }

        self.get_course(course_id).await
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Course, AppError> {
        courses::find_course(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound("course"))
    }

    pub async fn list_courses(&self, season_id: &str) -> Result<Vec<Course>, AppError> {
        seasons::find_season(&self.db, season_id)
            .await?
            .ok_or(AppError::NotFound("season"))?;
        Ok(courses::list_courses_by_season(&self.db, season_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{course_request, seed_season, setup_test_db};
    use crate::models::{Day, Role, ScheduleSlot};

    fn admin() -> Principal {
        Principal::new("admin-1", Role::Admin)
    }

    #[test]
    fn test_validate_trims_and_requires_fields() {
        let mut req = course_request("  Algebra  ", 10);
        req.room = Some("   ".to_string());
        let req = validate_course(req).unwrap();
        assert_eq!(req.title, "Algebra");
        assert_eq!(req.room, None);

        let mut blank = course_request("Algebra", 10);
        blank.instructor = " ".to_string();
        assert!(matches!(validate_course(blank), Err(AppError::Validation(_))));

        assert!(matches!(
            validate_course(course_request("Algebra", 0)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_overlapping_slots() {
        let mut req = course_request("Algebra", 10);
        req.schedule = vec![
            ScheduleSlot::new(Day::Mon, 1, 2),
            ScheduleSlot::new(Day::Mon, 2, 3),
        ];
        assert!(matches!(validate_course(req), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_counter_and_merges_fields() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let service = CourseService::new(pool.clone());

        let course = service
            .create_course(&season.id, course_request("Algebra", 10), &admin())
            .await
            .unwrap();
        courses::take_seat(&pool, &course.id).await.unwrap();
        courses::take_seat(&pool, &course.id).await.unwrap();

        let updated = service
            .update_course(
                &course.id,
                UpdateCourseRequest {
                    instructor: Some("Lee".to_string()),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();
        assert_eq!(updated.instructor, "Lee");
        assert_eq!(updated.title, "Algebra");
        assert_eq!(updated.enrolled, 2);

        let shrink = service
            .update_course(
                &course.id,
                UpdateCourseRequest {
                    capacity: Some(1),
                    ..Default::default()
                },
                &admin(),
            )
            .await;
        assert!(matches!(shrink, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_with_blank_room_clears_it() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let service = CourseService::new(pool.clone());
        let course = service
            .create_course(&season.id, course_request("Algebra", 10), &admin())
            .await
            .unwrap();
        assert_eq!(course.room.as_deref(), Some("101"));

        let kept = service
            .update_course(&course.id, UpdateCourseRequest::default(), &admin())
            .await
            .unwrap();
        assert_eq!(kept.room.as_deref(), Some("101"));

        let cleared = service
            .update_course(
                &course.id,
                UpdateCourseRequest {
                    room: Some(String::new()),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();
        assert_eq!(cleared.room, None);
    }

    #[tokio::test]
    async fn test_update_in_archived_season_fails() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        let service = CourseService::new(pool.clone());
        let course = service
            .create_course(&season.id, course_request("Algebra", 10), &admin())
            .await
            .unwrap();
        seasons::mark_archived(&pool, &season.id, Utc::now()).await.unwrap();

        let result = service
            .update_course(
                &course.id,
                UpdateCourseRequest {
                    title: Some("Algebra II".to_string()),
                    ..Default::default()
                },
                &admin(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(Conflict::SeasonArchived))));
    }

    #[tokio::test]
    async fn test_create_in_unknown_season_is_not_found() {
        let pool = setup_test_db().await;
        let result = CourseService::new(pool)
            .create_course("missing", course_request("Algebra", 10), &admin())
            .await;
        assert!(matches!(result, Err(AppError::NotFound("season"))));
    }

    #[tokio::test]
    async fn test_create_in_archived_season_fails() {
        let pool = setup_test_db().await;
        let season = seed_season(&pool).await;
        seasons::mark_archived(&pool, &season.id, Utc::now()).await.unwrap();

        let result = CourseService::new(pool)
            .create_course(&season.id, course_request("Algebra", 10), &admin())
            .await;
        assert!(matches!(result, Err(AppError::Conflict(Conflict::SeasonArchived))));
    }
}
