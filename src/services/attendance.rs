use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::db::{attendance, courses, enrollments, seasons};
use crate::error::{AppError, Conflict};
use crate::models::{
    AttendanceEntry, AttendanceRecord, AttendanceStats, AttendanceStatus, Course, Principal,
};

type Mark = (String, AttendanceStatus, Option<String>);

/// Entries that carry a status, one per student in first-seen order, each
/// holding that student's last entry.
fn latest_per_student(entries: Vec<AttendanceEntry>) -> Vec<Mark> {
    let mut marks: Vec<Mark> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        let Some(status) = entry.status else {
            continue;
        };
        let mark = (entry.student_id, status, entry.note);
        match index.get(&mark.0) {
            Some(&i) => marks[i] = mark,
            None => {
                index.insert(mark.0.clone(), marks.len());
                marks.push(mark);
            }
        }
    }
    marks
}

pub struct AttendanceTracker {
    db: SqlitePool,
}

impl AttendanceTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn course(&self, course_id: &str) -> Result<Course, AppError> {
        courses::find_course(&self.db, course_id)
            .await?
            .ok_or(AppError::NotFound("course"))
    }

    /// Records already taken for the session. Students without a record are
    /// left out rather than reported as absent.
    pub async fn get_for_date(
        &self,
        course_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        self.course(course_id).await?;
        Ok(attendance::fetch_for_date(&self.db, course_id, date).await?)
    }

    /// Upserts one record per student that has a status. Entries without a
    /// status are skipped; if none remain, nothing is written. A student
    /// listed twice keeps the last entry.
    #[instrument(skip(self, entries, principal), fields(admin = %principal.admin_id))]
    pub async fn bulk_set(
        &self,
        course_id: &str,
        date: NaiveDate,
        entries: Vec<AttendanceEntry>,
        principal: &Principal,
    ) -> Result<usize, AppError> {
        let selected = latest_per_student(entries);
        if selected.is_empty() {
            return Err(AppError::validation("nothing to save: no attendance status selected"));
        }

        let course = self.course(course_id).await?;
        let roster: HashSet<String> = enrollments::fetch_roster(&self.db, course_id)
            .await?
            .into_iter()
            .map(|e| e.student_id)
            .collect();
        if let Some((student_id, _, _)) = selected.iter().find(|(s, _, _)| !roster.contains(s)) {
            return Err(AppError::validation(format!(
                "student {student_id} is not an approved enrollee of this course"
            )));
        }

        let mut tx = self.db.begin().await?;
        for (student_id, status, note) in &selected {
            let note = note.as_deref().map(str::trim).filter(|n| !n.is_empty());
            attendance::upsert_record(
                &mut *tx,
                course_id,
                student_id,
                date,
                *status,
                note,
                &principal.admin_id,
            )
            .await?;
        }

        // checked after the writes so an archival cannot land in between
        let season = seasons::find_season(&mut *tx, &course.season_id)
            .await?
            .ok_or(AppError::NotFound("season"))?;
        if season.is_archived() {
            tx.rollback().await?;
            return Err(Conflict::SeasonArchived.into());
        }
        tx.commit().await?;

        info!(%date, saved = selected.len(), "attendance saved");
        Ok(selected.len())
    }

    /// Full recount over every recorded session of the course.
    pub async fn stats(&self, course_id: &str) -> Result<AttendanceStats, AppError> {
        self.course(course_id).await?;
        let rows = attendance::fetch_statuses(&self.db, course_id).await?;

        let mut stats = AttendanceStats::default();
        let mut sessions: HashMap<NaiveDate, usize> = HashMap::new();
        for (status, date) in rows {
            stats.record(status);
            *sessions.entry(date).or_default() += 1;
        }
        stats.sessions = sessions.len() as i64;

        Ok(stats)
    }
}
