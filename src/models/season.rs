use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, Conflict};

/// Figures frozen at archival time. They outlive the purge of the season's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonStats {
    pub total_courses: i64,
    pub total_students: i64,
    pub approved_enrollments: i64,
}

/// Lifecycle of a season. Archival and purge are one-way, and a purged
/// season is always an archived one, so the flags live in a single enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeasonState {
    Open { active: bool },
    Archived { archived_at: DateTime<Utc>, stats: SeasonStats },
    Purged { archived_at: DateTime<Utc>, stats: SeasonStats },
}

#[derive(Debug, Clone, Serialize)]
pub struct Season {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub state: SeasonState,
    pub created_at: DateTime<Utc>,
}

impl Season {
    pub fn is_active(&self) -> bool {
        matches!(self.state, SeasonState::Open { active: true })
    }

    pub fn is_archived(&self) -> bool {
        !matches!(self.state, SeasonState::Open { .. })
    }

    pub fn is_purged(&self) -> bool {
        matches!(self.state, SeasonState::Purged { .. })
    }

    pub fn stats(&self) -> Option<SeasonStats> {
        match self.state {
            SeasonState::Open { .. } => None,
            SeasonState::Archived { stats, .. } | SeasonState::Purged { stats, .. } => Some(stats),
        }
    }

    /// Courses, enrollments and attendance may only change while this holds.
    pub fn ensure_mutable(&self) -> Result<(), AppError> {
        if self.is_archived() {
            return Err(Conflict::SeasonArchived.into());
        }
        Ok(())
    }
}

/// Flat table shape of a season.
#[derive(Debug, Clone, FromRow)]
pub struct SeasonRow {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub data_deleted: bool,
    pub stats_total_courses: Option<i64>,
    pub stats_total_students: Option<i64>,
    pub stats_approved_enrollments: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SeasonRow> for Season {
    type Error = AppError;

    fn try_from(row: SeasonRow) -> Result<Self, Self::Error> {
        let state = if !row.archived {
            if row.data_deleted {
                return Err(AppError::Internal(format!(
                    "season {} is purged but not archived",
                    row.id
                )));
            }
            SeasonState::Open { active: row.active }
        } else {
            let archived_at = row.archived_at.ok_or_else(|| {
                AppError::Internal(format!("season {} has no archive timestamp", row.id))
            })?;
            let stats = match (
                row.stats_total_courses,
                row.stats_total_students,
                row.stats_approved_enrollments,
            ) {
                (Some(total_courses), Some(total_students), Some(approved_enrollments)) => {
                    SeasonStats {
                        total_courses,
                        total_students,
                        approved_enrollments,
                    }
                }
                _ => {
                    return Err(AppError::Internal(format!(
                        "season {} is archived without stats",
                        row.id
                    )));
                }
            };
            if row.data_deleted {
                SeasonState::Purged { archived_at, stats }
            } else {
                SeasonState::Archived { archived_at, stats }
            }
        };

        Ok(Season {
            id: row.id,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            state,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSeasonRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SeasonRow {
        SeasonRow {
            id: "s1".to_string(),
            name: "2025 Spring".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            active: true,
            archived: false,
            archived_at: None,
            data_deleted: false,
            stats_total_courses: None,
            stats_total_students: None,
            stats_approved_enrollments: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_row_converts() {
        let season = Season::try_from(row()).unwrap();
        assert!(season.is_active());
        assert!(!season.is_archived());
        assert!(season.ensure_mutable().is_ok());
        assert!(season.stats().is_none());
    }

    #[test]
    fn test_purged_row_keeps_stats() {
        let mut r = row();
        r.archived = true;
        r.archived_at = Some(Utc::now());
        r.data_deleted = true;
        r.stats_total_courses = Some(4);
        r.stats_total_students = Some(11);
        r.stats_approved_enrollments = Some(15);

        let season = Season::try_from(r).unwrap();
        assert!(season.is_purged());
        assert!(!season.is_active());
        assert_eq!(season.stats().unwrap().total_students, 11);
        assert!(matches!(
            season.ensure_mutable(),
            Err(AppError::Conflict(Conflict::SeasonArchived))
        ));
    }

    #[test]
    fn test_purged_without_archive_is_rejected() {
        let mut r = row();
        r.data_deleted = true;
        assert!(Season::try_from(r).is_err());
    }
}
