use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: String,
    pub course_id: String,
    pub student_id: String,
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub recorded_by: String,
    pub updated_at: DateTime<Utc>,
}

/// One roster line as submitted from the attendance sheet. `status: None`
/// means nothing was selected for that student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSetAttendanceRequest {
    pub date: NaiveDate,
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
    pub total: i64,
    pub sessions: i64,
    /// Percentage of records marked present, rounded half-up.
    pub rate: i64,
}

impl AttendanceStats {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
        self.total += 1;
        self.rate = present_rate(self.present, self.total);
    }
}

/// `round_half_up(present * 100 / total)`; zero when nothing is recorded.
pub fn present_rate(present: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (present * 200 + total) / (total * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_rounds_half_up() {
        assert_eq!(present_rate(0, 0), 0);
        assert_eq!(present_rate(1, 8), 13); // 12.5
        assert_eq!(present_rate(1, 3), 33); // 33.33
        assert_eq!(present_rate(2, 3), 67); // 66.67
        assert_eq!(present_rate(1, 200), 1); // 0.5
        assert_eq!(present_rate(5, 5), 100);
    }

    #[test]
    fn test_record_updates_rate() {
        let mut stats = AttendanceStats::default();
        stats.record(AttendanceStatus::Present);
        stats.record(AttendanceStatus::Late);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.rate, 50);
    }
}
