use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use crate::models::{
    BatchReport, Category, Day, ItemOutcome, Level, NewCourseRequest, Principal, ScheduleSlot,
};
use crate::services::course::CourseService;
use crate::services::schedule::validate_schedule;

/// One loosely typed spreadsheet row, keyed by column header.
pub type Row = Map<String, Value>;

pub const DEFAULT_CAPACITY: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    /// 1-based position in the uploaded rows.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub candidates: Vec<NewCourseRequest>,
    pub dropped: usize,
    pub rejections: Vec<RowRejection>,
}

/// Normalizes every row and keeps the ones that make a valid course.
pub fn normalize_rows(rows: &[Row]) -> ImportPreview {
    let mut candidates = Vec::new();
    let mut rejections = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => {
                debug!(row = index + 1, "dropping import row: {}", reason);
                rejections.push(RowRejection {
                    row: index + 1,
                    reason,
                });
            }
        }
    }

    ImportPreview {
        candidates,
        dropped: rejections.len(),
        rejections,
    }
}

pub fn normalize_row(row: &Row) -> Result<NewCourseRequest, String> {
    let title = text(row, &["title", "coursetitle", "course"]).unwrap_or_default();
    let instructor = text(row, &["instructor", "teacher"]).unwrap_or_default();
    if title.is_empty() {
        return Err("title is blank".to_string());
    }
    if instructor.is_empty() {
        return Err("instructor is blank".to_string());
    }

    let category = text(row, &["category"])
        .and_then(|c| Category::parse(&c))
        .unwrap_or(Category::FALLBACK);
    let level = text(row, &["level"])
        .and_then(|l| Level::parse(&l))
        .unwrap_or(Level::FALLBACK);
    let room = text(row, &["room", "classroom"]).filter(|r| !r.is_empty());
    let capacity = integer(row, &["capacity"]).unwrap_or(DEFAULT_CAPACITY);

    let schedule = match text(row, &["schedule"]).filter(|s| !s.is_empty()) {
        Some(notation) => parse_schedule(&notation),
        None => legacy_slot(row).into_iter().collect(),
    };
    if schedule.is_empty() {
        return Err("no schedule slot could be read".to_string());
    }
    validate_schedule(&schedule).map_err(|v| v.to_string())?;

    Ok(NewCourseRequest {
        title,
        instructor,
        category,
        level,
        room,
        capacity,
        schedule,
    })
}

/// Parses `Mon 1~2, Wed 3~4`. Pieces that cannot be read are skipped.
pub fn parse_schedule(notation: &str) -> Vec<ScheduleSlot> {
    notation
        .split([',', ';', '\n'])
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .filter_map(|piece| {
            let slot = parse_slot(piece);
            if slot.is_none() {
                debug!("unreadable schedule piece {:?}", piece);
            }
            slot
        })
        .collect()
}

/// One `day start~end` piece; `day n` is the single period `n~n`.
fn parse_slot(piece: &str) -> Option<ScheduleSlot> {
    let (day, periods) = match piece.split_once(char::is_whitespace) {
        Some((day, periods)) => (day, periods.trim()),
        // Korean notation often drops the space: `월1~2`
        None => {
            let split = piece.find(|c: char| c.is_ascii_digit())?;
            piece.split_at(split)
        }
    };
    let day = Day::parse(day)?;

    let (start, end) = match periods.split_once(['~', '-']) {
        Some((start, end)) => (start.trim().parse().ok()?, end.trim().parse().ok()?),
        None => {
            let period = periods.trim().parse().ok()?;
            (period, period)
        }
    };

    Some(ScheduleSlot::new(day, start, end))
}

/// The older template carried a single `day / startPeriod / endPeriod` triple.
fn legacy_slot(row: &Row) -> Option<ScheduleSlot> {
    let day = text(row, &["day", "dayofweek"]).and_then(|d| Day::parse(&d))?;
    let start = integer(row, &["startperiod", "start"])?;
    let end = integer(row, &["endperiod", "end"]).unwrap_or(start);
    Some(ScheduleSlot::new(
        day,
        u32::try_from(start).ok()?,
        u32::try_from(end).ok()?,
    ))
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup<'a>(row: &'a Row, aliases: &[&str]) -> Option<&'a Value> {
    row.iter()
        .find(|(key, _)| aliases.contains(&normalize_key(key).as_str()))
        .map(|(_, value)| value)
}

fn text(row: &Row, aliases: &[&str]) -> Option<String> {
    match lookup(row, aliases)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn integer(row: &Row, aliases: &[&str]) -> Option<i64> {
    match lookup(row, aliases)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

pub struct ImportService {
    courses: CourseService,
}

impl ImportService {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            courses: CourseService::new(db),
        }
    }

    /// Creates each candidate through normal course creation. One failure
    /// never undoes or blocks the others.
    #[instrument(skip(self, candidates, principal), fields(count = candidates.len()))]
    pub async fn create_many(
        &self,
        season_id: &str,
        candidates: Vec<NewCourseRequest>,
        principal: &Principal,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for candidate in candidates {
            let title = candidate.title.clone();
            let result = self.courses.create_course(season_id, candidate, principal).await;
            if let Err(e) = &result {
                warn!(%title, "import item failed: {}", e);
            }
            report.push(ItemOutcome::from_result(title, &result));
        }

        info!(
            "Import finished - {} created, {} failed",
            report.succeeded, report.failed
        );
        report
    }

    /// Normalizes then creates; rows dropped during normalization are
    /// returned alongside the creation report, which is empty when every
    /// row was dropped.
    pub async fn import_rows(&self, season_id: &str, rows: &[Row], principal: &Principal) -> ImportResult {
        let preview = normalize_rows(rows);
        if preview.candidates.is_empty() {
            warn!(rows = rows.len(), "no importable rows");
        }

        let report = self
            .create_many(season_id, preview.candidates, principal)
            .await;
        ImportResult {
            dropped: preview.dropped,
            rejections: preview.rejections,
            report,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub dropped: usize,
    pub rejections: Vec<RowRejection>,
    pub report: BatchReport,
}
