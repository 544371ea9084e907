//! CSV reading and writing for course sheets.

use serde_json::Value;

use crate::error::AppError;
use crate::models::Course;
use crate::services::import::Row;

pub const COURSE_COLUMNS: [&str; 7] = [
    "title",
    "instructor",
    "category",
    "level",
    "room",
    "capacity",
    "schedule",
];

const TEMPLATE_EXAMPLE: [&str; 7] = [
    "Conversational English",
    "Kim",
    "language",
    "beginner",
    "201",
    "20",
    "Mon 1~2, Wed 1~2",
];

/// Reads a sheet whose first line is the header. Every cell becomes a string
/// value keyed by its header; rows with no content are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<Row>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::validation(format!("unreadable header row: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| AppError::validation(format!("unreadable row {}: {e}", index + 1)))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let mut row = Row::new();
        for (i, field) in record.iter().enumerate() {
            if let Some(header) = headers.get(i).filter(|h| !h.is_empty()) {
                row.insert(header.to_string(), Value::String(field.to_string()));
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

pub fn export_rows(columns: &[&str], rows: &[Vec<String>]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_record(&mut writer, columns)?;
    for row in rows {
        write_record(&mut writer, row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}

/// Header plus one filled-in example row.
pub fn template() -> Result<String, AppError> {
    let example: Vec<String> = TEMPLATE_EXAMPLE.iter().map(|s| s.to_string()).collect();
    export_rows(&COURSE_COLUMNS, &[example])
}

/// One row per course, in `COURSE_COLUMNS` order. The output imports back.
pub fn course_rows(courses: &[Course]) -> Vec<Vec<String>> {
    courses
        .iter()
        .map(|c| {
            vec![
                c.title.clone(),
                c.instructor.clone(),
                c.category.as_str().to_string(),
                c.level.as_str().to_string(),
                c.room.clone().unwrap_or_default(),
                c.capacity.to_string(),
                c.schedule_text(),
            ]
        })
        .collect()
}

fn write_record<W, I, T>(writer: &mut csv::Writer<W>, record: I) -> Result<(), AppError>
where
    W: std::io::Write,
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer
        .write_record(record)
        .map_err(|e| AppError::Internal(format!("csv write failed: {e}")))
}
