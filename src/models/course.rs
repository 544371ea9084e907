use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    /// Accepts English abbreviations or full names in any case, and Korean
    /// day names with or without the `요일` suffix.
    pub fn parse(input: &str) -> Option<Day> {
        let s = input.trim();
        let s = s.strip_suffix("요일").unwrap_or(s);
        let day = match s.to_lowercase().as_str() {
            "mon" | "monday" | "월" => Day::Mon,
            "tue" | "tues" | "tuesday" | "화" => Day::Tue,
            "wed" | "wednesday" | "수" => Day::Wed,
            "thu" | "thur" | "thurs" | "thursday" | "목" => Day::Thu,
            "fri" | "friday" | "금" => Day::Fri,
            "sat" | "saturday" | "토" => Day::Sat,
            "sun" | "sunday" | "일" => Day::Sun,
            _ => return None,
        };
        Some(day)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
            Day::Sun => "Sun",
        };
        f.write_str(s)
    }
}

/// One weekly meeting: `day`, periods `start_period..=end_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub day: Day,
    pub start_period: u32,
    pub end_period: u32,
}

impl ScheduleSlot {
    pub fn new(day: Day, start_period: u32, end_period: u32) -> Self {
        Self {
            day,
            start_period,
            end_period,
        }
    }
}

impl fmt::Display for ScheduleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}~{}", self.day, self.start_period, self.end_period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Language,
    Math,
    Science,
    Coding,
    Art,
    Music,
    Sports,
    Other,
}

impl Category {
    pub const FALLBACK: Category = Category::Other;

    pub fn parse(input: &str) -> Option<Category> {
        let category = match input.trim().to_lowercase().as_str() {
            "language" => Category::Language,
            "math" => Category::Math,
            "science" => Category::Science,
            "coding" => Category::Coding,
            "art" => Category::Art,
            "music" => Category::Music,
            "sports" => Category::Sports,
            "other" => Category::Other,
            _ => return None,
        };
        Some(category)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Language => "language",
            Category::Math => "math",
            Category::Science => "science",
            Category::Coding => "coding",
            Category::Art => "art",
            Category::Music => "music",
            Category::Sports => "sports",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const FALLBACK: Level = Level::Beginner;

    pub fn parse(input: &str) -> Option<Level> {
        let level = match input.trim().to_lowercase().as_str() {
            "beginner" => Level::Beginner,
            "intermediate" => Level::Intermediate,
            "advanced" => Level::Advanced,
            _ => return None,
        };
        Some(level)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub season_id: String,
    pub title: String,
    pub instructor: String,
    pub category: Category,
    pub level: Level,
    pub room: Option<String>,
    pub capacity: i64,
    pub enrolled: i64,
    #[sqlx(json)]
    pub schedule: Vec<ScheduleSlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn seats_left(&self) -> i64 {
        (self.capacity - self.enrolled).max(0)
    }

    /// Slots rendered in the compact `Mon 1~2, Wed 3~4` notation.
    pub fn schedule_text(&self) -> String {
        self.schedule
            .iter()
            .map(ScheduleSlot::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub title: String,
    pub instructor: String,
    pub category: Category,
    pub level: Level,
    pub room: Option<String>,
    pub capacity: i64,
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub instructor: Option<String>,
    pub category: Option<Category>,
    pub level: Option<Level>,
    /// Absent keeps the current room; a blank string clears it.
    pub room: Option<String>,
    pub capacity: Option<i64>,
    pub schedule: Option<Vec<ScheduleSlot>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_parse_variants() {
        assert_eq!(Day::parse("Mon"), Some(Day::Mon));
        assert_eq!(Day::parse(" thursday "), Some(Day::Thu));
        assert_eq!(Day::parse("화"), Some(Day::Tue));
        assert_eq!(Day::parse("토요일"), Some(Day::Sat));
        assert_eq!(Day::parse("someday"), None);
    }

    #[test]
    fn test_enum_fallbacks() {
        assert_eq!(Category::parse("MATH"), Some(Category::Math));
        assert_eq!(Category::parse("cooking"), None);
        assert_eq!(Level::parse("Advanced"), Some(Level::Advanced));
        assert_eq!(Level::parse(""), None);
    }

    #[test]
    fn test_schedule_text() {
        let now = Utc::now();
        let course = Course {
            id: "c1".into(),
            season_id: "s1".into(),
            title: "Algebra".into(),
            instructor: "Kim".into(),
            category: Category::Math,
            level: Level::Beginner,
            room: None,
            capacity: 10,
            enrolled: 12,
            schedule: vec![
                ScheduleSlot::new(Day::Mon, 1, 2),
                ScheduleSlot::new(Day::Wed, 3, 4),
            ],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(course.schedule_text(), "Mon 1~2, Wed 3~4");
        assert_eq!(course.seats_left(), 0);
    }
}
