#![allow(dead_code)]

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tempfile::TempDir;

use academy::db;
use academy::models::{
    Category, Course, Day, Level, NewCourseRequest, NewSeasonRequest, Principal, Role,
    ScheduleSlot, Season,
};

pub async fn setup_test_db() -> SqlitePool {
    db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create test db")
}

/// On-disk database behind a multi-connection pool, for tests where writers
/// must really overlap. The directory is removed when this is dropped.
pub struct FileDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup_file_db(max_connections: u32) -> FileDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("academy.db").display());
    let pool = db::connect(&url, max_connections)
        .await
        .expect("Failed to create file db");
    FileDb { pool, _dir: dir }
}

pub fn superadmin() -> Principal {
    Principal::new("root", Role::Superadmin)
}

pub fn admin() -> Principal {
    Principal::new("staff", Role::Admin)
}

pub async fn seed_admins(pool: &SqlitePool) {
    db::admins::insert_admin(pool, "root", "root@academy.test", "Root", Role::Superadmin)
        .await
        .expect("Failed to insert superadmin");
    db::admins::insert_admin(pool, "staff", "staff@academy.test", "Staff", Role::Admin)
        .await
        .expect("Failed to insert admin");
}

pub async fn seed_season(pool: &SqlitePool, name: &str) -> Season {
    db::seasons::insert_season(
        pool,
        NewSeasonRequest {
            name: name.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        },
    )
    .await
    .expect("Failed to insert season")
}

pub fn course_request(title: &str, capacity: i64, day: Day) -> NewCourseRequest {
    NewCourseRequest {
        title: title.to_string(),
        instructor: "Kim".to_string(),
        category: Category::Math,
        level: Level::Beginner,
        room: None,
        capacity,
        schedule: vec![ScheduleSlot::new(day, 1, 2)],
    }
}

pub async fn seed_course(pool: &SqlitePool, season_id: &str, capacity: i64) -> Course {
    db::courses::insert_course(pool, season_id, course_request("Algebra", capacity, Day::Mon))
        .await
        .expect("Failed to insert course")
        .expect("Season is not open")
}
