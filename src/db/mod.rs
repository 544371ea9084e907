pub mod admins;
pub mod attendance;
pub mod courses;
pub mod enrollments;
pub mod seasons;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Opens the pool and brings the schema up to date.
///
/// Connections are never recycled, so `sqlite::memory:` pools (one
/// connection) keep their data for the life of the pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Tables that can be wiped by a collection reset. Seasons and admins never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Attendance,
    Enrollments,
    Courses,
}

impl Collection {
    /// Children before parents, the only order the foreign keys accept.
    pub const DELETION_ORDER: [Collection; 3] =
        [Collection::Attendance, Collection::Enrollments, Collection::Courses];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Attendance => "attendance_records",
            Collection::Enrollments => "enrollments",
            Collection::Courses => "courses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Collection::Attendance => "attendance",
            Collection::Enrollments => "enrollments",
            Collection::Courses => "courses",
        };
        f.write_str(s)
    }
}

pub async fn collection_ids(db: &SqlitePool, collection: Collection) -> Result<Vec<String>, sqlx::Error> {
    let sql = format!("SELECT id FROM {} ORDER BY id", collection.table());
    sqlx::query_scalar::<_, String>(&sql).fetch_all(db).await
}

pub async fn count_collection(db: &SqlitePool, collection: Collection) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    sqlx::query_scalar::<_, i64>(&sql).fetch_one(db).await
}
