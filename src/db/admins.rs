use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{Admin, Role};

pub async fn insert_admin(
    db: &SqlitePool,
    id: &str,
    login_id: &str,
    display_name: &str,
    role: Role,
) -> Result<Admin, sqlx::Error> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO admins (id, login_id, display_name, role, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(id)
    .bind(login_id)
    .bind(display_name)
    .bind(role)
    .bind(now)
    .execute(db)
    .await?;

    Ok(Admin {
        id: id.to_string(),
        login_id: login_id.to_string(),
        display_name: display_name.to_string(),
        role,
        created_at: now,
    })
}

/// Inserts `role` only while the table is empty. Returns false when any
/// admin already exists.
pub async fn insert_first_admin(
    db: &SqlitePool,
    id: &str,
    login_id: &str,
    display_name: &str,
    role: Role,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO admins (id, login_id, display_name, role, created_at)
        SELECT ?1, ?2, ?3, ?4, ?5
        WHERE NOT EXISTS (SELECT 1 FROM admins)
        "#,
    )
    .bind(id)
    .bind(login_id)
    .bind(display_name)
    .bind(role)
    .bind(Utc::now())
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn find_admin(db: &SqlitePool, id: &str) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        "SELECT id, login_id, display_name, role, created_at FROM admins WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_admins(db: &SqlitePool) -> Result<Vec<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        "SELECT id, login_id, display_name, role, created_at FROM admins ORDER BY created_at, login_id",
    )
    .fetch_all(db)
    .await
}

pub async fn delete_admin(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM admins WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
