//! Database access for rollcall-svc
//!
//! Classes, students and attendance dates live in one SQLite file under the
//! root folder. Uniqueness rules are enforced by the schema, not only by
//! callers:
//! - `classes.class_code` is UNIQUE
//! - `students` is UNIQUE on `(class_id, roll_number)`
//! - `attendance` is keyed by `(student_id, date)`, so a date can only be
//!   recorded once per student

pub mod attendance;
pub mod classes;
pub mod students;

use rollcall_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Initialize database connection pool
///
/// Creates the parent directory and the database file when missing, then
/// creates tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(250));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection: every `:memory:` connection would
/// otherwise open its own empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classes (
            id TEXT PRIMARY KEY,
            class_name TEXT NOT NULL,
            class_code TEXT NOT NULL UNIQUE,
            faculty_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_classes_faculty ON classes(faculty_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            profile_photo_url TEXT,
            uid TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (class_id, roll_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (student_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (classes, students, attendance)");

    Ok(())
}

/// Parse a TEXT id column back into a Uuid
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid {} '{}': {}", column, value, e)))
}

/// True when the error is a UNIQUE / PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}
