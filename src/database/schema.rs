//! Document table bootstrap.
//!
//! Each record type lives in its own table shaped as a document store:
//! `id TEXT PRIMARY KEY, doc JSONB NOT NULL`. The push token table reuses the
//! same shape with the token value as the row key, since the token is the
//! record's natural external identity.

use sqlx::PgPool;

pub const SCHEDULES: &str = "schedules";
pub const INVOICES: &str = "invoices";
pub const PHOTOS: &str = "photos";
pub const AVAILABILITIES: &str = "availabilities";
pub const TIME_OFF_REQUESTS: &str = "time_off_requests";
pub const PAYROLL_PERIODS: &str = "payroll_periods";
pub const REPORTS: &str = "reports";
pub const EXPO_PUSH_TOKENS: &str = "expo_push_tokens";

const DOCUMENT_TABLES: &[&str] = &[
    SCHEDULES,
    INVOICES,
    PHOTOS,
    AVAILABILITIES,
    TIME_OFF_REQUESTS,
    PAYROLL_PERIODS,
    REPORTS,
    EXPO_PUSH_TOKENS,
];

/// Create any missing document tables. Runs once per process on first pool
/// acquisition; every statement is idempotent.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), sqlx::Error> {
    for table in DOCUMENT_TABLES {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
            table
        );
        sqlx::query(&ddl).execute(pool).await?;
    }
    Ok(())
}
