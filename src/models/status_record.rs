use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Certificate revocation status as recorded by the registry.
///
/// Stored as lowercase text in the database. Caller input outside this set
/// is rejected at the service boundary before any row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertStatus {
    Good,
    Revoked,
    Unknown,
}

impl CertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertStatus::Good => "good",
            CertStatus::Revoked => "revoked",
            CertStatus::Unknown => "unknown",
        }
    }

    /// Parses a status value, returning `None` for anything outside the
    /// closed set so callers can surface a validation error instead of
    /// panicking on bad wire input.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(CertStatus::Good),
            "revoked" => Some(CertStatus::Revoked),
            "unknown" => Some(CertStatus::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for CertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusRecord {
    pub serial: String,
    pub status: String, // "good", "revoked", "unknown"
    pub this_update: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
}

impl StatusRecord {
    /// Insert or replace the record for `record.serial`.
    ///
    /// Exactly one row per serial: on conflict every column is replaced,
    /// including the revocation fields (NULL clears any previous value).
    pub async fn upsert(pool: &PgPool, record: &StatusRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO status_records (serial, status, this_update, next_update, revoked_at, revocation_reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (serial) DO UPDATE SET
                status = EXCLUDED.status,
                this_update = EXCLUDED.this_update,
                next_update = EXCLUDED.next_update,
                revoked_at = EXCLUDED.revoked_at,
                revocation_reason = EXCLUDED.revocation_reason
            "#,
        )
        .bind(&record.serial)
        .bind(&record.status)
        .bind(record.this_update)
        .bind(record.next_update)
        .bind(record.revoked_at)
        .bind(&record.revocation_reason)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Point lookup by serial. Absence is a normal outcome, not an error.
    pub async fn find_by_serial(pool: &PgPool, serial: &str) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, StatusRecord>(
            r#"
            SELECT serial, status, this_update, next_update, revoked_at, revocation_reason
            FROM status_records
            WHERE serial = $1
            "#,
        )
        .bind(serial)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }
}
