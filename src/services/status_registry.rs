use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::models::{CertStatus, StatusRecord};

/// How long a written status stays fresh before a responder should refresh it.
const VALIDITY_WINDOW_HOURS: i64 = 24;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("{0}")]
    InvalidInput(String),

    // The underlying cause is logged where it occurs, never shown to callers.
    #[error("failed to update status")]
    Storage(#[source] sqlx::Error),
}

/// Persistence seam for the registry. `PgPool` is the production
/// implementation; tests inject an in-memory double.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn upsert(&self, record: &StatusRecord) -> Result<(), sqlx::Error>;
    async fn find_by_serial(&self, serial: &str) -> Result<Option<StatusRecord>, sqlx::Error>;
}

#[async_trait]
impl StatusStore for PgPool {
    async fn upsert(&self, record: &StatusRecord) -> Result<(), sqlx::Error> {
        StatusRecord::upsert(self, record).await
    }

    async fn find_by_serial(&self, serial: &str) -> Result<Option<StatusRecord>, sqlx::Error> {
        StatusRecord::find_by_serial(self, serial).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub serial_number: String,
    /// Defaults to "good" when omitted or empty; anything outside
    /// good/revoked/unknown is rejected.
    pub status: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
}

/// What callers see when they ask for a serial's status. A serial with no
/// record on file reports `unknown` with a fresh validity window.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub status: CertStatus,
    pub this_update: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
}

/// The request-handling core: validation, persistence semantics and batch
/// aggregation for certificate status records. The store is injected at
/// construction so tests can substitute a double for PostgreSQL.
#[derive(Clone)]
pub struct StatusRegistry {
    store: Arc<dyn StatusStore>,
}

impl StatusRegistry {
    pub fn new(store: impl StatusStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Upserts the status record for a serial.
    ///
    /// `this_update` is reset to now and `next_update` to now + 24h on every
    /// write. Revocation fields are stored as provided when the new status is
    /// `revoked` and cleared otherwise, so no stale revocation data survives
    /// a transition back to `good`.
    #[tracing::instrument(skip(self, request), fields(serial = %request.serial_number))]
    pub async fn update_status(&self, request: &UpdateStatusRequest) -> Result<(), RegistryError> {
        tracing::info!(
            serial = %request.serial_number,
            status = ?request.status,
            "Received status update request"
        );

        if request.serial_number.is_empty() {
            return Err(RegistryError::InvalidInput(
                "serial number is required".to_string(),
            ));
        }

        let status = match request.status.as_deref() {
            None | Some("") => CertStatus::Good,
            Some(value) => CertStatus::parse(value).ok_or_else(|| {
                RegistryError::InvalidInput(
                    "invalid status (must be: good, revoked, or unknown)".to_string(),
                )
            })?,
        };

        let this_update = Utc::now();
        let record = StatusRecord {
            serial: request.serial_number.clone(),
            status: status.as_str().to_string(),
            this_update,
            next_update: this_update + Duration::hours(VALIDITY_WINDOW_HOURS),
            revoked_at: match status {
                CertStatus::Revoked => request.revoked_at,
                _ => None,
            },
            revocation_reason: match status {
                CertStatus::Revoked => request.revocation_reason.clone(),
                _ => None,
            },
        };

        self.store.upsert(&record).await.map_err(|e| {
            tracing::error!(
                serial = %request.serial_number,
                error = %e,
                "Failed to update certificate status"
            );
            RegistryError::Storage(e)
        })?;

        tracing::info!(
            serial = %request.serial_number,
            status = %status,
            "Certificate status updated"
        );

        Ok(())
    }

    /// Looks up the current status of a serial.
    ///
    /// A serial with no record is a defined success outcome, not an error:
    /// it reports `unknown` with a validity window starting now.
    #[tracing::instrument(skip(self))]
    pub async fn check_status(&self, serial: &str) -> Result<StatusView, RegistryError> {
        tracing::info!(serial = %serial, "Received status check request");

        if serial.is_empty() {
            return Err(RegistryError::InvalidInput(
                "serial number is required".to_string(),
            ));
        }

        let record = self.store.find_by_serial(serial).await.map_err(|e| {
            tracing::error!(serial = %serial, error = %e, "Failed to look up certificate status");
            RegistryError::Storage(e)
        })?;

        let view = match record {
            Some(record) => {
                // Rows are only ever written through CertStatus; anything else
                // is corruption and reported fail-open as unknown.
                let status = CertStatus::parse(&record.status).unwrap_or_else(|| {
                    tracing::warn!(
                        serial = %serial,
                        stored = %record.status,
                        "Stored status outside the known set, reporting unknown"
                    );
                    CertStatus::Unknown
                });

                StatusView {
                    status,
                    this_update: record.this_update,
                    next_update: record.next_update,
                    revoked_at: record.revoked_at,
                    revocation_reason: record.revocation_reason,
                }
            }
            None => {
                tracing::warn!(serial = %serial, "No status on record, reporting unknown");
                let now = Utc::now();
                StatusView {
                    status: CertStatus::Unknown,
                    this_update: now,
                    next_update: now + Duration::hours(VALIDITY_WINDOW_HOURS),
                    revoked_at: None,
                    revocation_reason: None,
                }
            }
        };

        tracing::info!(serial = %serial, status = %view.status, "Certificate status checked");

        Ok(view)
    }

    /// Applies each update independently, in input order. One item failing
    /// never aborts or rolls back its siblings; each success is committed on
    /// its own.
    #[tracing::instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn batch_update_status(&self, updates: &[UpdateStatusRequest]) -> BatchOutcome {
        tracing::info!(count = updates.len(), "Received batch status update request");

        let mut outcome = BatchOutcome {
            success_count: 0,
            failure_count: 0,
            errors: Vec::new(),
        };

        for update in updates {
            match self.update_status(update).await {
                Ok(()) => outcome.success_count += 1,
                Err(e) => {
                    outcome.failure_count += 1;
                    outcome.errors.push(e.to_string());
                }
            }
        }

        tracing::info!(
            success = outcome.success_count,
            failure = outcome.failure_count,
            "Batch status update completed"
        );

        outcome
    }
}
