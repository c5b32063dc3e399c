//! Detail filling with bounded retry.

use crate::source::{AuthorRecord, AuthorSource};
use std::time::Duration;
use tracing::{info, warn};

/// Result of a fill attempt
#[derive(Debug, Clone)]
pub enum FillOutcome {
    /// Record was already complete; nothing fetched
    AlreadyFilled(AuthorRecord),
    Filled(AuthorRecord),
    /// Every attempt failed; the input record is returned unchanged
    Degraded { record: AuthorRecord, error: String },
}

impl FillOutcome {
    pub fn into_record(self) -> AuthorRecord {
        match self {
            Self::AlreadyFilled(record) | Self::Filled(record) => record,
            Self::Degraded { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Fill `record`, retrying up to `attempts` times.
///
/// Attempt `n` (zero-based) waits `backoff * n` first. Every error is
/// retried the same way.
pub async fn fill_with_retry<S: AuthorSource + ?Sized>(
    source: &S,
    record: AuthorRecord,
    attempts: u32,
    backoff: Duration,
) -> FillOutcome {
    if record.filled {
        info!("Author already filled, skipping fill step");
        return FillOutcome::AlreadyFilled(record);
    }

    info!("Filling author details");
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if attempt > 0 {
            let wait = backoff * attempt;
            info!(
                attempt = attempt + 1,
                max_attempts = attempts,
                wait_secs = wait.as_secs(),
                "Retrying fill"
            );
            tokio::time::sleep(wait).await;
        }

        match source.fill(&record).await {
            Ok(filled) => {
                info!(
                    publications = ?filled.publication_count(),
                    "Author details filled successfully"
                );
                return FillOutcome::Filled(filled);
            }
            Err(e) => {
                warn!(attempt = attempt + 1, error = %e, "Error filling author details");
                last_error = e.to_string();
            }
        }
    }

    warn!("All fill attempts failed, using basic author data");
    FillOutcome::Degraded {
        record,
        error: last_error,
    }
}
