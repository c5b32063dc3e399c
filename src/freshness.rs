//! Freshness gate: reuse a recent document instead of fetching.

use crate::document::{ResultDocument, ScraperMethod};
use crate::store::ResultStore;
use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{info, warn};

/// Note attached to a reused document
pub const REUSED_NOTE: &str = "Using recent existing data";

/// Outcome of the freshness check
#[derive(Debug)]
pub enum Freshness {
    /// Recent document found; already re-stamped for reuse
    Reuse(Box<ResultDocument>),
    /// A live fetch is needed
    FetchRequired(String),
}

/// Decide whether the stored document is recent enough to reuse.
///
/// Missing, unreadable, undated or stale documents all mean
/// [`Freshness::FetchRequired`], as do documents written by a failed
/// run (`hard-failure-fallback`). Nothing here is fatal.
pub fn check(store: &ResultStore, max_age: Duration, now: DateTime<Local>) -> Freshness {
    let document = match store.load() {
        Ok(Some(doc)) => doc,
        Ok(None) => return Freshness::FetchRequired("no existing data".to_string()),
        Err(e) => {
            warn!(error = %e, "Error checking existing data");
            return Freshness::FetchRequired(format!("existing data unreadable: {}", e));
        }
    };

    if document.scraper_method == ScraperMethod::HardFailureFallback {
        info!(
            last_updated = %document.last_updated,
            "Existing data is a failure fallback, fetching again"
        );
        return Freshness::FetchRequired("existing data is a failure fallback".to_string());
    }

    let Some(last_updated) = document.last_updated_at() else {
        return Freshness::FetchRequired(format!(
            "unparseable last_updated {:?}",
            document.last_updated
        ));
    };

    let age = now.naive_local() - last_updated;
    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);

    if age < max_age {
        info!(
            last_updated = %document.last_updated,
            "Found recent data, using existing"
        );
        Freshness::Reuse(Box::new(document.refreshed(
            ScraperMethod::ReusedCache,
            REUSED_NOTE,
            now,
        )))
    } else {
        Freshness::FetchRequired(format!("existing data is stale ({})", document.last_updated))
    }
}
