//! Fetch pipeline: freshness gate -> resolve -> fill -> normalize ->
//! assemble, with checkpoints along the way and a fallback document when
//! the fetch fails or runs out of time.

use crate::checkpoint::Checkpointer;
use crate::config::Config;
use crate::document::{sort_by_citations, AuthorProfile, Publication, ResultDocument, ScraperMethod};
use crate::error::{ProfileError, Result};
use crate::filler::{fill_with_retry, FillOutcome};
use crate::freshness::{self, Freshness};
use crate::normalize::normalize_entry;
use crate::resolver::{self, Resolution, FALLBACK_SEARCH_NOTE};
use crate::source::{AuthorRecord, AuthorSource, RawPublication};
use crate::store::ResultStore;
use chrono::Local;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// What the run produced
#[derive(Debug)]
pub enum Outcome {
    /// Freshly fetched document
    Fresh(ResultDocument),
    /// Recent document reused by the freshness gate
    Reused(ResultDocument),
    /// Fetch failed; prior document or placeholder substituted
    Fallback {
        document: ResultDocument,
        reason: String,
    },
}

impl Outcome {
    pub fn document(&self) -> &ResultDocument {
        match self {
            Self::Fresh(document) | Self::Reused(document) => document,
            Self::Fallback { document, .. } => document,
        }
    }

    pub fn into_document(self) -> ResultDocument {
        match self {
            Self::Fresh(document) | Self::Reused(document) => document,
            Self::Fallback { document, .. } => document,
        }
    }
}

/// Wall-clock budget checked between publications
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires: Instant::now() + budget,
            budget,
        }
    }

    /// # Errors
    ///
    /// [`ProfileError::Timeout`] once the budget is spent.
    pub fn check(&self) -> Result<()> {
        if Instant::now() >= self.expires {
            Err(ProfileError::Timeout(self.budget.as_secs()))
        } else {
            Ok(())
        }
    }
}

/// Profile retrieval pipeline over an [`AuthorSource`]
pub struct Pipeline<S> {
    source: S,
    store: ResultStore,
    config: Config,
}

impl<S: AuthorSource> Pipeline<S> {
    pub fn new(source: S, config: Config) -> Self {
        let store = ResultStore::new(config.output.clone());
        Self {
            source,
            store,
            config,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run the pipeline and write the final document.
    ///
    /// # Errors
    ///
    /// [`ProfileError::NoDocument`] when no document could be produced, or
    /// the error from the final write. Checkpoint write failures are not
    /// errors.
    pub async fn run_and_save(&self) -> Result<Outcome> {
        let outcome = self.run().await?;
        self.store.save(outcome.document())?;
        info!(path = ?self.store.path(), "Final data saved");
        Ok(outcome)
    }

    /// Produce a result document without writing the final version.
    ///
    /// # Errors
    ///
    /// [`ProfileError::NoDocument`] when the fetch failed, nothing is on
    /// disk and the placeholder is disabled.
    pub async fn run(&self) -> Result<Outcome> {
        info!(author_id = %self.config.author_id, ci = self.config.ci, "Fetching Google Scholar profile");

        if self.config.freshness_gate_enabled() {
            match freshness::check(&self.store, self.config.max_age, Local::now()) {
                Freshness::Reuse(document) => return Ok(Outcome::Reused(*document)),
                Freshness::FetchRequired(reason) => info!(reason = %reason, "Fetching fresh data"),
            }
        }

        let budget = self.config.timeout;
        let deadline = Deadline::after(budget);
        let fetched = match tokio::time::timeout(budget, self.fetch(&deadline)).await {
            Ok(result) => result,
            Err(_) => Err(ProfileError::Timeout(budget.as_secs())),
        };

        match fetched {
            Ok(document) => {
                info!(
                    publications = document.publications.len(),
                    method = %document.scraper_method,
                    "Successfully fetched profile"
                );
                Ok(Outcome::Fresh(document))
            }
            Err(e) => {
                error!(error = %e, "Error fetching profile");
                self.fallback(&e.to_string())
            }
        }
    }

    /// Resolve, fill, normalize and assemble
    async fn fetch(&self, deadline: &Deadline) -> Result<ResultDocument> {
        let resolution = resolver::resolve(
            &self.source,
            &self.config.author_id,
            self.config.publication_limit,
            &self.config.identity,
        )
        .await?;
        let method = resolution.method();
        let mut notes: Vec<String> = Vec::new();

        let record = match resolution {
            Resolution::Direct(record) => {
                let throttle = &self.config.throttle;
                match fill_with_retry(
                    &self.source,
                    record,
                    throttle.fill_attempts,
                    throttle.fill_backoff,
                )
                .await
                {
                    FillOutcome::Degraded { record, error } => {
                        notes.push(format!(
                            "Detail fill failed ({}); partial author record used",
                            error
                        ));
                        record
                    }
                    outcome => outcome.into_record(),
                }
            }
            Resolution::FallbackSearch(record) => {
                notes.push(FALLBACK_SEARCH_NOTE.to_string());
                fill_with_retry(&self.source, record, 1, Duration::ZERO)
                    .await
                    .into_record()
            }
        };

        deadline.check()?;
        let record = self.ensure_publications(record).await;
        log_record_structure(&record);

        let profile = record.profile();
        info!(
            name = %profile.name,
            affiliation = %profile.affiliation,
            citations = profile.total_citations,
            h_index = profile.h_index,
            i10_index = profile.i10_index,
            "Extracted profile"
        );

        let raws = record.publications.unwrap_or_default();
        let publications = self
            .collect_publications(&profile, &raws, method.clone(), deadline)
            .await?;

        let note = if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        };
        Ok(ResultDocument::assemble(
            profile,
            publications,
            method,
            note,
            Local::now(),
        ))
    }

    /// One more fill when a record reaches extraction without publications
    async fn ensure_publications(&self, record: AuthorRecord) -> AuthorRecord {
        if record.publications.is_some() {
            return record;
        }
        if record.filled {
            warn!("Author is marked as filled but has no publications");
            return record;
        }

        info!("No publications in author data, attempting to fill");
        match self.source.fill(&record).await {
            Ok(filled) if filled.publications.is_some() => filled,
            Ok(_) => {
                warn!("Even after filling, no publications found");
                record
            }
            Err(e) => {
                warn!(error = %e, "Error filling author");
                record
            }
        }
    }

    /// Normalize every entry, checkpointing and throttling as we go
    async fn collect_publications(
        &self,
        profile: &AuthorProfile,
        raws: &[RawPublication],
        method: ScraperMethod,
        deadline: &Deadline,
    ) -> Result<Vec<Publication>> {
        let total = raws.len();
        info!(total, "Found publications");

        let checkpointer = Checkpointer::new(&self.store, self.config.checkpoint_every);
        let delay = self.config.throttle.per_publication;
        let mut publications = Vec::with_capacity(total);

        for (i, raw) in raws.iter().enumerate() {
            deadline.check()?;
            debug!(index = i + 1, total, title = raw.title(), "Processing publication");

            match normalize_entry(raw) {
                Ok(publication) => publications.push(publication),
                Err(e) => {
                    warn!(index = i + 1, error = %e, "Skipping publication");
                    continue;
                }
            }

            if checkpointer.is_due(i) {
                checkpointer.write(
                    profile,
                    &publications,
                    i + 1,
                    total,
                    method.clone(),
                    Local::now(),
                );
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        sort_by_citations(&mut publications);
        info!(
            extracted = publications.len(),
            skipped = total - publications.len(),
            "Extracted publications"
        );
        Ok(publications)
    }

    /// Prior document from disk, else the placeholder
    fn fallback(&self, reason: &str) -> Result<Outcome> {
        let now = Local::now();
        match self.store.load() {
            Ok(Some(existing)) => {
                info!("Using existing data due to scraping failure");
                let document = existing.refreshed(
                    ScraperMethod::HardFailureFallback,
                    format!("Existing data due to scraping failure: {}", reason),
                    now,
                );
                return Ok(Outcome::Fallback {
                    document,
                    reason: reason.to_string(),
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Existing data unreadable"),
        }

        if !self.config.allow_placeholder {
            return Err(ProfileError::NoDocument(reason.to_string()));
        }

        warn!("No existing data, writing placeholder profile");
        Ok(Outcome::Fallback {
            document: ResultDocument::placeholder(&self.config.identity, reason, now),
            reason: reason.to_string(),
        })
    }
}

fn log_record_structure(record: &AuthorRecord) {
    debug!(
        scholar_id = %record.scholar_id,
        name = %record.name,
        affiliation = %record.affiliation,
        interests = ?record.interests,
        email_domain = %record.email_domain,
        homepage = %record.homepage,
        citedby = record.citedby,
        hindex = record.hindex,
        i10index = record.i10index,
        cites_per_year = ?record.cites_per_year,
        publications = ?record.publication_count(),
        filled = record.filled,
        "Author record structure"
    );
}
