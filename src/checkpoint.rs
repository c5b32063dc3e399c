//! Periodic progress snapshots during a long publication loop.

use crate::document::{
    AuthorProfile, Publication, ResultDocument, ScrapeProgress, ScraperMethod,
};
use crate::store::ResultStore;
use chrono::{DateTime, Local};
use tracing::{info, warn};

/// Writes partial result documents to the output path.
///
/// Checkpoints are best effort: a failed write is logged and the run
/// continues.
pub struct Checkpointer<'a> {
    store: &'a ResultStore,
    every: usize,
}

impl<'a> Checkpointer<'a> {
    /// Checkpoint after publication 0, `every`, `2 * every`, ...
    /// `every == 0` disables checkpoints.
    pub fn new(store: &'a ResultStore, every: usize) -> Self {
        Self { store, every }
    }

    /// Whether a checkpoint is due after processing the zero-based `index`
    pub fn is_due(&self, index: usize) -> bool {
        self.every > 0 && index % self.every == 0
    }

    /// Write a checkpoint. Returns whether the write succeeded.
    pub fn write(
        &self,
        profile: &AuthorProfile,
        publications: &[Publication],
        current: usize,
        total: usize,
        scraper_method: ScraperMethod,
        now: DateTime<Local>,
    ) -> bool {
        let mut document = ResultDocument::assemble(
            profile.clone(),
            publications.to_vec(),
            scraper_method,
            None,
            now,
        );
        let progress = ScrapeProgress::new(current, total);
        let percentage = progress.percentage;
        document.scraping_progress = Some(progress);

        match self.store.save(&document) {
            Ok(()) => {
                info!(current, total, percentage, "Saved intermediate result");
                true
            }
            Err(e) => {
                warn!(error = %e, "Error saving intermediate result");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn publication(citations: u64) -> Publication {
        Publication {
            title: format!("paper-{}", citations),
            citations,
            ..Default::default()
        }
    }

    #[test]
    fn test_schedule() {
        let store = ResultStore::new("unused.json");
        let checkpointer = Checkpointer::new(&store, 10);
        let due: Vec<usize> = (0..25).filter(|i| checkpointer.is_due(*i)).collect();
        assert_eq!(due, vec![0, 10, 20]);
        assert!(!Checkpointer::new(&store, 0).is_due(0));
    }

    #[test]
    fn test_checkpoint_is_valid_sorted_document() -> crate::Result<()> {
        let dir = TempDir::new()?;
        let store = ResultStore::new(dir.path().join("gs_data.json"));
        let checkpointer = Checkpointer::new(&store, 10);

        let profile = AuthorProfile {
            name: "In Progress".to_string(),
            ..Default::default()
        };
        let pubs = vec![publication(1), publication(9), publication(4)];
        assert!(checkpointer.write(&profile, &pubs, 3, 12, ScraperMethod::Direct, Local::now()));

        let loaded = store.load()?.expect("checkpoint written");
        assert!(loaded.is_sorted_by_citations());
        assert_eq!(loaded.publications.len(), 3);
        let progress = loaded.scraping_progress.expect("progress present");
        assert_eq!(progress.current, 3);
        assert_eq!(progress.total, 12);
        assert_eq!(progress.percentage, 25.0);
        Ok(())
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let store = ResultStore::new("/nonexistent/dir/gs_data.json");
        let checkpointer = Checkpointer::new(&store, 10);
        let written = checkpointer.write(
            &AuthorProfile::default(),
            &[],
            1,
            1,
            ScraperMethod::Direct,
            Local::now(),
        );
        assert!(!written);
    }
}
