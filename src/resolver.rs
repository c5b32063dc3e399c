//! Author resolution: id lookup first, name search as a last resort.
//!
//! The name search is a heuristic. It accepts the first of the top five
//! candidates whose affiliation contains one of the configured lab names
//! or whose name contains the configured author name. It only runs when
//! an [`Identity`] is configured; otherwise a failed id lookup is final.

use crate::config::Identity;
use crate::document::ScraperMethod;
use crate::error::{ProfileError, Result};
use crate::source::{AuthorRecord, AuthorSource};
use tracing::{debug, info, warn};

/// Candidates inspected from the name search
pub const MAX_SEARCH_CANDIDATES: usize = 5;

/// Note attached to documents built from the name search
pub const FALLBACK_SEARCH_NOTE: &str = "Found via alternative name search";

/// How the author was found
#[derive(Debug, Clone)]
pub enum Resolution {
    Direct(AuthorRecord),
    FallbackSearch(AuthorRecord),
}

impl Resolution {
    pub fn method(&self) -> ScraperMethod {
        match self {
            Self::Direct(_) => ScraperMethod::Direct,
            Self::FallbackSearch(_) => ScraperMethod::FallbackSearch,
        }
    }
}

/// Resolve `author_id` to an author record.
///
/// # Errors
///
/// [`ProfileError::NotFound`] when neither path yields a record; search
/// failures are returned as-is.
pub async fn resolve<S: AuthorSource + ?Sized>(
    source: &S,
    author_id: &str,
    publication_limit: usize,
    identity: &Identity,
) -> Result<Resolution> {
    match lookup_direct(source, author_id, publication_limit).await {
        Ok(Some(record)) => {
            info!(name = %record.name, "Found author");
            return Ok(Resolution::Direct(record));
        }
        Ok(None) => info!(author_id, "No author found with ID"),
        Err(e) => warn!(author_id, error = %e, "Error searching for author"),
    }

    if !identity.is_searchable() {
        return Err(ProfileError::NotFound(author_id.to_string()));
    }

    info!("Trying alternative search method");
    search_fallback(source, identity).await
}

/// Lightweight lookup first; fall back to a filled lookup when the
/// lightweight record is missing or has no publication list.
async fn lookup_direct<S: AuthorSource + ?Sized>(
    source: &S,
    author_id: &str,
    publication_limit: usize,
) -> Result<Option<AuthorRecord>> {
    debug!(author_id, "Attempting lookup with filled=false");
    let light = source
        .lookup_by_id(author_id, false, None)
        .await?
        .filter(|r| !r.is_empty());

    match light {
        None => {
            info!("Lightweight lookup returned nothing, trying filled lookup");
            Ok(source
                .lookup_by_id(author_id, true, None)
                .await?
                .filter(|r| !r.is_empty()))
        }
        Some(record) if record.publications.is_none() => {
            info!(
                limit = publication_limit,
                "Basic lookup has no publications, trying filled lookup"
            );
            let filled = source
                .lookup_by_id(author_id, true, Some(publication_limit))
                .await?
                .filter(|r| !r.is_empty());
            Ok(Some(filled.unwrap_or(record)))
        }
        Some(record) => Ok(Some(record)),
    }
}

async fn search_fallback<S: AuthorSource + ?Sized>(
    source: &S,
    identity: &Identity,
) -> Result<Resolution> {
    let query = identity
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| identity.labs.first().cloned())
        .unwrap_or_default();

    info!(query = %query, "Attempting alternative search by author name");
    let candidates = source.search_by_name(&query).await?;

    for (i, candidate) in candidates
        .into_iter()
        .take(MAX_SEARCH_CANDIDATES)
        .enumerate()
    {
        info!(
            index = i + 1,
            name = %candidate.name,
            affiliation = %candidate.affiliation,
            "Checking candidate"
        );
        if matches_identity(identity, &candidate) {
            info!(name = %candidate.name, "Found matching author");
            return Ok(Resolution::FallbackSearch(candidate));
        }
    }

    info!("No matching author found in alternative search");
    Err(ProfileError::NotFound(query))
}

/// Case-insensitive lab-in-affiliation or name-in-name match
pub fn matches_identity(identity: &Identity, candidate: &AuthorRecord) -> bool {
    let affiliation = candidate.affiliation.to_lowercase();
    let lab_match = identity
        .labs
        .iter()
        .map(|l| l.trim().to_lowercase())
        .any(|l| !l.is_empty() && affiliation.contains(&l));

    let name_match = identity
        .name
        .as_deref()
        .map(|n| n.trim().to_lowercase())
        .is_some_and(|n| !n.is_empty() && candidate.name.to_lowercase().contains(&n));

    lab_match || name_match
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            name: Some("Yuhang Zang".to_string()),
            labs: vec![
                "Shanghai AI Laboratory".to_string(),
                "Shanghai AI Lab".to_string(),
            ],
            interests: Vec::new(),
        }
    }

    fn candidate(name: &str, affiliation: &str) -> AuthorRecord {
        AuthorRecord {
            name: name.to_string(),
            affiliation: affiliation.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_lab_case_insensitive() {
        assert!(matches_identity(
            &identity(),
            &candidate("Someone Else", "Researcher, SHANGHAI AI LAB")
        ));
    }

    #[test]
    fn test_matches_name() {
        assert!(matches_identity(
            &identity(),
            &candidate("Dr. Yuhang Zang", "Nanyang Technological University")
        ));
    }

    #[test]
    fn test_rejects_unrelated() {
        assert!(!matches_identity(
            &identity(),
            &candidate("Yuhang Zhang", "Tsinghua University")
        ));
        assert!(!matches_identity(
            &Identity::default(),
            &candidate("Anyone", "Anywhere")
        ));
    }
}
