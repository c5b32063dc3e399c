//! Result document schema.
//!
//! The document written to `gs_data.json` is the profile fields flattened
//! next to the sorted publication list and a few provenance fields. The
//! same type is used for checkpoints, final results and cached reads.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Identity;

/// Timestamp format used for `last_updated`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a local time as a `last_updated` string
pub fn format_timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `last_updated` string. Returns `None` for anything unparseable.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// Researcher profile fields, flattened into the result document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthorProfile {
    /// Display name as shown on the profile
    pub name: String,
    /// Affiliation line under the name
    pub affiliation: String,
    /// Research interests, in profile order
    pub interests: Vec<String>,
    /// Domain from "Verified email at ...", empty when unverified
    pub email_domain: String,
    /// Personal homepage link, empty when absent
    pub homepage: String,
    /// All-time citation count
    pub total_citations: u64,
    /// All-time h-index
    pub h_index: u64,
    /// All-time i10-index
    pub i10_index: u64,
    /// Year -> citations received that year
    pub citations_per_year: BTreeMap<String, u64>,
}

impl AuthorProfile {
    /// Minimal profile built from the configured identity, with zero citations
    pub fn placeholder(identity: &Identity) -> Self {
        Self {
            name: identity.name.clone().unwrap_or_default(),
            affiliation: identity.labs.first().cloned().unwrap_or_default(),
            interests: identity.interests.clone(),
            ..Default::default()
        }
    }
}

/// Publication year as found in the source.
///
/// Years that parse as integers (including integral floats such as
/// `2021.0`) are stored as numbers; anything else
/// (`"n.d."`, `"2021a"`) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicationYear {
    Numeric(i64),
    Raw(serde_json::Value),
}

impl PublicationYear {
    /// Coerce a raw year value, keeping it unchanged when it is not an integer
    pub fn coerce(raw: serde_json::Value) -> Self {
        match &raw {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(year) => Self::Numeric(year),
                None => match n.as_f64() {
                    Some(year) if year.fract() == 0.0 && year.abs() < 1e15 => {
                        Self::Numeric(year as i64)
                    }
                    _ => Self::Raw(raw),
                },
            },
            serde_json::Value::String(s) => match s.trim().parse::<i64>() {
                Ok(year) => Self::Numeric(year),
                Err(_) => Self::Raw(raw),
            },
            _ => Self::Raw(raw),
        }
    }
}

/// A single normalized publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Publication {
    #[serde(default)]
    pub title: String,
    /// Author list as one string ("A Smith, B Jones")
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub year: Option<PublicationYear>,
    #[serde(default)]
    pub citations: u64,
    #[serde(default)]
    pub pub_url: String,
    /// Preprint / full-text link when the source exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eprint_url: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Per-publication key, e.g. `hW23VKIAAAAJ:u-x6o8ySG0sC`
    #[serde(default)]
    pub key: String,
}

/// Progress of an in-flight fetch, only present on checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ScrapeProgress {
    pub fn new(current: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            ((current as f64 / total as f64) * 10_000.0).round() / 100.0
        };
        Self {
            current,
            total,
            percentage,
        }
    }
}

/// Which path produced the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ScraperMethod {
    /// Lookup by author id succeeded
    #[default]
    Direct,
    /// Author found through the name/affiliation search
    FallbackSearch,
    /// Recent document on disk reused without fetching
    ReusedCache,
    /// Fetch failed; prior document or placeholder substituted
    HardFailureFallback,
    /// Value written by some other tool, kept verbatim
    Other(String),
}

impl ScraperMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Direct => "direct",
            Self::FallbackSearch => "fallback-search",
            Self::ReusedCache => "reused-cache",
            Self::HardFailureFallback => "hard-failure-fallback",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ScraperMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "direct" => Self::Direct,
            "fallback-search" => Self::FallbackSearch,
            "reused-cache" => Self::ReusedCache,
            "hard-failure-fallback" => Self::HardFailureFallback,
            _ => Self::Other(value),
        }
    }
}

impl From<ScraperMethod> for String {
    fn from(value: ScraperMethod) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ScraperMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted artifact: profile + publications + provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    #[serde(flatten)]
    pub profile: AuthorProfile,
    /// Sorted by citations, descending; ties keep discovery order
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub scraper_method: ScraperMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraping_progress: Option<ScrapeProgress>,
}

impl ResultDocument {
    /// Assemble a document, sorting the publications by citation count
    pub fn assemble(
        profile: AuthorProfile,
        mut publications: Vec<Publication>,
        scraper_method: ScraperMethod,
        note: Option<String>,
        now: DateTime<Local>,
    ) -> Self {
        sort_by_citations(&mut publications);
        Self {
            profile,
            publications,
            last_updated: format_timestamp(now),
            scraper_method,
            note,
            scraping_progress: None,
        }
    }

    /// Placeholder used when nothing was fetched and nothing is on disk
    pub fn placeholder(identity: &Identity, reason: &str, now: DateTime<Local>) -> Self {
        Self::assemble(
            AuthorProfile::placeholder(identity),
            Vec::new(),
            ScraperMethod::HardFailureFallback,
            Some(format!("Fallback data due to scraping failure: {}", reason)),
            now,
        )
    }

    /// Re-stamp a previously persisted document for reuse.
    ///
    /// Drops any checkpoint progress and restores the sort order, so a
    /// half-written checkpoint comes back as a valid final document.
    pub fn refreshed(
        mut self,
        scraper_method: ScraperMethod,
        note: impl Into<String>,
        now: DateTime<Local>,
    ) -> Self {
        sort_by_citations(&mut self.publications);
        self.last_updated = format_timestamp(now);
        self.scraper_method = scraper_method;
        self.note = Some(note.into());
        self.scraping_progress = None;
        self
    }

    /// Parsed `last_updated`, if any
    pub fn last_updated_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.last_updated)
    }

    pub fn is_sorted_by_citations(&self) -> bool {
        self.publications
            .windows(2)
            .all(|w| w[0].citations >= w[1].citations)
    }
}

/// Stable sort by citation count, descending
pub fn sort_by_citations(publications: &mut [Publication]) {
    publications.sort_by(|a, b| b.citations.cmp(&a.citations));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn publication(title: &str, citations: u64) -> Publication {
        Publication {
            title: title.to_string(),
            citations,
            ..Default::default()
        }
    }

    fn fixed_now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .expect("valid local time")
    }

    #[test]
    fn test_sort_is_stable_and_descending() {
        let mut pubs = vec![
            publication("a", 5),
            publication("b", 10),
            publication("c", 5),
            publication("d", 0),
            publication("e", 10),
        ];
        sort_by_citations(&mut pubs);
        let titles: Vec<&str> = pubs.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "e", "a", "c", "d"]);
    }

    #[test]
    fn test_year_coercion() {
        assert_eq!(
            PublicationYear::coerce(json!("2021")),
            PublicationYear::Numeric(2021)
        );
        assert_eq!(
            PublicationYear::coerce(json!(2019)),
            PublicationYear::Numeric(2019)
        );
        assert_eq!(
            PublicationYear::coerce(json!("n.d.")),
            PublicationYear::Raw(json!("n.d."))
        );
    }

    #[test]
    fn test_year_coercion_integral_float() {
        assert_eq!(
            PublicationYear::coerce(json!(2021.0)),
            PublicationYear::Numeric(2021)
        );
        assert_eq!(
            PublicationYear::coerce(json!(2021.5)),
            PublicationYear::Raw(json!(2021.5))
        );
    }

    #[test]
    fn test_progress_percentage_rounding() {
        let progress = ScrapeProgress::new(1, 3);
        assert_eq!(progress.percentage, 33.33);
        assert_eq!(ScrapeProgress::new(2, 3).percentage, 66.67);
        assert_eq!(ScrapeProgress::new(0, 0).percentage, 100.0);
    }

    #[test]
    fn test_document_json_shape() -> crate::Result<()> {
        let mut profile = AuthorProfile {
            name: "Zoë Example".to_string(),
            total_citations: 42,
            ..Default::default()
        };
        profile.citations_per_year.insert("2023".to_string(), 40);

        let doc = ResultDocument::assemble(
            profile,
            vec![publication("low", 1), publication("high", 41)],
            ScraperMethod::Direct,
            None,
            fixed_now(),
        );

        let value = serde_json::to_value(&doc)?;
        assert_eq!(value["name"], "Zoë Example");
        assert_eq!(value["total_citations"], 42);
        assert_eq!(value["citations_per_year"]["2023"], 40);
        assert_eq!(value["publications"][0]["title"], "high");
        assert_eq!(value["last_updated"], "2024-05-01 12:30:00");
        assert_eq!(value["scraper_method"], "direct");
        assert!(value.get("note").is_none());
        assert!(value.get("scraping_progress").is_none());
        Ok(())
    }

    #[test]
    fn test_reads_foreign_document() -> crate::Result<()> {
        let raw = json!({
            "name": "Someone",
            "affiliation": "Somewhere",
            "total_citations": 7,
            "publications": [
                {"title": "t", "authors": "x", "venue": "", "year": null, "citations": 7, "pub_url": "", "key": "k"}
            ],
            "last_updated": "2024-01-02 03:04:05",
            "scraper_method": "scholarly",
            "scraping_progress": {"current": 1, "total": 2, "percentage": 50.0}
        });
        let doc: ResultDocument = serde_json::from_value(raw)?;
        assert_eq!(doc.scraper_method, ScraperMethod::Other("scholarly".to_string()));
        assert_eq!(doc.publications[0].year, None);
        assert!(doc.last_updated_at().is_some());

        let refreshed = doc.refreshed(ScraperMethod::ReusedCache, "reused", fixed_now());
        assert!(refreshed.scraping_progress.is_none());
        assert_eq!(refreshed.note.as_deref(), Some("reused"));
        assert_eq!(refreshed.last_updated, "2024-05-01 12:30:00");
        Ok(())
    }

    #[test]
    fn test_placeholder_has_zero_citations() {
        let identity = Identity {
            name: Some("Ada Lovelace".to_string()),
            labs: vec!["Analytical Engine Lab".to_string()],
            interests: vec!["Computing".to_string()],
        };
        let doc = ResultDocument::placeholder(&identity, "timeout", fixed_now());
        assert_eq!(doc.profile.name, "Ada Lovelace");
        assert_eq!(doc.profile.affiliation, "Analytical Engine Lab");
        assert_eq!(doc.profile.total_citations, 0);
        assert!(doc.publications.is_empty());
        assert_eq!(doc.scraper_method, ScraperMethod::HardFailureFallback);
    }
}
