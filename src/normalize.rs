//! Raw publication -> [`Publication`] mapping.
//!
//! Entries that cannot be mapped at all are skipped by the caller; entries
//! with missing fields are mapped with empty/zero defaults.

use crate::document::{Publication, PublicationYear};
use crate::error::{ProfileError, Result};
use crate::source::RawPublication;
use serde_json::{Map, Value};

/// Map one raw entry into the output schema.
///
/// # Errors
///
/// [`ProfileError::Validation`] when the entry has no `bib` map or a
/// non-text title.
pub fn normalize_entry(raw: &RawPublication) -> Result<Publication> {
    let bib = raw
        .bib
        .as_ref()
        .ok_or_else(|| ProfileError::Validation("publication has no bib".to_string()))?;

    let title = match bib.get("title") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(ProfileError::Validation(format!(
                "publication title is not text: {}",
                other
            )))
        }
    };

    let mut venue = text(bib, "venue");
    if venue.is_empty() {
        venue = ["journal", "conference"]
            .iter()
            .map(|k| text(bib, k))
            .find(|v| !v.is_empty())
            .unwrap_or_default();
    }

    let year = bib
        .get("pub_year")
        .or_else(|| bib.get("year"))
        .filter(|v| !v.is_null())
        .cloned()
        .map(PublicationYear::coerce);

    Ok(Publication {
        title,
        authors: authors(bib),
        venue,
        year,
        citations: citation_count(raw.num_citations.as_ref()),
        pub_url: raw.pub_url.clone().unwrap_or_default(),
        eprint_url: raw.eprint_url.clone().filter(|u| !u.is_empty()),
        abstract_text: Some(text(bib, "abstract")).filter(|a| !a.is_empty()),
        key: raw.author_pub_id.clone().unwrap_or_default(),
    })
}

/// String-ish field, empty when absent or not scalar
fn text(bib: &Map<String, Value>, key: &str) -> String {
    match bib.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Author list; arrays are joined with ", "
fn authors(bib: &Map<String, Value>) -> String {
    match bib.get("author") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", "),
        _ => text(bib, "author"),
    }
}

/// Citation count; anything that is not a non-negative integer counts as 0
fn citation_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or(0),
        _ => 0,
    }
}
