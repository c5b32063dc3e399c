//! Author lookup service abstraction.
//!
//! The pipeline only talks to an [`AuthorSource`]; [`crate::scholar`]
//! provides the Google Scholar implementation and tests provide fakes.

use crate::document::AuthorProfile;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Raw author record as returned by the lookup service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorRecord {
    /// Platform-assigned author id
    pub scholar_id: String,
    pub name: String,
    pub affiliation: String,
    pub interests: Vec<String>,
    pub email_domain: String,
    pub homepage: String,
    pub citedby: u64,
    pub hindex: u64,
    pub i10index: u64,
    pub cites_per_year: BTreeMap<String, u64>,
    /// `None` when the record is a lightweight summary
    pub publications: Option<Vec<RawPublication>>,
    /// Complete publication list and histogram present
    pub filled: bool,
}

impl AuthorRecord {
    /// A record with no usable identity is treated as "not found"
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.scholar_id.trim().is_empty()
    }

    /// Profile-level fields of the record
    pub fn profile(&self) -> AuthorProfile {
        AuthorProfile {
            name: self.name.clone(),
            affiliation: self.affiliation.clone(),
            interests: self.interests.clone(),
            email_domain: self.email_domain.clone(),
            homepage: self.homepage.clone(),
            total_citations: self.citedby,
            h_index: self.hindex,
            i10_index: self.i10index,
            citations_per_year: self.cites_per_year.clone(),
        }
    }

    pub fn publication_count(&self) -> Option<usize> {
        self.publications.as_ref().map(Vec::len)
    }
}

/// Raw publication entry. `bib` is a loose field map; nothing in it is
/// guaranteed to be present or well-typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPublication {
    pub bib: Option<Map<String, Value>>,
    pub num_citations: Option<Value>,
    pub pub_url: Option<String>,
    pub eprint_url: Option<String>,
    pub author_pub_id: Option<String>,
}

impl RawPublication {
    /// Title for log lines
    pub fn title(&self) -> &str {
        self.bib
            .as_ref()
            .and_then(|b| b.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }
}

/// Lookup service consumed by the pipeline
#[async_trait]
pub trait AuthorSource: Send + Sync {
    /// Look an author up by id. `filled` requests the publication list,
    /// bounded by `limit` when given. `Ok(None)` means not found.
    async fn lookup_by_id(
        &self,
        author_id: &str,
        filled: bool,
        limit: Option<usize>,
    ) -> Result<Option<AuthorRecord>>;

    /// Search authors by name, best match first
    async fn search_by_name(&self, name: &str) -> Result<Vec<AuthorRecord>>;

    /// Fetch the complete record for `record`
    async fn fill(&self, record: &AuthorRecord) -> Result<AuthorRecord>;
}
