//! Runtime configuration.
//!
//! The CLI builds a [`Config`]; the library never reads the environment
//! on its own.

use std::path::PathBuf;
use std::time::Duration;

/// Default output file, in the working directory
pub const DEFAULT_OUTPUT: &str = "gs_data.json";

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Who to look for when the id lookup fails, and what to print when
/// nothing can be fetched at all.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Full name used for the fallback search (e.g. "Yuhang Zang")
    pub name: Option<String>,
    /// Lab / affiliation substrings accepted in search results. The first
    /// entry doubles as the placeholder affiliation.
    pub labs: Vec<String>,
    /// Interests shown on the placeholder profile
    pub interests: Vec<String>,
}

impl Identity {
    /// Whether there is anything to search for
    pub fn is_searchable(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
            || self.labs.iter().any(|l| !l.trim().is_empty())
    }
}

/// Delays applied while fetching
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Fixed pause after each publication
    pub per_publication: Duration,
    /// Fill backoff base, multiplied by the attempt number
    pub fill_backoff: Duration,
    /// Total fill attempts
    pub fill_attempts: u32,
}

impl Throttle {
    /// Delays for an automated (CI) run or a manual one
    pub fn for_context(ci: bool) -> Self {
        Self {
            per_publication: if ci {
                Duration::from_secs(2)
            } else {
                Duration::from_millis(500)
            },
            fill_backoff: Duration::from_secs(10),
            fill_attempts: 3,
        }
    }

    /// No delays at all
    pub fn none() -> Self {
        Self {
            per_publication: Duration::ZERO,
            fill_backoff: Duration::ZERO,
            fill_attempts: 3,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Opaque platform id of the author (e.g. `hW23VKIAAAAJ`)
    pub author_id: String,
    /// Output path, also read back as cache
    pub output: PathBuf,
    /// Running in CI (GITHUB_ACTIONS=true)
    pub ci: bool,
    /// Engage the freshness gate even outside CI
    pub reuse_recent: bool,
    /// Age below which the document on disk is reused
    pub max_age: Duration,
    /// Wall-clock budget for the whole fetch
    pub timeout: Duration,
    /// Publications requested on the bounded filled lookup
    pub publication_limit: usize,
    /// Write a placeholder document when nothing else is available
    pub allow_placeholder: bool,
    /// Checkpoint every N publications
    pub checkpoint_every: usize,
    /// Who to look for when the id lookup fails; also seeds the placeholder
    pub identity: Identity,
    /// Delays between publications and between fill retries
    pub throttle: Throttle,
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    /// Custom base URL for mirror sites
    pub base_url: String,
}

impl Config {
    pub fn new(author_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            ci: false,
            reuse_recent: false,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
            timeout: Duration::from_secs(60 * 60),
            publication_limit: 100,
            allow_placeholder: true,
            checkpoint_every: 10,
            identity: Identity::default(),
            throttle: Throttle::for_context(false),
            proxy: None,
            base_url: DEFAULT_SCHOLAR_URL.to_string(),
        }
    }

    /// Configuration with no delays, writing to `output`
    pub fn for_testing(author_id: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            throttle: Throttle::none(),
            ..Self::new(author_id)
        }
    }

    /// Whether the freshness gate runs before fetching
    pub fn freshness_gate_enabled(&self) -> bool {
        self.ci || self.reuse_recent
    }
}
