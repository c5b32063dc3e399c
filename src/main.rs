//! gscholar-profile - Google Scholar profile fetcher
//!
//! Fetches one author's profile and publications and writes them to
//! `gs_data.json` (or `--output`).
//!
//! ## Usage
//! ```bash
//! gscholar-profile hW23VKIAAAAJ
//! GITHUB_ACTIONS=true gscholar-profile hW23VKIAAAAJ --author-name "Yuhang Zang" --lab "Shanghai AI Laboratory"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gscholar_profile::config::{Config, Identity, Throttle, DEFAULT_OUTPUT, DEFAULT_SCHOLAR_URL};
use gscholar_profile::pipeline::{Outcome, Pipeline};
use gscholar_profile::scholar::ScholarClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Upper bound for `--max-age-days` (about a century)
const MAX_AGE_DAYS_LIMIT: u64 = 36_500;

// ============================================================================
// CLI Definition
// ============================================================================

/// Fetch a Google Scholar profile and save it as JSON
#[derive(Parser)]
#[command(name = "gscholar-profile")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Google Scholar author id (e.g., hW23VKIAAAAJ)
    author_id: String,

    /// Output file, also read back as cache
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Automated run: longer delays and reuse of recent data
    /// (also enabled by GITHUB_ACTIONS=true)
    #[arg(long)]
    ci: bool,

    /// Reuse recent data outside CI as well
    #[arg(long)]
    reuse_recent: bool,

    /// Reuse data younger than this many days
    #[arg(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u64).range(0..=MAX_AGE_DAYS_LIMIT)
    )]
    max_age_days: u64,

    /// Give up on the fetch after this many seconds
    #[arg(long, default_value_t = 3600)]
    timeout_secs: u64,

    /// Publications requested on the first filled lookup
    #[arg(long, default_value_t = 100)]
    publication_limit: usize,

    /// Author name for the fallback search (e.g., "Yuhang Zang")
    #[arg(long)]
    author_name: Option<String>,

    /// Affiliation substring accepted by the fallback search; repeatable.
    /// The first one is used on the placeholder profile.
    #[arg(long = "lab")]
    labs: Vec<String>,

    /// Interest shown on the placeholder profile; repeatable
    #[arg(long = "interest")]
    interests: Vec<String>,

    /// Fail instead of writing a placeholder when nothing can be fetched
    #[arg(long)]
    no_placeholder: bool,

    /// Proxy URL (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    proxy: Option<String>,

    /// Mirror site URL
    #[arg(long, default_value = DEFAULT_SCHOLAR_URL)]
    base_url: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let ci = self.ci || std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        Config {
            output: self.output,
            ci,
            reuse_recent: self.reuse_recent,
            max_age: Duration::from_secs(self.max_age_days.saturating_mul(SECS_PER_DAY)),
            timeout: Duration::from_secs(self.timeout_secs),
            publication_limit: self.publication_limit,
            allow_placeholder: !self.no_placeholder,
            identity: Identity {
                name: self.author_name,
                labs: self.labs,
                interests: self.interests,
            },
            throttle: Throttle::for_context(ci),
            proxy: self.proxy,
            base_url: self.base_url,
            ..Config::new(self.author_id)
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Failed to fetch data: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config();
    println!("Fetching Google Scholar profile: {}", config.author_id);

    let client = ScholarClient::from_config(&config).context("Failed to create Scholar client")?;
    let pipeline = Pipeline::new(client, config);

    let outcome = pipeline
        .run_and_save()
        .await
        .context("No result document written")?;

    println!("Final data saved to {}", pipeline.store().path().display());
    print_summary(&outcome);
    Ok(())
}

/// Print key fields of the written document
fn print_summary(outcome: &Outcome) {
    let document = outcome.document();
    let profile = &document.profile;

    println!("\nSummary:");
    println!("Name: {}", profile.name);
    println!("Affiliation: {}", profile.affiliation);
    println!("Total Citations: {}", profile.total_citations);
    println!("H-index: {}", profile.h_index);
    println!("i10-index: {}", profile.i10_index);
    println!("Publications: {}", document.publications.len());
    println!("Method: {}", document.scraper_method);
    if let Some(note) = &document.note {
        println!("Note: {}", note);
    }
    if let Outcome::Fallback { reason, .. } = outcome {
        println!("Fetch failed: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["gscholar-profile", "hW23VKIAAAAJ"]).expect("parse");
        let config = cli.into_config();
        assert_eq!(config.author_id, "hW23VKIAAAAJ");
        assert_eq!(config.output, PathBuf::from("gs_data.json"));
        assert_eq!(config.max_age, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.timeout, Duration::from_secs(3600));
        assert!(config.allow_placeholder);
        assert!(!config.identity.is_searchable());
    }

    #[test]
    fn test_cli_identity() {
        let cli = Cli::try_parse_from([
            "gscholar-profile",
            "BAD1",
            "--author-name",
            "Yuhang Zang",
            "--lab",
            "Shanghai AI Laboratory",
            "--lab",
            "Shanghai AI Lab",
            "--no-placeholder",
        ])
        .expect("parse");
        let config = cli.into_config();
        assert_eq!(config.identity.name.as_deref(), Some("Yuhang Zang"));
        assert_eq!(config.identity.labs.len(), 2);
        assert!(!config.allow_placeholder);
    }

    #[test]
    fn test_missing_author_id_is_error() {
        let err = Cli::try_parse_from(["gscholar-profile"]).err().expect("should fail");
        assert!(err.use_stderr());
    }

    #[test]
    fn test_huge_max_age_is_rejected() {
        let err = Cli::try_parse_from([
            "gscholar-profile",
            "XYZ1",
            "--max-age-days",
            "18446744073709551615",
        ])
        .err()
        .expect("out-of-range max age should fail");
        assert!(err.use_stderr());
    }

    #[test]
    fn test_max_age_upper_bound() {
        let limit = MAX_AGE_DAYS_LIMIT.to_string();
        let cli = Cli::try_parse_from(["gscholar-profile", "XYZ1", "--max-age-days", &limit])
            .expect("parse");
        let config = cli.into_config();
        assert_eq!(
            config.max_age,
            Duration::from_secs(MAX_AGE_DAYS_LIMIT * SECS_PER_DAY)
        );
    }
}
