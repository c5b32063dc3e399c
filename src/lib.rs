//! # gscholar-profile
//!
//! Fetch a researcher's Google Scholar profile and publication list and
//! persist it as JSON, with checkpoints and cached fallbacks.
//!
//! ## Modules
//!
//! - [`scholar`] - Google Scholar citations-page client
//! - [`source`] - Author lookup trait and raw records
//! - [`resolver`] - Id lookup with name-search fallback
//! - [`filler`] - Detail fill with bounded retry
//! - [`normalize`] - Raw publication mapping
//! - [`checkpoint`] - Progress snapshots
//! - [`freshness`] - Reuse of recent results
//! - [`pipeline`] - Orchestration and fallback documents
//! - [`store`] - Result file persistence
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gscholar_profile::{config::Config, pipeline::Pipeline, scholar::ScholarClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("hW23VKIAAAAJ");
//!     let client = ScholarClient::from_config(&config)?;
//!     let outcome = Pipeline::new(client, config).run_and_save().await?;
//!     println!("Saved {} publications", outcome.document().publications.len());
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod config;
pub mod document;
pub mod error;
pub mod filler;
pub mod freshness;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod scholar;
pub mod source;
pub mod store;

pub use error::{ProfileError, Result};
