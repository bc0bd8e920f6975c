//! # sekolah-scraper
//!
//! Concurrent scraper for the kemendikdasmen school-reference portal.
//! Reads the JavaScript-rendered listing table for a region, then enriches
//! each school with detail pulled from its profile page through a bounded
//! pool of headless Chrome sessions, and returns a uniform,
//! field-filtered, sorted record set.
//!
//! The moving parts:
//!
//! - a browser session manager with two construction strategies (plain and
//!   fingerprint-suppressing) composed by an ordered fallback, and
//!   guaranteed teardown on every exit path;
//! - a bounded detail worker pool (one Chrome process per in-flight task)
//!   with task-level failure isolation: a dead page degrades its own record
//!   to the list-stage fields and never aborts the batch;
//! - total field normalizers that collapse noisy rendered text to either a
//!   canonical value or the `"-"` sentinel;
//! - a process reaper that terminates any browser process this run spawned
//!   but failed to tear down.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sekolah_scraper::{Config, FieldSet, ScrapeService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ScrapeService::new(Config::default())?;
//!     let fields = FieldSet::parse(&["Nama Sekolah", "NPSN", "Email"])?;
//!     let records = service.scrape("Ambarawa", &fields).await?;
//!     println!("{} schools", records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## CLI usage
//!
//! ```bash
//! sekolah-scraper scrape --region Ambarawa --fields "Nama Sekolah,NPSN,Email"
//! sekolah-scraper serve --port 8000
//! ```

/// Configuration and Chrome argument profiles
pub mod config;

/// Error types
pub mod error;

/// Record, field vocabulary, and enrichment task types
pub mod record;

/// Field normalization (pure, total functions)
pub mod normalize;

/// Region name → code registry
pub mod registry;

/// Profile-id resolution over plain HTTP
pub mod resolver;

/// Browser session lifecycle and the session registry
pub mod session;

/// Sequential listing-table scrape
pub mod listing;

/// Bounded detail-enrichment worker pool
pub mod worker;

/// Browser process reaping
pub mod reaper;

/// Scrape orchestration and result aggregation
pub mod service;

/// REST API layer
pub mod server;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod tests;

pub use cli::*;
pub use config::*;
pub use error::*;
pub use record::*;
pub use registry::RegionRegistry;
pub use service::*;
pub use session::{SessionManager, SessionMode, SessionRegistry};
