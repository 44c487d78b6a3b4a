//! # Match Scraper
//!
//! Collects bowling league match results from the league site, which only
//! exposes them through XHR calls fired while a match detail page renders.
//!
//! ## Architecture
//!
//! - **MatchScraper**: walks each configured team's schedule in one browser page
//! - **PageDriver / BrowserLauncher**: browser capabilities, backed by headless Chrome
//! - **intercept**: captures the head-info and match-results responses of a click
//! - **extract / normalize**: listing rows, player tables and lenient numbers
//! - **RunLog**: progress events for a run, ending with its [`RunResult`]
//!
//! Matches are stored through [`match_store::MatchStore`], keyed by
//! `(match_id, team_id)`; a key that is already stored is skipped.

pub mod browser;
pub mod chrome;
pub mod config;
pub mod error;
pub mod extract;
pub mod intercept;
pub mod normalize;
pub mod progress;
pub mod scraper;
pub mod types;

#[cfg(test)]
mod testing;

pub use browser::{BrowserLauncher, ListenerId, PageDriver, ResponseListener};
pub use chrome::{ChromeLauncher, ChromePage};
pub use config::{BrowserConfig, ScraperConfig, SiteConfig, TimeoutConfig};
pub use error::{BrowserError, ExtractionError, InterceptError, ScrapeError};
pub use intercept::{intercept, PendingResponse};
pub use progress::{RunLog, ScrapeEvent};
pub use scraper::{run_scraper, MatchScraper};
pub use types::{MatchHeadInfo, MatchResultsPayload, MatchRow, RunResult, Team};
