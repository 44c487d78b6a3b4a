//! Error types for the match scraper

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a browser driver
#[derive(Error, Debug, Clone)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("could not read response body: {0}")]
    ResponseBody(String),

    #[error("browser error: {0}")]
    Other(String),
}

impl BrowserError {
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout { what: what.into(), after }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failures while waiting for an intercepted response
#[derive(Error, Debug, Clone)]
pub enum InterceptError {
    #[error("{fragment} response timed out after {after:?}")]
    Timeout { fragment: String, after: Duration },

    #[error("failed to parse {fragment} response: {reason}")]
    Parse { fragment: String, reason: String },

    #[error("{fragment} response could not be captured: {source}")]
    Browser {
        fragment: String,
        #[source]
        source: BrowserError,
    },
}

/// Structural mismatches in rendered pages or payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("expected 2 player score tables, found {0}")]
    ScoreTableCount(usize),

    #[error("could not identify the side of {0} on the match page")]
    UnknownSide(String),

    #[error("no player rows found in player score table")]
    NoPlayerRows,

    #[error("payload is missing {0}")]
    MissingField(&'static str),

    #[error("invalid selector {0}")]
    Selector(String),
}

/// Errors surfaced by a scrape run, grouped by blast radius
///
/// `Connection` and `Launch` end the run. Everything else is scoped to a single
/// team or row: the scraper records it and moves on.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] match_store::StoreError),

    #[error("Failed to launch browser: {0}")]
    Launch(#[source] BrowserError),

    #[error("Navigation to {url} timed out: {source}")]
    NavigationTimeout {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("Selector {selector} did not appear within {after:?}")]
    SelectorTimeout { selector: String, after: Duration },

    #[error(transparent)]
    Interception(#[from] InterceptError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Failed to persist match {match_id}: {source}")]
    PersistenceWrite {
        match_id: i64,
        #[source]
        source: match_store::StoreError,
    },

    #[error("Store lookup failed for match {match_id}: {source}")]
    PersistenceRead {
        match_id: i64,
        #[source]
        source: match_store::StoreError,
    },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Fatal errors abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Launch(_) | Self::Config(_))
    }
}
