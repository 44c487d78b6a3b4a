//! Browser capability seam.
//!
//! The scraper only needs a handful of page operations. Keeping them behind
//! these traits lets the orchestration run against the headless Chrome driver in
//! production and against scripted pages in tests.

use std::sync::Arc;
use std::time::Duration;

use crate::error::BrowserError;

/// Identifies a registered response listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "response-listener-{}", self.0)
    }
}

/// Called once per network response with the response URL and a body reader.
/// Reading the body is optional and may be expensive.
pub type ResponseListener =
    Box<dyn Fn(&str, &dyn Fn() -> Result<String, BrowserError>) + Send + Sync>;

/// One browser page, driven sequentially by a single owner
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait until the page has loaded
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait until an element matching `selector` is present
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    /// Current rendered HTML
    async fn content(&self) -> Result<String, BrowserError>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Wait for the navigation started by the last action to complete
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// Go back one history entry and wait for it to load
    async fn go_back(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// Start notifying `listener` about network responses
    fn add_response_listener(&self, listener: ResponseListener) -> Result<ListenerId, BrowserError>;

    /// Stop notifying a listener; unknown ids are ignored
    fn remove_response_listener(&self, id: ListenerId) -> Result<(), BrowserError>;

    /// Close the page and its browser session
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Starts a browser session for one run
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, BrowserError>;
}
