//! # ScrapeGateway
//!
//! HTTP front of the match scraper. A client opens `GET /api/scrape` as an
//! event stream and receives the run's progress lines followed by its result.

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;

pub use config::ServerConfig;
pub use error::{GatewayError, Result};
pub use logging::initialize_logging;
pub use routes::{create_routes, AppState};
