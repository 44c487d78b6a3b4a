//! Error types for the ScrapeGateway

use thiserror::Error;

/// Errors that can occur while starting the ScrapeGateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid listen address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type for ScrapeGateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
