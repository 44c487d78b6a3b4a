//! Configuration for the ScrapeGateway

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{GatewayError, Result};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Interval of SSE keep-alive comments in seconds
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3001, keep_alive_secs: 15 }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let address = format!("{}:{}", self.host, self.port);
        address.parse().map_err(|e: std::net::AddrParseError| GatewayError::InvalidAddress {
            address: address.clone(),
            reason: e.to_string(),
        })
    }

    pub fn keep_alive(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.keep_alive_secs.max(1))
    }
}
