//! # Match Store
//!
//! Persistence gateway for scraped league matches. The scraper only needs two
//! idempotent operations from storage: an existence check on the record key
//! and an insert that reports a uniqueness conflict instead of failing.
//!
//! ## Architecture
//!
//! - **MatchStore**: Abstract trait the scraper talks to
//! - **PgMatchStore**: Postgres implementation (sqlx, schema via migrations)
//! - **InMemoryMatchStore**: Process-local implementation for tests and dry runs
//!
//! ## Usage
//!
//! ```rust
//! use match_store::{InMemoryMatchStore, InsertOutcome, MatchRecord, MatchStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryMatchStore::new();
//!     store.connect().await?;
//!
//!     let record = MatchRecord {
//!         match_id: 555,
//!         team_id: "90611".to_string(),
//!         team_name: "Lunds BK Mamba".to_string(),
//!         ..Default::default()
//!     };
//!     assert_eq!(store.insert(&record).await?, InsertOutcome::Inserted);
//!     assert!(store.exists(555, "90611").await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod postgres;
pub mod record;

pub use backend::{InMemoryMatchStore, InsertOutcome, MatchStore};
pub use config::DatabaseConfig;
pub use error::{Result, StoreError};
pub use postgres::PgMatchStore;
pub use record::{MatchKey, MatchRecord, PlayerRecord};
