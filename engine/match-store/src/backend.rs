//! Match store trait and the in-memory implementation

use crate::error::{Result, StoreError};
use crate::record::{MatchKey, MatchRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of an insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was written
    Inserted,
    /// A record with the same key already existed; nothing was written
    Duplicate,
}

/// Abstract trait for match storage
///
/// Implementations must enforce uniqueness of `(match_id, team_id)` and report a
/// conflicting insert as [`InsertOutcome::Duplicate`] rather than as an error, so
/// that a retried or racing insert behaves like "already exists".
#[async_trait::async_trait]
pub trait MatchStore: Send + Sync {
    /// Verify the store is reachable and its schema is in place
    async fn connect(&self) -> Result<()>;

    /// Check whether a record exists for the key
    async fn exists(&self, match_id: i64, team_id: &str) -> Result<bool>;

    /// Insert a new record
    async fn insert(&self, record: &MatchRecord) -> Result<InsertOutcome>;
}

/// In-memory match store (for testing and dry runs)
#[derive(Clone, Default)]
pub struct InMemoryMatchStore {
    records: Arc<tokio::sync::Mutex<HashMap<MatchKey, MatchRecord>>>,
    connected: Arc<AtomicBool>,
}

impl InMemoryMatchStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Fetch a stored record by key
    pub async fn get(&self, match_id: i64, team_id: &str) -> Option<MatchRecord> {
        self.records.lock().await.get(&MatchKey::new(match_id, team_id)).cloned()
    }

    /// All records stored for a team, ordered by match id
    pub async fn records_for_team(&self, team_id: &str) -> Vec<MatchRecord> {
        let records = self.records.lock().await;
        let mut matches: Vec<MatchRecord> =
            records.values().filter(|r| r.team_id == team_id).cloned().collect();
        matches.sort_by_key(|r| r.match_id);
        matches
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(StoreError::invalid_operation("Match store not connected"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn connect(&self) -> Result<()> {
        if !self.connected.swap(true, Ordering::AcqRel) {
            tracing::info!("In-memory match store initialized");
        }
        Ok(())
    }

    async fn exists(&self, match_id: i64, team_id: &str) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.records.lock().await.contains_key(&MatchKey::new(match_id, team_id)))
    }

    async fn insert(&self, record: &MatchRecord) -> Result<InsertOutcome> {
        self.ensure_connected()?;

        let mut records = self.records.lock().await;
        let key = record.key();
        if records.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }

        records.insert(key, record.clone());
        Ok(InsertOutcome::Inserted)
    }
}
