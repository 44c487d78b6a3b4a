//! Postgres-backed match store

use crate::backend::{InsertOutcome, MatchStore};
use crate::config::DatabaseConfig;
use crate::error::{Result, StoreError};
use crate::record::MatchRecord;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};

/// Match store on top of a Postgres pool
///
/// The pool is created lazily so the owning service can start without the
/// database; reachability is checked by [`MatchStore::connect`] at the start of
/// every run.
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    /// Create a store with a lazily connecting pool
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&config.url)
            .map_err(|e| StoreError::config(format!("Invalid database url: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl MatchStore for PgMatchStore {
    async fn connect(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        info!("Connected to match database");
        Ok(())
    }

    async fn exists(&self, match_id: i64, team_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM matches WHERE match_id = $1 AND team_id = $2)",
        )
        .bind(match_id)
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, record: &MatchRecord) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO matches (
                match_id, team_id, team_name, match_date, round,
                home_team, away_team, home_score, away_score, is_home_game,
                division_id, division_name, season, head_info, players
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (match_id, team_id) DO NOTHING
            "#,
        )
        .bind(record.match_id)
        .bind(&record.team_id)
        .bind(&record.team_name)
        .bind(&record.date)
        .bind(round_column(record.round))
        .bind(&record.home_team)
        .bind(&record.away_team)
        .bind(record.home_score)
        .bind(record.away_score)
        .bind(record.is_home_game)
        .bind(record.division_id)
        .bind(&record.division_name)
        .bind(record.season)
        .bind(Json(&record.head_info))
        .bind(Json(&record.players))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                debug!("Insert of {} hit an existing row", record.key());
                Ok(InsertOutcome::Duplicate)
            }
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) => {
                let err = StoreError::from(e);
                if err.is_unique_violation() {
                    Ok(InsertOutcome::Duplicate)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// `round` is stored as INTEGER; rounds that do not fit become 0
fn round_column(round: u32) -> i32 {
    i32::try_from(round).unwrap_or(0)
}
