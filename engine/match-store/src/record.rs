//! Stored match and player records

use serde::{Deserialize, Serialize};

/// Uniqueness key of a stored match: a fixture is stored once per team whose
/// schedule lists it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub match_id: i64,
    pub team_id: String,
}

impl MatchKey {
    pub fn new(match_id: i64, team_id: impl Into<String>) -> Self {
        Self { match_id, team_id: team_id.into() }
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "match {} / team {}", self.match_id, self.team_id)
    }
}

/// One player's line in a match, from the observed team's side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Player name without the license suffix
    pub name: String,
    /// License number, empty when the source label carried none
    pub license_number: String,
    pub series1: i32,
    pub series2: i32,
    pub series3: i32,
    pub series4: i32,
    /// Pin total without handicap
    pub total_score: i32,
    /// Number of series bowled
    pub series_count: i32,
    pub lane_points: i32,
    /// Finish position within the match
    pub position: i32,
    /// Set when at least one numeric field was missing or non-numeric at the
    /// source and was stored as 0
    #[serde(default)]
    pub degraded: bool,
}

/// A played fixture as seen from one configured team
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// External match id
    pub match_id: i64,
    pub team_id: String,
    pub team_name: String,
    pub date: String,
    pub round: u32,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    /// Relative to `team_id`
    pub is_home_game: bool,
    pub division_id: i64,
    pub division_name: String,
    pub season: i32,
    /// Head-info payload exactly as intercepted
    pub head_info: serde_json::Value,
    pub players: Vec<PlayerRecord>,
}

impl MatchRecord {
    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.match_id, self.team_id.clone())
    }

    /// Number of players with at least one degraded numeric field
    pub fn degraded_players(&self) -> usize {
        self.players.iter().filter(|p| p.degraded).count()
    }
}
