use match_store::PlayerRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExtractionError;
use crate::normalize::{parse_player_label, value_as_i64, value_as_string, LenientInts};

/// A configured team whose schedule is scraped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// League team id (e.g. "90611")
    pub id: String,
    /// Display name exactly as the listing renders it
    pub name: String,
    /// Division the team plays in
    pub division_id: String,
}

impl Team {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        division_id: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), division_id: division_id.into() }
    }
}

/// A played fixture row on a team's listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    /// Value of the row's `data-uid` attribute
    pub uid: String,
    /// Round number from the first column, 0 when unreadable
    pub round: u32,
}

impl MatchRow {
    /// Selector of the row's "Matchfakta" control
    pub fn detail_link_selector(&self) -> String {
        format!("tr[data-uid=\"{}\"] td:nth-child(4) a", self.uid)
    }
}

/// Fixture metadata from the intercepted head-info response
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHeadInfo {
    pub match_id: i64,
    /// Home team id rendered as a string, for comparison with [`Team::id`]
    pub home_team_id: String,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_team_score: i32,
    pub away_team_score: i32,
    pub date: String,
    pub round_id: u32,
    pub division_id: i64,
    pub division_name: String,
    pub season: i32,
    /// The payload as received
    pub raw: Value,
}

impl MatchHeadInfo {
    /// Read the fields the scraper needs; only the match id and home team id are
    /// required, everything else falls back to empty or zero.
    pub fn from_value(raw: Value) -> Result<Self, ExtractionError> {
        let match_id = raw
            .get("matchId")
            .and_then(value_as_i64)
            .ok_or(ExtractionError::MissingField("matchId"))?;
        let home_team_id = raw
            .get("matchHomeTeamId")
            .and_then(value_as_string)
            .ok_or(ExtractionError::MissingField("matchHomeTeamId"))?;

        let text = |key: &str| raw.get(key).and_then(value_as_string).unwrap_or_default();
        let int = |key: &str| raw.get(key).and_then(value_as_i64).unwrap_or(0);
        let small = |key: &str| i32::try_from(int(key)).unwrap_or(0);

        Ok(Self {
            match_id,
            home_team_id,
            home_team_name: text("matchHomeTeamName"),
            away_team_name: text("matchAwayTeamName"),
            home_team_score: small("matchHomeTeamScore"),
            away_team_score: small("matchAwayTeamScore"),
            date: text("matchDate"),
            round_id: u32::try_from(int("matchRoundId")).unwrap_or(0),
            division_id: int("matchDivisionId"),
            division_name: text("matchDivisionName"),
            season: small("matchSeason"),
            raw,
        })
    }

    /// Whether `team` is the home side of this fixture
    pub fn is_home_team(&self, team: &Team) -> bool {
        self.home_team_id == team.id
    }
}

/// Player lists from the intercepted match-results response
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResultsPayload {
    raw: Value,
}

impl MatchResultsPayload {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// Normalized players for the home or away side, in display order
    pub fn players_for_side(&self, home: bool) -> Result<Vec<PlayerRecord>, ExtractionError> {
        let key: &'static str = if home { "playerListHome" } else { "playerListAway" };
        let list =
            self.raw.get(key).and_then(Value::as_array).ok_or(ExtractionError::MissingField(key))?;

        Ok(list.iter().map(player_from_value).collect())
    }
}

fn player_from_value(entry: &Value) -> PlayerRecord {
    let label = entry.get("player").and_then(value_as_string).unwrap_or_default();
    let (name, parsed_license) = parse_player_label(&label);
    let license_number = entry
        .get("licNbr")
        .and_then(value_as_string)
        .filter(|l| !l.trim().is_empty())
        .unwrap_or(parsed_license);

    let mut ints = LenientInts::new();
    let player = PlayerRecord {
        name,
        license_number,
        series1: ints.read_value(entry.get("result1")),
        series2: ints.read_value(entry.get("result2")),
        series3: ints.read_value(entry.get("result3")),
        series4: ints.read_value(entry.get("result4")),
        total_score: ints.read_value(entry.get("totalResultWithoutHcp")),
        series_count: ints.read_value(entry.get("totalSeries")),
        lane_points: ints.read_value(entry.get("lanePoint")),
        position: ints.read_value(entry.get("place")),
        degraded: false,
    };

    PlayerRecord { degraded: ints.degraded(), ..player }
}

/// Outcome of one scrape run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub success: bool,
    pub message: String,
    /// Newly inserted matches
    pub matches_processed: usize,
    /// Every failure seen during the run, including the ones that were skipped over
    pub errors: Vec<String>,
}

impl RunResult {
    pub fn completed(matches_processed: usize, errors: Vec<String>) -> Self {
        Self {
            success: true,
            message: format!("Successfully processed {matches_processed} matches"),
            matches_processed,
            errors,
        }
    }

    pub fn failed(
        message: impl Into<String>,
        matches_processed: usize,
        mut errors: Vec<String>,
    ) -> Self {
        let message = message.into();
        errors.push(message.clone());
        Self { success: false, message, matches_processed, errors }
    }
}
