//! Extraction from rendered league pages

use match_store::PlayerRecord;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::normalize::{parse_player_label, parse_round, LenientInts};
use crate::types::MatchRow;

/// Rows of the division schedule table on a team listing page
pub const LISTING_ROW_SELECTOR: &str = r#"#divisionMatchesDesktop table[role="grid"] tr[data-uid]"#;

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector(format!("{css}: {e:?}")))
}

fn cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name().eq_ignore_ascii_case("td"))
        .collect()
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Find the played fixtures of `team_name` on a rendered listing page.
///
/// Column layout of a schedule row: round in the 1st cell, the "Matchfakta"
/// control in the 4th, the two team labels (`a.details-link`) in the 5th. Rows
/// without the control are unplayed fixtures and are skipped.
pub fn extract_match_rows(html: &str, team_name: &str) -> Vec<MatchRow> {
    let document = Html::parse_document(html);

    // Selectors are constants; a parse failure here is a programming error
    let (row_selector, team_link_selector, anchor_selector) =
        match (selector(LISTING_ROW_SELECTOR), selector("a.details-link"), selector("a")) {
            (Ok(r), Ok(t), Ok(a)) => (r, t, a),
            _ => {
                warn!("Listing selectors failed to parse");
                return Vec::new();
            }
        };

    let mut rows = Vec::new();
    for row in document.select(&row_selector) {
        let cells = cells(&row);
        if cells.len() < 5 {
            continue;
        }

        let lists_team =
            cells[4].select(&team_link_selector).any(|link| text_of(&link) == team_name);
        if !lists_team {
            continue;
        }

        if cells[3].select(&anchor_selector).next().is_none() {
            continue;
        }

        let uid = row.value().attr("data-uid").unwrap_or("").trim();
        if uid.is_empty() {
            continue;
        }

        rows.push(MatchRow { uid: uid.to_string(), round: parse_round(&text_of(&cells[0])) });
    }

    debug!("Extracted {} match rows for {}", rows.len(), team_name);
    rows
}

/// Player statistics read from a rendered match detail page
#[derive(Debug, Clone, PartialEq)]
pub struct DomMatchDetail {
    pub home_team: String,
    pub away_team: String,
    pub is_home_game: bool,
    pub players: Vec<PlayerRecord>,
}

/// Read the observed team's player table from a rendered match detail page.
pub fn extract_player_table(
    html: &str,
    team_name: &str,
) -> Result<DomMatchDetail, ExtractionError> {
    let document = Html::parse_document(html);

    let home_name_selector = selector(".home-team .team-name")?;
    let away_name_selector = selector(".away-team .team-name")?;
    let score_table_selector = selector(".matchdetail-player-score")?;
    let row_selector = selector("table tbody tr:not(.Grid_Header)")?;

    let first_text =
        |s: &Selector| document.select(s).next().map(|e| text_of(&e)).unwrap_or_default();
    let home_team = first_text(&home_name_selector);
    let away_team = first_text(&away_name_selector);

    let tables: Vec<ElementRef<'_>> = document.select(&score_table_selector).collect();
    if tables.len() != 2 {
        return Err(ExtractionError::ScoreTableCount(tables.len()));
    }

    let is_home_game = if names_team(&home_team, team_name) {
        true
    } else if names_team(&away_team, team_name) {
        false
    } else {
        return Err(ExtractionError::UnknownSide(team_name.to_string()));
    };

    let table = if is_home_game { tables[0] } else { tables[1] };

    let mut players = Vec::new();
    for row in table.select(&row_selector) {
        match parse_player_row(&row) {
            Some(player) => players.push(player),
            None => continue,
        }
    }

    if players.is_empty() {
        return Err(ExtractionError::NoPlayerRows);
    }

    Ok(DomMatchDetail { home_team, away_team, is_home_game, players })
}

fn names_team(label: &str, team_name: &str) -> bool {
    !label.is_empty()
        && (label == team_name || label.to_lowercase().contains(&team_name.to_lowercase()))
}

/// Cells: label, series 1-4, total, series count, lane points, position.
/// The last two are missing on some layouts and then read as 0.
fn parse_player_row(row: &ElementRef<'_>) -> Option<PlayerRecord> {
    let cells = cells(row);
    if cells.len() < 7 {
        return None;
    }

    let cell = |i: usize| cells.get(i).map(text_of);
    let (name, license_number) = parse_player_label(&text_of(&cells[0]));

    let mut ints = LenientInts::new();
    let player = PlayerRecord {
        name,
        license_number,
        series1: ints.read_text(cell(1).as_deref()),
        series2: ints.read_text(cell(2).as_deref()),
        series3: ints.read_text(cell(3).as_deref()),
        series4: ints.read_text(cell(4).as_deref()),
        total_score: ints.read_text(cell(5).as_deref()),
        series_count: ints.read_text(cell(6).as_deref()),
        lane_points: ints.read_text(cell(7).as_deref()),
        position: ints.read_text(cell(8).as_deref()),
        degraded: false,
    };

    Some(PlayerRecord { degraded: ints.degraded(), ..player })
}
