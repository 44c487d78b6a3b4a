use match_store::{InsertOutcome, MatchRecord, MatchStore, PlayerRecord};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::browser::{BrowserLauncher, PageDriver};
use crate::config::ScraperConfig;
use crate::error::{ExtractionError, ScrapeError};
use crate::extract::{extract_match_rows, extract_player_table, LISTING_ROW_SELECTOR};
use crate::intercept::intercept;
use crate::progress::RunLog;
use crate::types::{MatchHeadInfo, MatchResultsPayload, MatchRow, RunResult, Team};

/// What happened to one listing row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Inserted,
    AlreadyStored,
}

/// Drives one browser page through every configured team's schedule
pub struct MatchScraper {
    config: ScraperConfig,
    store: Arc<dyn MatchStore>,
    launcher: Arc<dyn BrowserLauncher>,
}

impl MatchScraper {
    pub fn new(
        config: ScraperConfig,
        store: Arc<dyn MatchStore>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self { config, store, launcher }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Run one sweep over all teams.
    ///
    /// Only a fatal error (see [`ScrapeError::is_fatal`]) fails the run. Team
    /// and row failures are collected in [`RunResult::errors`].
    pub async fn run(&self, log: &RunLog) -> RunResult {
        let mut errors = Vec::new();

        let page = match self.start(log).await {
            Ok(page) => page,
            Err(e) => return fatal(log, e, errors),
        };

        let mut processed = 0;
        for team in &self.config.teams {
            log.log(format!("Scraping matches for {} ({})", team.name, team.id));
            match self.scrape_team(&page, team, log, &mut errors).await {
                Ok(inserted) => processed += inserted,
                Err(e) if e.is_fatal() => {
                    close_page(&page).await;
                    return fatal(log, e, errors);
                }
                Err(e) => {
                    let message = format!("Error scraping {}: {}", team.name, e);
                    log.log(message.clone());
                    errors.push(message);
                }
            }
        }

        close_page(&page).await;

        log.log(format!("Scraping complete. Processed {processed} matches."));
        RunResult::completed(processed, errors)
    }

    /// Validate the configuration, connect the store and open a page
    async fn start(&self, log: &RunLog) -> Result<Arc<dyn PageDriver>, ScrapeError> {
        self.config.validate()?;

        log.log("Connecting to database...");
        self.store.connect().await.map_err(ScrapeError::Connection)?;

        log.log("Launching browser...");
        self.launcher.launch().await.map_err(ScrapeError::Launch)
    }

    /// Visit one team's listing and process its played fixtures.
    ///
    /// Returns the number of newly stored matches. Row failures are appended to
    /// `errors`. If the listing cannot be restored after a detail page, the
    /// remaining rows are abandoned and the matches stored so far still count.
    /// An error return means the listing never loaded.
    async fn scrape_team(
        &self,
        page: &Arc<dyn PageDriver>,
        team: &Team,
        log: &RunLog,
        errors: &mut Vec<String>,
    ) -> Result<usize, ScrapeError> {
        let url = self.config.listing_url(team);
        self.open_listing(page, &url).await?;

        let html = page.content().await?;
        let rows = extract_match_rows(&html, &team.name);
        log.log(format!("Found {} played matches for {}", rows.len(), team.name));

        let mut inserted = 0;
        for (i, row) in rows.iter().enumerate() {
            log.log(format!("Processing match {}/{} (row {})", i + 1, rows.len(), row.uid));
            let mut navigated = false;
            match self.scrape_row(page, team, row, log, &mut navigated).await {
                Ok(RowOutcome::Inserted) => inserted += 1,
                Ok(RowOutcome::AlreadyStored) => {}
                Err(e) => {
                    let message = format!("Error processing match row {}: {}", row.uid, e);
                    log.log(message.clone());
                    errors.push(message);
                }
            }

            if navigated {
                if let Err(e) = self.return_to_listing(page, &url, errors).await {
                    let message = format!("Error scraping {}: {}", team.name, e);
                    log.log(message.clone());
                    errors.push(message);
                    break;
                }
            }
            tokio::time::sleep(self.config.timeouts.row_delay()).await;
        }

        Ok(inserted)
    }

    async fn open_listing(
        &self,
        page: &Arc<dyn PageDriver>,
        url: &str,
    ) -> Result<(), ScrapeError> {
        let timeouts = &self.config.timeouts;

        page.goto(url, timeouts.navigation()).await.map_err(|source| {
            if source.is_timeout() {
                ScrapeError::NavigationTimeout { url: url.to_string(), source }
            } else {
                ScrapeError::Browser(source)
            }
        })?;

        page.wait_for_selector(LISTING_ROW_SELECTOR, timeouts.selector())
            .await
            .map_err(|e| {
                debug!("Listing wait failed: {}", e);
                ScrapeError::SelectorTimeout {
                    selector: LISTING_ROW_SELECTOR.to_string(),
                    after: timeouts.selector(),
                }
            })
    }

    /// Go back to the listing after a detail page, reloading it if history fails
    async fn return_to_listing(
        &self,
        page: &Arc<dyn PageDriver>,
        url: &str,
        errors: &mut Vec<String>,
    ) -> Result<(), ScrapeError> {
        let back = page.go_back(self.config.timeouts.navigation()).await;
        let listed = match back {
            Ok(()) => page
                .wait_for_selector(LISTING_ROW_SELECTOR, self.config.timeouts.selector())
                .await
                .is_ok(),
            Err(e) => {
                warn!("Failed to navigate back to {}: {}", url, e);
                errors.push(format!("Failed to navigate back to listing: {e}"));
                false
            }
        };

        if !listed {
            self.open_listing(page, url).await?;
        }
        Ok(())
    }

    async fn scrape_row(
        &self,
        page: &Arc<dyn PageDriver>,
        team: &Team,
        row: &MatchRow,
        log: &RunLog,
        navigated: &mut bool,
    ) -> Result<RowOutcome, ScrapeError> {
        let site = &self.config.site;
        let timeouts = &self.config.timeouts;

        // Both responses fire during the click; listen before it
        let head = intercept(page, &site.head_info_fragment, timeouts.response())?;
        let results = intercept(page, &site.match_results_fragment, timeouts.response())?;

        page.click(&row.detail_link_selector()).await?;
        *navigated = true;

        page.wait_for_navigation(timeouts.navigation()).await.map_err(|source| {
            ScrapeError::NavigationTimeout { url: format!("match details {}", row.uid), source }
        })?;

        let head: Value = head.wait().await?;
        let results: Option<Value> = match results.wait().await {
            Ok(value) => Some(value),
            Err(e) if self.config.dom_fallback => {
                log.log(format!("{e}; reading players from the match page"));
                None
            }
            Err(e) => return Err(e.into()),
        };

        let head = MatchHeadInfo::from_value(head)?;
        let is_home_game = head.is_home_team(team);

        let exists = self
            .store
            .exists(head.match_id, &team.id)
            .await
            .map_err(|source| ScrapeError::PersistenceRead { match_id: head.match_id, source })?;
        if exists {
            log.log(format!(
                "Match {} already exists for {}, skipping",
                head.match_id, team.name
            ));
            return Ok(RowOutcome::AlreadyStored);
        }

        let players = match results {
            Some(results) => {
                MatchResultsPayload::from_value(results).players_for_side(is_home_game)?
            }
            None => self.players_from_page(page, team, is_home_game).await?,
        };

        let record = build_record(team, row, head, is_home_game, players);
        let degraded = record.degraded_players();
        if degraded > 0 {
            warn!(
                "Match {}: {} players had unreadable numbers, stored as 0",
                record.match_id, degraded
            );
        }

        match self.store.insert(&record).await {
            Ok(InsertOutcome::Inserted) => {
                log.log(format!(
                    "Saved match {} for {} ({} players)",
                    record.match_id,
                    team.name,
                    record.players.len()
                ));
                Ok(RowOutcome::Inserted)
            }
            Ok(InsertOutcome::Duplicate) => {
                log.log(format!(
                    "Match {} already exists for {}, skipping",
                    record.match_id, team.name
                ));
                Ok(RowOutcome::AlreadyStored)
            }
            Err(source) => Err(ScrapeError::PersistenceWrite { match_id: record.match_id, source }),
        }
    }

    /// Read the team's players from the rendered match page.
    ///
    /// The side shown on the page must agree with the head-info side.
    async fn players_from_page(
        &self,
        page: &Arc<dyn PageDriver>,
        team: &Team,
        is_home_game: bool,
    ) -> Result<Vec<PlayerRecord>, ScrapeError> {
        let html = page.content().await?;
        let detail = extract_player_table(&html, &team.name)?;
        if detail.is_home_game != is_home_game {
            return Err(ExtractionError::UnknownSide(team.name.clone()).into());
        }
        Ok(detail.players)
    }
}

fn build_record(
    team: &Team,
    row: &MatchRow,
    head: MatchHeadInfo,
    is_home_game: bool,
    players: Vec<PlayerRecord>,
) -> MatchRecord {
    MatchRecord {
        match_id: head.match_id,
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        date: head.date,
        round: if row.round > 0 { row.round } else { head.round_id },
        home_team: head.home_team_name,
        away_team: head.away_team_name,
        home_score: head.home_team_score,
        away_score: head.away_team_score,
        is_home_game,
        division_id: head.division_id,
        division_name: head.division_name,
        season: head.season,
        head_info: head.raw,
        players,
    }
}

async fn close_page(page: &Arc<dyn PageDriver>) {
    if let Err(e) = page.close().await {
        warn!("Failed to close browser: {}", e);
    }
}

fn fatal(log: &RunLog, err: ScrapeError, errors: Vec<String>) -> RunResult {
    let message = format!("Scraper error: {err}");
    error!("{}", message);
    log.log(message.clone());
    RunResult::failed(message, 0, errors)
}

/// Run a sweep on its own task and publish the result on `log`.
///
/// The result event is always sent last, also when the run task panics.
pub async fn run_scraper(scraper: Arc<MatchScraper>, log: RunLog) -> RunResult {
    let task_log = log.clone();
    let handle = tokio::spawn(async move { scraper.run(&task_log).await });

    let result = match handle.await {
        Ok(result) => result,
        Err(e) => {
            let message = format!("Scraper error: {e}");
            error!("{}", message);
            log.log(message.clone());
            RunResult::failed(message, 0, Vec::new())
        }
    };

    log.finish(&result);
    result
}
