use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ScrapeError;
use crate::types::Team;

/// Configuration for a scrape run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Upstream site configuration
    pub site: SiteConfig,

    /// Teams to visit, in order
    pub teams: Vec<Team>,

    /// Bounds for every wait the scraper performs
    pub timeouts: TimeoutConfig,

    /// Headless browser configuration
    pub browser: BrowserConfig,

    /// Read players from the rendered detail page when the match-results
    /// response could not be intercepted
    pub dom_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL of the league site
    pub base_url: String,

    /// Season id (e.g. 2025)
    pub season: u32,

    /// Owning club id
    pub club_id: String,

    /// URL fragment of the head-info XHR
    pub head_info_fragment: String,

    /// URL fragment of the match-results XHR
    pub match_results_fragment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Page navigation timeout in milliseconds
    pub navigation_ms: u64,

    /// Listing table wait in milliseconds
    pub selector_ms: u64,

    /// Intercepted response wait in milliseconds
    pub response_ms: u64,

    /// Pause between detail pages in milliseconds
    pub row_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Chrome sandbox; usually disabled inside containers
    pub sandbox: bool,

    pub window_width: u32,
    pub window_height: u32,

    /// Chrome executable, auto-detected when unset
    pub chrome_path: Option<PathBuf>,

    /// Browser is torn down after this long without DevTools traffic
    pub idle_timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            teams: vec![
                Team::new("90611", "Lunds BK Mamba", "4"),
                Team::new("162063", "Lunds BK Mamba B", "874"),
                Team::new("107121", "Lunds BK Mamba F1", "923"),
                Team::new("184677", "Lunds BK Mamba F2", "803"),
            ],
            timeouts: TimeoutConfig::default(),
            browser: BrowserConfig::default(),
            dom_fallback: false,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bits.swebowl.se".to_string(),
            season: 2025,
            club_id: "33651".to_string(),
            head_info_fragment: "matchResult/GetHeadInfo".to_string(),
            match_results_fragment: "matchResult/GetMatchResults".to_string(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { navigation_ms: 30_000, selector_ms: 10_000, response_ms: 30_000, row_delay_ms: 500 }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            window_width: 1920,
            window_height: 1080,
            chrome_path: None,
            idle_timeout_secs: 300,
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn selector(&self) -> Duration {
        Duration::from_millis(self.selector_ms)
    }

    pub fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }
}

impl ScraperConfig {
    /// Load configuration from an optional TOML file, then `SCRAPER__*`
    /// environment variables (e.g. `SCRAPER__SITE__SEASON=2024`)
    pub fn load(path: Option<&Path>) -> Result<Self, ScrapeError> {
        dotenv::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            tracing::debug!("Loading scraper configuration from {:?}", path);
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SCRAPER").separator("__").try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ScrapeError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Listing page for one team
    pub fn listing_url(&self, team: &Team) -> String {
        format!(
            "{}/seriespel?seasonId={}&clubId={}&teamId={}&divisionId={}\
             &showAllDivisionMatches=true&showTeamDetails=true",
            self.site.base_url.trim_end_matches('/'),
            self.site.season,
            self.site.club_id,
            team.id,
            team.division_id
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.teams.is_empty() {
            return Err(ScrapeError::Config("at least one team must be configured".to_string()));
        }

        let mut seen = HashSet::new();
        for team in &self.teams {
            if team.id.is_empty() || team.name.is_empty() {
                return Err(ScrapeError::Config(format!("team entry {team:?} is incomplete")));
            }
            if !seen.insert(team.id.as_str()) {
                return Err(ScrapeError::Config(format!("duplicate team id {}", team.id)));
            }
        }

        let t = &self.timeouts;
        if t.navigation_ms == 0 || t.selector_ms == 0 || t.response_ms == 0 {
            return Err(ScrapeError::Config("timeouts must be greater than 0".to_string()));
        }

        if self.site.head_info_fragment.is_empty()
            || self.site.match_results_fragment.is_empty()
            || self.site.head_info_fragment == self.site.match_results_fragment
        {
            return Err(ScrapeError::Config(
                "response fragments must be non-empty and distinct".to_string(),
            ));
        }

        Ok(())
    }
}
