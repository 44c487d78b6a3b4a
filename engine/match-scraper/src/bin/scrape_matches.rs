use anyhow::{Context, Result};
use clap::Parser;
use match_scraper::{run_scraper, ChromeLauncher, MatchScraper, RunLog, ScraperConfig};
use match_store::{DatabaseConfig, InMemoryMatchStore, MatchStore, PgMatchStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One-shot sweep over every configured team
#[derive(Parser, Debug)]
#[command(name = "scrape_matches")]
#[command(about = "Scrape played league matches and store them")]
struct Cli {
    /// Scraper configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep scraped matches in memory instead of Postgres
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config =
        ScraperConfig::load(cli.config.as_deref()).context("Failed to load scraper configuration")?;
    info!(
        "Starting match scraper for {} teams, season {}",
        config.teams.len(),
        config.site.season
    );

    let store: Arc<dyn MatchStore> = if cli.dry_run {
        info!("Dry run: matches are kept in memory only");
        Arc::new(InMemoryMatchStore::new())
    } else {
        let db_config =
            DatabaseConfig::from_env().context("Failed to read database configuration")?;
        Arc::new(PgMatchStore::new(&db_config).context("Failed to create database pool")?)
    };
    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));

    let scraper = Arc::new(MatchScraper::new(config, store, launcher));
    let result = run_scraper(scraper, RunLog::discard()).await;

    println!("\nSummary:");
    println!("- Success: {}", result.success);
    println!("- {}", result.message);
    println!("- Matches processed: {}", result.matches_processed);
    if !result.errors.is_empty() {
        println!("- Errors ({}):", result.errors.len());
        for error in &result.errors {
            println!("    {error}");
        }
    }

    if !result.success {
        anyhow::bail!("Scrape run failed: {}", result.message);
    }
    Ok(())
}
