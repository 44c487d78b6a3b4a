use anyhow::{Context, Result};
use clap::Parser;
use match_scraper::{ChromeLauncher, MatchScraper, ScraperConfig};
use match_store::{DatabaseConfig, InMemoryMatchStore, MatchStore, PgMatchStore};
use scrape_gateway::{create_routes, initialize_logging, AppState, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// HTTP gateway that runs the match scraper on demand
#[derive(Parser)]
#[command(name = "scrape-gateway")]
#[command(about = "Trigger match scrapes over HTTP and stream their progress")]
struct Cli {
    /// Scraper configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: pretty, json or compact
    #[arg(long, default_value = "compact")]
    log_format: String,

    /// Keep scraped matches in memory instead of Postgres
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli.log_level, &cli.log_format)?;

    info!("Starting ScrapeGateway v{}", env!("CARGO_PKG_VERSION"));

    let scraper_config =
        ScraperConfig::load(cli.config.as_deref()).context("Failed to load scraper configuration")?;
    info!(
        "Configured {} teams for season {}",
        scraper_config.teams.len(),
        scraper_config.site.season
    );

    let store: Arc<dyn MatchStore> = if cli.dry_run {
        info!("Dry run: matches are kept in memory only");
        Arc::new(InMemoryMatchStore::new())
    } else {
        let db_config =
            DatabaseConfig::from_env().context("Failed to read database configuration")?;
        Arc::new(PgMatchStore::new(&db_config).context("Failed to create database pool")?)
    };
    let launcher = Arc::new(ChromeLauncher::new(scraper_config.browser.clone()));
    let scraper = Arc::new(MatchScraper::new(scraper_config, store, launcher));

    let server = ServerConfig { host: cli.host, port: cli.port, ..Default::default() };
    let addr = server.socket_addr()?;
    let routes = create_routes(Arc::new(AppState::new(scraper, server.keep_alive())));

    info!("Listening on http://{}", addr);
    warp::serve(routes).run(addr).await;
    Ok(())
}
