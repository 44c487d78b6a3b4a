//! HTTP endpoints for the ScrapeGateway
//!
//! `GET /api/scrape` starts a run and streams its progress as server-sent
//! events: one `log` event per progress line, then a single `result` event
//! carrying the JSON [`RunResult`]. Only one run may be active at a time.

use futures_util::StreamExt;
use match_scraper::{run_scraper, MatchScraper, RunLog, RunResult, ScrapeEvent};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use warp::sse::Event;
use warp::Filter;

/// Shared state of the HTTP handlers
pub struct AppState {
    scraper: Arc<MatchScraper>,
    run_lock: Arc<Mutex<()>>,
    keep_alive: Duration,
}

impl AppState {
    pub fn new(scraper: Arc<MatchScraper>, keep_alive: Duration) -> Self {
        Self { scraper, run_lock: Arc::new(Mutex::new(())), keep_alive }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }
}

fn to_event(event: ScrapeEvent) -> Event {
    match event {
        ScrapeEvent::Log(line) => Event::default().event("log").data(line),
        ScrapeEvent::Result(result) => Event::default()
            .event("result")
            .data(serde_json::to_string(&result).unwrap_or_else(|e| {
                format!(r#"{{"success":false,"message":"{e}","matchesProcessed":0,"errors":[]}}"#)
            })),
    }
}

/// Start a run, or report that one is already active
async fn start_scrape(state: Arc<AppState>) -> Result<impl warp::Reply, warp::Rejection> {
    let (log, rx) = RunLog::channel();

    match state.run_lock.clone().try_lock_owned() {
        Ok(guard) => {
            info!("Scrape run requested");
            let scraper = state.scraper.clone();
            tokio::spawn(async move {
                let result = run_scraper(scraper, log).await;
                info!(
                    "Scrape run finished: success={} processed={}",
                    result.success, result.matches_processed
                );
                drop(guard);
            });
        }
        Err(_) => {
            warn!("Scrape run requested while another run is active");
            log.finish(&RunResult::failed("A scrape is already running", 0, Vec::new()));
        }
    }

    let stream = UnboundedReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(to_event(event)));
    Ok(warp::sse::reply(warp::sse::keep_alive().interval(state.keep_alive).stream(stream)))
}

/// Create the gateway routes
pub fn create_routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    // Trigger a run and stream its log
    let scrape = warp::path("api")
        .and(warp::path("scrape"))
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(start_scrape);

    // Configured teams
    let teams = warp::path("api")
        .and(warp::path("teams"))
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: Arc<AppState>| warp::reply::json(&state.scraper.config().teams));

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .and(state_filter)
        .map(|state: Arc<AppState>| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "scrapeRunning": state.is_running(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        });

    scrape.or(teams).or(health).with(
        warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type"])
            .allow_methods(vec!["GET", "OPTIONS"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use match_scraper::{BrowserError, BrowserLauncher, PageDriver, ScraperConfig};
    use match_store::{InMemoryMatchStore, MatchStore};

    struct NoBrowser;

    #[async_trait]
    impl BrowserLauncher for NoBrowser {
        async fn launch(&self) -> Result<Arc<dyn PageDriver>, BrowserError> {
            Err(BrowserError::Launch("chrome not installed".to_string()))
        }
    }

    fn state() -> Arc<AppState> {
        let store: Arc<dyn MatchStore> = Arc::new(InMemoryMatchStore::new());
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(NoBrowser);
        let scraper = Arc::new(MatchScraper::new(ScraperConfig::default(), store, launcher));
        Arc::new(AppState::new(scraper, Duration::from_secs(15)))
    }

    fn result_payload(body: &str) -> serde_json::Value {
        let data = body
            .split("event:result\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .and_then(|line| line.strip_prefix("data:"))
            .unwrap();
        serde_json::from_str(data).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let routes = create_routes(state());
        let resp = warp::test::request().method("GET").path("/health").reply(&routes).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["scrapeRunning"], false);
    }

    #[tokio::test]
    async fn test_teams_lists_configuration() {
        let routes = create_routes(state());
        let resp = warp::test::request().method("GET").path("/api/teams").reply(&routes).await;

        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 4);
        assert_eq!(body[0]["id"], "90611");
        assert_eq!(body[0]["name"], "Lunds BK Mamba");
    }

    #[tokio::test]
    async fn test_scrape_streams_logs_then_result() {
        let routes = create_routes(state());
        let resp = warp::test::request().method("GET").path("/api/scrape").reply(&routes).await;

        assert_eq!(resp.status(), 200);
        let body = String::from_utf8(resp.body().to_vec()).unwrap();

        let first_log = body.find("event:log").unwrap();
        let last_log = body.rfind("event:log").unwrap();
        let result_at = body.find("event:result").unwrap();
        assert!(first_log < result_at && last_log < result_at);
        assert_eq!(body.matches("event:result").count(), 1);
        assert!(body.contains("data:Connecting to database..."));

        let result = result_payload(&body);
        assert_eq!(result["success"], false);
        assert_eq!(result["matchesProcessed"], 0);
        assert!(result["message"].as_str().unwrap().contains("Failed to launch browser"));
    }

    #[tokio::test]
    async fn test_second_trigger_while_running_fails_fast() {
        let state = state();
        let routes = create_routes(state.clone());
        let _running = state.run_lock.lock().await;
        assert!(state.is_running());

        let resp = warp::test::request().method("GET").path("/api/scrape").reply(&routes).await;
        let body = String::from_utf8(resp.body().to_vec()).unwrap();

        assert!(!body.contains("event:log"));
        let result = result_payload(&body);
        assert_eq!(result["success"], false);
        assert_eq!(result["message"], "A scrape is already running");
    }

    #[tokio::test]
    async fn test_unknown_path_is_rejected() {
        let routes = create_routes(state());
        let resp = warp::test::request().method("GET").path("/api/unknown").reply(&routes).await;
        assert_eq!(resp.status(), 404);
    }
}
