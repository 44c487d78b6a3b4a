//! Scripted browser and store doubles for tests

use async_trait::async_trait;
use match_store::{InMemoryMatchStore, InsertOutcome, MatchRecord, MatchStore, StoreError};
use parking_lot::Mutex;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{BrowserLauncher, ListenerId, PageDriver, ResponseListener};
use crate::error::BrowserError;
use crate::types::MatchRow;

/// What happens when a row's detail control is clicked
#[derive(Debug, Clone, Default)]
pub struct DetailScript {
    /// Rendered detail page
    pub html: String,
    /// Responses fired by the click, as (url, body), in order
    pub responses: Vec<(String, String)>,
    /// The detail page never finishes loading
    pub navigation_times_out: bool,
}

impl DetailScript {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into(), ..Default::default() }
    }

    pub fn respond(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.push((url.into(), body.into()));
        self
    }

    pub fn navigation_times_out(mut self) -> Self {
        self.navigation_times_out = true;
        self
    }
}

#[derive(Default)]
struct PageState {
    listings: HashMap<String, String>,
    failing_urls: HashSet<String>,
    single_visit: HashSet<String>,
    visited: HashSet<String>,
    failing_go_back: bool,
    details: HashMap<String, DetailScript>,
    current: String,
    history: Vec<String>,
    pending_navigation_timeout: bool,
    calls: Vec<String>,
    closed: bool,
}

/// A page that replays fixed HTML and JSON fixtures
#[derive(Default)]
pub struct ScriptedPage {
    state: Mutex<PageState>,
    listeners: Mutex<HashMap<ListenerId, Arc<ResponseListener>>>,
    next_id: AtomicU64,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` when `url` is visited
    pub fn with_listing(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.state.lock().listings.insert(url.into(), html.into());
        self
    }

    /// Time out when `url` is visited
    pub fn with_failing_goto(self, url: impl Into<String>) -> Self {
        self.state.lock().failing_urls.insert(url.into());
        self
    }

    /// Serve `url` on the first visit only; later visits time out
    pub fn with_single_visit(self, url: impl Into<String>) -> Self {
        self.state.lock().single_visit.insert(url.into());
        self
    }

    /// Make every history navigation fail
    pub fn with_failing_go_back(self) -> Self {
        self.state.lock().failing_go_back = true;
        self
    }

    /// Script the click on `row`'s detail control
    pub fn with_detail(self, row_uid: &str, script: DetailScript) -> Self {
        let row = MatchRow { uid: row_uid.to_string(), round: 0 };
        self.state.lock().details.insert(row.detail_link_selector(), script);
        self
    }

    /// Deliver a response to every registered listener; returns how many were notified
    pub fn emit(&self, url: &str, body: &str) -> usize {
        let listeners: Vec<Arc<ResponseListener>> =
            self.listeners.lock().values().cloned().collect();
        let read_body = || Ok::<String, BrowserError>(body.to_string());
        for listener in &listeners {
            (listener.as_ref())(url, &read_body);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Driver calls in order, e.g. `goto <url>`, `click <selector>`, `go_back`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.record(format!("goto {url}"));
        let mut state = self.state.lock();
        let revisit = state.single_visit.contains(url) && !state.visited.insert(url.to_string());
        if state.failing_urls.contains(url) || revisit {
            return Err(BrowserError::timeout(format!("navigation to {url}"), timeout));
        }
        let html = state
            .listings
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Navigation(format!("no page scripted for {url}")))?;
        let previous = std::mem::replace(&mut state.current, html);
        state.history.push(previous);
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.record(format!("wait_for_selector {selector}"));
        let parsed = Selector::parse(selector)
            .map_err(|e| BrowserError::Other(format!("{selector}: {e:?}")))?;
        let html = self.state.lock().current.clone();
        if Html::parse_document(&html).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(BrowserError::timeout(selector, timeout))
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.state.lock().current.clone())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.record(format!("click {selector}"));
        let script = {
            let mut state = self.state.lock();
            let script = state
                .details
                .get(selector)
                .cloned()
                .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))?;
            let previous = std::mem::replace(&mut state.current, script.html.clone());
            state.history.push(previous);
            state.pending_navigation_timeout = script.navigation_times_out;
            script
        };

        for (url, body) in &script.responses {
            self.emit(url, body);
        }
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), BrowserError> {
        self.record("wait_for_navigation".to_string());
        if std::mem::take(&mut self.state.lock().pending_navigation_timeout) {
            return Err(BrowserError::timeout("navigation", timeout));
        }
        Ok(())
    }

    async fn go_back(&self, _timeout: Duration) -> Result<(), BrowserError> {
        self.record("go_back".to_string());
        let mut state = self.state.lock();
        if state.failing_go_back {
            return Err(BrowserError::Navigation("history navigation failed".to_string()));
        }
        let previous =
            state.history.pop().ok_or_else(|| BrowserError::Navigation("no history".to_string()))?;
        state.current = previous;
        Ok(())
    }

    fn add_response_listener(
        &self,
        listener: ResponseListener,
    ) -> Result<ListenerId, BrowserError> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, Arc::new(listener));
        Ok(id)
    }

    fn remove_response_listener(&self, id: ListenerId) -> Result<(), BrowserError> {
        self.listeners.lock().remove(&id);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.record("close".to_string());
        self.state.lock().closed = true;
        Ok(())
    }
}

enum LaunchScript {
    Page(Arc<ScriptedPage>),
    Fail,
    Panic,
}

/// Hands out one scripted page, or fails to launch when it has none
pub struct ScriptedLauncher {
    script: LaunchScript,
    launches: AtomicUsize,
}

impl ScriptedLauncher {
    pub fn new(page: Arc<ScriptedPage>) -> Self {
        Self { script: LaunchScript::Page(page), launches: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { script: LaunchScript::Fail, launches: AtomicUsize::new(0) }
    }

    /// Panic inside `launch`
    pub fn panicking() -> Self {
        Self { script: LaunchScript::Panic, launches: AtomicUsize::new(0) }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            LaunchScript::Page(page) => Ok(page.clone() as Arc<dyn PageDriver>),
            LaunchScript::Fail => Err(BrowserError::Launch("chrome not found".to_string())),
            LaunchScript::Panic => panic!("chrome crashed"),
        }
    }
}

/// In-memory store with injectable faults and call counters
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryMatchStore,
    fail_connect: bool,
    fail_insert: bool,
    duplicate_on_insert: bool,
    inserts: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_insert(mut self) -> Self {
        self.fail_insert = true;
        self
    }

    /// Report every insert as a uniqueness conflict
    pub fn duplicate_on_insert(mut self) -> Self {
        self.duplicate_on_insert = true;
        self
    }

    /// Insert attempts that reached the store
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchStore for RecordingStore {
    async fn connect(&self) -> match_store::Result<()> {
        if self.fail_connect {
            return Err(StoreError::connection("connection refused"));
        }
        self.inner.connect().await
    }

    async fn exists(&self, match_id: i64, team_id: &str) -> match_store::Result<bool> {
        self.inner.exists(match_id, team_id).await
    }

    async fn insert(&self, record: &MatchRecord) -> match_store::Result<InsertOutcome> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert {
            return Err(StoreError::invalid_operation("disk full"));
        }
        if self.duplicate_on_insert {
            return Ok(InsertOutcome::Duplicate);
        }
        self.inner.insert(record).await
    }
}
