//! Headless Chrome implementation of the browser seam.
//!
//! `headless_chrome` is a blocking client, so every call that waits on the
//! browser runs on the blocking thread pool.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::{BrowserLauncher, ListenerId, PageDriver, ResponseListener};
use crate::config::BrowserConfig;
use crate::error::BrowserError;

/// Launches one Chrome instance with a single tab per run
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, BrowserError> {
        let config = self.config.clone();

        let (browser, tab) = tokio::task::spawn_blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(config.headless)
                .sandbox(config.sandbox)
                .window_size(Some((config.window_width, config.window_height)))
                .path(config.chrome_path.clone())
                .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
                .args(vec![OsStr::new("--disable-dev-shm-usage"), OsStr::new("--disable-gpu")])
                .build()
                .map_err(|e| BrowserError::Launch(e.to_string()))?;

            let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
            let tab = browser.new_tab().map_err(|e| BrowserError::Launch(e.to_string()))?;
            Ok::<_, BrowserError>((browser, tab))
        })
        .await
        .map_err(|e| BrowserError::Launch(format!("launch task failed: {e}")))??;

        info!("Launched headless Chrome");
        Ok(Arc::new(ChromePage { _browser: browser, tab, next_listener: AtomicU64::new(1) }))
    }
}

/// A Chrome tab driven over the DevTools protocol
pub struct ChromePage {
    // Dropping the browser kills the process
    _browser: Browser,
    tab: Arc<Tab>,
    next_listener: AtomicU64,
}

impl ChromePage {
    async fn blocking<T, F>(&self, f: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| BrowserError::Other(format!("browser task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let url = url.to_string();
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url).map_err(|e| BrowserError::Navigation(format!("{url}: {e}")))?;
            tab.wait_until_navigated()
                .map_err(|_| BrowserError::timeout(format!("navigation to {url}"), timeout))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .map(|_| ())
                .map_err(|_| BrowserError::timeout(selector.clone(), timeout))
        })
        .await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.blocking(|tab| tab.get_content().map_err(|e| BrowserError::Other(e.to_string()))).await
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|_| BrowserError::ElementNotFound(selector.clone()))?;
            element.click().map_err(|e| BrowserError::Other(format!("click {selector}: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), BrowserError> {
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.wait_until_navigated().map_err(|_| BrowserError::timeout("navigation", timeout))?;
            Ok(())
        })
        .await
    }

    async fn go_back(&self, timeout: Duration) -> Result<(), BrowserError> {
        self.blocking(move |tab| {
            tab.set_default_timeout(timeout);
            tab.evaluate("window.history.back()", false)
                .map_err(|e| BrowserError::Navigation(format!("history back: {e}")))?;
            tab.wait_until_navigated().map_err(|_| BrowserError::timeout("history back", timeout))?;
            Ok(())
        })
        .await
    }

    fn add_response_listener(
        &self,
        listener: ResponseListener,
    ) -> Result<ListenerId, BrowserError> {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));

        self.tab
            .register_response_handling(
                &id.to_string(),
                Box::new(move |params, fetch_body| {
                    let read_body = || -> Result<String, BrowserError> {
                        let body = fetch_body()
                            .map_err(|e| BrowserError::ResponseBody(e.to_string()))?;
                        if body.base_64_encoded {
                            return Err(BrowserError::ResponseBody("binary body".to_string()));
                        }
                        Ok(body.body)
                    };
                    listener(&params.response.url, &read_body);
                }),
            )
            .map_err(|e| BrowserError::Other(format!("register {id}: {e}")))?;

        debug!("Registered {}", id);
        Ok(id)
    }

    fn remove_response_listener(&self, id: ListenerId) -> Result<(), BrowserError> {
        self.tab
            .deregister_response_handling(&id.to_string())
            .map(|_| ())
            .map_err(|e| BrowserError::Other(format!("deregister {id}: {e}")))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.blocking(|tab| {
            tab.close(true).map(|_| ()).map_err(|e| BrowserError::Other(e.to_string()))
        })
        .await
    }
}
