//! Capture of transient XHR responses.
//!
//! The league site only exposes its data as JSON responses fired while a detail
//! page renders. An interceptor is armed before the click that triggers them and
//! awaited afterwards, so a response arriving before the caller starts waiting
//! is not lost.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::browser::{ListenerId, PageDriver, ResponseListener};
use crate::error::{BrowserError, InterceptError};

/// An armed interceptor waiting for one response
///
/// The listener is detached when the response is awaited or when this value is
/// dropped, whichever comes first.
pub struct PendingResponse {
    page: Arc<dyn PageDriver>,
    listener: Option<ListenerId>,
    fragment: String,
    timeout: Duration,
    deadline: Instant,
    rx: oneshot::Receiver<Result<Value, InterceptError>>,
}

/// Arm an interceptor for the first response whose URL contains `url_fragment`.
///
/// The timeout runs from the moment of arming.
pub fn intercept(
    page: &Arc<dyn PageDriver>,
    url_fragment: &str,
    timeout: Duration,
) -> Result<PendingResponse, InterceptError> {
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));
    let fragment = url_fragment.to_string();

    let wanted = fragment.clone();
    let listener: ResponseListener = Box::new(
        move |url: &str, read_body: &dyn Fn() -> Result<String, BrowserError>| {
            if !url.contains(&wanted) {
                return;
            }
            // At most one delivery; later matches find the slot empty
            let Some(tx) = slot.lock().take() else {
                return;
            };

            let outcome = match read_body() {
                Ok(body) => serde_json::from_str::<Value>(&body).map_err(|e| InterceptError::Parse {
                    fragment: wanted.clone(),
                    reason: e.to_string(),
                }),
                Err(source) => Err(InterceptError::Browser { fragment: wanted.clone(), source }),
            };
            let _ = tx.send(outcome);
        },
    );

    let id = page
        .add_response_listener(listener)
        .map_err(|source| InterceptError::Browser { fragment: fragment.clone(), source })?;
    debug!("Armed {} for {}", id, fragment);

    Ok(PendingResponse {
        page: Arc::clone(page),
        listener: Some(id),
        fragment,
        timeout,
        deadline: Instant::now() + timeout,
        rx,
    })
}

impl PendingResponse {
    /// Wait for the response and decode its JSON body into `T`
    pub async fn wait<T: DeserializeOwned>(mut self) -> Result<T, InterceptError> {
        let outcome = tokio::time::timeout_at(self.deadline, &mut self.rx).await;
        self.detach();

        let value = match outcome {
            Ok(Ok(delivered)) => delivered?,
            Ok(Err(_)) => {
                return Err(InterceptError::Browser {
                    fragment: self.fragment.clone(),
                    source: BrowserError::Other("response listener was dropped".to_string()),
                })
            }
            Err(_) => {
                return Err(InterceptError::Timeout {
                    fragment: self.fragment.clone(),
                    after: self.timeout,
                })
            }
        };

        serde_json::from_value(value).map_err(|e| InterceptError::Parse {
            fragment: self.fragment.clone(),
            reason: e.to_string(),
        })
    }

    fn detach(&mut self) {
        if let Some(id) = self.listener.take() {
            if let Err(e) = self.page.remove_response_listener(id) {
                warn!("Failed to detach {} for {}: {}", id, self.fragment, e);
            }
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPage;
    use serde_json::json;

    const HEAD: &str = "matchResult/GetHeadInfo";
    const RESULTS: &str = "matchResult/GetMatchResults";

    fn page() -> (Arc<ScriptedPage>, Arc<dyn PageDriver>) {
        let page = Arc::new(ScriptedPage::new());
        let driver: Arc<dyn PageDriver> = page.clone();
        (page, driver)
    }

    #[tokio::test]
    async fn test_two_interceptors_resolve_in_either_order() {
        for reversed in [false, true] {
            let (page, driver) = page();
            let head = intercept(&driver, HEAD, Duration::from_secs(1)).unwrap();
            let results = intercept(&driver, RESULTS, Duration::from_secs(1)).unwrap();
            assert_eq!(page.listener_count(), 2);

            let mut responses = vec![
                (
                    "https://api.swebowl.se/api/v1/matchResult/GetHeadInfo?id=555",
                    r#"{"matchId":555}"#,
                ),
                (
                    "https://api.swebowl.se/api/v1/matchResult/GetMatchResults?id=555",
                    r#"{"playerListHome":[]}"#,
                ),
            ];
            if reversed {
                responses.reverse();
            }
            for (url, body) in responses {
                page.emit(url, body);
            }

            let head: Value = head.wait().await.unwrap();
            let results: Value = results.wait().await.unwrap();
            assert_eq!(head, json!({ "matchId": 555 }));
            assert_eq!(results, json!({ "playerListHome": [] }));
            assert_eq!(page.listener_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_non_matching_responses_are_ignored() {
        let (page, driver) = page();
        let pending = intercept(&driver, HEAD, Duration::from_secs(1)).unwrap();

        page.emit("https://bits.swebowl.se/scripts/app.js", "not json");
        page.emit("https://api.swebowl.se/matchResult/GetHeadInfo", r#"{"matchId":1}"#);

        let value: Value = pending.wait().await.unwrap();
        assert_eq!(value["matchId"], 1);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let (page, driver) = page();
        let pending = intercept(&driver, HEAD, Duration::from_secs(1)).unwrap();

        page.emit("/matchResult/GetHeadInfo", r#"{"matchId":1}"#);
        page.emit("/matchResult/GetHeadInfo", r#"{"matchId":2}"#);

        let value: Value = pending.wait().await.unwrap();
        assert_eq!(value["matchId"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_detaches_listener_and_ignores_late_response() {
        let (page, driver) = page();
        let pending = intercept(&driver, HEAD, Duration::from_millis(200)).unwrap();

        let err = pending.wait::<Value>().await.unwrap_err();
        assert!(matches!(err, InterceptError::Timeout { .. }));
        assert_eq!(page.listener_count(), 0);

        // Arrives after the deadline: nobody is listening any more
        assert_eq!(page.emit("/matchResult/GetHeadInfo", r#"{"matchId":1}"#), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_parse_error() {
        let (page, driver) = page();
        let pending = intercept(&driver, RESULTS, Duration::from_secs(1)).unwrap();

        page.emit("/matchResult/GetMatchResults", "<html>Server Error</html>");

        let err = pending.wait::<Value>().await.unwrap_err();
        assert!(matches!(err, InterceptError::Parse { .. }));
        assert_eq!(page.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_a_parse_error() {
        let (page, driver) = page();
        let pending = intercept(&driver, RESULTS, Duration::from_secs(1)).unwrap();

        page.emit("/matchResult/GetMatchResults", r#"{"playerListHome":[]}"#);

        let err = pending.wait::<Vec<u32>>().await.unwrap_err();
        assert!(matches!(err, InterceptError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_drop_without_waiting_detaches() {
        let (page, driver) = page();
        let pending = intercept(&driver, HEAD, Duration::from_secs(1)).unwrap();
        assert_eq!(page.listener_count(), 1);

        drop(pending);
        assert_eq!(page.listener_count(), 0);
    }
}
