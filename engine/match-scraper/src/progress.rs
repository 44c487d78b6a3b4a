//! Progress reporting for a scrape run

use tokio::sync::mpsc;
use tracing::info;

use crate::types::RunResult;

/// Event emitted while a run progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    /// One human-readable progress line
    Log(String),
    /// Final outcome; always the last event of a run
    Result(RunResult),
}

/// Sink for the progress of one run
///
/// Every line is also written to `tracing`. A closed receiver is not an error:
/// the run keeps going when nobody listens any more.
#[derive(Debug, Clone)]
pub struct RunLog {
    tx: Option<mpsc::UnboundedSender<ScrapeEvent>>,
}

impl RunLog {
    /// A log paired with the receiving end of its events
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScrapeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A log that only writes to `tracing`
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.send(ScrapeEvent::Log(message));
    }

    /// Publish the final result
    pub fn finish(&self, result: &RunResult) {
        self.send(ScrapeEvent::Result(result.clone()));
    }

    fn send(&self, event: ScrapeEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
