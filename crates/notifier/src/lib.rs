pub mod sink;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use common::{MessageSink, ScanSummary, SignalEvent};

pub use sink::TelegramSink;
pub use templates::{render_signal, render_startup, render_summary, StartupNotice};

/// Best-effort alert delivery.
///
/// Every send is bounded by `timeout`. A failed or timed-out send is logged
/// and reported as `false`; it is never retried and never aborts a scan.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn MessageSink>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn MessageSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Send raw HTML text. Returns whether the sink accepted it.
    pub async fn notify(&self, text: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.sink.send(text)).await {
            Ok(Ok(())) => {
                debug!(len = text.len(), "Message sent");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Message delivery failed");
                false
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Message delivery timed out");
                false
            }
        }
    }

    pub async fn notify_signal(&self, event: &SignalEvent, quote_asset: &str) -> bool {
        self.notify(&render_signal(event, quote_asset)).await
    }

    pub async fn notify_summary(&self, summary: &ScanSummary) -> bool {
        self.notify(&render_summary(summary)).await
    }

    pub async fn notify_startup(&self, notice: &StartupNotice) -> bool {
        self.notify(&render_startup(notice)).await
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").field("timeout", &self.timeout).finish()
    }
}
