use async_trait::async_trait;

use crate::Result;

/// Outbound text channel for alerts and summaries.
///
/// `TelegramSink` in `crates/notifier` implements this for production.
/// Payloads use the Telegram HTML subset (`<b>`, literal newlines).
/// Delivery is best-effort: callers must not retry or assume arrival.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
