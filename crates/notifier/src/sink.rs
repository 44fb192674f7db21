use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
};

use common::{Error, MessageSink, Result};

/// Sends alert text to one Telegram chat or channel as HTML.
pub struct TelegramSink {
    bot: Bot,
    chat: Recipient,
}

impl TelegramSink {
    /// `chat` is a numeric chat id (`-100123…`) or a channel handle (`@name`).
    pub fn new(token: impl Into<String>, chat: &str) -> Self {
        Self {
            bot: Bot::new(token),
            chat: parse_recipient(chat),
        }
    }
}

fn parse_recipient(raw: &str) -> Recipient {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(raw.to_string()),
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat.clone(), text)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await
            .map(|_| ())
            .map_err(|e| Error::NotifyFailed(e.to_string()))
    }
}
