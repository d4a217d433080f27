// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API transport for herald.
//!
//! Implements [`Transport`] via teloxide, translating Bot API failures
//! into tagged [`TransportError`] values that the dispatch classifier
//! can act on without string-matching teloxide internals.

use async_trait::async_trait;
use herald_config::model::TelegramConfig;
use herald_core::error::HeraldError;
use herald_core::traits::Transport;
use herald_core::types::TransportError;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::{ApiError, RequestError};
use tracing::debug;

/// Transport backed by the Telegram Bot API.
///
/// Messages are sent as HTML-formatted text to the recipient's chat id.
#[derive(Debug)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, HeraldError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            HeraldError::Config("telegram.bot_token is required for the Telegram transport".into())
        })?;

        if token.is_empty() {
            return Err(HeraldError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        Ok(Self {
            bot: Bot::new(token),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Verifies the bot token by calling getMe.
    pub async fn verify_token(&self) -> Result<(), HeraldError> {
        self.bot
            .get_me()
            .await
            .map_err(|e| HeraldError::Transport {
                message: format!("Telegram bot unreachable: {e}"),
                source: None,
            })?;
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, recipient_id: i64, text: &str) -> Result<(), TransportError> {
        debug!(recipient_id, "sending Telegram message");
        self.bot
            .send_message(ChatId(recipient_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}

/// Maps a teloxide request failure to a tagged transport error.
///
/// Descriptions mirror the Bot API wire text so failure records read
/// the same whether they came from teloxide's typed variants or from
/// an unrecognized API response.
fn map_request_error(err: RequestError) -> TransportError {
    match err {
        RequestError::Api(api) => map_api_error(api),
        RequestError::RetryAfter(secs) => TransportError::api(
            429,
            format!("Too Many Requests: retry after {}", secs.seconds()),
        ),
        RequestError::MigrateToChatId(chat_id) => TransportError::api(
            400,
            format!("Bad Request: group chat was upgraded to a supergroup chat {chat_id}"),
        ),
        other => TransportError::other(other.to_string()),
    }
}

fn map_api_error(err: ApiError) -> TransportError {
    match err {
        ApiError::BotBlocked => {
            TransportError::forbidden("Forbidden: bot was blocked by the user")
        }
        ApiError::CantInitiateConversation => {
            TransportError::forbidden("Forbidden: bot can't initiate conversation with a user")
        }
        ApiError::CantTalkWithBots => {
            TransportError::forbidden("Forbidden: bot can't send messages to bots")
        }
        ApiError::ChatNotFound => TransportError::api(400, "Bad Request: chat not found"),
        ApiError::UserNotFound => TransportError::api(400, "Bad Request: user not found"),
        ApiError::UserDeactivated => {
            TransportError::api(400, "Bad Request: user is deactivated")
        }
        ApiError::Unknown(text) => TransportError::other(text),
        other => TransportError::other(other.to_string()),
    }
}
