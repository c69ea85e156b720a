//! Telegram adapter (teloxide).
//!
//! This crate implements the `pivotbot-core` MessagingPort over Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, Recipient},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use pivotbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatQuery, InlineKeyboard, ResolvedChat},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }

    fn tg_recipient(query: &ChatQuery) -> Recipient {
        match query {
            ChatQuery::Username(name) => Recipient::ChannelUsername(format!("@{name}")),
            ChatQuery::Raw(raw) => match raw.parse::<i64>() {
                Ok(id) => Recipient::Id(teloxide::types::ChatId(id)),
                Err(_) if raw.starts_with('@') => Recipient::ChannelUsername(raw.clone()),
                Err(_) => Recipient::ChannelUsername(format!("@{raw}")),
            },
            ChatQuery::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(e.to_string())
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::debug!(wait = ?d, "telegram asked us to back off");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let markup = Self::tg_markup(keyboard);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
                    .reply_markup(markup.clone())
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(Self::tg_markup);
        self.with_retry(|| {
            let req = self.bot.edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                text.to_string(),
            );
            match &markup {
                Some(m) => req.reply_markup(m.clone()),
                None => req,
            }
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn resolve_chat(&self, query: ChatQuery) -> Result<ResolvedChat> {
        let recipient = Self::tg_recipient(&query);
        let chat = self
            .with_retry(|| self.bot.get_chat(recipient.clone()))
            .await?;

        let kind = if chat.is_channel() {
            "channel"
        } else if chat.is_supergroup() {
            "supergroup"
        } else if chat.is_group() {
            "group"
        } else {
            "private"
        };
        Ok(ResolvedChat {
            id: ChatId(chat.id.0),
            title: chat.title().map(str::to_string),
            kind: kind.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivotbot_core::messaging::types::InlineButton;

    #[test]
    fn raw_queries_pick_id_or_username() {
        let id = TelegramMessenger::tg_recipient(&ChatQuery::Raw("-1001234".to_string()));
        assert_eq!(id, Recipient::Id(teloxide::types::ChatId(-1001234)));

        let name = TelegramMessenger::tg_recipient(&ChatQuery::Raw("gold".to_string()));
        assert_eq!(name, Recipient::ChannelUsername("@gold".to_string()));

        let user = TelegramMessenger::tg_recipient(&ChatQuery::Username("gold".to_string()));
        assert_eq!(user, Recipient::ChannelUsername("@gold".to_string()));
    }

    #[test]
    fn keyboard_rows_are_preserved() {
        let kb = InlineKeyboard {
            rows: vec![
                vec![InlineButton::new("a", "x"), InlineButton::new("b", "y")],
                vec![InlineButton::new("c", "z")],
            ],
        };
        let markup = TelegramMessenger::tg_markup(kb);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
    }
}
