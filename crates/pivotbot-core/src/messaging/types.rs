use crate::domain::{ChatId, MessageRef, UserId};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields should live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    Callback(CallbackQuery),
}

impl IncomingUpdate {
    pub fn sender(&self) -> &Sender {
        match self {
            IncomingUpdate::Command(c) => &c.sender,
            IncomingUpdate::Text(t) => &t.sender,
            IncomingUpdate::Callback(q) => &q.sender,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub name: String,
    pub args: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub sender: Sender,
    pub callback_id: String,
    pub data: String,
    pub message: Option<MessageRef>,
}

/// Inline keyboard, one row per inner `Vec`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    /// Convenience for "one button per row" layouts.
    pub fn one_per_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn callback_tokens(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flatten()
            .map(|b| b.callback_data.as_str())
    }
}

/// Ways to look up a chat, tried in order by the channel binder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatQuery {
    /// Public username, without the leading `@`.
    Username(String),
    /// Whatever the user typed after normalization; the adapter decides how to send it.
    Raw(String),
    Id(i64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChat {
    pub id: ChatId,
    pub title: Option<String>,
    pub kind: String,
}
