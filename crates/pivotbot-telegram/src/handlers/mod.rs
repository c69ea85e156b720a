//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - converts the teloxide update into a core `IncomingUpdate`
//! - serializes work per sender
//! - hands the update to `PivotBot`

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use pivotbot_core::{domain::UserId, messaging::types::Sender};

use crate::router::AppState;
mod callback;
mod commands;
mod text;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        tracing::debug!(chat = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(msg, state).await;
    }
    text::handle_text(msg, state).await
}

fn sender_of(user: &User) -> Sender {
    Sender {
        id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|s| !s.is_empty()),
    }
}
