use std::sync::Arc;

use teloxide::prelude::*;

use pivotbot_core::{
    domain::ChatId,
    messaging::types::{IncomingUpdate, TextMessage},
};

use super::sender_of;
use crate::router::AppState;

pub async fn handle_text(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let sender = sender_of(user);
    let _guard = state.user_locks.lock_user(sender.id.0).await;
    state
        .bot
        .handle(IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(msg.chat.id.0),
            sender,
            text,
        }))
        .await;
    Ok(())
}
