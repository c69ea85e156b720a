use std::sync::Arc;

use teloxide::prelude::*;

use pivotbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{self, IncomingUpdate},
};

use super::sender_of;
use crate::router::AppState;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let sender = sender_of(&q.from);

    // Buttons on messages older than 48h arrive without the message; reply in the private chat.
    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    let chat_id = message
        .map(|m| m.chat_id)
        .unwrap_or(ChatId(sender.id.0));

    let _guard = state.user_locks.lock_user(sender.id.0).await;
    state
        .bot
        .handle(IncomingUpdate::Callback(types::CallbackQuery {
            chat_id,
            sender,
            callback_id: q.id.clone(),
            data: q.data.clone().unwrap_or_default(),
            message,
        }))
        .await;
    Ok(())
}
