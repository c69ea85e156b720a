use std::sync::Arc;

use teloxide::prelude::*;

use pivotbot_core::{
    domain::ChatId,
    messaging::types::{Command, IncomingUpdate},
};

use super::sender_of;
use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let (name, args) = parse_command(msg.text().unwrap_or(""));
    if name.is_empty() {
        return Ok(());
    }

    let sender = sender_of(user);
    let _guard = state.user_locks.lock_user(sender.id.0).await;
    state
        .bot
        .handle(IncomingUpdate::Command(Command {
            chat_id: ChatId(msg.chat.id.0),
            sender,
            name,
            args,
        }))
        .await;
    Ok(())
}
