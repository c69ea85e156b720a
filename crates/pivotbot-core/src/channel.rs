//! Channel binding: resolve what the user typed, prove we can post there, hand back a binding.

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    errors::ValidationError,
    messaging::{
        port::MessagingPort,
        types::{ChatQuery, ResolvedChat},
    },
    settings::ChannelBinding,
    utils::truncate_text,
};

static LINK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?://)?(?i:t|telegram)\.me/").expect("link prefix pattern is valid")
});

const MARKER_TEXT: &str =
    "🤖 This channel is now linked to the bot.\nThis message will be deleted shortly.";

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("channel not found: {0}")]
    NotFound(String),

    #[error("cannot post to {channel}: {reason}")]
    NoSendPermission { channel: String, reason: String },
}

/// Strip `https://t.me/` style prefixes, query strings and a leading `@`.
///
/// The result is either a (possibly negative) numeric id or a bare username.
pub fn normalize_channel_identifier(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let without_prefix = LINK_PREFIX.replace(trimmed, "");
    let without_query = without_prefix
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let ident = without_query
        .strip_prefix('@')
        .unwrap_or(without_query)
        .trim();

    if is_numeric_id(ident) || is_username(ident) {
        Ok(ident.to_string())
    } else {
        Err(ValidationError::MalformedChannel(raw.trim().to_string()))
    }
}

fn is_numeric_id(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_username(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A verified channel and the chat type reported while resolving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundChannel {
    pub binding: ChannelBinding,
    pub kind: String,
}

/// Resolves and verifies broadcast targets. Never touches settings; the caller commits.
pub struct ChannelBinder {
    messenger: Arc<dyn MessagingPort>,
    marker_ttl: Duration,
}

impl ChannelBinder {
    pub fn new(messenger: Arc<dyn MessagingPort>, marker_ttl: Duration) -> Self {
        Self {
            messenger,
            marker_ttl,
        }
    }

    pub async fn bind(&self, raw: &str) -> Result<BoundChannel, BindError> {
        let ident = normalize_channel_identifier(raw)?;
        let chat = self
            .resolve(&ident)
            .await
            .ok_or_else(|| BindError::NotFound(ident.clone()))?;

        let marker = self
            .messenger
            .send_text(chat.id, MARKER_TEXT)
            .await
            .map_err(|e| BindError::NoSendPermission {
                channel: ident.clone(),
                reason: truncate_text(&e.to_string(), 100),
            })?;

        if !self.marker_ttl.is_zero() {
            tokio::time::sleep(self.marker_ttl).await;
        }
        if let Err(e) = self.messenger.delete_message(marker).await {
            // Posting works, which is all a binding needs.
            warn!(channel = %chat.id, error = %e, "failed to delete verification marker");
        }

        info!(channel = %chat.id, username = %ident, kind = %chat.kind, "channel verified");
        Ok(BoundChannel {
            binding: ChannelBinding {
                id: chat.id,
                display_name: chat.title.unwrap_or_else(|| ident.clone()),
                username: ident,
            },
            kind: chat.kind,
        })
    }

    // Username first, then the text as typed, then a numeric id.
    async fn resolve(&self, ident: &str) -> Option<ResolvedChat> {
        let mut attempts = vec![
            ChatQuery::Username(ident.to_string()),
            ChatQuery::Raw(ident.to_string()),
        ];
        if is_numeric_id(ident) {
            if let Ok(id) = ident.parse::<i64>() {
                attempts.push(ChatQuery::Id(id));
            }
        }

        for query in attempts {
            match self.messenger.resolve_chat(query.clone()).await {
                Ok(chat) => return Some(chat),
                Err(e) => debug!(?query, error = %e, "channel lookup failed"),
            }
        }
        None
    }
}
