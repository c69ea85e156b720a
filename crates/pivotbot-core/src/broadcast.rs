use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    access::{AccessLevel, PermissionEngine},
    domain::{ChatId, UserId},
    messaging::port::MessagingPort,
    settings::SettingsStore,
    utils::{fit_message, local_now, short_timestamp},
    Result,
};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";

/// Longest body a draft may carry. The header, rules and timestamp added on delivery must still fit
/// in one Telegram message with a 32-character supervisor username.
pub const BROADCAST_BODY_MAX: usize = 3800;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// Sequential fan-out to every known user. One recipient failing never stops the rest.
pub struct BroadcastDispatcher {
    messenger: Arc<dyn MessagingPort>,
    store: Arc<SettingsStore>,
    access: PermissionEngine,
    spacing: Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        store: Arc<SettingsStore>,
        access: PermissionEngine,
        spacing: Duration,
    ) -> Self {
        Self {
            messenger,
            store,
            access,
            spacing,
        }
    }

    pub async fn broadcast(&self, sender: UserId, text: &str) -> Result<BroadcastReport> {
        // Snapshot recipients so the settings lock is not held across sends.
        let (recipients, sender_name) = self
            .store
            .read(|s| -> Result<_> {
                self.access.require(s, sender, AccessLevel::Privileged)?;
                let recipients: Vec<UserId> =
                    s.user_stats.keys().copied().filter(|u| *u != sender).collect();
                Ok((recipients, s.username_of(sender).map(str::to_string)))
            })
            .await?;

        let body = self.render(sender, sender_name.as_deref(), text);
        let mut report = BroadcastReport::default();

        for user in recipients {
            match self.messenger.send_text(ChatId::from(user), &body).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(recipient = %user, error = %e, "broadcast delivery failed");
                }
            }
            if !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }
        }

        info!(
            sender = %sender,
            sent = report.sent,
            failed = report.failed,
            "broadcast finished"
        );
        Ok(report)
    }

    fn render(&self, sender: UserId, sender_name: Option<&str>, text: &str) -> String {
        let header = if self.access.is_owner(sender) {
            "📢 Message from the owner".to_string()
        } else {
            format!(
                "📢 Message from supervisor @{}",
                sender_name.unwrap_or("unknown")
            )
        };
        fit_message(&format!(
            "{header}\n{RULE}\n\n{text}\n\n{RULE}\n⏰ {}",
            short_timestamp(local_now())
        ))
    }
}
