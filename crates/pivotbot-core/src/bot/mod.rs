//! Application layer: turns one [`IncomingUpdate`] into replies, state changes and audit events.
//!
//! Adapters serialize updates per user before calling [`PivotBot::handle`]; everything below assumes
//! at most one in-flight update per sender.

use std::sync::Arc;

use tracing::{debug, error};

use crate::{
    access::{AccessLevel, DenyReason, PermissionEngine},
    broadcast::BroadcastDispatcher,
    channel::ChannelBinder,
    config::Config,
    conversation::ConversationEngine,
    domain::ChatId,
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, IncomingUpdate, Sender},
    },
    settings::SettingsStore,
    utils::{AuditEvent, AuditLogger},
    Result,
};

mod callbacks;
mod commands;
mod flows;
pub mod views;

use views::View;

pub struct PivotBot {
    cfg: Config,
    store: Arc<SettingsStore>,
    access: PermissionEngine,
    conversations: ConversationEngine,
    broadcaster: BroadcastDispatcher,
    messenger: Arc<dyn MessagingPort>,
    audit: AuditLogger,
}

impl PivotBot {
    pub fn new(cfg: Config, store: Arc<SettingsStore>, messenger: Arc<dyn MessagingPort>) -> Self {
        let access = PermissionEngine::new(cfg.owner_id);
        let binder = Arc::new(ChannelBinder::new(
            messenger.clone(),
            cfg.channel_marker_ttl,
        ));
        let conversations = ConversationEngine::new(
            store.clone(),
            access,
            binder,
            cfg.max_text_length,
            cfg.session_idle_timeout,
        );
        let broadcaster =
            BroadcastDispatcher::new(messenger.clone(), store.clone(), access, cfg.broadcast_spacing);
        let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);

        Self {
            cfg,
            store,
            access,
            conversations,
            broadcaster,
            messenger,
            audit,
        }
    }

    /// Handle one update. Failures are logged, audited and reported to the user; never returned.
    pub async fn handle(&self, update: IncomingUpdate) {
        let sender = update.sender().clone();
        let (chat_id, kind) = match &update {
            IncomingUpdate::Command(c) => (c.chat_id, "command"),
            IncomingUpdate::Text(t) => (t.chat_id, "text"),
            IncomingUpdate::Callback(q) => (q.chat_id, "callback"),
        };
        debug!(user = %sender.id, kind, "update received");

        let result = match update {
            IncomingUpdate::Command(c) => self.on_command(c).await,
            IncomingUpdate::Text(t) => self.on_text(t).await,
            IncomingUpdate::Callback(q) => self.on_callback(q).await,
        };

        if let Err(e) = result {
            error!(user = %sender.id, kind, error = %e, "update handling failed");
            self.audit.record(AuditEvent::error(
                sender.id,
                username(&sender),
                &e.to_string(),
                Some(kind),
            ));
            if let Err(e) = self
                .messenger
                .send_text(chat_id, views::GENERIC_FAILURE)
                .await
            {
                debug!(error = %e, "failed to report failure to user");
            }
        }
    }

    // ============== Shared helpers ==============

    async fn access_of(&self, sender: &Sender) -> (AccessLevel, Option<DenyReason>) {
        self.store
            .read(|s| {
                (
                    self.access.evaluate(s, sender.id),
                    self.access.deny_reason(s, sender.id),
                )
            })
            .await
    }

    async fn reply(&self, chat_id: ChatId, view: View) -> Result<()> {
        match view.keyboard() {
            Some(kb) => self.messenger.send_keyboard(chat_id, &view.text, kb).await?,
            None => self.messenger.send_text(chat_id, &view.text).await?,
        };
        Ok(())
    }

    async fn say(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.messenger.send_text(chat_id, text).await?;
        Ok(())
    }

    /// Replace the message the button was pressed on, or send fresh when it is gone.
    async fn show(&self, q: &CallbackQuery, view: View) -> Result<()> {
        match q.message {
            Some(msg) => {
                self.messenger
                    .edit_text(msg, &view.text, view.keyboard())
                    .await
            }
            None => self.reply(q.chat_id, view).await,
        }
    }

    fn audit_admin(&self, sender: &Sender, action: &str, target: Option<&str>, detail: Option<&str>) {
        self.audit.record(AuditEvent::admin(
            sender.id,
            username(sender),
            action,
            target,
            detail,
        ));
    }

    fn audit_denied(&self, sender: &Sender, reason: &str) {
        self.audit
            .record(AuditEvent::auth(sender.id, username(sender), false, Some(reason)));
    }
}

fn username(sender: &Sender) -> &str {
    sender.username.as_deref().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageId, MessageRef, UserId},
        messaging::{
            fake::FakeMessenger,
            types::{Command, TextMessage},
        },
        settings::{ChannelBinding, Settings, TextKey},
        utils::local_now,
    };

    const OWNER: i64 = 1;
    const CHANNEL: i64 = -100_500;

    struct Harness {
        bot: PivotBot,
        fake: Arc<FakeMessenger>,
        store: Arc<SettingsStore>,
    }

    fn scratch_dir() -> std::path::PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("pivotbot-bot-{}-{ts}", std::process::id()))
    }

    fn harness(settings: Settings) -> Harness {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let cfg = Config {
            owner_id: UserId(OWNER),
            settings_file: dir.join("bot_settings.json"),
            broadcast_spacing: std::time::Duration::ZERO,
            channel_marker_ttl: std::time::Duration::ZERO,
            audit_log_path: dir.join("audit.log"),
            ..Config::default()
        };
        let store = Arc::new(SettingsStore::with_settings(
            cfg.settings_file.clone(),
            UserId(OWNER),
            settings,
        ));
        let fake = Arc::new(FakeMessenger::new());
        let bot = PivotBot::new(cfg, store.clone(), fake.clone());
        Harness { bot, fake, store }
    }

    fn with_channel() -> Settings {
        Settings {
            channel: Some(ChannelBinding {
                id: ChatId(CHANNEL),
                display_name: "Gold Signals".to_string(),
                username: "gold_signals".to_string(),
            }),
            ..Settings::default()
        }
    }

    fn sender(id: i64) -> Sender {
        Sender {
            id: UserId(id),
            username: Some(format!("u{id}")),
            first_name: None,
        }
    }

    fn text(id: i64, body: &str) -> IncomingUpdate {
        IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(id),
            sender: sender(id),
            text: body.to_string(),
        })
    }

    fn cmd(id: i64, name: &str, args: &str) -> IncomingUpdate {
        IncomingUpdate::Command(Command {
            chat_id: ChatId(id),
            sender: sender(id),
            name: name.to_string(),
            args: args.to_string(),
        })
    }

    fn press(id: i64, data: &str) -> IncomingUpdate {
        IncomingUpdate::Callback(CallbackQuery {
            chat_id: ChatId(id),
            sender: sender(id),
            callback_id: format!("cb-{id}"),
            data: data.to_string(),
            message: Some(MessageRef {
                chat_id: ChatId(id),
                message_id: MessageId(99),
            }),
        })
    }

    fn last_text(h: &Harness, chat: i64) -> String {
        h.fake
            .last_sent_to(ChatId(chat))
            .map(|s| s.text)
            .unwrap_or_default()
    }

    fn last_edit(h: &Harness) -> String {
        h.fake
            .edits
            .lock()
            .unwrap()
            .last()
            .map(|(_, t, _)| t.clone())
            .unwrap_or_default()
    }

    fn last_answer(h: &Harness) -> Option<String> {
        h.fake.answers.lock().unwrap().last().and_then(|(_, t)| t.clone())
    }

    #[tokio::test]
    async fn calculation_records_stats_and_posts_to_channel() {
        let h = harness(with_channel());
        h.bot.handle(text(5, "3250.75,3200.25,3225.50")).await;

        let to_user = h.fake.sent_to(ChatId(5));
        assert_eq!(to_user.len(), 2);
        assert!(to_user[0].text.contains("PP: 3225.50"));
        assert!(to_user[1].text.contains("posted to the channel"));

        let post = last_text(&h, CHANNEL);
        assert!(post.starts_with(TextKey::ChannelRecommendationHeader.default_text()));
        assert!(post.contains("📉 SELL"));

        let (total, count) = h
            .store
            .read(|s| (s.total_calculations, s.user_stats[&UserId(5)].calculation_count))
            .await;
        assert_eq!((total, count), (1, 1));
    }

    #[tokio::test]
    async fn channel_failure_still_answers_the_user() {
        let h = harness(with_channel());
        h.fake.fail_chat(CHANNEL);
        h.bot.handle(text(5, "10,5,7")).await;

        let to_user = h.fake.sent_to(ChatId(5));
        assert_eq!(to_user.len(), 1);
        assert!(to_user[0].text.contains("Pivot point analysis"));
    }

    #[tokio::test]
    async fn bad_prices_get_guidance_and_are_not_counted() {
        let h = harness(Settings::default());
        h.bot.handle(text(5, "1,2")).await;
        assert!(last_text(&h, 5).contains("Wrong format"));

        h.bot.handle(text(5, "3200,3250,3225")).await;
        assert!(last_text(&h, 5).contains("greater than or equal"));

        assert_eq!(h.store.read(|s| s.total_calculations).await, 0);
    }

    #[tokio::test]
    async fn denied_users_get_the_matching_reason() {
        let mut s = Settings::default();
        s.block_user(UserId(OWNER), UserId(6)).unwrap();
        let h = harness(s);

        h.bot.handle(text(6, "10,5,7")).await;
        assert!(last_text(&h, 6).contains("blocked"));

        h.bot.handle(press(OWNER, "set_inactive")).await;
        h.bot.handle(text(7, "10,5,7")).await;
        assert!(last_text(&h, 7).contains("stopped"));

        // The owner is never locked out.
        h.bot.handle(text(OWNER, "10,5,7")).await;
        assert!(last_text(&h, OWNER).contains("Pivot point analysis"));
    }

    #[tokio::test]
    async fn unknown_and_forbidden_buttons_are_acknowledged() {
        let h = harness(Settings::default());

        h.bot.handle(press(5, "bogus_token")).await;
        assert_eq!(last_answer(&h).as_deref(), Some(views::UNKNOWN_OPTION));

        h.bot.handle(press(5, "admin_panel")).await;
        assert_eq!(last_answer(&h).as_deref(), Some(views::PAGE_DENIED));
        h.bot.handle(press(5, "set_inactive")).await;
        assert!(h.fake.edits.lock().unwrap().is_empty());
        assert!(h.store.read(|s| s.active).await);
    }

    #[tokio::test]
    async fn session_input_is_not_treated_as_prices() {
        let h = harness(Settings::default());
        h.bot.handle(press(OWNER, "add_user")).await;
        assert!(last_edit(&h).contains("Allow a user"));

        h.bot.handle(text(OWNER, "3250.75,3200.25,3225.50")).await;
        assert!(last_text(&h, OWNER).contains("Invalid user ID"));
        assert_eq!(h.store.read(|s| s.total_calculations).await, 0);

        h.bot.handle(text(OWNER, "42")).await;
        assert!(last_text(&h, OWNER).contains("42 can use the bot"));
        assert!(h.store.read(|s| s.allowed_users.contains(&UserId(42))).await);

        // The session closed, so prices are calculated again.
        h.bot.handle(text(OWNER, "10,5,7")).await;
        assert!(last_text(&h, OWNER).contains("Pivot point analysis"));
    }

    #[tokio::test]
    async fn cancel_reports_whether_anything_was_open() {
        let h = harness(Settings::default());
        h.bot.handle(cmd(OWNER, "cancel", "")).await;
        assert_eq!(last_text(&h, OWNER), views::NOTHING_TO_CANCEL);

        h.bot.handle(press(OWNER, "block_user")).await;
        h.bot.handle(cmd(OWNER, "cancel", "")).await;
        assert!(last_text(&h, OWNER).contains("Operation cancelled"));

        h.bot.handle(text(OWNER, "42")).await;
        assert!(h.store.read(|s| s.blocked_users.is_empty()).await);
    }

    #[tokio::test]
    async fn broadcast_is_previewed_then_confirmed() {
        let mut s = Settings::default();
        for id in [5, 6] {
            s.record_calculation(UserId(id), Some(&format!("u{id}")), None, local_now());
        }
        let h = harness(s);

        h.bot.handle(press(OWNER, "send_broadcast")).await;
        h.bot.handle(text(OWNER, "market closes early today")).await;

        let preview = h.fake.last_sent_to(ChatId(OWNER)).unwrap();
        assert!(preview.text.contains("sent to 2 users"));
        let tokens: Vec<String> = preview
            .keyboard
            .unwrap()
            .callback_tokens()
            .map(str::to_string)
            .collect();
        assert!(tokens.contains(&"confirm_broadcast_1".to_string()));
        assert!(h.fake.sent_to(ChatId(5)).is_empty());

        h.bot.handle(press(OWNER, "confirm_broadcast_1")).await;
        for id in [5, 6] {
            assert!(last_text(&h, id).contains("market closes early today"));
        }
        assert!(last_edit(&h).contains("Delivered: 2"));

        // The draft is consumed.
        h.bot.handle(press(OWNER, "confirm_broadcast_1")).await;
        assert!(last_edit(&h).contains("No pending message"));
    }

    #[tokio::test]
    async fn confirm_rejects_someone_elses_token() {
        let mut s = Settings::default();
        s.grant_privilege(UserId(OWNER), UserId(5)).unwrap();
        let h = harness(s);

        h.bot.handle(press(5, "confirm_broadcast_1")).await;
        assert!(last_edit(&h).contains("Verification failed"));
    }

    #[tokio::test]
    async fn first_start_notifies_the_owner_once_per_unknown_user() {
        let h = harness(Settings::default());
        h.bot.handle(cmd(5, "start", "")).await;

        let notice = last_text(&h, OWNER);
        assert!(notice.contains("New user joined"));
        assert!(notice.contains("@u5"));
        assert!(last_text(&h, 5).contains("Welcome"));

        h.bot.handle(cmd(OWNER, "start", "")).await;
        assert_eq!(
            h.fake
                .sent_to(ChatId(OWNER))
                .iter()
                .filter(|m| m.text.contains("New user joined"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn custom_signals_need_privilege_and_a_channel() {
        let mut s = Settings::default();
        s.grant_privilege(UserId(OWNER), UserId(5)).unwrap();
        let h = harness(s);

        h.bot.handle(cmd(6, "scalp", "3250.75,3200.25,3240")).await;
        assert!(last_text(&h, 6).contains("supervisors and the owner only"));

        h.bot.handle(cmd(5, "scalp", "3250.75,3200.25,3240")).await;
        assert!(last_text(&h, 5).contains("Set up the signals channel first"));

        h.store.mutate(|s| s.channel = with_channel().channel).await;
        h.bot.handle(cmd(5, "swing", "")).await;
        assert!(last_text(&h, 5).contains("/swing high,low,close"));

        h.bot.handle(cmd(5, "scalp", "3250.75,3200.25,3240")).await;
        let post = last_text(&h, CHANNEL);
        assert!(post.starts_with(TextKey::CustomRecommendationHeader.default_text()));
        assert!(post.contains("📈 BUY"));
        assert!(post.ends_with(TextKey::ScalpFooter.default_text()));
        assert!(last_text(&h, 5).contains("Scalping signal posted"));
    }

    #[tokio::test]
    async fn revoke_and_unblock_buttons_update_the_menu() {
        let mut s = Settings::default();
        s.grant_privilege(UserId(OWNER), UserId(5)).unwrap();
        s.block_user(UserId(OWNER), UserId(6)).unwrap();
        let h = harness(s);

        h.bot.handle(press(OWNER, "revoke_5")).await;
        assert!(h.store.read(|s| s.privileged_users.is_empty()).await);
        assert!(last_answer(&h).unwrap_or_default().contains("removed"));
        assert!(last_edit(&h).contains("no supervisors"));

        h.bot.handle(press(OWNER, "unblock_6")).await;
        assert!(h.store.read(|s| s.blocked_users.is_empty()).await);
        assert!(last_edit(&h).contains("no blocked users"));
    }

    #[tokio::test]
    async fn admin_panel_is_owner_only() {
        let h = harness(Settings::default());
        h.bot.handle(cmd(5, "admin", "")).await;
        assert_eq!(last_text(&h, 5), views::PAGE_DENIED);

        h.bot.handle(cmd(OWNER, "admin", "")).await;
        let panel = h.fake.last_sent_to(ChatId(OWNER)).unwrap();
        assert!(panel.text.contains("Bot administration"));
        assert_eq!(panel.keyboard.unwrap().rows.len(), 10);
    }

    #[tokio::test]
    async fn manual_save_writes_the_settings_file() {
        let h = harness(Settings::default());
        h.bot.handle(press(OWNER, "save_settings")).await;
        assert!(last_edit(&h).contains("All settings saved"));
        assert!(h.store.path().exists());
    }
}
