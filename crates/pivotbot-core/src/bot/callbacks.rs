use tracing::{debug, error, info};

use super::{username, views, views::View, PivotBot};
use crate::{
    actions::Action,
    conversation::Flow,
    domain::UserId,
    messaging::types::CallbackQuery,
    utils::AuditEvent,
    Result,
};

impl PivotBot {
    /// Every callback is answered exactly once, whatever happens below.
    pub(super) async fn on_callback(&self, q: CallbackQuery) -> Result<()> {
        let Some(action) = Action::parse(&q.data) else {
            debug!(data = %q.data, "unknown callback token");
            return self
                .messenger
                .answer_callback_query(&q.callback_id, Some(views::UNKNOWN_OPTION))
                .await;
        };

        let required = action.required_level();
        let allowed = self
            .store
            .read(|s| self.access.require(s, q.sender.id, required))
            .await;
        if allowed.is_err() {
            self.audit_denied(&q.sender, &format!("{} requires {required:?}", q.data));
            return self
                .messenger
                .answer_callback_query(&q.callback_id, Some(views::PAGE_DENIED))
                .await;
        }

        // Broadcasts can outlive the callback's answer window.
        let answered_early = matches!(action, Action::ConfirmBroadcast(_));
        if answered_early {
            self.messenger
                .answer_callback_query(&q.callback_id, None)
                .await?;
        }

        let ack = match self.run_action(&q, action).await {
            Ok(ack) => ack,
            Err(e) => {
                error!(user = %q.sender.id, action = %q.data, error = %e, "callback failed");
                self.audit.record(AuditEvent::error(
                    q.sender.id,
                    username(&q.sender),
                    &e.to_string(),
                    Some(&q.data),
                ));
                if answered_early {
                    return self.say(q.chat_id, views::GENERIC_FAILURE).await;
                }
                Some(views::GENERIC_FAILURE)
            }
        };

        if answered_early {
            return Ok(());
        }
        self.messenger
            .answer_callback_query(&q.callback_id, ack)
            .await
    }

    /// Returns the toast shown with the callback answer, if any.
    async fn run_action(&self, q: &CallbackQuery, action: Action) -> Result<Option<&'static str>> {
        let user = q.sender.id;
        let is_owner = self.access.is_owner(user);
        let mut ack = None;

        let view = match action {
            // Navigation
            Action::MainMenu => {
                self.store
                    .read(|s| views::main_menu(s, self.access.evaluate(s, user)))
                    .await
            }
            Action::AdminPanel => self.store.read(views::admin_panel).await,
            Action::SupervisorPanel => self.store.read(views::supervisor_panel).await,
            Action::CommandsList => {
                let level = self.store.read(|s| self.access.evaluate(s, user)).await;
                views::commands_list(level)
            }
            Action::PivotGuide => views::pivot_guide(),
            Action::TradingGuide => views::trading_guide(),

            // Supervisors
            Action::ManagePermissions => self.store.read(views::permissions_panel).await,
            Action::ListSupervisors => self.store.read(views::supervisors_list).await,
            Action::RevokeMenu => self.store.read(views::revoke_menu).await,
            Action::Revoke(target) => {
                let removed = self.store.mutate(|s| s.revoke_privilege(target)).await;
                if removed {
                    info!(user = %user, target = %target, "supervisor revoked");
                    self.audit_admin(&q.sender, "revoke_privilege", Some(&target.to_string()), None);
                    ack = Some("✅ Supervisor removed");
                } else {
                    ack = Some("ℹ️ This user is not a supervisor");
                }
                self.store.read(views::revoke_menu).await
            }
            Action::GrantPermission => return self.open(q, Flow::GrantPermission).await,

            // Channel
            Action::SetupChannel => {
                self.store
                    .read(|s| views::channel_panel(s, is_owner))
                    .await
            }
            Action::AddChannel => return self.open(q, Flow::SetChannel).await,
            Action::RemoveChannel => {
                let previous = self.store.mutate(|s| s.unbind_channel()).await;
                if let Some(c) = previous {
                    self.audit_admin(&q.sender, "remove_channel", Some(&format!("@{}", c.username)), None);
                }
                views::channel_removed()
            }

            // Broadcast
            Action::SendBroadcast => return self.open(q, Flow::Broadcast).await,
            Action::ConfirmBroadcast(drafter) => self.confirm_broadcast(q, drafter, is_owner).await?,
            Action::CancelBroadcast => {
                self.conversations.cancel(user).await;
                views::broadcast_cancelled(is_owner)
            }

            // Texts
            Action::EditTexts => views::texts_menu(),
            Action::EditText(key) => return self.open(q, Flow::EditText(key)).await,

            // Bot mode
            Action::ToggleBot => views::mode_menu(),
            Action::SetMode(mode) => {
                self.store.mutate(|s| s.set_mode(mode)).await;
                info!(user = %user, mode = mode.as_str(), "bot mode changed");
                self.audit_admin(&q.sender, "set_mode", Some(mode.as_str()), None);
                views::mode_changed(mode)
            }

            // Users
            Action::ManageUsers => views::users_panel(),
            Action::AddUser => return self.open(q, Flow::AddUser).await,
            Action::BlockUser => return self.open(q, Flow::BlockUser).await,
            Action::ListAllowed => self.store.read(views::allowed_list).await,
            Action::ListBlocked => self.store.read(views::blocked_list).await,
            Action::UnblockMenu => self.store.read(views::unblock_menu).await,
            Action::Unblock(target) => {
                if self.store.mutate(|s| s.unblock_user(target)).await {
                    self.audit_admin(&q.sender, "unblock_user", Some(&target.to_string()), None);
                    ack = Some("✅ User unblocked");
                }
                self.store.read(views::unblock_menu).await
            }

            // Misc
            Action::DetailedStats => {
                self.store
                    .read(|s| views::detailed_stats(s, is_owner))
                    .await
            }
            Action::SaveSettings => {
                let saved = match self.store.save().await {
                    Ok(()) => {
                        self.audit_admin(&q.sender, "save_settings", None, None);
                        true
                    }
                    Err(e) => {
                        error!(error = %e, "manual save failed");
                        false
                    }
                };
                self.store.read(|s| views::save_report(s, saved)).await
            }
        };

        self.show(q, view).await?;
        Ok(ack)
    }

    async fn open(&self, q: &CallbackQuery, flow: Flow) -> Result<Option<&'static str>> {
        self.open_flow(q, flow).await?;
        Ok(None)
    }

    async fn confirm_broadcast(
        &self,
        q: &CallbackQuery,
        drafter: UserId,
        is_owner: bool,
    ) -> Result<View> {
        let user = q.sender.id;
        if drafter != user {
            return Ok(View::text("❌ Verification failed"));
        }
        let Some(text) = self.conversations.take_draft(user).await else {
            return Ok(View::text("❌ No pending message found"));
        };

        self.show(q, View::text("⏳ Sending...")).await?;
        let report = self.broadcaster.broadcast(user, &text).await?;
        self.audit_admin(
            &q.sender,
            "broadcast",
            Some(&format!("{} recipients", report.total())),
            Some(&text),
        );
        Ok(views::broadcast_report(report.sent, report.failed, is_owner))
    }
}
