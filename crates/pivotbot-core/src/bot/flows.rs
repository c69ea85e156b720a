use tracing::info;

use super::{views, views::View, PivotBot};
use crate::{
    conversation::{Flow, Outcome, Transition},
    messaging::types::{CallbackQuery, Sender, TextMessage},
    Result,
};

impl PivotBot {
    /// Open a conversation from a button and show its prompt.
    pub(super) async fn open_flow(&self, q: &CallbackQuery, flow: Flow) -> Result<()> {
        self.conversations.begin(q.sender.id, flow).await?;
        let view = self.store.read(|s| views::flow_prompt(s, flow)).await;
        self.show(q, view).await
    }

    pub(super) async fn on_transition(&self, msg: &TextMessage, t: Transition) -> Result<()> {
        match t {
            Transition::Done(outcome) => {
                let view = self.complete(&msg.sender, outcome).await;
                self.reply(msg.chat_id, view).await
            }
            Transition::Reprompt(e) => self.say(msg.chat_id, &views::reprompt(&e)).await,
            Transition::Aborted(e) => {
                info!(user = %msg.sender.id, error = %e, "conversation aborted");
                self.audit_denied(&msg.sender, "access lost during conversation");
                self.say(
                    msg.chat_id,
                    "❌ You no longer have access to this operation",
                )
                .await
            }
        }
    }

    async fn complete(&self, sender: &Sender, outcome: Outcome) -> View {
        match outcome {
            Outcome::UserAllowed(u) => {
                self.audit_admin(sender, "allow_user", Some(&u.to_string()), None);
                views::user_allowed(u)
            }
            Outcome::UserBlocked(u) => {
                self.audit_admin(sender, "block_user", Some(&u.to_string()), None);
                views::user_blocked(u)
            }
            Outcome::PrivilegeGranted(u) => {
                self.audit_admin(sender, "grant_privilege", Some(&u.to_string()), None);
                self.store.read(|s| views::privilege_granted(s, u)).await
            }
            Outcome::ChannelBound(bound) => {
                self.audit_admin(
                    sender,
                    "bind_channel",
                    Some(&format!("@{}", bound.binding.username)),
                    Some(&bound.binding.id.to_string()),
                );
                views::channel_bound(&bound.binding, &bound.kind)
            }
            Outcome::BroadcastDrafted { text, audience } => {
                views::broadcast_preview(sender.id, &text, audience)
            }
            Outcome::TextUpdated(key) => {
                self.audit_admin(sender, "edit_text", Some(key.as_str()), None);
                self.store.read(|s| views::text_updated(s, key)).await
            }
        }
    }
}
