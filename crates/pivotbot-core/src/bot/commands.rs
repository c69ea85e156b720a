use tracing::{debug, info, warn};

use super::{username, views, PivotBot};
use crate::{
    access::AccessLevel,
    domain::ChatId,
    messaging::types::{Command, TextMessage},
    pivot::{
        format_channel_recommendation, format_custom_recommendation, format_results,
        parse_prices, PivotLevels, TradeType,
    },
    settings::TextKey,
    utils::{local_now, long_timestamp},
    Result,
};

impl PivotBot {
    pub(super) async fn on_command(&self, cmd: Command) -> Result<()> {
        match cmd.name.as_str() {
            "start" => self.cmd_start(&cmd).await,
            "help" => self.cmd_help(&cmd).await,
            "signal" => self.cmd_signal(&cmd).await,
            "scalp" => self.cmd_custom_signal(&cmd, TradeType::Scalp).await,
            "swing" => self.cmd_custom_signal(&cmd, TradeType::Swing).await,
            "admin" => self.cmd_admin(&cmd).await,
            "cancel" => self.cmd_cancel(&cmd).await,
            other => {
                debug!(command = other, "ignoring unknown command");
                Ok(())
            }
        }
    }

    /// Plain text outside a conversation: a price calculation request.
    pub(super) async fn on_text(&self, msg: TextMessage) -> Result<()> {
        if let Some(transition) = self
            .conversations
            .handle_input(msg.sender.id, &msg.text)
            .await
        {
            return self.on_transition(&msg, transition).await;
        }
        self.calculate(&msg).await
    }

    async fn cmd_start(&self, cmd: &Command) -> Result<()> {
        let user = cmd.sender.id;
        let (level, is_new, view) = self
            .store
            .read(|s| {
                let level = self.access.evaluate(s, user);
                let is_new = !self.access.is_owner(user) && !s.user_stats.contains_key(&user);
                (level, is_new, views::main_menu(s, level))
            })
            .await;

        if level == AccessLevel::Denied {
            self.audit_denied(&cmd.sender, "start");
            return self.say(cmd.chat_id, views::START_DENIED).await;
        }

        if is_new && self.cfg.notify_owner_on_new_user {
            let notice =
                views::new_user_notice(user, username(&cmd.sender), &long_timestamp(local_now()));
            let owner = ChatId::from(self.access.owner());
            if let Err(e) = self.messenger.send_text(owner, &notice).await {
                warn!(error = %e, "failed to notify owner about new user");
            }
        }

        self.reply(cmd.chat_id, view).await
    }

    async fn cmd_help(&self, cmd: &Command) -> Result<()> {
        let (level, reason) = self.access_of(&cmd.sender).await;
        if level == AccessLevel::Denied {
            return self.say(cmd.chat_id, views::denial(reason)).await;
        }
        let view = self.store.read(|s| views::help(s, level)).await;
        self.reply(cmd.chat_id, view).await
    }

    async fn cmd_signal(&self, cmd: &Command) -> Result<()> {
        let (level, reason) = self.access_of(&cmd.sender).await;
        if level == AccessLevel::Denied {
            return self.say(cmd.chat_id, views::denial(reason)).await;
        }
        self.reply(cmd.chat_id, views::signal_info(level)).await
    }

    async fn cmd_admin(&self, cmd: &Command) -> Result<()> {
        if !self.access.is_owner(cmd.sender.id) {
            self.audit_denied(&cmd.sender, "admin");
            return self.say(cmd.chat_id, views::PAGE_DENIED).await;
        }
        let view = self.store.read(views::admin_panel).await;
        self.reply(cmd.chat_id, view).await
    }

    async fn cmd_cancel(&self, cmd: &Command) -> Result<()> {
        let (level, _) = self.access_of(&cmd.sender).await;
        match self.conversations.cancel(cmd.sender.id).await {
            Some(_) => self.reply(cmd.chat_id, views::cancelled(level)).await,
            None => self.say(cmd.chat_id, views::NOTHING_TO_CANCEL).await,
        }
    }

    /// `/scalp` and `/swing`: post a custom signal straight to the bound channel.
    async fn cmd_custom_signal(&self, cmd: &Command, trade: TradeType) -> Result<()> {
        let footer_key = match trade {
            TradeType::Scalp => TextKey::ScalpFooter,
            TradeType::Swing => TextKey::SwingFooter,
        };
        let (level, channel, header, footer) = self
            .store
            .read(|s| {
                (
                    self.access.evaluate(s, cmd.sender.id),
                    s.channel.clone(),
                    s.text(TextKey::CustomRecommendationHeader).to_string(),
                    s.text(footer_key).to_string(),
                )
            })
            .await;

        if level < AccessLevel::Privileged {
            self.audit_denied(&cmd.sender, trade.as_str());
            return self
                .say(
                    cmd.chat_id,
                    "❌ This command is for supervisors and the owner only",
                )
                .await;
        }
        let Some(channel) = channel else {
            return self
                .say(
                    cmd.chat_id,
                    "❌ Set up the signals channel first!\n\nLink one from the control panel.",
                )
                .await;
        };
        if cmd.args.trim().is_empty() {
            return self
                .say(cmd.chat_id, &views::custom_signal_usage(trade))
                .await;
        }

        let input = match parse_prices(&cmd.args) {
            Ok(input) => input,
            Err(e) => {
                let prefix = format!("/{} ", trade.as_str());
                return self.say(cmd.chat_id, &views::price_error(&e, &prefix)).await;
            }
        };
        let levels = PivotLevels::calculate(input);
        let post = format_custom_recommendation(&levels, input.close, &header, &footer);

        match self.messenger.send_text(channel.id, &post).await {
            Ok(_) => {
                info!(user = %cmd.sender.id, channel = %channel.id, trade = trade.as_str(), "custom signal posted");
                self.audit_admin(
                    &cmd.sender,
                    "custom_signal",
                    Some(&format!("@{}", channel.username)),
                    Some(&format!("{} {}", trade.as_str(), cmd.args.trim())),
                );
                self.say(
                    cmd.chat_id,
                    &views::custom_signal_sent(trade, input.high, input.low, input.close),
                )
                .await
            }
            Err(e) => {
                warn!(channel = %channel.id, error = %e, "failed to post custom signal");
                self.say(cmd.chat_id, "❌ Failed to post the signal to the channel!")
                    .await
            }
        }
    }

    async fn calculate(&self, msg: &TextMessage) -> Result<()> {
        let (level, reason) = self.access_of(&msg.sender).await;
        if level == AccessLevel::Denied {
            self.audit_denied(&msg.sender, "calculate");
            return self.say(msg.chat_id, views::denial(reason)).await;
        }

        let input = match parse_prices(&msg.text) {
            Ok(input) => input,
            Err(e) => return self.say(msg.chat_id, &views::price_error(&e, "")).await,
        };
        let levels = PivotLevels::calculate(input);

        let sender = &msg.sender;
        let channel_post = self
            .store
            .mutate(|s| {
                s.record_calculation(
                    sender.id,
                    sender.username.as_deref(),
                    sender.first_name.as_deref(),
                    local_now(),
                );
                s.channel.clone().map(|c| {
                    (
                        c,
                        s.text(TextKey::ChannelRecommendationHeader).to_string(),
                    )
                })
            })
            .await;

        self.say(msg.chat_id, &format_results(&levels)).await?;

        if let Some((channel, header)) = channel_post {
            let post = format_channel_recommendation(&levels, input.close, &header);
            match self.messenger.send_text(channel.id, &post).await {
                Ok(_) => {
                    self.say(msg.chat_id, "📢 The signal was also posted to the channel!")
                        .await?
                }
                Err(e) => warn!(channel = %channel.id, error = %e, "failed to post signal to channel"),
            }
        }
        Ok(())
    }
}
