//! Text + keyboard for every screen the bot shows. Pure functions over settings snapshots.

use crate::{
    access::{AccessLevel, DenyReason},
    actions::Action,
    channel::BindError,
    conversation::Flow,
    domain::UserId,
    errors::{Error, ValidationError},
    messaging::types::{InlineButton, InlineKeyboard},
    pivot::TradeType,
    settings::{BotMode, ChannelBinding, Settings, TextKey},
    utils::{fit_message, truncate_text},
};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";
const SAVED: &str = "💾 Settings saved automatically";
const MENU_PAGE: usize = 10;
const PROMPT_ECHO_CHARS: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub text: String,
    pub keyboard: InlineKeyboard,
}

impl View {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: fit_message(&text.into()),
            keyboard: InlineKeyboard::default(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<InlineButton>) -> Self {
        Self {
            text: fit_message(&text.into()),
            keyboard: InlineKeyboard::one_per_row(buttons),
        }
    }

    pub fn keyboard(&self) -> Option<InlineKeyboard> {
        if self.keyboard.rows.is_empty() {
            None
        } else {
            Some(self.keyboard.clone())
        }
    }
}

fn button(label: impl Into<String>, action: Action) -> InlineButton {
    InlineButton::new(label, action.token())
}

/// "Back" to whichever panel the user's role opens from.
fn back_to_panel(is_owner: bool) -> InlineButton {
    if is_owner {
        button("🔙 Back to admin panel", Action::AdminPanel)
    } else {
        button("🔙 Back to supervisor panel", Action::SupervisorPanel)
    }
}

fn sorted(ids: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut v: Vec<UserId> = ids.into_iter().collect();
    v.sort();
    v
}

fn user_line(s: &Settings, user: UserId) -> String {
    match s.username_of(user) {
        Some(name) => format!("• @{name} (ID: {user})"),
        None => format!("• ID: {user}"),
    }
}

fn user_label(s: &Settings, user: UserId) -> String {
    match s.username_of(user) {
        Some(name) => format!("@{name}"),
        None => user.to_string(),
    }
}

fn status_label(s: &Settings) -> &'static str {
    if s.active {
        "🟢 Active"
    } else {
        "🔴 Stopped"
    }
}

fn channel_label(s: &Settings) -> String {
    match &s.channel {
        Some(c) => format!("@{}", c.username),
        None => "not set".to_string(),
    }
}

// ============== Menus ==============

pub fn main_menu(s: &Settings, level: AccessLevel) -> View {
    let mut text = s.text(TextKey::WelcomeMessage).to_string();
    let mut buttons = Vec::new();
    match level {
        AccessLevel::Owner => {
            text.push_str("\n\n👑 Welcome back, owner!");
            buttons.push(button("⚙️ Admin panel", Action::AdminPanel));
        }
        AccessLevel::Privileged => {
            text.push_str("\n\n⭐ Welcome, supervisor!");
            buttons.push(button("🔧 Supervisor panel", Action::SupervisorPanel));
        }
        AccessLevel::Basic | AccessLevel::Denied => {}
    }
    buttons.push(button("📚 Commands", Action::CommandsList));
    View::with_buttons(text, buttons)
}

pub fn help(s: &Settings, level: AccessLevel) -> View {
    let mut buttons = Vec::new();
    match level {
        AccessLevel::Owner => buttons.push(button("⚙️ Admin panel", Action::AdminPanel)),
        AccessLevel::Privileged => {
            buttons.push(button("🔧 Supervisor panel", Action::SupervisorPanel))
        }
        AccessLevel::Basic | AccessLevel::Denied => {}
    }
    buttons.push(button("📚 Commands", Action::CommandsList));
    View::with_buttons(s.text(TextKey::HelpMessage), buttons)
}

pub fn admin_panel(s: &Settings) -> View {
    let access_mode = if s.owner_only {
        "owner only".to_string()
    } else if !s.allowed_users.is_empty() {
        format!("everyone ({} allowed)", s.allowed_users.len())
    } else {
        "everyone".to_string()
    };

    let text = format!(
        "⚙️ Bot administration\n\n\
         📊 Statistics:\n\
         • Bot status: {}\n\
         • Access mode: {access_mode}\n\
         • Signals channel: {}\n\
         • Total calculations: {}\n\
         • Users: {}\n\
         • Blocked: {}\n\
         • Supervisors: {}\n\n\
         🎛️ Controls:",
        status_label(s),
        channel_label(s),
        s.total_calculations,
        s.user_stats.len(),
        s.blocked_users.len(),
        s.privileged_users.len(),
    );

    View::with_buttons(
        text,
        vec![
            button("🔄 Bot mode", Action::ToggleBot),
            button("👥 Manage users", Action::ManageUsers),
            button("👑 Manage supervisors", Action::ManagePermissions),
            button("📢 Signals channel", Action::SetupChannel),
            button("📨 Broadcast a message", Action::SendBroadcast),
            button("📝 Edit texts", Action::EditTexts),
            button("💾 Save settings", Action::SaveSettings),
            button("📊 Detailed statistics", Action::DetailedStats),
            button("📚 Commands", Action::CommandsList),
            button("🏠 Main menu", Action::MainMenu),
        ],
    )
}

pub fn supervisor_panel(s: &Settings) -> View {
    let text = format!(
        "🔧 Supervisor panel\n\n\
         📊 Statistics:\n\
         • Total calculations: {}\n\
         • Users: {}\n\n\
         🎛️ Tools:",
        s.total_calculations,
        s.user_stats.len(),
    );
    View::with_buttons(
        text,
        vec![
            button("📢 Signals channel", Action::SetupChannel),
            button("📨 Broadcast a message", Action::SendBroadcast),
            button("📊 Detailed statistics", Action::DetailedStats),
            button("📚 Commands", Action::CommandsList),
            button("🏠 Main menu", Action::MainMenu),
        ],
    )
}

pub fn commands_list(level: AccessLevel) -> View {
    let mut text = String::from(
        "📚 Available commands\n\n\
         🔧 Basics:\n\
         • /start - start the bot\n\
         • /help - usage guide\n\
         • /signal - scalping and swing overview\n\
         • send prices - calculate pivot points\n\n\
         📊 Usage:\n\
         send high,low,close\n\
         example: 3250.75,3200.25,3225.50",
    );
    if level >= AccessLevel::Privileged {
        text.push_str(
            "\n\n🔧 Supervisor commands:\n\
             • /scalp high,low,close - custom scalping signal\n\
             • /swing high,low,close - custom swing signal\n\
             • supervisor panel - channel, broadcasts, statistics",
        );
    }
    if level == AccessLevel::Owner {
        text.push_str(
            "\n\n👑 Owner commands:\n\
             • /admin - full administration panel\n\
             • user management (allow / block)\n\
             • supervisor management (grant / revoke)\n\
             • bot mode, texts and manual save",
        );
    }
    View::with_buttons(text, vec![button("🔙 Main menu", Action::MainMenu)])
}

pub fn pivot_guide() -> View {
    View::with_buttons(
        "📊 Pivot points guide\n\n\
         🎯 How to use:\n\
         send high,low,close\n\n\
         📝 Example: 3250.75,3200.25,3225.50\n\n\
         🔢 Results:\n\
         • PP (pivot) - entry zone\n\
         • R1, R2, R3 - resistance levels (targets)\n\
         • S1, S2, S3 - support levels (stops)\n\n\
         📈 Strategy:\n\
         • price above PP = buy, targets R1-R3\n\
         • price below PP = sell, targets S1-S3\n\n\
         ⚠️ Always use a stop loss and never trade your whole balance",
        vec![button("🔙 Back", Action::MainMenu)],
    )
}

pub fn trading_guide() -> View {
    View::with_buttons(
        "📈 Trading strategies\n\n\
         🎯 Scalping:\n\
         • holding time: 1-15 minutes\n\
         • target: 5-15 points\n\
         • stop loss: 3-8 points\n\n\
         📊 Swing trading:\n\
         • holding time: 1-7 days\n\
         • target: 50-200 points\n\
         • stop loss: 20-50 points\n\n\
         💡 Risk management:\n\
         • never risk more than 2% of your balance\n\
         • always use a stop loss\n\
         • take profits gradually",
        vec![button("🔙 Back", Action::MainMenu)],
    )
}

pub fn signal_info(level: AccessLevel) -> View {
    let text = if level >= AccessLevel::Privileged {
        "📊 Trading signals - scalping and swing\n\n\
         🎯 For supervisors and the owner:\n\
         • /scalp high,low,close - scalping signal\n\
         • /swing high,low,close - swing signal\n\n\
         Example: /scalp 3370,3350,3365\n\
         The signal is posted to the linked channel.\n\n\
         Both signal types cap the stop loss at 25 points.\n\n\
         ⚠️ Trading is risky; manage your risk"
    } else {
        "📊 Trading signals - scalping and swing\n\n\
         🎯 Scalping: short term (minutes), quick limited targets, tight stop\n\
         📈 Swing: medium term (days or weeks), larger targets, wider stop\n\n\
         💡 How to use:\n\
         1. send high,low,close\n\
         2. get the pivot levels\n\
         3. use them for entries and exits\n\n\
         ⚠️ Trading is risky; manage your risk"
    };
    View::with_buttons(
        text,
        vec![
            button("📊 Pivot points guide", Action::PivotGuide),
            button("📚 Trading guide", Action::TradingGuide),
            button("🏠 Main menu", Action::MainMenu),
        ],
    )
}

// ============== Supervisors ==============

pub fn permissions_panel(s: &Settings) -> View {
    View::with_buttons(
        format!(
            "👑 Supervisor management\n\n\
             Current supervisors: {}\n\n\
             Supervisors can link the signals channel, broadcast messages and view statistics.",
            s.privileged_users.len()
        ),
        vec![
            button("➕ Add supervisor", Action::GrantPermission),
            button("📋 List supervisors", Action::ListSupervisors),
            button("➖ Remove supervisor", Action::RevokeMenu),
            button("🔙 Back to admin panel", Action::AdminPanel),
        ],
    )
}

pub fn supervisors_list(s: &Settings) -> View {
    let text = if s.privileged_users.is_empty() {
        "📋 Supervisors\n\n❌ There are no supervisors yet".to_string()
    } else {
        let lines: Vec<String> = sorted(s.privileged_users.iter().copied())
            .into_iter()
            .map(|u| match s.user_stats.get(&u) {
                Some(rec) => format!(
                    "• @{} ({}) - ID: {u}",
                    rec.username.as_deref().unwrap_or("unknown"),
                    rec.first_name.as_deref().unwrap_or("unknown"),
                ),
                None => format!("• ID: {u}"),
            })
            .collect();
        format!("📋 Supervisors:\n\n{}", lines.join("\n"))
    };
    View::with_buttons(text, vec![button("🔙 Back", Action::ManagePermissions)])
}

pub fn revoke_menu(s: &Settings) -> View {
    if s.privileged_users.is_empty() {
        return View::with_buttons(
            "❌ There are no supervisors to remove!",
            vec![button("🔙 Back", Action::ManagePermissions)],
        );
    }

    let users: Vec<UserId> = sorted(s.privileged_users.iter().copied())
        .into_iter()
        .take(MENU_PAGE)
        .collect();
    let mut text = String::from("➖ Remove supervisor\n\nPick the supervisor to remove:\n");
    let mut buttons = Vec::new();
    for u in users {
        text.push_str(&user_line(s, u));
        text.push('\n');
        buttons.push(button(
            format!("Remove {}", user_label(s, u)),
            Action::Revoke(u),
        ));
    }
    buttons.push(button("🔙 Back", Action::ManagePermissions));
    View::with_buttons(text, buttons)
}

// ============== Channel ==============

pub fn channel_panel(s: &Settings, is_owner: bool) -> View {
    View::with_buttons(
        format!(
            "📢 Signals channel\n\n\
             Current channel: {}\n\n\
             ℹ️ Once a channel is linked, every calculated signal is posted there automatically.",
            channel_label(s)
        ),
        vec![
            button("➕ Link / change channel", Action::AddChannel),
            button("❌ Remove channel", Action::RemoveChannel),
            back_to_panel(is_owner),
        ],
    )
}

pub fn channel_removed() -> View {
    View::with_buttons(
        format!("✅ Signals channel removed.\n\nSignals will no longer be posted.\n{SAVED}"),
        vec![button("🔙 Back", Action::SetupChannel)],
    )
}

pub fn channel_bound(b: &ChannelBinding, kind: &str) -> View {
    View::with_buttons(
        format!(
            "✅ Channel linked!\n\n\
             Channel: @{}\n\
             Title: {}\n\
             ID: {}\n\
             Type: {kind}\n\n\
             Every signal will be posted to this channel automatically.\n{SAVED}",
            b.username, b.display_name, b.id
        ),
        vec![button("🔙 Back", Action::SetupChannel)],
    )
}

// ============== Users ==============

pub fn users_panel() -> View {
    View::with_buttons(
        "👥 User management\n\nControl who can use the bot:",
        vec![
            button("➕ Allow user", Action::AddUser),
            button("➖ Block user", Action::BlockUser),
            button("📋 Allowed users", Action::ListAllowed),
            button("🚫 Blocked users", Action::ListBlocked),
            button("🔄 Unblock user", Action::UnblockMenu),
            button("🔙 Back", Action::AdminPanel),
        ],
    )
}

fn user_list(s: &Settings, title: &str, empty: &str, users: Vec<UserId>) -> View {
    let text = if users.is_empty() {
        format!("{title}\n\n❌ {empty}")
    } else {
        let lines: Vec<String> = users.into_iter().map(|u| user_line(s, u)).collect();
        format!("{title}:\n\n{}", lines.join("\n"))
    };
    View::with_buttons(text, vec![button("🔙 Back", Action::ManageUsers)])
}

pub fn allowed_list(s: &Settings) -> View {
    user_list(
        s,
        "📋 Allowed users",
        "No users are on the allow-list",
        sorted(s.allowed_users.iter().copied()),
    )
}

pub fn blocked_list(s: &Settings) -> View {
    user_list(
        s,
        "🚫 Blocked users",
        "No users are blocked",
        sorted(s.blocked_users.iter().copied()),
    )
}

pub fn unblock_menu(s: &Settings) -> View {
    if s.blocked_users.is_empty() {
        return View::with_buttons(
            "❌ There are no blocked users!",
            vec![button("🔙 Back", Action::ManageUsers)],
        );
    }

    let mut text = String::from("🔄 Unblock user\n\nBlocked users:\n");
    let mut buttons = Vec::new();
    for u in sorted(s.blocked_users.iter().copied())
        .into_iter()
        .take(MENU_PAGE)
    {
        text.push_str(&user_line(s, u));
        text.push('\n');
        buttons.push(button(
            format!("Unblock {}", user_label(s, u)),
            Action::Unblock(u),
        ));
    }
    buttons.push(button("🔙 Back", Action::ManageUsers));
    View::with_buttons(text, buttons)
}

pub fn user_allowed(user: UserId) -> View {
    View::with_buttons(
        format!("✅ User {user} can use the bot now.\n{SAVED}"),
        vec![button("🔙 Back to user management", Action::ManageUsers)],
    )
}

pub fn user_blocked(user: UserId) -> View {
    View::with_buttons(
        format!("✅ User {user} is blocked from the bot.\n{SAVED}"),
        vec![button("🔙 Back to user management", Action::ManageUsers)],
    )
}

pub fn privilege_granted(s: &Settings, user: UserId) -> View {
    let who = match s.username_of(user) {
        Some(name) => format!("{user} (@{name})"),
        None => user.to_string(),
    };
    View::with_buttons(
        format!(
            "✅ {who} is now a supervisor.\n\n\
             They can link the signals channel, broadcast messages and view statistics.\n{SAVED}"
        ),
        vec![button("🔙 Back to supervisors", Action::ManagePermissions)],
    )
}

// ============== Texts & mode ==============

pub fn texts_menu() -> View {
    let mut buttons: Vec<InlineButton> = TextKey::ALL
        .into_iter()
        .map(|k| button(k.label(), Action::EditText(k)))
        .collect();
    buttons.push(button("🔙 Back to admin panel", Action::AdminPanel));
    View::with_buttons("📝 Edit bot texts\n\nPick the text to customise:", buttons)
}

pub fn text_updated(s: &Settings, key: TextKey) -> View {
    View::with_buttons(
        format!(
            "✅ {} updated!\n\nNew text:\n{RULE}\n{}\n{RULE}\n\n{SAVED}",
            key.label(),
            truncate_text(s.text(key), 200)
        ),
        vec![button("🔙 Back to texts", Action::EditTexts)],
    )
}

pub fn mode_menu() -> View {
    View::with_buttons(
        "🎛️ Choose the bot mode:\n\n\
         🟢 Public: anyone can use the bot\n\
         👑 Owner only: only you can use it\n\
         🔴 Stopped: the bot is off for everyone",
        vec![
            button("🟢 Public", Action::SetMode(BotMode::Public)),
            button("👑 Owner only", Action::SetMode(BotMode::OwnerOnly)),
            button("🔴 Stop the bot", Action::SetMode(BotMode::Inactive)),
            button("🔙 Back", Action::AdminPanel),
        ],
    )
}

pub fn mode_changed(mode: BotMode) -> View {
    let text = match mode {
        BotMode::Public => "✅ The bot is public!\n\nAnyone can use it now.",
        BotMode::OwnerOnly => "👑 The bot is now owner only!\n\nYou are the only one who can use it.",
        BotMode::Inactive => "🔴 The bot is stopped!\n\nNobody else can use it right now.",
    };
    View::with_buttons(
        format!("{text}\n{SAVED}"),
        vec![button("🔙 Back", Action::AdminPanel)],
    )
}

// ============== Stats & save ==============

pub fn detailed_stats(s: &Settings, is_owner: bool) -> View {
    let mut text = format!(
        "📊 Detailed statistics\n{RULE}\n\n\
         📈 Total calculations: {}\n\
         👥 Users: {}\n\
         ✅ Allowed: {}\n\
         🚫 Blocked: {}\n\
         👑 Supervisors: {}\n",
        s.total_calculations,
        s.user_stats.len(),
        s.allowed_users.len(),
        s.blocked_users.len(),
        s.privileged_users.len(),
    );

    let top = s.top_users(5);
    if !top.is_empty() {
        text.push_str("\n🏆 Most active users:\n");
        for (i, (user, rec)) in top.into_iter().enumerate() {
            let name = rec
                .username
                .clone()
                .unwrap_or_else(|| format!("User_{user}"));
            text.push_str(&format!(
                "{}. @{name}: {} calculations\n",
                i + 1,
                rec.calculation_count
            ));
        }
    }

    let back = if is_owner {
        button("🔙 Back", Action::AdminPanel)
    } else {
        button("🔙 Back", Action::SupervisorPanel)
    };
    View::with_buttons(text, vec![back])
}

pub fn save_report(s: &Settings, saved: bool) -> View {
    let text = if saved {
        format!(
            "✅ All settings saved!\n\n\
             📋 Saved state:\n\
             • Bot status: {}\n\
             • Access mode: {}\n\
             • Allowed: {}\n\
             • Blocked: {}\n\
             • Supervisors: {}\n\
             • Total calculations: {}\n\
             • Users: {}\n\n\
             🔄 Everything survives a restart.",
            status_label(s),
            if s.owner_only { "owner only" } else { "everyone" },
            s.allowed_users.len(),
            s.blocked_users.len(),
            s.privileged_users.len(),
            s.total_calculations,
            s.user_stats.len(),
        )
    } else {
        "❌ Failed to save settings!\n\nTry again or check the logs.".to_string()
    };
    View::with_buttons(text, vec![button("🔙 Back to admin panel", Action::AdminPanel)])
}

// ============== Broadcast ==============

pub fn broadcast_preview(sender: UserId, text: &str, audience: usize) -> View {
    View::with_buttons(
        format!(
            "📨 Message preview:\n\n{RULE}\n{text}\n{RULE}\n\n\
             It will be sent to {audience} users.\n\nContinue?"
        ),
        vec![
            button("✅ Send", Action::ConfirmBroadcast(sender)),
            button("❌ Cancel", Action::CancelBroadcast),
        ],
    )
}

pub fn broadcast_report(sent: usize, failed: usize, is_owner: bool) -> View {
    View::with_buttons(
        format!(
            "✅ Broadcast sent!\n\n\
             📊 Results:\n\
             • Delivered: {sent}\n\
             • Failed: {failed}\n\
             • Total: {}",
            sent + failed
        ),
        vec![back_to_panel(is_owner)],
    )
}

pub fn broadcast_cancelled(is_owner: bool) -> View {
    View::with_buttons("❌ Broadcast cancelled", vec![back_to_panel(is_owner)])
}

// ============== Flow prompts ==============

pub fn flow_prompt(s: &Settings, flow: Flow) -> View {
    let text = match flow {
        Flow::AddUser => "➕ Allow a user\n\n\
             Send the numeric user ID to allow.\n\n\
             Example: 123456789\n\nor /cancel to abort"
            .to_string(),
        Flow::BlockUser => "➖ Block a user\n\n\
             Send the numeric user ID to block.\n\n\
             Example: 123456789\n\nor /cancel to abort"
            .to_string(),
        Flow::GrantPermission => "👑 Add a supervisor\n\n\
             Send the numeric user ID to promote.\n\n\
             Example: 123456789\n\nor /cancel to abort"
            .to_string(),
        Flow::SetChannel => "📢 Link a signals channel\n\n\
             Send the channel username or link:\n\
             • @channel\n\
             • https://t.me/channel\n\
             • -1001234567890\n\n\
             ⚠️ Add the bot to the channel as an admin with posting rights first.\n\n\
             or /cancel to abort"
            .to_string(),
        Flow::Broadcast => "📨 Broadcast a message\n\n\
             Type the message to send to every user.\n\
             Sender details are added automatically.\n\n\
             or /cancel to abort"
            .to_string(),
        Flow::EditText(key) => format!(
            "📝 Editing: {}\n\nCurrent text:\n{RULE}\n{}\n{RULE}\n\n\
             Send the new text or /cancel to abort",
            key.label(),
            truncate_text(s.text(key), PROMPT_ECHO_CHARS)
        ),
    };
    View::text(text)
}

pub fn cancelled(level: AccessLevel) -> View {
    let back = match level {
        AccessLevel::Owner => button("🔙 Back to admin panel", Action::AdminPanel),
        AccessLevel::Privileged => button("🔙 Back to supervisor panel", Action::SupervisorPanel),
        AccessLevel::Basic | AccessLevel::Denied => button("🏠 Main menu", Action::MainMenu),
    };
    View::with_buttons("❌ Operation cancelled", vec![back])
}

// ============== Errors & denials ==============

pub fn denial(reason: Option<DenyReason>) -> &'static str {
    match reason {
        Some(DenyReason::Inactive) => "🔴 The bot is currently stopped by the administration",
        Some(DenyReason::Blocked) => "🚫 You are blocked from using this bot",
        Some(DenyReason::OwnerOnly) => "👑 The bot is currently available to the owner only",
        Some(DenyReason::NotAllowed) | None => "❌ You are not allowed to use this bot",
    }
}

pub const START_DENIED: &str =
    "❌ Sorry, the bot is not available right now\n\nContact the bot developer for access";
pub const PAGE_DENIED: &str = "❌ You are not allowed to open this page";
pub const UNKNOWN_OPTION: &str = "❌ Unknown option";
pub const GENERIC_FAILURE: &str = "❌ Something went wrong, please try again";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel";

/// Guidance for a bad price input, `prefix` being e.g. `/scalp ` for commands.
pub fn price_error(err: &ValidationError, prefix: &str) -> String {
    let example = format!("Example: {prefix}3250.75,3200.25,3225.50");
    match err {
        ValidationError::PriceFormat => {
            format!("❌ Wrong format\n\nSend the prices as:\n{prefix}high,low,close\n\n{example}")
        }
        ValidationError::PriceNotNumeric => {
            format!("❌ Invalid data\n\nMake sure you only send numbers\n\n{example}")
        }
        ValidationError::HighBelowLow => {
            "❌ Invalid data\n\nThe high price must be greater than or equal to the low price"
                .to_string()
        }
        other => format!("❌ {other}"),
    }
}

pub fn custom_signal_usage(trade: TradeType) -> String {
    let cmd = trade.as_str();
    format!(
        "❌ Wrong format\n\nUsage:\n/{cmd} high,low,close\n\nExample: /{cmd} 3370.50,3350.25,3365.75"
    )
}

pub fn custom_signal_sent(trade: TradeType, high: f64, low: f64, close: f64) -> String {
    format!(
        "✅ {} signal posted to the channel!\n\n\
         📊 Input:\n\
         • High: {high:.2}\n\
         • Low: {low:.2}\n\
         • Close: {close:.2}\n\n\
         {}",
        match trade {
            TradeType::Scalp => "Scalping",
            TradeType::Swing => "Swing",
        },
        trade.description()
    )
}

pub fn new_user_notice(user: UserId, username: &str, at: &str) -> String {
    format!("👤 New user joined the bot:\n• Username: @{username}\n• ID: {user}\n• Time: {at}")
}

/// Re-prompt text for a rejected conversation input.
pub fn reprompt(err: &Error) -> String {
    let body = match err {
        Error::Validation(v) => validation_message(v),
        Error::Bind(BindError::Invalid(v)) => validation_message(v),
        Error::Bind(BindError::NotFound(channel)) => format!(
            "❌ Channel not found: {channel}\n\n\
             Check that:\n\
             • the username is correct\n\
             • the channel is public or the bot is a member\n\
             • the bot is an admin of the channel"
        ),
        Error::Bind(BindError::NoSendPermission { reason, .. }) => format!(
            "❌ The bot cannot post in this channel!\n\n\
             Make sure the bot is an admin with permission to post.\n\n\
             Error: {reason}"
        ),
        _ => GENERIC_FAILURE.to_string(),
    };
    format!("{body}\n\nTry again or send /cancel to abort")
}

fn validation_message(v: &ValidationError) -> String {
    match v {
        ValidationError::InvalidUserId(_) => "❌ Invalid user ID! Send a numeric ID".to_string(),
        ValidationError::OwnerHasFullAccess => "❌ The owner already has full access!".to_string(),
        ValidationError::OwnerCannotBeBlocked => "❌ The owner cannot be blocked!".to_string(),
        ValidationError::AlreadyPrivileged(_) => "❌ This user is already a supervisor!".to_string(),
        ValidationError::UserBlocked(_) => {
            "❌ This user is blocked; unblock them first".to_string()
        }
        ValidationError::EmptyText => "❌ The text is empty!".to_string(),
        ValidationError::TextTooLong { max, .. } => {
            format!("❌ The text is too long!\n\nThe limit is {max} characters.")
        }
        ValidationError::MalformedChannel(_) => {
            "❌ That does not look like a channel username, link or ID".to_string()
        }
        other => format!("❌ {other}"),
    }
}
