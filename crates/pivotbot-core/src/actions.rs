//! Inline-button routing tokens.
//!
//! Every button the bot renders carries one of these as callback data. Parsing is total over the
//! known token set; anything else is `None` and gets an "unknown option" acknowledgement.

use crate::{
    access::AccessLevel,
    domain::UserId,
    settings::{BotMode, TextKey},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    // Navigation
    MainMenu,
    AdminPanel,
    SupervisorPanel,
    CommandsList,
    PivotGuide,
    TradingGuide,

    // Supervisors
    ManagePermissions,
    ListSupervisors,
    RevokeMenu,
    Revoke(UserId),
    GrantPermission,

    // Channel
    SetupChannel,
    AddChannel,
    RemoveChannel,

    // Broadcast
    SendBroadcast,
    ConfirmBroadcast(UserId),
    CancelBroadcast,

    // Texts
    EditTexts,
    EditText(TextKey),

    // Bot mode
    ToggleBot,
    SetMode(BotMode),

    // Users
    ManageUsers,
    AddUser,
    BlockUser,
    ListAllowed,
    ListBlocked,
    UnblockMenu,
    Unblock(UserId),

    // Misc
    DetailedStats,
    SaveSettings,
}

impl Action {
    pub fn token(self) -> String {
        match self {
            Action::MainMenu => "main_menu".into(),
            Action::AdminPanel => "admin_panel".into(),
            Action::SupervisorPanel => "supervisor_panel".into(),
            Action::CommandsList => "commands_list".into(),
            Action::PivotGuide => "pivot_guide".into(),
            Action::TradingGuide => "trading_guide".into(),
            Action::ManagePermissions => "manage_permissions".into(),
            Action::ListSupervisors => "list_supervisors".into(),
            Action::RevokeMenu => "revoke_permissions".into(),
            Action::Revoke(u) => format!("revoke_{u}"),
            Action::GrantPermission => "grant_permissions".into(),
            Action::SetupChannel => "setup_channel".into(),
            Action::AddChannel => "add_channel".into(),
            Action::RemoveChannel => "remove_channel".into(),
            Action::SendBroadcast => "send_broadcast".into(),
            Action::ConfirmBroadcast(u) => format!("confirm_broadcast_{u}"),
            Action::CancelBroadcast => "cancel_broadcast".into(),
            Action::EditTexts => "edit_texts".into(),
            Action::EditText(k) => format!("edit_text_{}", k.as_str()),
            Action::ToggleBot => "toggle_bot".into(),
            Action::SetMode(BotMode::Public) => "set_public".into(),
            Action::SetMode(BotMode::OwnerOnly) => "set_owner_only".into(),
            Action::SetMode(BotMode::Inactive) => "set_inactive".into(),
            Action::ManageUsers => "manage_users".into(),
            Action::AddUser => "add_user".into(),
            Action::BlockUser => "block_user".into(),
            Action::ListAllowed => "list_allowed".into(),
            Action::ListBlocked => "list_blocked".into(),
            Action::UnblockMenu => "unblock_user".into(),
            Action::Unblock(u) => format!("unblock_{u}"),
            Action::DetailedStats => "detailed_stats".into(),
            Action::SaveSettings => "save_settings".into(),
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let fixed = match token {
            "main_menu" => Some(Action::MainMenu),
            "admin_panel" => Some(Action::AdminPanel),
            "supervisor_panel" => Some(Action::SupervisorPanel),
            "commands_list" => Some(Action::CommandsList),
            "pivot_guide" => Some(Action::PivotGuide),
            "trading_guide" => Some(Action::TradingGuide),
            "manage_permissions" => Some(Action::ManagePermissions),
            "list_supervisors" => Some(Action::ListSupervisors),
            "revoke_permissions" => Some(Action::RevokeMenu),
            "grant_permissions" => Some(Action::GrantPermission),
            "setup_channel" => Some(Action::SetupChannel),
            "add_channel" => Some(Action::AddChannel),
            "remove_channel" => Some(Action::RemoveChannel),
            "send_broadcast" => Some(Action::SendBroadcast),
            "cancel_broadcast" => Some(Action::CancelBroadcast),
            "edit_texts" => Some(Action::EditTexts),
            "toggle_bot" => Some(Action::ToggleBot),
            "set_public" => Some(Action::SetMode(BotMode::Public)),
            "set_owner_only" => Some(Action::SetMode(BotMode::OwnerOnly)),
            "set_inactive" => Some(Action::SetMode(BotMode::Inactive)),
            "manage_users" => Some(Action::ManageUsers),
            "add_user" => Some(Action::AddUser),
            "block_user" => Some(Action::BlockUser),
            "list_allowed" => Some(Action::ListAllowed),
            "list_blocked" => Some(Action::ListBlocked),
            "unblock_user" => Some(Action::UnblockMenu),
            "detailed_stats" => Some(Action::DetailedStats),
            "save_settings" => Some(Action::SaveSettings),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        // Parameterized tokens; fixed names above take precedence.
        if let Some(rest) = token.strip_prefix("confirm_broadcast_") {
            return parse_id(rest).map(Action::ConfirmBroadcast);
        }
        if let Some(rest) = token.strip_prefix("revoke_") {
            return parse_id(rest).map(Action::Revoke);
        }
        if let Some(rest) = token.strip_prefix("unblock_") {
            return parse_id(rest).map(Action::Unblock);
        }
        if let Some(rest) = token.strip_prefix("edit_text_") {
            return TextKey::parse(rest).map(Action::EditText);
        }
        None
    }

    /// Minimum level needed to press this button.
    pub fn required_level(self) -> AccessLevel {
        match self {
            Action::MainMenu
            | Action::CommandsList
            | Action::PivotGuide
            | Action::TradingGuide => AccessLevel::Basic,

            Action::SupervisorPanel
            | Action::SetupChannel
            | Action::AddChannel
            | Action::RemoveChannel
            | Action::SendBroadcast
            | Action::ConfirmBroadcast(_)
            | Action::CancelBroadcast
            | Action::DetailedStats => AccessLevel::Privileged,

            Action::AdminPanel
            | Action::ManagePermissions
            | Action::ListSupervisors
            | Action::RevokeMenu
            | Action::Revoke(_)
            | Action::GrantPermission
            | Action::EditTexts
            | Action::EditText(_)
            | Action::ToggleBot
            | Action::SetMode(_)
            | Action::ManageUsers
            | Action::AddUser
            | Action::BlockUser
            | Action::ListAllowed
            | Action::ListBlocked
            | Action::UnblockMenu
            | Action::Unblock(_)
            | Action::SaveSettings => AccessLevel::Owner,
        }
    }
}

fn parse_id(s: &str) -> Option<UserId> {
    s.parse::<i64>().ok().map(UserId)
}
