//! Canonical mutable bot state.
//!
//! `Settings` is a plain value; every mutation that has an invariant goes through a method here so
//! the flows and buttons cannot leave the sets inconsistent. Durability lives in [`store`].

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChatId, UserId},
    errors::ValidationError,
};

pub mod record;
pub mod store;

pub use store::{LoadOutcome, SettingsStore};

/// Keys of the owner-editable texts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKey {
    WelcomeMessage,
    ChannelRecommendationHeader,
    CustomRecommendationHeader,
    ScalpFooter,
    SwingFooter,
    HelpMessage,
}

impl TextKey {
    pub const ALL: [TextKey; 6] = [
        TextKey::WelcomeMessage,
        TextKey::ChannelRecommendationHeader,
        TextKey::CustomRecommendationHeader,
        TextKey::ScalpFooter,
        TextKey::SwingFooter,
        TextKey::HelpMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TextKey::WelcomeMessage => "welcome_message",
            TextKey::ChannelRecommendationHeader => "channel_recommendation_header",
            TextKey::CustomRecommendationHeader => "custom_recommendation_header",
            TextKey::ScalpFooter => "scalp_footer",
            TextKey::SwingFooter => "swing_footer",
            TextKey::HelpMessage => "help_message",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Human label used in menus.
    pub fn label(self) -> &'static str {
        match self {
            TextKey::WelcomeMessage => "Welcome message",
            TextKey::ChannelRecommendationHeader => "Channel recommendation header",
            TextKey::CustomRecommendationHeader => "Custom recommendation header",
            TextKey::ScalpFooter => "Scalping footer",
            TextKey::SwingFooter => "Swing footer",
            TextKey::HelpMessage => "Help message",
        }
    }

    pub fn default_text(self) -> &'static str {
        match self {
            TextKey::WelcomeMessage => {
                "🤖 Welcome to the pivot points calculator\n\n\
                 📊 Send prices in this format:\n\
                 high,low,close\n\n\
                 Example:\n\
                 3250.75,3200.25,3225.50\n\n\
                 🔍 The bot calculates:\n\
                 • Entry zone (PP)\n\
                 • Targets (R1, R2, R3)\n\
                 • Support levels (S1, S2, S3)\n\n\
                 💡 All results are shown with two decimals"
            }
            TextKey::ChannelRecommendationHeader => "🔔 New signal - pivot point analysis",
            TextKey::CustomRecommendationHeader => "🔥 New signal - custom entry",
            TextKey::ScalpFooter => "⚡ Trade type: scalping (quick in and out)",
            TextKey::SwingFooter => "📊 Trade type: swing (be patient with targets)",
            TextKey::HelpMessage => {
                "📚 Usage guide\n\n\
                 🔢 Input format:\n\
                 high,low,close\n\n\
                 📝 Valid examples:\n\
                 • 3250.75,3200.25,3225.50\n\
                 • 1850,1820,1835\n\
                 • 50.25,49.80,50.10\n\n\
                 ⚠️ Notes:\n\
                 • Separate values with a comma (,)\n\
                 • High must be >= low\n\
                 • Integers and decimals are both accepted\n\n\
                 📊 Results:\n\
                 • Every level is rounded to two decimals\n\
                 • 7 levels: entry zone (PP), targets (R1, R2, R3), supports (S1, S2, S3)"
            }
        }
    }
}

/// A verified broadcast target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelBinding {
    pub id: ChatId,
    pub display_name: String,
    pub username: String,
}

/// Per-user history. Never deleted, even after a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(rename = "calculations", default)]
    pub calculation_count: u64,
    #[serde(rename = "first_use")]
    pub first_seen_at: NaiveDateTime,
}

/// Bot-wide availability toggled from the admin panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotMode {
    Public,
    OwnerOnly,
    Inactive,
}

impl BotMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BotMode::Public => "public",
            BotMode::OwnerOnly => "owner_only",
            BotMode::Inactive => "inactive",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub active: bool,
    pub owner_only: bool,
    pub allowed_users: HashSet<UserId>,
    pub blocked_users: HashSet<UserId>,
    pub privileged_users: HashSet<UserId>,
    pub channel: Option<ChannelBinding>,
    pub custom_texts: BTreeMap<TextKey, String>,
    pub total_calculations: u64,
    pub user_stats: BTreeMap<UserId, UserRecord>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            active: true,
            owner_only: false,
            allowed_users: HashSet::new(),
            blocked_users: HashSet::new(),
            privileged_users: HashSet::new(),
            channel: None,
            custom_texts: TextKey::ALL
                .into_iter()
                .map(|k| (k, k.default_text().to_string()))
                .collect(),
            total_calculations: 0,
            user_stats: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn text(&self, key: TextKey) -> &str {
        self.custom_texts
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    pub fn username_of(&self, user: UserId) -> Option<&str> {
        self.user_stats
            .get(&user)
            .and_then(|r| r.username.as_deref())
    }

    /// Add to the allow-list. Lifts a block on the same user.
    pub fn allow_user(&mut self, owner: UserId, user: UserId) -> Result<(), ValidationError> {
        if user == owner {
            return Err(ValidationError::OwnerHasFullAccess);
        }
        self.blocked_users.remove(&user);
        self.allowed_users.insert(user);
        Ok(())
    }

    /// Block a user, dropping any allow-list or supervisor membership.
    pub fn block_user(&mut self, owner: UserId, user: UserId) -> Result<(), ValidationError> {
        if user == owner {
            return Err(ValidationError::OwnerCannotBeBlocked);
        }
        self.allowed_users.remove(&user);
        self.privileged_users.remove(&user);
        self.blocked_users.insert(user);
        Ok(())
    }

    /// Returns whether the user was blocked. Unblocking an unknown user is a no-op.
    pub fn unblock_user(&mut self, user: UserId) -> bool {
        self.blocked_users.remove(&user)
    }

    pub fn grant_privilege(&mut self, owner: UserId, user: UserId) -> Result<(), ValidationError> {
        if user == owner {
            return Err(ValidationError::OwnerHasFullAccess);
        }
        if self.blocked_users.contains(&user) {
            return Err(ValidationError::UserBlocked(user.0));
        }
        if !self.privileged_users.insert(user) {
            return Err(ValidationError::AlreadyPrivileged(user.0));
        }
        Ok(())
    }

    pub fn revoke_privilege(&mut self, user: UserId) -> bool {
        self.privileged_users.remove(&user)
    }

    /// Clear the channel binding, returning the one that was in place.
    pub fn unbind_channel(&mut self) -> Option<ChannelBinding> {
        self.channel.take()
    }

    pub fn set_mode(&mut self, mode: BotMode) {
        match mode {
            BotMode::Public => {
                self.active = true;
                self.owner_only = false;
                self.allowed_users.clear();
            }
            BotMode::OwnerOnly => {
                self.active = true;
                self.owner_only = true;
            }
            BotMode::Inactive => {
                self.active = false;
            }
        }
    }

    pub fn set_text(
        &mut self,
        key: TextKey,
        text: &str,
        max_len: usize,
    ) -> Result<(), ValidationError> {
        let text = validate_text(text, max_len)?;
        self.custom_texts.insert(key, text);
        Ok(())
    }

    /// StatsTracker: count one successful calculation for `user`.
    pub fn record_calculation(
        &mut self,
        user: UserId,
        username: Option<&str>,
        first_name: Option<&str>,
        now: NaiveDateTime,
    ) {
        let rec = self.user_stats.entry(user).or_insert_with(|| UserRecord {
            username: None,
            first_name: None,
            calculation_count: 0,
            first_seen_at: now,
        });
        if let Some(u) = username {
            rec.username = Some(u.to_string());
        }
        if let Some(f) = first_name {
            rec.first_name = Some(f.to_string());
        }
        rec.calculation_count += 1;
        self.total_calculations += 1;
    }

    /// Restore the membership invariants on state that did not come from our own mutations.
    pub fn normalize(&mut self, owner: UserId) {
        self.allowed_users.remove(&owner);
        self.blocked_users.remove(&owner);
        self.privileged_users.remove(&owner);
        for u in &self.blocked_users {
            self.allowed_users.remove(u);
            self.privileged_users.remove(u);
        }
    }

    /// Top users by calculation count, ties broken by id.
    pub fn top_users(&self, limit: usize) -> Vec<(UserId, &UserRecord)> {
        let mut all: Vec<(UserId, &UserRecord)> =
            self.user_stats.iter().map(|(k, v)| (*k, v)).collect();
        all.sort_by(|a, b| {
            b.1.calculation_count
                .cmp(&a.1.calculation_count)
                .then(a.0.cmp(&b.0))
        });
        all.truncate(limit);
        all
    }
}

/// Trim and bound a free-text input (broadcast body, custom texts).
pub fn validate_text(text: &str, max_len: usize) -> Result<String, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let len = text.chars().count();
    if len > max_len {
        return Err(ValidationError::TextTooLong { len, max: max_len });
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: UserId = UserId(1);

    fn ts() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap()
    }

    #[test]
    fn block_clears_allowed_and_privileged() {
        let mut s = Settings::default();
        s.allow_user(OWNER, UserId(5)).unwrap();
        s.grant_privilege(OWNER, UserId(5)).unwrap();

        s.block_user(OWNER, UserId(5)).unwrap();
        assert!(s.blocked_users.contains(&UserId(5)));
        assert!(!s.allowed_users.contains(&UserId(5)));
        assert!(!s.privileged_users.contains(&UserId(5)));
    }

    #[test]
    fn allow_lifts_block() {
        let mut s = Settings::default();
        s.block_user(OWNER, UserId(5)).unwrap();
        s.allow_user(OWNER, UserId(5)).unwrap();
        assert!(!s.blocked_users.contains(&UserId(5)));
        assert!(s.allowed_users.contains(&UserId(5)));
    }

    #[test]
    fn owner_is_never_stored() {
        let mut s = Settings::default();
        assert_eq!(
            s.block_user(OWNER, OWNER),
            Err(ValidationError::OwnerCannotBeBlocked)
        );
        assert_eq!(
            s.grant_privilege(OWNER, OWNER),
            Err(ValidationError::OwnerHasFullAccess)
        );
        assert_eq!(
            s.allow_user(OWNER, OWNER),
            Err(ValidationError::OwnerHasFullAccess)
        );
        assert!(s.blocked_users.is_empty());
        assert!(s.privileged_users.is_empty());
        assert!(s.allowed_users.is_empty());
    }

    #[test]
    fn grant_rejects_duplicates_and_blocked_users() {
        let mut s = Settings::default();
        s.grant_privilege(OWNER, UserId(7)).unwrap();
        assert_eq!(
            s.grant_privilege(OWNER, UserId(7)),
            Err(ValidationError::AlreadyPrivileged(7))
        );

        s.block_user(OWNER, UserId(8)).unwrap();
        assert_eq!(
            s.grant_privilege(OWNER, UserId(8)),
            Err(ValidationError::UserBlocked(8))
        );
    }

    #[test]
    fn unblock_and_revoke_are_idempotent() {
        let mut s = Settings::default();
        let before = s.clone();
        assert!(!s.unblock_user(UserId(9)));
        assert!(!s.revoke_privilege(UserId(9)));
        assert_eq!(s, before);
    }

    #[test]
    fn unbind_is_idempotent() {
        let mut s = Settings {
            channel: Some(ChannelBinding {
                id: ChatId(-100),
                display_name: "t".to_string(),
                username: "t".to_string(),
            }),
            ..Settings::default()
        };
        assert!(s.unbind_channel().is_some());
        assert_eq!(s.unbind_channel(), None);
        assert_eq!(s.channel, None);
    }

    #[test]
    fn public_mode_clears_allow_list() {
        let mut s = Settings::default();
        s.allow_user(OWNER, UserId(3)).unwrap();
        s.set_mode(BotMode::Inactive);
        assert!(!s.active);

        s.set_mode(BotMode::OwnerOnly);
        assert!(s.active && s.owner_only);
        assert_eq!(s.allowed_users.len(), 1);

        s.set_mode(BotMode::Public);
        assert!(s.active && !s.owner_only);
        assert!(s.allowed_users.is_empty());
    }

    #[test]
    fn record_calculation_creates_then_updates() {
        let mut s = Settings::default();
        s.record_calculation(UserId(4), Some("alice"), Some("Alice"), ts());
        s.record_calculation(UserId(4), None, None, ts());
        s.record_calculation(UserId(4), Some("alice2"), None, ts());

        let rec = &s.user_stats[&UserId(4)];
        assert_eq!(rec.calculation_count, 3);
        assert_eq!(rec.username.as_deref(), Some("alice2"));
        assert_eq!(rec.first_name.as_deref(), Some("Alice"));
        assert_eq!(rec.first_seen_at, ts());
        assert_eq!(s.total_calculations, 3);
    }

    #[test]
    fn text_length_is_counted_in_characters() {
        let mut s = Settings::default();
        let arabic = "م".repeat(10);
        assert!(s.set_text(TextKey::ScalpFooter, &arabic, 10).is_ok());
        assert_eq!(
            s.set_text(TextKey::ScalpFooter, &"x".repeat(11), 10),
            Err(ValidationError::TextTooLong { len: 11, max: 10 })
        );
        assert_eq!(
            s.set_text(TextKey::ScalpFooter, "   ", 10),
            Err(ValidationError::EmptyText)
        );
        assert_eq!(s.text(TextKey::ScalpFooter), arabic);
    }

    #[test]
    fn normalize_enforces_invariants() {
        let mut s = Settings::default();
        s.allowed_users.extend([OWNER, UserId(2)]);
        s.privileged_users.extend([UserId(2), UserId(3)]);
        s.blocked_users.insert(UserId(2));

        s.normalize(OWNER);
        assert!(!s.allowed_users.contains(&OWNER));
        assert!(!s.allowed_users.contains(&UserId(2)));
        assert!(!s.privileged_users.contains(&UserId(2)));
        assert!(s.privileged_users.contains(&UserId(3)));
    }

    #[test]
    fn text_keys_round_trip_through_tokens() {
        for k in TextKey::ALL {
            assert_eq!(TextKey::parse(k.as_str()), Some(k));
        }
        assert_eq!(TextKey::parse("nope"), None);
    }
}
