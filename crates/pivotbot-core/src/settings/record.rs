//! On-disk shape of [`Settings`].
//!
//! Keys match the existing `bot_settings.json` files. Decoding is per key: an unknown key is
//! ignored and a malformed one keeps its default, so one bad field never discards the rest.

use std::collections::{BTreeMap, HashSet};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    settings::{ChannelBinding, Settings, TextKey, UserRecord},
    Result,
};

#[derive(Serialize)]
struct SettingsRecord<'a> {
    active: bool,
    owner_only: bool,
    allowed_users: Vec<UserId>,
    blocked_users: Vec<UserId>,
    privileged_users: Vec<UserId>,
    total_calculations: u64,
    user_stats: &'a BTreeMap<UserId, UserRecord>,
    channel_id: Option<ChatId>,
    channel_username: Option<&'a str>,
    channel_title: Option<&'a str>,
    custom_texts: BTreeMap<&'static str, &'a str>,
}

fn sorted(set: &HashSet<UserId>) -> Vec<UserId> {
    let mut v: Vec<UserId> = set.iter().copied().collect();
    v.sort();
    v
}

pub fn encode(settings: &Settings) -> Result<String> {
    let channel = settings.channel.as_ref();
    let record = SettingsRecord {
        active: settings.active,
        owner_only: settings.owner_only,
        allowed_users: sorted(&settings.allowed_users),
        blocked_users: sorted(&settings.blocked_users),
        privileged_users: sorted(&settings.privileged_users),
        total_calculations: settings.total_calculations,
        user_stats: &settings.user_stats,
        channel_id: channel.map(|c| c.id),
        channel_username: channel.map(|c| c.username.as_str()),
        channel_title: channel.map(|c| c.display_name.as_str()),
        custom_texts: settings
            .custom_texts
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect(),
    };
    let mut out = serde_json::to_string_pretty(&record)?;
    out.push('\n');
    Ok(out)
}

/// Take one typed field out of the record, logging and skipping it when malformed.
fn take<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let v = map.remove(key)?;
    match serde_json::from_value(v) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed settings key");
            None
        }
    }
}

pub fn decode(raw: &str, owner: UserId) -> Result<Settings> {
    let Value::Object(mut map) = serde_json::from_str::<Value>(raw)? else {
        return Err(Error::Persistence(
            "settings record is not a JSON object".to_string(),
        ));
    };

    let mut s = Settings::default();

    if let Some(v) = take(&mut map, "active") {
        s.active = v;
    }
    if let Some(v) = take(&mut map, "owner_only") {
        s.owner_only = v;
    }
    if let Some(v) = take::<Vec<UserId>>(&mut map, "allowed_users") {
        s.allowed_users = v.into_iter().collect();
    }
    if let Some(v) = take::<Vec<UserId>>(&mut map, "blocked_users") {
        s.blocked_users = v.into_iter().collect();
    }
    if let Some(v) = take::<Vec<UserId>>(&mut map, "privileged_users") {
        s.privileged_users = v.into_iter().collect();
    }
    if let Some(v) = take(&mut map, "total_calculations") {
        s.total_calculations = v;
    }

    if let Some(stats) = take::<Map<String, Value>>(&mut map, "user_stats") {
        for (k, v) in stats {
            let Ok(id) = k.trim().parse::<i64>() else {
                warn!(key = %k, "ignoring user record with non-numeric id");
                continue;
            };
            match serde_json::from_value::<UserRecord>(v) {
                Ok(rec) => {
                    s.user_stats.insert(UserId(id), rec);
                }
                Err(e) => warn!(user_id = id, error = %e, "ignoring malformed user record"),
            }
        }
    }

    let channel_id = take::<Option<ChatId>>(&mut map, "channel_id").flatten();
    let channel_username = take::<Option<String>>(&mut map, "channel_username").flatten();
    let channel_title = take::<Option<String>>(&mut map, "channel_title").flatten();
    s.channel = channel_id.map(|id| {
        let username = channel_username.unwrap_or_default();
        ChannelBinding {
            id,
            display_name: channel_title.unwrap_or_else(|| username.clone()),
            username,
        }
    });

    if let Some(texts) = take::<BTreeMap<String, String>>(&mut map, "custom_texts") {
        for (k, v) in texts {
            match TextKey::parse(&k) {
                Some(key) => {
                    s.custom_texts.insert(key, v);
                }
                None => debug!(key = %k, "ignoring unknown custom text"),
            }
        }
    }

    for k in map.keys() {
        debug!(key = %k, "ignoring unrecognized settings key");
    }

    s.normalize(owner);
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BotMode;

    const OWNER: UserId = UserId(7718878771);

    fn populated() -> Settings {
        let now = chrono::NaiveDate::from_ymd_opt(2025, 3, 4)
            .and_then(|d| d.and_hms_micro_opt(10, 11, 12, 345_678))
            .unwrap();
        let mut s = Settings::default();
        s.set_mode(BotMode::OwnerOnly);
        s.allow_user(OWNER, UserId(10)).unwrap();
        s.allow_user(OWNER, UserId(11)).unwrap();
        s.block_user(OWNER, UserId(12)).unwrap();
        s.grant_privilege(OWNER, UserId(13)).unwrap();
        s.record_calculation(UserId(10), Some("ten"), Some("Ten"), now);
        s.record_calculation(UserId(13), None, None, now);
        s.record_calculation(UserId(13), None, Some("Thirteen"), now);
        s.set_text(TextKey::SwingFooter, "swing away", 4000).unwrap();
        s.channel = Some(ChannelBinding {
            id: ChatId(-1001234567890),
            display_name: "Signals".to_string(),
            username: "signals_channel".to_string(),
        });
        s
    }

    #[test]
    fn populated_state_survives_encode_decode() {
        let s = populated();
        let back = decode(&encode(&s).unwrap(), OWNER).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn sets_are_written_as_sequences() {
        let raw = encode(&populated()).unwrap();
        let v: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["allowed_users"], serde_json::json!([10, 11]));
        assert_eq!(v["user_stats"]["13"]["calculations"], 2);
        assert_eq!(v["channel_id"], -1001234567890i64);
    }

    #[test]
    fn reads_legacy_record_without_title() {
        let raw = r#"{
          "active": true,
          "owner_only": false,
          "allowed_users": [],
          "blocked_users": [55],
          "privileged_users": [55, 66],
          "total_calculations": 4,
          "user_stats": {
            "66": {"username": "sup", "first_name": null, "calculations": 4, "first_use": "2024-11-05T09:15:30.123456"}
          },
          "channel_id": -100200,
          "channel_username": "mychan",
          "custom_texts": {"welcome_message": "hi", "retired_text": "x"}
        }"#;
        let s = decode(raw, OWNER).unwrap();
        assert!(s.blocked_users.contains(&UserId(55)));
        // Blocked wins over stale supervisor membership.
        assert_eq!(s.privileged_users, HashSet::from([UserId(66)]));
        assert_eq!(s.user_stats[&UserId(66)].calculation_count, 4);
        let ch = s.channel.as_ref().unwrap();
        assert_eq!(ch.username, "mychan");
        assert_eq!(ch.display_name, "mychan");
        assert_eq!(s.text(TextKey::WelcomeMessage), "hi");
        // Missing texts fall back to defaults.
        assert_eq!(
            s.text(TextKey::HelpMessage),
            TextKey::HelpMessage.default_text()
        );
    }

    #[test]
    fn malformed_and_unknown_keys_keep_defaults() {
        let raw = r#"{"active": "yes", "owner_only": true, "surprise": 1, "total_calculations": -3}"#;
        let s = decode(raw, OWNER).unwrap();
        assert!(s.active);
        assert!(s.owner_only);
        assert_eq!(s.total_calculations, 0);
    }

    #[test]
    fn owner_is_dropped_from_sets_on_decode() {
        let raw = format!(r#"{{"blocked_users": [{}], "privileged_users": [{}]}}"#, OWNER.0, OWNER.0);
        let s = decode(&raw, OWNER).unwrap();
        assert!(s.blocked_users.is_empty());
        assert!(s.privileged_users.is_empty());
    }

    #[test]
    fn non_object_record_is_an_error() {
        assert!(decode("[1,2,3]", OWNER).is_err());
        assert!(decode("not json", OWNER).is_err());
    }
}
