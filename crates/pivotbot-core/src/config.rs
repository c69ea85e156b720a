use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::UserId, errors::Error, messaging::throttled::ThrottleConfig, Result};

/// Owner identity used when `OWNER_USER_ID` is not set.
pub const DEFAULT_OWNER_ID: i64 = 7_718_878_771;

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub owner_id: UserId,
    pub settings_file: PathBuf,

    // Limits
    pub max_text_length: usize,
    pub broadcast_spacing: Duration,
    pub channel_marker_ttl: Duration,

    /// `None` disables idle expiry of conversation sessions.
    pub session_idle_timeout: Option<Duration>,
    pub notify_owner_on_new_user: bool,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Outbound throttling
    pub throttle: ThrottleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            owner_id: UserId(DEFAULT_OWNER_ID),
            settings_file: PathBuf::from("bot_settings.json"),
            max_text_length: 4000,
            broadcast_spacing: Duration::from_millis(100),
            channel_marker_ttl: Duration::from_millis(5000),
            session_idle_timeout: Some(Duration::from_secs(900)),
            notify_owner_on_new_user: true,
            audit_log_path: PathBuf::from("/tmp/pivotbot-audit.log"),
            audit_log_json: false,
            throttle: ThrottleConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| env_str("BOT_TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let owner_id = match env_str("OWNER_USER_ID").and_then(non_empty) {
            Some(raw) => raw.trim().parse::<i64>().map(UserId).map_err(|_| {
                Error::Config(format!("OWNER_USER_ID must be a numeric user id, got {raw:?}"))
            })?,
            None => UserId(DEFAULT_OWNER_ID),
        };

        let defaults = Self::default();

        let settings_file = env_path("SETTINGS_FILE").unwrap_or(defaults.settings_file);
        let max_text_length = env_usize("MAX_TEXT_LENGTH")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_text_length);
        let broadcast_spacing = env_u64("BROADCAST_SPACING_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.broadcast_spacing);
        let channel_marker_ttl = env_u64("CHANNEL_MARKER_TTL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.channel_marker_ttl);

        // 0 disables expiry.
        let session_idle_timeout = match env_u64("SESSION_IDLE_TIMEOUT_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.session_idle_timeout,
        };
        let notify_owner_on_new_user =
            env_bool("NOTIFY_OWNER_ON_NEW_USER").unwrap_or(defaults.notify_owner_on_new_user);

        // Audit logging
        let audit_log_path = env_path("AUDIT_LOG_PATH").unwrap_or(defaults.audit_log_path);
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        let throttle = ThrottleConfig {
            global_min_interval: env_u64("THROTTLE_GLOBAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.throttle.global_min_interval),
            per_chat_min_interval: env_u64("THROTTLE_PER_CHAT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.throttle.per_chat_min_interval),
        };

        Ok(Self {
            telegram_bot_token,
            owner_id,
            settings_file,
            max_text_length,
            broadcast_spacing,
            channel_marker_ttl,
            session_idle_timeout,
            notify_owner_on_new_user,
            audit_log_path,
            audit_log_json,
            throttle,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

/// Strip optional surrounding quotes from a `.env` value.
fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
