use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::{domain::UserId, errors::Error, Result};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Wall-clock local time, as stored in user records.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// `2025-01-02 03:04`, used in broadcast footers.
pub fn short_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// `2025-01-02 03:04:05`, used in owner notifications.
pub fn long_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, user_id: UserId, username: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: Some(user_id.0),
            username: Some(username.to_string()),
            action: None,
            target: None,
            detail: None,
            authorized: None,
            reason: None,
            error: None,
            context: None,
        }
    }

    /// A state-changing administrative action (block, grant, bind, broadcast...).
    pub fn admin(
        user_id: UserId,
        username: &str,
        action: &str,
        target: Option<&str>,
        detail: Option<&str>,
    ) -> Self {
        Self {
            action: Some(action.to_string()),
            target: target.map(|s| s.to_string()),
            detail: detail.map(|s| s.to_string()),
            ..Self::base("admin", user_id, username)
        }
    }

    pub fn auth(user_id: UserId, username: &str, authorized: bool, reason: Option<&str>) -> Self {
        Self {
            authorized: Some(authorized),
            reason: reason.map(|s| s.to_string()),
            ..Self::base("auth", user_id, username)
        }
    }

    pub fn error(user_id: UserId, username: &str, error: &str, context: Option<&str>) -> Self {
        Self {
            error: Some(error.to_string()),
            context: context.map(|s| s.to_string()),
            ..Self::base("error", user_id, username)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort variant of [`write`](Self::write): failures only reach the tracing log.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            warn!(path = %self.path.display(), error = %e, "failed to write audit event");
        }
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        // Broadcast bodies and custom texts can be long.
        if let Some(s) = &event.detail {
            event.detail = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::Persistence(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

/// Truncate to `max_len` characters, appending `...` when shortened.
/// Longest message text Telegram accepts, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

/// Clamp an outgoing message to [`MESSAGE_LIMIT`], marking the cut with `...`.
pub fn fit_message(s: &str) -> String {
    if s.chars().count() <= MESSAGE_LIMIT {
        s.to_string()
    } else {
        truncate_text(s, MESSAGE_LIMIT - 3)
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_counts_characters() {
        let s = "م".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);

        let short = "م".repeat(AUDIT_MAX_TEXT);
        assert_eq!(truncate_text(&short, AUDIT_MAX_TEXT), short);
    }

    #[test]
    fn fit_message_respects_the_transport_limit() {
        let exact = "x".repeat(MESSAGE_LIMIT);
        assert_eq!(fit_message(&exact), exact);

        let long = "م".repeat(MESSAGE_LIMIT + 1);
        let fitted = fit_message(&long);
        assert_eq!(fitted.chars().count(), MESSAGE_LIMIT);
        assert!(fitted.ends_with("..."));
    }

    #[test]
    fn audit_truncates_detail() {
        let log = AuditLogger::new(tmp_file("pivotbot-audit-test"), true);
        let body = "x".repeat(AUDIT_MAX_TEXT + 1);
        let ev = AuditEvent::admin(UserId(1), "owner", "broadcast", None, Some(&body));
        log.write(ev).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(parsed["event"], "admin");
        assert_eq!(parsed["action"], "broadcast");
        assert!(parsed["detail"].as_str().unwrap().ends_with("..."));
        assert!(parsed.get("target").is_none());
    }

    #[test]
    fn plain_format_lists_fields() {
        let log = AuditLogger::new(tmp_file("pivotbot-audit-plain"), false);
        log.record(AuditEvent::auth(UserId(9), "mallory", false, Some("blocked")));

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: auth"));
        assert!(written.contains("authorized: false"));
        assert!(written.contains("reason: blocked"));
    }

    #[test]
    fn timestamps_use_fixed_layouts() {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        assert_eq!(short_timestamp(at), "2025-01-02 03:04");
        assert_eq!(long_timestamp(at), "2025-01-02 03:04:05");
    }
}
