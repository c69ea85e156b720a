use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    domain::UserId,
    errors::Error,
    settings::{record, Settings},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// No prior durable state; compiled-in defaults are in effect.
    Missing,
}

/// Owner of the [`Settings`] aggregate and its durable record.
///
/// All access goes through one mutex. A mutation and the save that follows it happen inside the
/// same critical section so concurrent handlers for different users cannot lose updates.
pub struct SettingsStore {
    path: PathBuf,
    owner: UserId,
    state: Mutex<Settings>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, owner: UserId) -> Self {
        Self::with_settings(path, owner, Settings::default())
    }

    pub fn with_settings(path: impl Into<PathBuf>, owner: UserId, mut settings: Settings) -> Self {
        settings.normalize(owner);
        Self {
            path: path.into(),
            owner,
            state: Mutex::new(settings),
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace in-memory state with the durable record.
    ///
    /// On error the in-memory state is left untouched.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let txt = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadOutcome::Missing),
            Err(e) => return Err(e.into()),
        };
        if txt.trim().is_empty() {
            return Ok(LoadOutcome::Missing);
        }

        let settings = record::decode(&txt, self.owner)?;
        *self.state.lock().await = settings;
        Ok(LoadOutcome::Loaded)
    }

    /// Startup variant of [`load`](Self::load): failures are logged and defaults stay in effect.
    pub async fn load_or_default(&self) -> LoadOutcome {
        match self.load().await {
            Ok(LoadOutcome::Loaded) => {
                info!(path = %self.path.display(), "settings loaded");
                LoadOutcome::Loaded
            }
            Ok(LoadOutcome::Missing) => {
                info!(path = %self.path.display(), "no settings file, using defaults");
                LoadOutcome::Missing
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to load settings, using defaults");
                LoadOutcome::Missing
            }
        }
    }

    /// Manual save, surfaced to the admin panel.
    pub async fn save(&self) -> Result<()> {
        let st = self.state.lock().await;
        self.persist(&st).await
    }

    pub async fn read<T>(&self, f: impl FnOnce(&Settings) -> T) -> T {
        let st = self.state.lock().await;
        f(&st)
    }

    pub async fn snapshot(&self) -> Settings {
        self.state.lock().await.clone()
    }

    /// Apply an infallible mutation and persist.
    ///
    /// A failed save is logged; the in-memory change stands and is reported as applied.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut Settings) -> T) -> T {
        let mut st = self.state.lock().await;
        let out = f(&mut st);
        self.persist_logged(&st).await;
        out
    }

    /// Apply a validated mutation all-or-nothing, persisting only on success.
    pub async fn try_mutate<T, E>(
        &self,
        f: impl FnOnce(&mut Settings) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let mut st = self.state.lock().await;
        let mut draft = st.clone();
        let out = f(&mut draft)?;
        *st = draft;
        self.persist_logged(&st).await;
        Ok(out)
    }

    async fn persist_logged(&self, st: &Settings) {
        if let Err(e) = self.persist(st).await {
            error!(path = %self.path.display(), error = %e, "failed to save settings; change kept in memory only");
        }
    }

    async fn persist(&self, st: &Settings) -> Result<()> {
        let payload = record::encode(st)?;
        write_atomic(&self.path, &payload)
            .await
            .map_err(|e| Error::Persistence(format!("{}: {e}", self.path.display())))?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Write via a sibling temp file + rename so a crash never leaves a truncated record.
async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent).await?;

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("settings");
    let tmp = parent.join(format!(".{file_name}.tmp-{}-{nanos}", std::process::id()));

    tokio::fs::write(&tmp, content).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::ChatId,
        errors::ValidationError,
        settings::{ChannelBinding, TextKey},
    };

    const OWNER: UserId = UserId(1);

    fn tmp_path(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        PathBuf::from(format!(
            "/tmp/{prefix}-{}-{ts}/bot_settings.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn save_then_load_reproduces_state() {
        let path = tmp_path("pivotbot-store-rt");
        let store = SettingsStore::new(&path, OWNER);
        store
            .try_mutate(|s| {
                s.allow_user(OWNER, UserId(2))?;
                s.grant_privilege(OWNER, UserId(3))?;
                s.block_user(OWNER, UserId(4))?;
                s.set_text(TextKey::HelpMessage, "read the docs", 4000)
            })
            .await
            .unwrap();
        store
            .mutate(|s| {
                s.channel = Some(ChannelBinding {
                    id: ChatId(-100),
                    display_name: "Chan".to_string(),
                    username: "chan".to_string(),
                });
                s.record_calculation(
                    UserId(2),
                    Some("two"),
                    None,
                    chrono::Local::now().naive_local(),
                );
            })
            .await;

        let fresh = SettingsStore::new(&path, OWNER);
        assert_eq!(fresh.load().await.unwrap(), LoadOutcome::Loaded);
        assert_eq!(fresh.snapshot().await, store.snapshot().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_lose_no_updates() {
        const WRITERS: i64 = 32;
        let path = tmp_path("pivotbot-store-concurrent");
        let store = std::sync::Arc::new(SettingsStore::new(&path, OWNER));

        let mut tasks = Vec::new();
        for i in 0..WRITERS {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let user = UserId(100 + i);
                store
                    .mutate(|s| {
                        s.record_calculation(
                            user,
                            Some(&format!("u{i}")),
                            None,
                            chrono::Local::now().naive_local(),
                        )
                    })
                    .await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        let snap = store.snapshot().await;
        assert_eq!(snap.total_calculations, WRITERS as u64);
        assert_eq!(snap.user_stats.len(), WRITERS as usize);

        let fresh = SettingsStore::new(&path, OWNER);
        assert_eq!(fresh.load().await.unwrap(), LoadOutcome::Loaded);
        assert_eq!(fresh.snapshot().await, snap);
    }

    #[tokio::test]
    async fn missing_file_keeps_defaults() {
        let store = SettingsStore::new(tmp_path("pivotbot-store-missing"), OWNER);
        assert_eq!(store.load().await.unwrap(), LoadOutcome::Missing);
        assert_eq!(store.snapshot().await, Settings::default());
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_defaults() {
        let path = tmp_path("pivotbot-store-corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ definitely not json").unwrap();

        let store = SettingsStore::new(&path, OWNER);
        assert!(store.load().await.is_err());
        assert_eq!(store.load_or_default().await, LoadOutcome::Missing);
        assert_eq!(store.snapshot().await, Settings::default());
    }

    #[tokio::test]
    async fn failed_validation_leaves_state_untouched() {
        let path = tmp_path("pivotbot-store-validation");
        let store = SettingsStore::new(&path, OWNER);
        let before = store.snapshot().await;

        let res = store
            .try_mutate(|s| {
                s.allow_user(OWNER, UserId(9))?;
                s.block_user(OWNER, OWNER)
            })
            .await;
        assert_eq!(res, Err(ValidationError::OwnerCannotBeBlocked));
        assert_eq!(store.snapshot().await, before);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_failure_keeps_in_memory_mutation() {
        // A directory where the file should be makes every save fail.
        let path = tmp_path("pivotbot-store-unwritable");
        std::fs::create_dir_all(&path).unwrap();

        let store = SettingsStore::new(&path, OWNER);
        let blocked = store
            .try_mutate(|s| s.block_user(OWNER, UserId(5)))
            .await;
        assert!(blocked.is_ok());
        assert!(store.read(|s| s.blocked_users.contains(&UserId(5))).await);
        assert!(matches!(store.save().await, Err(Error::Persistence(_))));
    }
}
