//! Per-user multi-step admin flows.
//!
//! A session is opened by a button, consumes plain-text input until a terminal transition, and is
//! closed by success, `/cancel`, an access check failing mid-flow, or idle expiry. Validation runs
//! before any mutation; a rejected input leaves both settings and the session where they were.

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info};

use crate::{
    access::{AccessLevel, PermissionEngine},
    broadcast::BROADCAST_BODY_MAX,
    channel::{BoundChannel, ChannelBinder},
    domain::UserId,
    errors::{Error, ValidationError},
    settings::{validate_text, SettingsStore, TextKey},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    AddUser,
    BlockUser,
    SetChannel,
    Broadcast,
    GrantPermission,
    EditText(TextKey),
}

impl Flow {
    /// Level checked when the flow opens and again on every input.
    pub fn required_level(self) -> AccessLevel {
        match self {
            Flow::SetChannel | Flow::Broadcast => AccessLevel::Privileged,
            Flow::AddUser | Flow::BlockUser | Flow::GrantPermission | Flow::EditText(_) => {
                AccessLevel::Owner
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Flow::AddUser => "add_user",
            Flow::BlockUser => "block_user",
            Flow::SetChannel => "set_channel",
            Flow::Broadcast => "broadcast",
            Flow::GrantPermission => "grant_permission",
            Flow::EditText(_) => "edit_text",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    UserAllowed(UserId),
    UserBlocked(UserId),
    PrivilegeGranted(UserId),
    ChannelBound(BoundChannel),
    /// Text is held as a draft until the composer confirms.
    BroadcastDrafted { text: String, audience: usize },
    TextUpdated(TextKey),
}

#[derive(Debug)]
pub enum Transition {
    /// Terminal success; the mutation is applied and persisted, the session is closed.
    Done(Outcome),
    /// Input rejected; same state, nothing mutated.
    Reprompt(Error),
    /// Session closed without applying anything.
    Aborted(Error),
}

#[derive(Clone, Copy, Debug)]
struct Session {
    flow: Flow,
    last_activity: Instant,
}

pub struct ConversationEngine {
    store: Arc<SettingsStore>,
    access: PermissionEngine,
    binder: Arc<ChannelBinder>,
    max_text_len: usize,
    idle_timeout: Option<Duration>,
    sessions: Mutex<HashMap<UserId, Session>>,
    drafts: Mutex<HashMap<UserId, String>>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<SettingsStore>,
        access: PermissionEngine,
        binder: Arc<ChannelBinder>,
        max_text_len: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            access,
            binder,
            max_text_len,
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
            drafts: Mutex::new(HashMap::new()),
        }
    }

    /// Open `flow` for `user`, discarding whatever session and unconfirmed draft they had.
    pub async fn begin(&self, user: UserId, flow: Flow) -> Result<(), Error> {
        self.check_access(user, flow).await?;

        if self.drafts.lock().await.remove(&user).is_some() {
            debug!(user = %user, "dropping unconfirmed broadcast draft");
        }

        let prev = self.sessions.lock().await.insert(
            user,
            Session {
                flow,
                last_activity: Instant::now(),
            },
        );
        if let Some(prev) = prev {
            debug!(user = %user, flow = prev.flow.name(), "discarding stale session");
        }
        debug!(user = %user, flow = flow.name(), "session opened");
        Ok(())
    }

    /// Close any open session and drop a pending broadcast draft. Idempotent.
    pub async fn cancel(&self, user: UserId) -> Option<Flow> {
        self.drafts.lock().await.remove(&user);
        let prev = self.sessions.lock().await.remove(&user).map(|s| s.flow);
        if let Some(flow) = prev {
            info!(user = %user, flow = flow.name(), "session cancelled");
        }
        prev
    }

    pub async fn active(&self, user: UserId) -> Option<Flow> {
        self.active_at(user, Instant::now()).await
    }

    pub async fn active_at(&self, user: UserId, now: Instant) -> Option<Flow> {
        let mut sessions = self.sessions.lock().await;
        self.live_session(&mut sessions, user, now).map(|s| s.flow)
    }

    /// Feed one plain-text message to the user's open session.
    ///
    /// `None` means there is no (live) session and the text belongs to command dispatch.
    pub async fn handle_input(&self, user: UserId, text: &str) -> Option<Transition> {
        self.handle_input_at(user, text, Instant::now()).await
    }

    pub async fn handle_input_at(
        &self,
        user: UserId,
        text: &str,
        now: Instant,
    ) -> Option<Transition> {
        let flow = {
            let mut sessions = self.sessions.lock().await;
            self.live_session(&mut sessions, user, now)?.flow
        };

        if let Err(e) = self.check_access(user, flow).await {
            self.close(user).await;
            info!(user = %user, flow = flow.name(), "session aborted: access revoked");
            return Some(Transition::Aborted(e));
        }

        let transition = match self.step(user, flow, text).await {
            Ok(outcome) => {
                self.close(user).await;
                info!(user = %user, flow = flow.name(), "session completed");
                Transition::Done(outcome)
            }
            Err(e) => {
                if let Some(s) = self.sessions.lock().await.get_mut(&user) {
                    s.last_activity = now;
                }
                debug!(user = %user, flow = flow.name(), error = %e, "input rejected");
                Transition::Reprompt(e)
            }
        };
        Some(transition)
    }

    pub async fn take_draft(&self, user: UserId) -> Option<String> {
        self.drafts.lock().await.remove(&user)
    }

    async fn step(&self, user: UserId, flow: Flow, text: &str) -> Result<Outcome, Error> {
        let owner = self.access.owner();
        match flow {
            Flow::AddUser => {
                let target = parse_user_id(text)?;
                self.store
                    .try_mutate(|s| s.allow_user(owner, target))
                    .await?;
                Ok(Outcome::UserAllowed(target))
            }
            Flow::BlockUser => {
                let target = parse_user_id(text)?;
                self.store
                    .try_mutate(|s| s.block_user(owner, target))
                    .await?;
                Ok(Outcome::UserBlocked(target))
            }
            Flow::GrantPermission => {
                let target = parse_user_id(text)?;
                self.store
                    .try_mutate(|s| s.grant_privilege(owner, target))
                    .await?;
                Ok(Outcome::PrivilegeGranted(target))
            }
            Flow::SetChannel => {
                let bound = self.binder.bind(text).await?;
                let committed = bound.binding.clone();
                self.store.mutate(|s| s.channel = Some(committed)).await;
                Ok(Outcome::ChannelBound(bound))
            }
            Flow::Broadcast => {
                let body = validate_text(text, self.max_text_len.min(BROADCAST_BODY_MAX))?;
                let audience = self
                    .store
                    .read(|s| s.user_stats.keys().filter(|u| **u != user).count())
                    .await;
                self.drafts.lock().await.insert(user, body.clone());
                Ok(Outcome::BroadcastDrafted {
                    text: body,
                    audience,
                })
            }
            Flow::EditText(key) => {
                let max = self.max_text_len;
                self.store
                    .try_mutate(|s| s.set_text(key, text, max))
                    .await?;
                Ok(Outcome::TextUpdated(key))
            }
        }
    }

    async fn check_access(&self, user: UserId, flow: Flow) -> Result<AccessLevel, Error> {
        self.store
            .read(|s| self.access.require(s, user, flow.required_level()))
            .await
    }

    async fn close(&self, user: UserId) {
        self.sessions.lock().await.remove(&user);
    }

    fn live_session(
        &self,
        sessions: &mut HashMap<UserId, Session>,
        user: UserId,
        now: Instant,
    ) -> Option<Session> {
        let session = *sessions.get(&user)?;
        if let Some(timeout) = self.idle_timeout {
            if now.saturating_duration_since(session.last_activity) > timeout {
                sessions.remove(&user);
                info!(user = %user, flow = session.flow.name(), "idle session expired");
                return None;
            }
        }
        Some(session)
    }
}

/// Positive numeric Telegram user id.
pub fn parse_user_id(text: &str) -> Result<UserId, ValidationError> {
    let t = text.trim();
    match t.parse::<i64>() {
        Ok(id) if id > 0 => Ok(UserId(id)),
        _ => Err(ValidationError::InvalidUserId(t.to_string())),
    }
}
