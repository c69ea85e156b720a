use crate::{domain::UserId, errors::Error, settings::Settings, Result};

/// Privilege tiers, ordered so `>=` means "at least".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessLevel {
    Denied,
    Basic,
    Privileged,
    Owner,
}

/// Why a non-owner was denied. Mirrors the first matching rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    Inactive,
    Blocked,
    OwnerOnly,
    NotAllowed,
}

/// Stateless role evaluation against the current [`Settings`].
#[derive(Clone, Copy, Debug)]
pub struct PermissionEngine {
    owner: UserId,
}

impl PermissionEngine {
    pub fn new(owner: UserId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        user == self.owner
    }

    pub fn evaluate(&self, settings: &Settings, user: UserId) -> AccessLevel {
        self.classify(settings, user).unwrap_or(AccessLevel::Denied)
    }

    pub fn deny_reason(&self, settings: &Settings, user: UserId) -> Option<DenyReason> {
        self.classify(settings, user).err()
    }

    /// `Ok(level)` when `user` holds at least `required`.
    pub fn require(
        &self,
        settings: &Settings,
        user: UserId,
        required: AccessLevel,
    ) -> Result<AccessLevel> {
        let level = self.evaluate(settings, user);
        if level >= required && level > AccessLevel::Denied {
            Ok(level)
        } else {
            Err(Error::Unauthorized { required })
        }
    }

    // First match wins.
    fn classify(
        &self,
        settings: &Settings,
        user: UserId,
    ) -> std::result::Result<AccessLevel, DenyReason> {
        if user == self.owner {
            return Ok(AccessLevel::Owner);
        }
        if !settings.active {
            return Err(DenyReason::Inactive);
        }
        if settings.blocked_users.contains(&user) {
            return Err(DenyReason::Blocked);
        }
        if settings.owner_only {
            return Err(DenyReason::OwnerOnly);
        }
        if settings.privileged_users.contains(&user) {
            return Ok(AccessLevel::Privileged);
        }
        if !settings.allowed_users.is_empty() && !settings.allowed_users.contains(&user) {
            return Err(DenyReason::NotAllowed);
        }
        Ok(AccessLevel::Basic)
    }
}
