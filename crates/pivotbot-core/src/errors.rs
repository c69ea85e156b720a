use crate::{access::AccessLevel, channel::BindError};

/// Core error type for the bot.
///
/// Adapter crates map their transport errors into `Transport` so the dispatcher
/// can decide between a user-facing failure and a logged, isolated one.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("access denied: requires {required:?}")]
    Unauthorized { required: AccessLevel },

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected input. Never mutates state; the caller re-prompts or explains.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("not a valid numeric user id: {0:?}")]
    InvalidUserId(String),

    #[error("the owner already has full access")]
    OwnerHasFullAccess,

    #[error("the owner cannot be blocked")]
    OwnerCannotBeBlocked,

    #[error("user {0} is already a supervisor")]
    AlreadyPrivileged(i64),

    #[error("user {0} is blocked; unblock them first")]
    UserBlocked(i64),

    #[error("text is empty")]
    EmptyText,

    #[error("text is too long ({len} characters, max {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("malformed channel identifier: {0:?}")]
    MalformedChannel(String),

    #[error("expected three comma-separated prices: high,low,close")]
    PriceFormat,

    #[error("prices must be numbers")]
    PriceNotNumeric,

    #[error("high price must be greater than or equal to low price")]
    HighBelowLow,
}

pub type Result<T> = std::result::Result<T, Error>;
