//! Caller identity as supplied by the external principal provider.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable, opaque user identifier issued by the identity provider.
///
/// Deserialization applies the same trim and non-blank rule as `new`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Wraps a provider-issued id. Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = BlankUserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(BlankUserIdError)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// A user id was empty after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankUserIdError;

impl Display for BlankUserIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("user id cannot be blank")
    }
}

impl std::error::Error for BlankUserIdError {}

/// Result of asking the identity provider who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(UserId),
    Anonymous,
}

impl Identity {
    /// Builds an identity from an optional raw provider id.
    ///
    /// Missing or blank ids are treated as anonymous.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.and_then(UserId::new) {
            Some(user_id) => Self::Authenticated(user_id),
            None => Self::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(user_id) => Some(user_id),
            Self::Anonymous => None,
        }
    }
}
