//! User actions on a suggested completion.
//!
//! The API boundary receives actions as loosely-typed strings; they are
//! parsed into this closed enum immediately, and unrecognized values are
//! rejected with a typed error rather than silently defaulting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the user did with a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    /// Kept the suggestion (possibly after touching it up).
    Accept,
    /// Rewrote the suggestion before using it.
    Edit,
    /// Removed the suggestion outright.
    Delete,
    /// Left the suggestion unused.
    Ignore,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Accept => "accept",
            UserAction::Edit => "edit",
            UserAction::Delete => "delete",
            UserAction::Ignore => "ignore",
        }
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an action string does not name a known [`UserAction`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized user action: {0:?} (expected accept, edit, delete, or ignore)")]
pub struct ParseActionError(pub String);

impl FromStr for UserAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(UserAction::Accept),
            "edit" => Ok(UserAction::Edit),
            "delete" => Ok(UserAction::Delete),
            "ignore" => Ok(UserAction::Ignore),
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}
