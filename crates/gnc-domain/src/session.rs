use std::fmt;

use serde::{Deserialize, Serialize};

/// How a session treats its backing store when it begins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionOpenMode {
    /// Open an existing store and take its lock.
    #[default]
    Normal,
    /// Create a store; fails if one already exists.
    NewStore,
    /// Create a store, replacing any existing one.
    NewOverwrite,
    /// Open without taking the lock; saving is refused.
    ReadOnly,
    /// Open an existing store, discarding a stale lock.
    BreakLock,
}

impl SessionOpenMode {
    pub const fn code(self) -> i32 {
        match self {
            SessionOpenMode::Normal => 0,
            SessionOpenMode::NewStore => 2,
            SessionOpenMode::NewOverwrite => 3,
            SessionOpenMode::ReadOnly => 4,
            SessionOpenMode::BreakLock => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SessionOpenMode::Normal),
            2 => Some(SessionOpenMode::NewStore),
            3 => Some(SessionOpenMode::NewOverwrite),
            4 => Some(SessionOpenMode::ReadOnly),
            5 => Some(SessionOpenMode::BreakLock),
            _ => None,
        }
    }

    /// Whether the store is expected to be created rather than loaded.
    pub const fn creates_store(self) -> bool {
        matches!(self, SessionOpenMode::NewStore | SessionOpenMode::NewOverwrite)
    }
}

impl fmt::Display for SessionOpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionOpenMode::Normal => "normal",
            SessionOpenMode::NewStore => "new-store",
            SessionOpenMode::NewOverwrite => "new-overwrite",
            SessionOpenMode::ReadOnly => "read-only",
            SessionOpenMode::BreakLock => "break-lock",
        };
        f.write_str(label)
    }
}
