//! Connection lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`crate::Session`].
///
/// Only the session itself moves between states:
///
/// ```text
/// Disconnected --connect--> Connecting --ok--> Connected
///                               \--err--> Error
/// Connected --unit of work--> Processing --ok--> Connected
///                                 \--err--> Error
/// Connected --disconnect--> Disconnecting --ok--> Disconnected
/// Error --connect--> Connecting ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionState {
    Unknown = 0,
    Connecting = 1,
    Connected = 2,
    Processing = 3,
    Disconnecting = 4,
    Disconnected = 5,
    Error = 6,
}

impl SessionState {
    /// Decode the compact form used for lock-free state reads.
    pub(crate) fn from_repr(repr: u8) -> Self {
        match repr {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Processing,
            4 => Self::Disconnecting,
            5 => Self::Disconnected,
            6 => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub(crate) fn repr(self) -> u8 {
        self as u8
    }

    /// States in which a unit of work may run.
    pub fn accepts_work(self) -> bool {
        matches!(self, Self::Connected | Self::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Processing => "processing",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
