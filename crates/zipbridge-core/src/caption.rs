//! Captioning activity as reported by the extension.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Last known captioning activity.
///
/// The extension owns this vocabulary. `running` and `stopped` are the values
/// seen in practice; anything else is kept verbatim in [`CaptionState::Other`]
/// so it can still be shown and compared against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaptionState {
    /// Nothing received since the process started.
    #[default]
    Unknown,
    Running,
    Stopped,
    Other(String),
}

impl CaptionState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Other(s) => s,
        }
    }

    /// Whether this state matches a feedback comparison value.
    pub fn is(&self, value: &str) -> bool {
        self.as_str() == value
    }
}

impl fmt::Display for CaptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CaptionState {
    fn from(s: &str) -> Self {
        match s {
            "unknown" => Self::Unknown,
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CaptionState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "unknown" | "running" | "stopped" => Self::from(s.as_str()),
            _ => Self::Other(s),
        }
    }
}

impl From<CaptionState> for String {
    fn from(state: CaptionState) -> Self {
        match state {
            CaptionState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for CaptionState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
