//! Commands the control surface can send to the extension.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A command token sent to the extension as a bare text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundCommand {
    /// Start or stop listening.
    ToggleListen,
    /// Toggle play/pause.
    PlayPause,
}

impl OutboundCommand {
    pub const ALL: [OutboundCommand; 2] = [Self::ToggleListen, Self::PlayPause];

    /// The wire token.
    pub fn token(self) -> &'static str {
        match self {
            Self::ToggleListen => "TOGGLE_LISTEN",
            Self::PlayPause => "PLAY_PAUSE",
        }
    }

    /// Human-readable label for the host's command picker.
    pub fn label(self) -> &'static str {
        match self {
            Self::ToggleListen => "Toggle Listen (Start/Stop)",
            Self::PlayPause => "Toggle Play/Pause",
        }
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for OutboundCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.token() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// A command identifier outside the fixed set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);
