//! Wire codec.
//!
//! Traffic is asymmetric. The extension sends JSON objects (or the bare probe
//! reply); the bridge sends bare command tokens and the bare probe.

use crate::{CaptionState, OutboundCommand};
use serde_json::{Map, Value};

/// Liveness probe sent to every open peer.
pub const PROBE: &str = "PING";

/// Probe reply from the extension.
pub const PROBE_ACK: &str = "PONG";

const STATUS_KEY: &str = "status";
const LAST_WORD_KEY: &str = "lastWord";

/// A successfully decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Reply to a liveness probe. Carries no state.
    HeartbeatAck,
    Update(InboundUpdate),
}

/// The recognized fields an inbound frame actually carried.
///
/// A `None` slot means the key was absent, and the stored value must be left
/// alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundUpdate {
    pub status: Option<CaptionState>,
    pub last_word: Option<String>,
}

impl InboundUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.last_word.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Decode one inbound frame.
///
/// Invalid UTF-8 is replaced rather than rejected, so a damaged binary frame
/// still applies whatever fields survive.
pub fn decode(raw: impl AsRef<[u8]>) -> Result<Inbound, DecodeError> {
    let text = String::from_utf8_lossy(raw.as_ref());
    if text == PROBE_ACK {
        return Ok(Inbound::HeartbeatAck);
    }

    let Value::Object(fields) = serde_json::from_str::<Value>(&text)? else {
        return Err(DecodeError::NotAnObject);
    };

    Ok(Inbound::Update(InboundUpdate {
        // An empty status carries no state.
        status: string_field(&fields, STATUS_KEY)
            .filter(|s| !s.is_empty())
            .map(CaptionState::from),
        last_word: string_field(&fields, LAST_WORD_KEY).map(str::to_string),
    }))
}

/// Encode a command as its wire token.
pub fn encode(command: OutboundCommand) -> &'static str {
    command.token()
}

// Null or non-string values count as absent.
fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}
