//! WebSocket bridge between a control surface and the Zip Captions browser
//! extension.
//!
//! The extension connects to [`Bridge`]'s listening port. The bridge probes
//! it periodically, relays commands to it and turns its status messages into
//! variables and feedbacks for the [`Host`].

mod bridge;
mod config;
mod error;
mod heartbeat;
mod host;
mod registry;
mod server;
mod session;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError, DEFAULT_HEARTBEAT_SECS, DEFAULT_PORT, ServerConfig};
pub use error::{BindError, BridgeError};
pub use heartbeat::HeartbeatMonitor;
pub use host::{
    CAPTION_STATE_CHOICES, FeedbackId, Host, SEND_COMMAND_ACTION, TracingHost, VariableId,
    command_choices,
};
pub use session::{SendOutcome, Snapshot};
pub use zipbridge_core::{CaptionState, ConnectivityStatus, OutboundCommand};
