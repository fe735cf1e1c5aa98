//! Connectivity status shown to the host.

use serde::Serialize;
use std::fmt;

/// Externally visible connectivity, in the host's five-value taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "detail", rename_all = "snake_case")]
pub enum ConnectivityStatus {
    Connecting,
    Ok(String),
    BadConfig(String),
    Warning(String),
    ConnectionFailure(String),
}

impl ConnectivityStatus {
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Connecting => None,
            Self::Ok(d) | Self::BadConfig(d) | Self::Warning(d) | Self::ConnectionFailure(d) => {
                Some(d)
            }
        }
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Self::Connecting => "connecting",
            Self::Ok(_) => "ok",
            Self::BadConfig(_) => "bad config",
            Self::Warning(_) => "warning",
            Self::ConnectionFailure(_) => "connection failure",
        };
        match self.detail() {
            Some(detail) => write!(f, "{level}: {detail}"),
            None => f.write_str(level),
        }
    }
}

/// Lifecycle events that move the reported status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The bridge is initializing or restarting.
    Starting,
    /// Configuration was rejected before any bind.
    ConfigRejected(String),
    /// The port is held by someone else.
    PortInUse(u16),
    /// Any other bind failure.
    BindFailed(String),
    Listening,
    PeerConnected,
    /// The registry went from non-empty to empty.
    LastPeerLeft,
    /// A command was issued with no peer to receive it.
    CommandDropped,
}

/// Maps lifecycle events to statuses and suppresses repeats.
#[derive(Debug, Default)]
pub struct StatusReporter {
    last: Option<ConnectivityStatus>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The status an event maps to.
    pub fn status_for(event: &StatusEvent) -> ConnectivityStatus {
        match event {
            StatusEvent::Starting => ConnectivityStatus::Connecting,
            StatusEvent::ConfigRejected(reason) => ConnectivityStatus::BadConfig(reason.clone()),
            StatusEvent::PortInUse(port) => {
                ConnectivityStatus::ConnectionFailure(format!("Port {port} is already in use"))
            }
            StatusEvent::BindFailed(detail) => {
                ConnectivityStatus::ConnectionFailure(format!("Server error: {detail}"))
            }
            StatusEvent::Listening => {
                ConnectivityStatus::Ok("Listening (waiting for extension)".into())
            }
            StatusEvent::PeerConnected => ConnectivityStatus::Ok("Connected to extension".into()),
            StatusEvent::LastPeerLeft => {
                ConnectivityStatus::Warning("Disconnected from extension".into())
            }
            StatusEvent::CommandDropped => {
                ConnectivityStatus::Warning("Extension not connected".into())
            }
        }
    }

    /// Record an event. Returns the new status if it differs from the last one reported.
    pub fn observe(&mut self, event: &StatusEvent) -> Option<ConnectivityStatus> {
        let status = Self::status_for(event);
        if self.last.as_ref() == Some(&status) {
            return None;
        }
        self.last = Some(status.clone());
        Some(status)
    }

    /// The last status reported, if any.
    pub fn current(&self) -> Option<&ConnectivityStatus> {
        self.last.as_ref()
    }
}
