//! Server and handle errors.

use zipbridge_core::StatusEvent;

/// Failure to bind the listening endpoint.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("port {port} is already in use")]
    AddrInUse { port: u16 },
    #[error("failed to bind port {port}: {source}")]
    Io { port: u16, source: std::io::Error },
}

impl BindError {
    pub(crate) fn from_io(port: u16, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::AddrInUse => Self::AddrInUse { port },
            _ => Self::Io { port, source },
        }
    }

    pub(crate) fn status_event(&self) -> StatusEvent {
        match self {
            Self::AddrInUse { port } => StatusEvent::PortInUse(*port),
            Self::Io { source, .. } => StatusEvent::BindFailed(source.to_string()),
        }
    }
}

/// Errors from the [`Bridge`](crate::Bridge) handle.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge has shut down")]
    Closed,
    #[error(transparent)]
    UnknownCommand(#[from] zipbridge_core::UnknownCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn addr_in_use_is_distinguished() {
        let err = BindError::from_io(8082, io::Error::from(io::ErrorKind::AddrInUse));
        assert!(matches!(err, BindError::AddrInUse { port: 8082 }));
        assert_eq!(err.status_event(), StatusEvent::PortInUse(8082));
    }

    #[test]
    fn other_errors_keep_detail() {
        let err = BindError::from_io(
            8082,
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, BindError::Io { port: 8082, .. }));
        assert_eq!(err.status_event(), StatusEvent::BindFailed("denied".into()));
    }
}
