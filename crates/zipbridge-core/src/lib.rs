//! Core types for the Zip Captions bridge.
//!
//! This crate has no I/O. It defines what travels over the wire between the
//! bridge and the browser extension, and the state that inbound traffic
//! produces; the server crate supplies the sockets and timers.

mod caption;
mod codec;
mod command;
mod state;
mod status;

pub use caption::CaptionState;
pub use codec::{DecodeError, Inbound, InboundUpdate, PROBE, PROBE_ACK, decode, encode};
pub use command::{OutboundCommand, UnknownCommand};
pub use state::{ChangedField, StateStore};
pub use status::{ConnectivityStatus, StatusEvent, StatusReporter};
