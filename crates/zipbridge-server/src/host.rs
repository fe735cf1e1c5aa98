//! The control-surface host the bridge reports to.
//!
//! The host owns the UI. It registers the action, feedback and variables
//! described here, and the session pushes status and value changes to it
//! through [`Host`].

use std::fmt;
use zipbridge_core::{ConnectivityStatus, OutboundCommand};

/// Callbacks into the host. All calls come from the session task.
pub trait Host: Send + 'static {
    fn update_status(&mut self, status: &ConnectivityStatus);

    /// New values for one or more variables, delivered as a single batch.
    fn set_variable_values(&mut self, values: &[(VariableId, String)]);

    /// Ask the host to re-evaluate these feedbacks.
    fn check_feedbacks(&mut self, feedbacks: &[FeedbackId]);
}

/// Action that sends a command to the extension.
pub const SEND_COMMAND_ACTION: &str = "send_command";

/// `(id, label)` choices for the send-command action.
pub fn command_choices() -> impl Iterator<Item = (&'static str, &'static str)> {
    OutboundCommand::ALL
        .into_iter()
        .map(|c| (c.token(), c.label()))
}

/// `(id, label)` choices for the caption-state feedback. The first is the default.
pub const CAPTION_STATE_CHOICES: [(&str, &str); 2] = [("running", "Running"), ("stopped", "Stopped")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableId {
    CaptionState,
    LastWord,
}

impl VariableId {
    pub const ALL: [VariableId; 2] = [Self::CaptionState, Self::LastWord];

    pub fn id(self) -> &'static str {
        match self {
            Self::CaptionState => "caption_state",
            Self::LastWord => "last_word",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CaptionState => "Captioning Status",
            Self::LastWord => "Last Captioned Word",
        }
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Boolean feedbacks. `CaptionState` is true when the caption state equals
/// the value chosen in the feedback's options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackId {
    CaptionState,
}

impl FeedbackId {
    pub fn id(self) -> &'static str {
        match self {
            Self::CaptionState => "caption_state",
        }
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A host that only logs. Used by the standalone binary.
#[derive(Debug, Default)]
pub struct TracingHost;

impl Host for TracingHost {
    fn update_status(&mut self, status: &ConnectivityStatus) {
        tracing::info!(%status, "status");
    }

    fn set_variable_values(&mut self, values: &[(VariableId, String)]) {
        for (id, value) in values {
            tracing::info!(variable = %id, %value, "variable updated");
        }
    }

    fn check_feedbacks(&mut self, feedbacks: &[FeedbackId]) {
        for id in feedbacks {
            tracing::debug!(feedback = %id, "feedback refresh");
        }
    }
}
