//! Operational state vocabularies and transition paths.
//!
//! Processors and ports share one vocabulary, controller services another.
//! The control plane only accepts single-step transitions between
//! neighbouring run states:
//!
//! ```text
//!     ┌──────────┐  stop   ┌──────────┐ disable ┌──────────┐
//!     │ RUNNING  │────────▶│ STOPPED  │────────▶│ DISABLED │
//!     │          │◀────────│          │◀────────│          │
//!     └──────────┘  start  └──────────┘ enable  └──────────┘
//!
//!     DISABLED ──enable──▶ ENABLING ──▶ ENABLED
//!     DISABLED ◀── DISABLING ◀──disable── ENABLED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run state of a processor or port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Scheduled and processing data.
    Running,
    /// Not scheduled; configuration may be changed.
    Stopped,
    /// Not schedulable until re-enabled.
    Disabled,
    /// Any state this client does not model.
    #[serde(other)]
    Unknown,
}

impl RunState {
    /// The wire spelling of this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Disabled => "DISABLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enablement state of a controller service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    /// Enabled and usable by referencing components.
    Enabled,
    /// Enable requested, not yet applied.
    Enabling,
    /// Disabled; properties may be changed.
    Disabled,
    /// Disable requested, not yet applied.
    Disabling,
    /// Any state this client does not model.
    #[serde(other)]
    Unknown,
}

impl ServiceState {
    /// The wire spelling of this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Enabling => "ENABLING",
            Self::Disabled => "DISABLED",
            Self::Disabling => "DISABLING",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns true while the service is between enabled and disabled.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Enabling | Self::Disabling)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if the control plane accepts `from -> to` as one request.
#[must_use]
pub const fn is_single_step(from: RunState, to: RunState) -> bool {
    use RunState::{Disabled, Running, Stopped};

    matches!(
        (from, to),
        (Running, Stopped) | (Stopped, Running | Disabled) | (Disabled, Stopped)
    )
}

/// The sequence of states to request, in order, to get from `from` to `to`.
///
/// Returns an empty path when already in `to`. An unknown current state is
/// treated as stopped, which the control plane rejects with a conflict if
/// wrong; the poller treats that conflict as benign.
#[must_use]
pub fn transition_path(from: RunState, to: RunState) -> Vec<RunState> {
    use RunState::{Disabled, Running, Stopped, Unknown};

    if from == to {
        return Vec::new();
    }

    match (from, to) {
        (Running | Unknown, Disabled) => vec![Stopped, Disabled],
        (Disabled, Running) => vec![Stopped, Running],
        _ => vec![to],
    }
}
