//! User-facing progress of a convergence pass.
//!
//! Separate from `tracing`: these events are meant to be rendered for a person
//! watching `apply`, not filtered by log level.

use crate::error::EntityKind;
use std::sync::Mutex;

/// What the engine is doing to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Checking,
    Pulling,
    Creating,
    Starting,
    Stopping,
    Removing,
    Recreating,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Pulling => "pulling",
            Self::Creating => "creating",
            Self::Starting => "starting",
            Self::Stopping => "stopping",
            Self::Removing => "removing",
            Self::Recreating => "recreating",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyEvent {
    /// A new kind of entity is being converged.
    Phase(EntityKind),
    Step {
        kind: EntityKind,
        name: String,
        action: Action,
    },
    /// The entity is in its desired state.
    Ready { kind: EntityKind, name: String },
    /// Something went wrong but the pass continues.
    Warning { name: String, message: String },
    RoutingApplied { entries: usize },
    HostsSkipped,
    HostsRegistered { count: usize },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ApplyEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&self, _event: ApplyEvent) {}
}

/// Keeps every event in order. Useful for tests and for summaries.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ApplyEvent>>,
}

impl RecordingProgress {
    #[must_use]
    pub fn events(&self) -> Vec<ApplyEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ApplyEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
