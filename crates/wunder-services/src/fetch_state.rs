//! Fetch pipeline state machine.
//!
//! Ensures only one locate-and-forecast run is in flight. Used by
//! `FetchOrchestrator`.

/// Pipeline state for a single orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
}

impl FetchState {
    /// True if a new run can be started.
    pub fn can_start(self) -> bool {
        matches!(self, FetchState::Idle)
    }

    /// State after a run reaches any terminal outcome.
    pub fn on_done(self) -> Self {
        FetchState::Idle
    }
}
