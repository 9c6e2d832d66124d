//! Pipeline state machine.
//!
//! The pipeline is always in exactly one of three states.  Transitions are
//! driven by user commands and by the processing task finishing; there is
//! no path from `Recording` back to `Idle` that skips `Processing` except a
//! failed capture stop.

use std::sync::{Arc, Mutex};

/// The three pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Waiting for a start command.
    Idle,
    /// Microphone audio is being captured.
    Recording,
    /// A captured buffer is being transcribed and improved.
    Processing,
}

impl PipelineState {
    /// Short label for logs and the command prompt.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Recording => "recording",
            PipelineState::Processing => "processing",
        }
    }

    /// Returns `true` when a new recording cannot start.
    pub fn is_busy(&self) -> bool {
        !matches!(self, PipelineState::Idle)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// State cell shared between the controller and its processing task.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<PipelineState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineState::Idle)),
        }
    }

    pub fn get(&self) -> PipelineState {
        *self.lock()
    }

    pub fn set(&self, state: PipelineState) {
        let mut guard = self.lock();
        if *guard != state {
            log::debug!("pipeline: {} -> {}", guard.label(), state.label());
            *guard = state;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PipelineState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(SharedState::new().get(), PipelineState::Idle);
    }

    #[test]
    fn set_and_get_round_trip() {
        let state = SharedState::new();
        state.set(PipelineState::Recording);
        assert_eq!(state.get(), PipelineState::Recording);
        state.set(PipelineState::Processing);
        assert_eq!(state.get(), PipelineState::Processing);
    }

    #[test]
    fn clones_share_the_same_cell() {
        let state = SharedState::new();
        let clone = state.clone();
        clone.set(PipelineState::Processing);
        assert_eq!(state.get(), PipelineState::Processing);
    }

    #[test]
    fn only_idle_is_not_busy() {
        assert!(!PipelineState::Idle.is_busy());
        assert!(PipelineState::Recording.is_busy());
        assert!(PipelineState::Processing.is_busy());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(PipelineState::Idle.to_string(), "idle");
        assert_eq!(PipelineState::Recording.to_string(), "recording");
        assert_eq!(PipelineState::Processing.to_string(), "processing");
    }
}
