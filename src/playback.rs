//! Agent playback state tracking
//!
//! The host reports agent state transitions with more than two named states.
//! Only whether the agent is speaking matters for interruption decisions.

use serde::Deserialize;
use tracing::info;

/// Agent state as reported by the host session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Initializing,
    Idle,
    Listening,
    Thinking,
    Speaking,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Initializing => write!(f, "initializing"),
            AgentState::Idle => write!(f, "idle"),
            AgentState::Listening => write!(f, "listening"),
            AgentState::Thinking => write!(f, "thinking"),
            AgentState::Speaking => write!(f, "speaking"),
        }
    }
}

/// Whether the agent is currently producing speech
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
}

impl PlaybackState {
    pub fn is_speaking(&self) -> bool {
        matches!(self, PlaybackState::Speaking)
    }
}

/// Tracks the speaking flag from agent state transitions
///
/// Transitions must be applied in the order the host delivers them; nothing
/// here detects or repairs reordering.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    state: PlaybackState,
}

impl PlaybackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one agent state transition
    ///
    /// Entering `Speaking` is keyed on the new state, leaving it on the old
    /// state. Transitions between two non-speaking states change nothing.
    pub fn on_transition(&mut self, old: AgentState, new: AgentState) {
        if new == AgentState::Speaking {
            self.state = PlaybackState::Speaking;
            info!("Agent has started speaking");
        } else if old == AgentState::Speaking {
            self.state = PlaybackState::Idle;
            info!("Agent has stopped speaking (now {})", new);
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.state.is_speaking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let tracker = PlaybackTracker::new();
        assert_eq!(tracker.state(), PlaybackState::Idle);
        assert!(!tracker.is_speaking());
    }

    #[test]
    fn test_enter_and_leave_speaking() {
        let mut tracker = PlaybackTracker::new();
        tracker.on_transition(AgentState::Thinking, AgentState::Speaking);
        assert!(tracker.is_speaking());

        tracker.on_transition(AgentState::Speaking, AgentState::Listening);
        assert!(!tracker.is_speaking());
    }

    #[test]
    fn test_non_speaking_transitions_leave_state_alone() {
        let mut tracker = PlaybackTracker::new();
        tracker.on_transition(AgentState::Initializing, AgentState::Listening);
        assert!(!tracker.is_speaking());

        tracker.on_transition(AgentState::Listening, AgentState::Speaking);
        // a stray non-speaking transition does not clear the flag
        tracker.on_transition(AgentState::Listening, AgentState::Thinking);
        assert!(tracker.is_speaking());
    }

    #[test]
    fn test_speaking_to_speaking_stays_speaking() {
        let mut tracker = PlaybackTracker::new();
        tracker.on_transition(AgentState::Speaking, AgentState::Speaking);
        assert!(tracker.is_speaking());
    }

    #[test]
    fn test_agent_state_parses_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            state: AgentState,
        }
        let parsed: Wrapper = toml::from_str(r#"state = "speaking""#).unwrap();
        assert_eq!(parsed.state, AgentState::Speaking);
    }
}
