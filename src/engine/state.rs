use serde::{Deserialize, Serialize};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Connected,
    Streaming,
    Stopped,
}

impl SessionState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, target),
            (Idle, Connected)
                | (Connected, Streaming)
                // teardown is allowed from anywhere but Stopped
                | (Idle, Stopped)
                | (Connected, Stopped)
                | (Streaming, Stopped)
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Connected => "Connected",
            Self::Streaming => "Streaming",
            Self::Stopped => "Stopped",
        }
    }
}
