//! Session state machine
//!
//! State transitions:
//! ```text
//! DISCONNECTED ──connect──→ GREETED ──login──→ LOGGED_IN
//!      ↑                       │                   │
//!      └───────close───────────┘                   │
//!      └───────────────────logout──────────────────┘
//!
//! any state ──I/O failure──→ FAILED (terminal)
//! ```

use crate::error::StateError;

/// Protocol state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No transport attached
    #[default]
    Disconnected,

    /// Transport attached and server greeting received
    Greeted,

    /// Login accepted, ready for object commands
    LoggedIn,

    /// Transport is in an unknown state; the session must be discarded
    Failed,
}

impl SessionState {
    /// Validates a state transition
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            // Nothing leaves Failed
            (Failed, Failed) => true,
            (Failed, _) => false,

            // Any live state can fail
            (_, Failed) => true,

            (Disconnected, Greeted) => true,
            (Greeted, LoggedIn) => true,
            (Greeted, Disconnected) => true,
            (LoggedIn, Disconnected) => true,

            (a, b) if *a == b => true,

            _ => false,
        }
    }

    /// Attempts to transition to a new state
    ///
    /// Returns Ok(()) if transition is valid, Err otherwise
    pub fn transition_to(&mut self, next: SessionState) -> Result<(), StateError> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(StateError::InvalidStateTransition {
                from: *self,
                to: next,
            })
        }
    }

    #[inline]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, SessionState::Disconnected)
    }

    #[inline]
    pub fn is_greeted(&self) -> bool {
        matches!(self, SessionState::Greeted)
    }

    #[inline]
    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed)
    }

    /// Returns true if a transport is attached and healthy
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Greeted | SessionState::LoggedIn)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Greeted => write!(f, "Greeted"),
            SessionState::LoggedIn => write!(f, "LoggedIn"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}
