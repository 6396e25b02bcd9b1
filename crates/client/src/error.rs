use std::time::Duration;

use eppkit_protocol::{
    CommandError, DecodeError, EncodeError, NegotiationError, SessionState, StateError,
};
use thiserror::Error;

/// Writing a document to the transport failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Document of {size} bytes exceeds frame limit of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Transport not accepting writes within {0:?}")]
    Timeout(Duration),
}

/// Reading a document from the transport failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiveError {
    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed by peer")]
    ConnectionClosed,
}

/// Errors surfaced by a [`Session`](crate::Session)
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Receive error: {0}")]
    Receive(#[from] ReceiveError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Service negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Failed to connect: {0}")]
    Connect(#[from] std::io::Error),

    #[error("Session is invalid and must be discarded")]
    SessionInvalid,

    #[error("Cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Response out of order: expected clTRID {expected:?}, got {actual:?}")]
    OrderingViolation {
        expected: String,
        actual: Option<String>,
    },

    #[error("{0} responses still pending")]
    PendingResponses(usize),

    #[error("No command awaiting a response")]
    NoPendingCommand,

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    #[error("Usage error: {0}")]
    Usage(&'static str),
}

impl SessionError {
    /// Returns true if the session was marked failed by this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Send(SendError::ChannelClosed | SendError::Timeout(_))
                | SessionError::Receive(_)
                | SessionError::SessionInvalid
                | SessionError::OrderingViolation { .. }
                | SessionError::UnexpectedMessage(_)
                | SessionError::Connect(_)
        )
    }

    /// The server rejection, if that is what this error is
    pub fn as_command_error(&self) -> Option<&CommandError> {
        match self {
            SessionError::Command(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors surfaced by a [`SessionPool`](crate::SessionPool)
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Pool exhausted: {max_active} sessions active")]
    PoolExhausted { max_active: usize },

    #[error("Session validation failed: {0}")]
    ValidationFailed(#[source] SessionError),

    #[error("Failed to create session: {0}")]
    Session(#[from] SessionError),

    #[error("Pool is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SessionError::from(ReceiveError::Timeout(Duration::from_secs(1))).is_fatal());
        assert!(SessionError::from(SendError::ChannelClosed).is_fatal());
        assert!(SessionError::from(SendError::Timeout(Duration::from_secs(1))).is_fatal());
        assert!(!SessionError::from(SendError::FrameTooLarge { size: 10, max: 5 }).is_fatal());
        assert!(SessionError::SessionInvalid.is_fatal());
        assert!(!SessionError::from(EncodeError::MissingField("clID")).is_fatal());
        assert!(!SessionError::PendingResponses(2).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = SessionError::OrderingViolation {
            expected: "T1".into(),
            actual: Some("T2".into()),
        };
        assert_eq!(
            err.to_string(),
            r#"Response out of order: expected clTRID "T1", got Some("T2")"#
        );
        assert_eq!(
            PoolError::PoolExhausted { max_active: 4 }.to_string(),
            "Pool exhausted: 4 sessions active"
        );
    }
}
