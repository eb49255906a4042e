//! The per-server session state machine (spec §4.4).

use serde::{Deserialize, Serialize};

/// A session's lifecycle state.
///
/// `disconnected → connecting → initializing → ready → closing → closed`.
/// Any state may jump to `closed` on an unrecoverable transport failure; see
/// [`SessionState::can_transition_to`] for the full edge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No transport has been opened yet.
    Disconnected,
    /// The transport is open; `initialize` has not yet been sent.
    Connecting,
    /// `initialize` is in flight.
    Initializing,
    /// The handshake completed; the session accepts calls.
    Ready,
    /// A graceful close has been requested.
    Closing,
    /// The session is torn down; every outstanding request has been failed.
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is a legal edge in the state
    /// machine.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use SessionState::{Closed, Closing, Connecting, Disconnected, Initializing, Ready};
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Initializing)
                | (Connecting, Closed)
                | (Initializing, Ready)
                | (Initializing, Closed)
                | (Ready, Closing)
                | (Ready, Closed)
                | (Closing, Closed)
        )
    }

    /// Whether the session currently accepts new outbound calls.
    #[must_use]
    pub fn accepts_calls(self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        assert!(SessionState::Disconnected.can_transition_to(SessionState::Connecting));
        assert!(SessionState::Connecting.can_transition_to(SessionState::Initializing));
        assert!(SessionState::Initializing.can_transition_to(SessionState::Ready));
        assert!(SessionState::Ready.can_transition_to(SessionState::Closing));
        assert!(SessionState::Closing.can_transition_to(SessionState::Closed));
    }

    #[test]
    fn ready_can_abort_straight_to_closed() {
        assert!(SessionState::Ready.can_transition_to(SessionState::Closed));
    }

    #[test]
    fn closed_is_terminal() {
        for state in [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::Initializing,
            SessionState::Ready,
            SessionState::Closing,
            SessionState::Closed,
        ] {
            assert!(!SessionState::Closed.can_transition_to(state));
        }
    }

    #[test]
    fn only_ready_accepts_calls() {
        assert!(SessionState::Ready.accepts_calls());
        assert!(!SessionState::Initializing.accepts_calls());
    }
}
