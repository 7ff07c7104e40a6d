//! Session status state machine.
//!
//! ```text
//! launching -> navigating -> awaiting_credential -> connected
//!     \            \                 \                 \
//!      +------------+-----------------+-----------------+--> error
//! (any state) --> closed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Driver created, target site not yet opened.
    Launching,
    /// Target site opening; login prompt not yet seen.
    Navigating,
    /// Login prompt (QR or phone code) is on screen.
    AwaitingCredential,
    /// Authenticated UI detected.
    Connected,
    /// A collaborator call failed. Callers must start a new session.
    Error,
    /// Torn down by explicit close or idle eviction.
    Closed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Launching => "launching",
            SessionStatus::Navigating => "navigating",
            SessionStatus::AwaitingCredential => "awaiting_credential",
            SessionStatus::Connected => "connected",
            SessionStatus::Error => "error",
            SessionStatus::Closed => "closed",
        }
    }

    /// `error` and `closed` admit no further progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Error | SessionStatus::Closed)
    }

    pub fn is_connected(self) -> bool {
        self == SessionStatus::Connected
    }

    /// Whether a credential artifact may exist in this status.
    pub fn expects_credential(self) -> bool {
        matches!(
            self,
            SessionStatus::Navigating | SessionStatus::AwaitingCredential
        )
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Error, _) => false,
            (_, Error) => true,
            (Launching, Navigating) => true,
            (Navigating, AwaitingCredential) => true,
            (AwaitingCredential, Connected) => true,
            _ => false,
        }
    }

    /// Move to `next` if legal, returning the resulting status.
    pub fn advance(&mut self, next: SessionStatus) -> Result<SessionStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

#[cfg(test)]
mod tests {
    use super::SessionStatus::*;

    #[test]
    fn happy_path() {
        let mut s = Launching;
        s.advance(Navigating).unwrap();
        s.advance(AwaitingCredential).unwrap();
        s.advance(Connected).unwrap();
        assert!(s.is_connected());
        assert!(!s.is_terminal());
    }

    #[test]
    fn cannot_skip_phases() {
        let mut s = Launching;
        assert!(s.advance(Connected).is_err());
        assert_eq!(s, Launching);
        let mut s = Navigating;
        assert!(s.advance(Connected).is_err());
    }

    #[test]
    fn error_reachable_from_every_live_state() {
        for from in [Launching, Navigating, AwaitingCredential, Connected] {
            assert!(from.can_transition_to(Error), "{from}");
        }
        assert!(!Closed.can_transition_to(Error));
    }

    #[test]
    fn error_only_leads_to_closed() {
        for to in [Launching, Navigating, AwaitingCredential, Connected, Error] {
            assert!(!Error.can_transition_to(to), "{to}");
        }
        assert!(Error.can_transition_to(Closed));
    }

    #[test]
    fn closed_is_final() {
        let mut s = Closed;
        let err = s.advance(Closed).unwrap_err();
        assert_eq!(err.from, Closed);
        assert!(s.is_terminal());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AwaitingCredential).unwrap(),
            "\"awaiting_credential\""
        );
    }
}
