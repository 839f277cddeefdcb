//! Session state machine.

/// Lifecycle state of an `op` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No valid token yet.
    #[default]
    Unauthenticated,
    /// Probing whether an existing token is still accepted.
    Verifying,
    /// Running `op signin`.
    SigningIn,
    /// Holding a valid token.
    Authenticated,
    /// Signed out; the token is gone.
    SignedOut,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Unauthenticated -> Verifying | SigningIn
    /// - Verifying -> Authenticated | Unauthenticated (stale token)
    /// - SigningIn -> Authenticated | Unauthenticated (sign-in failed)
    /// - Authenticated -> SignedOut
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Unauthenticated, Verifying)
                | (Unauthenticated, SigningIn)
                | (Verifying, Authenticated)
                | (Verifying, Unauthenticated)
                | (SigningIn, Authenticated)
                | (SigningIn, Unauthenticated)
                | (Authenticated, SignedOut)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::OpError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::SignedOut)
    }

    /// Check if the session can run authenticated operations.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}
