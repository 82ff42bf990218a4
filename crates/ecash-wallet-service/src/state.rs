//! Operation state machine
//!
//! ```text
//! Idle -> CountersReserved -> CountersPersisted -> MintCallInFlight -> Applied
//!   \___________\___________________\___________________\_______-> Failed
//! ```
//!
//! Only `CountersPersisted -> MintCallInFlight` crosses into the network.

use crate::{Error, Result};
use std::fmt;

/// Phase of a receive or send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Nothing reserved yet
    Idle,
    /// Range carved from the in-memory snapshot
    CountersReserved,
    /// Range durably written
    CountersPersisted,
    /// Mint call issued with outputs from the range
    MintCallInFlight,
    /// Proof set updated
    Applied,
    /// Operation abandoned
    Failed,
}

impl OperationState {
    /// True for `Applied` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Applied | OperationState::Failed)
    }

    fn successor(self) -> Option<OperationState> {
        match self {
            OperationState::Idle => Some(OperationState::CountersReserved),
            OperationState::CountersReserved => Some(OperationState::CountersPersisted),
            OperationState::CountersPersisted => Some(OperationState::MintCallInFlight),
            OperationState::MintCallInFlight => Some(OperationState::Applied),
            OperationState::Applied | OperationState::Failed => None,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationState::Idle => write!(f, "Idle"),
            OperationState::CountersReserved => write!(f, "CountersReserved"),
            OperationState::CountersPersisted => write!(f, "CountersPersisted"),
            OperationState::MintCallInFlight => write!(f, "MintCallInFlight"),
            OperationState::Applied => write!(f, "Applied"),
            OperationState::Failed => write!(f, "Failed"),
        }
    }
}

/// Operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Redeem an incoming token
    Receive,
    /// Split proofs into an outgoing token and change
    Send,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Receive => write!(f, "receive"),
            OperationKind::Send => write!(f, "send"),
        }
    }
}

/// Checked record of the states one operation passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTrace {
    kind: OperationKind,
    history: Vec<OperationState>,
}

impl OperationTrace {
    /// Start a trace in `Idle`
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            history: vec![OperationState::Idle],
        }
    }

    /// Operation kind
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Current state
    pub fn current(&self) -> OperationState {
        // history starts with Idle and is never drained
        self.history
            .last()
            .copied()
            .unwrap_or(OperationState::Idle)
    }

    /// Every state entered, in order
    pub fn history(&self) -> &[OperationState] {
        &self.history
    }

    /// True once the counters for this operation were durably written
    pub fn counters_persisted(&self) -> bool {
        self.history.contains(&OperationState::CountersPersisted)
    }

    /// Move to `next`, rejecting anything but the single forward step
    pub fn advance(&mut self, next: OperationState) -> Result<()> {
        let current = self.current();
        if next == OperationState::Failed || current.successor() != Some(next) {
            return Err(Error::Internal(format!(
                "illegal {} transition {} -> {}",
                self.kind, current, next
            )));
        }

        tracing::debug!("{} operation: {} -> {}", self.kind, current, next);
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` from any non-terminal state
    pub fn fail(&mut self) -> Result<()> {
        let current = self.current();
        if current.is_terminal() {
            return Err(Error::Internal(format!(
                "illegal {} transition {} -> {}",
                self.kind,
                current,
                OperationState::Failed
            )));
        }

        tracing::debug!("{} operation: {} -> {}", self.kind, current, OperationState::Failed);
        self.history.push(OperationState::Failed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut trace = OperationTrace::new(OperationKind::Receive);
        trace.advance(OperationState::CountersReserved).unwrap();
        trace.advance(OperationState::CountersPersisted).unwrap();
        trace.advance(OperationState::MintCallInFlight).unwrap();
        trace.advance(OperationState::Applied).unwrap();

        assert_eq!(trace.current(), OperationState::Applied);
        assert_eq!(trace.history().len(), 5);
        assert!(trace.counters_persisted());
    }

    #[test]
    fn test_skipping_persist_rejected() {
        let mut trace = OperationTrace::new(OperationKind::Send);
        trace.advance(OperationState::CountersReserved).unwrap();

        let err = trace.advance(OperationState::MintCallInFlight).unwrap_err();
        assert!(matches!(err, Error::Internal(msg) if msg.contains("CountersReserved -> MintCallInFlight")));
        assert_eq!(trace.current(), OperationState::CountersReserved);
    }

    #[test]
    fn test_fail_from_any_non_terminal() {
        for steps in 0..4 {
            let mut trace = OperationTrace::new(OperationKind::Receive);
            let mut state = OperationState::Idle;
            for _ in 0..steps {
                state = state.successor().unwrap();
                trace.advance(state).unwrap();
            }
            trace.fail().unwrap();
            assert_eq!(trace.current(), OperationState::Failed);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut trace = OperationTrace::new(OperationKind::Receive);
        trace.fail().unwrap();
        assert!(trace.fail().is_err());
        assert!(trace.advance(OperationState::CountersReserved).is_err());
        assert!(!trace.counters_persisted());
    }

    #[test]
    fn test_advance_to_failed_rejected() {
        let mut trace = OperationTrace::new(OperationKind::Send);
        assert!(trace.advance(OperationState::Failed).is_err());
    }
}
