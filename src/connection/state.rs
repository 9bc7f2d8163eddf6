//! Producer lifecycle state machine

use crate::{Error, Result};

/// Producer lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProducerState {
    /// No configuration accepted yet
    #[default]
    Uninitialized,

    /// Configuration stored, no cached connection
    Initialized,

    /// Configuration stored and a verified connection is cached
    Connected,
}

impl ProducerState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ProducerState) -> bool {
        use ProducerState::*;

        matches!(
            (self, next),
            (Uninitialized, Initialized)
                | (Initialized, Initialized)
                | (Initialized, Connected)
                | (Connected, Initialized)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ProducerState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for ProducerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initialized => write!(f, "initialized"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = ProducerState::Uninitialized;
        assert!(state.transition(ProducerState::Initialized).is_ok());
        assert!(state.transition(ProducerState::Connected).is_ok());
        assert!(state.transition(ProducerState::Initialized).is_ok());
    }

    #[test]
    fn test_cannot_connect_before_initialize() {
        let mut state = ProducerState::Uninitialized;
        assert!(state.transition(ProducerState::Connected).is_err());
        assert_eq!(state, ProducerState::Uninitialized);
    }

    #[test]
    fn test_reinitialize() {
        let mut state = ProducerState::Initialized;
        assert!(state.transition(ProducerState::Initialized).is_ok());
    }

    #[test]
    fn test_no_way_back_to_uninitialized() {
        let mut state = ProducerState::Connected;
        assert!(state.transition(ProducerState::Uninitialized).is_err());
        assert!(state.transition(ProducerState::Connected).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ProducerState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ProducerState::Connected.to_string(), "connected");
    }
}
