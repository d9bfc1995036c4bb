//! Typed lifecycle rules for queue entries.
//!
//! The persisted `state` field is a plain enum; this module owns the
//! transition table so "an entry cannot skip `pending`" is checked in one
//! place instead of being a convention spread across call sites.

use thiserror::Error;

use crate::dao::models::QueueState;

/// Events that can be applied to a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// Moderator approves a pending request.
    Approve,
    /// Moderator rejects or removes the entry; legal from every state.
    Remove,
    /// The selection rule picked this entry as "what plays next".
    StartPlaying,
    /// Playback finished (naturally or via skip).
    Complete,
}

/// Outcome of a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTransition {
    /// The entry moves to a new state.
    To(QueueState),
    /// The entry's row is deleted. Completed and rejected entries are not
    /// archived; their history lives in the transaction ledger.
    Removed,
}

/// Error returned when an event cannot be applied to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid queue transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidQueueTransition {
    /// State the entry was in.
    pub from: QueueState,
    /// Event that cannot be applied from this state.
    pub event: QueueEvent,
}

/// Compute the transition for an event, or reject it.
pub fn next_transition(
    from: QueueState,
    event: QueueEvent,
) -> Result<QueueTransition, InvalidQueueTransition> {
    let next = match (from, event) {
        (QueueState::Pending, QueueEvent::Approve) => QueueTransition::To(QueueState::Approved),
        (QueueState::Approved, QueueEvent::StartPlaying) => {
            QueueTransition::To(QueueState::Playing)
        }
        (QueueState::Playing, QueueEvent::Complete) => QueueTransition::Removed,
        (_, QueueEvent::Remove) => QueueTransition::Removed,
        (from, event) => return Err(InvalidQueueTransition { from, event }),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_approved() {
        assert_eq!(
            next_transition(QueueState::Pending, QueueEvent::Approve),
            Ok(QueueTransition::To(QueueState::Approved))
        );
    }

    #[test]
    fn approve_is_only_legal_from_pending() {
        for from in [QueueState::Approved, QueueState::Playing] {
            let err = next_transition(from, QueueEvent::Approve).unwrap_err();
            assert_eq!(err.from, from);
            assert_eq!(err.event, QueueEvent::Approve);
        }
    }

    #[test]
    fn only_approved_entries_can_start_playing() {
        assert_eq!(
            next_transition(QueueState::Approved, QueueEvent::StartPlaying),
            Ok(QueueTransition::To(QueueState::Playing))
        );
        assert!(next_transition(QueueState::Pending, QueueEvent::StartPlaying).is_err());
        assert!(next_transition(QueueState::Playing, QueueEvent::StartPlaying).is_err());
    }

    #[test]
    fn completion_removes_the_playing_entry() {
        assert_eq!(
            next_transition(QueueState::Playing, QueueEvent::Complete),
            Ok(QueueTransition::Removed)
        );
        assert!(next_transition(QueueState::Pending, QueueEvent::Complete).is_err());
        assert!(next_transition(QueueState::Approved, QueueEvent::Complete).is_err());
    }

    #[test]
    fn removal_is_legal_from_every_state() {
        for from in [QueueState::Pending, QueueState::Approved, QueueState::Playing] {
            assert_eq!(
                next_transition(from, QueueEvent::Remove),
                Ok(QueueTransition::Removed)
            );
        }
    }
}
