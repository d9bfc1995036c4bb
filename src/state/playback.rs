//! Per-display playback session state.
//!
//! A session tracks whether the venue's display is driving the external
//! player (`Active`) or waiting for an approved entry (`Idle`). The queue
//! rows remain the source of truth; the session only mirrors them so the
//! backend knows which commands to push over the change feed.

use uuid::Uuid;

/// Phase of a display session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No entry is playing; the display shows the idle screen.
    Idle,
    /// The display is playing the given queue entry.
    Active {
        /// Queue entry currently loaded in the external player.
        entry_id: Uuid,
    },
}

/// Playback session bound to one venue's display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSession {
    phase: PlaybackPhase,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
        }
    }
}

impl PlaybackSession {
    /// New session starting idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Whether the session is driving the player.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Active { .. })
    }

    /// Enter the active phase for an entry. Re-entering with a new entry is
    /// legal: advancing replaces the current entry in one step.
    pub fn begin(&mut self, entry_id: Uuid) {
        self.phase = PlaybackPhase::Active { entry_id };
    }

    /// Leave the active phase, returning the entry that was playing.
    pub fn finish(&mut self) -> Option<Uuid> {
        match self.phase {
            PlaybackPhase::Active { entry_id } => {
                self.phase = PlaybackPhase::Idle;
                Some(entry_id)
            }
            PlaybackPhase::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_idle() {
        let session = PlaybackSession::new();
        assert_eq!(session.phase(), PlaybackPhase::Idle);
        assert!(!session.is_active());
    }

    #[test]
    fn begin_then_finish_round_trips_the_entry() {
        let mut session = PlaybackSession::new();
        let entry = Uuid::new_v4();

        session.begin(entry);
        assert!(session.is_active());

        assert_eq!(session.finish(), Some(entry));
        assert_eq!(session.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn finishing_an_idle_session_is_a_no_op() {
        let mut session = PlaybackSession::new();
        assert_eq!(session.finish(), None);
        assert_eq!(session.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn begin_replaces_the_current_entry() {
        let mut session = PlaybackSession::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        session.begin(first);
        session.begin(second);

        assert_eq!(session.finish(), Some(second));
    }
}
