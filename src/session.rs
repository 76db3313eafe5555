//! Per-caller stream bookkeeping.
//!
//! A session remembers whether a stream is in flight and owns its token, so
//! a new submission can supersede the old one. The running flag is cleared
//! only when the stream reaches a terminal state, never on the first chunk.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::assembler::AssemblerState;

/// Handle for one submission within a session.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    pub cancel: CancellationToken,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct StreamSession {
    current: Option<StreamTicket>,
    last_state: AssemblerState,
    generation: u64,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new submission. A stream still running is cancelled first.
    pub fn begin(&mut self) -> StreamTicket {
        if let Some(prev) = self.current.take() {
            info!(generation = prev.generation, "superseding running stream");
            prev.cancel.cancel();
        }
        self.generation += 1;
        let ticket = StreamTicket {
            cancel: CancellationToken::new(),
            generation: self.generation,
        };
        self.current = Some(ticket.clone());
        self.last_state = AssemblerState::Requesting;
        ticket
    }

    /// Record that submission `generation` ended in `state`.
    ///
    /// Returns `false` (and changes nothing) when `generation` has already
    /// been superseded, so a late finish cannot clear a newer stream.
    pub fn finish(&mut self, generation: u64, state: AssemblerState) -> bool {
        match &self.current {
            Some(t) if t.generation == generation => {
                self.current = None;
                self.last_state = state;
                true
            }
            _ => false,
        }
    }

    /// Cancel the running stream, if any. It stays "running" until `finish`.
    pub fn cancel(&self) -> bool {
        match &self.current {
            Some(t) if !t.cancel.is_cancelled() => {
                t.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn last_state(&self) -> AssemblerState {
        self.last_state
    }

    /// Number of submissions started so far.
    pub fn submissions(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let s = StreamSession::new();
        assert!(!s.is_running());
        assert_eq!(s.last_state(), AssemblerState::Idle);
        assert_eq!(s.submissions(), 0);
    }

    #[test]
    fn test_begin_marks_running() {
        let mut s = StreamSession::new();
        let t = s.begin();
        assert!(s.is_running());
        assert!(!t.cancel.is_cancelled());
        assert_eq!(t.generation, 1);
        assert_eq!(s.last_state(), AssemblerState::Requesting);
    }

    #[test]
    fn test_second_begin_cancels_first() {
        let mut s = StreamSession::new();
        let first = s.begin();
        let second = s.begin();
        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert_eq!(second.generation, 2);
    }

    #[test]
    fn test_stale_finish_is_ignored() {
        let mut s = StreamSession::new();
        let first = s.begin();
        let second = s.begin();
        assert!(!s.finish(first.generation, AssemblerState::Cancelled));
        assert!(s.is_running());
        assert!(s.finish(second.generation, AssemblerState::Completed));
        assert!(!s.is_running());
        assert_eq!(s.last_state(), AssemblerState::Completed);
    }

    #[test]
    fn test_begin_after_finish_does_not_cancel() {
        let mut s = StreamSession::new();
        let first = s.begin();
        s.finish(first.generation, AssemblerState::Completed);
        let _second = s.begin();
        assert!(!first.cancel.is_cancelled());
    }

    #[test]
    fn test_cancel_keeps_running_until_finish() {
        let mut s = StreamSession::new();
        let t = s.begin();
        assert!(s.cancel());
        assert!(t.cancel.is_cancelled());
        assert!(s.is_running());
        assert!(!s.cancel());
        s.finish(t.generation, AssemblerState::Cancelled);
        assert!(!s.is_running());
    }
}
