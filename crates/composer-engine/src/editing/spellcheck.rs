//! Debounced spell checking.
//!
//! Scrolling reveals text the checker has not seen yet. Rather than
//! re-checking on every scroll step, the session schedules one pass a
//! fixed delay after the last scroll.

use std::time::{Duration, Instant};

/// Quiet time after the last scroll before a spell check runs.
pub const SPELL_CHECK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct SpellCheckDebouncer {
    due: Option<Instant>,
}

impl SpellCheckDebouncer {
    /// Schedule a pass [`SPELL_CHECK_DELAY`] after `now`, replacing any
    /// pass already scheduled.
    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + SPELL_CHECK_DELAY);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// True once the scheduled pass is due. The pass is consumed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                log::debug!("spell check due");
                true
            }
            _ => false,
        }
    }
}
