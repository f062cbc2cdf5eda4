//! Retransmission counters for unreliable deltas.

/// Counts how many more ticks a changed value is sent.
///
/// Unreliable deltas are never acknowledged. Instead every change is sent on
/// `attempts` consecutive ticks, so a single lost packet does not lose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedundancyCounter {
    attempts: u32,
    pending: u32,
}

impl RedundancyCounter {
    #[must_use]
    pub const fn new(attempts: u32) -> Self {
        Self {
            attempts,
            pending: 0,
        }
    }

    /// Number of sends per change.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sends still owed for the latest change.
    #[must_use]
    pub const fn pending(&self) -> u32 {
        self.pending
    }

    /// Starts retransmitting from scratch after a change.
    pub fn reset(&mut self) {
        self.pending = self.attempts;
    }

    /// Consumes one send. Returns `false` when nothing is owed.
    pub fn consume(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_counter_sends_nothing() {
        let mut counter = RedundancyCounter::new(3);
        assert!(!counter.consume());
        assert_eq!(counter.pending(), 0);
    }

    #[test]
    fn change_is_sent_attempts_times() {
        let mut counter = RedundancyCounter::new(3);
        counter.reset();
        assert_eq!((0..5).filter(|_| counter.consume()).count(), 3);
    }

    #[test]
    fn reset_restarts_countdown() {
        let mut counter = RedundancyCounter::new(2);
        counter.reset();
        assert!(counter.consume());
        counter.reset();
        assert_eq!(counter.pending(), 2);
    }
}
