//! One-shot timers with explicit, idempotently cancellable handles.
//!
//! Nothing here sleeps: the owner asks for the next deadline, waits for it
//! however it likes, then drains whatever is due.

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Reveal the cached hint candidate.
    HintReveal,
    /// Minimum AI thinking time elapsed; apply its move.
    AiMoveReady,
    /// Resubmit the AI's search after the session was busy.
    RetryTurn,
    /// Resubmit the background evaluation after the session was busy.
    RetryBackground,
}

#[derive(Debug)]
struct Armed {
    id: TimerId,
    deadline: Instant,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct Timers {
    next_id: u64,
    armed: Vec<Armed>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, deadline: Instant, kind: TimerKind) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.armed.push(Armed { id, deadline, kind });
        id
    }

    /// Cancel a timer. Returns whether it was still armed; cancelling twice is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.armed.len();
        self.armed.retain(|t| t.id != id);
        self.armed.len() != before
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.iter().any(|t| t.id == id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.armed.iter().map(|t| t.deadline).min()
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerId, TimerKind)> {
        let mut due: Vec<Armed> = Vec::new();
        let mut i = 0;
        while i < self.armed.len() {
            if self.armed[i].deadline <= now {
                due.push(self.armed.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|t| (t.deadline, t.id));
        due.into_iter().map(|t| (t.id, t.kind)).collect()
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let late = timers.arm(t0 + Duration::from_millis(300), TimerKind::HintReveal);
        let early = timers.arm(t0 + Duration::from_millis(100), TimerKind::RetryTurn);
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(100)));

        assert!(timers.take_due(t0).is_empty());
        let due = timers.take_due(t0 + Duration::from_millis(500));
        assert_eq!(due, vec![(early, TimerKind::RetryTurn), (late, TimerKind::HintReveal)]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let id = timers.arm(t0, TimerKind::AiMoveReady);
        assert!(timers.is_armed(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.is_armed(id));
        assert!(timers.take_due(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let a = timers.arm(t0, TimerKind::HintReveal);
        timers.cancel(a);
        let b = timers.arm(t0, TimerKind::HintReveal);
        assert_ne!(a, b);
        assert_eq!(timers.len(), 1);
    }
}
