//! Delayed reveal of a precomputed hint move.
//!
//! The timer and the candidate arrive independently: whichever lands second
//! triggers the reveal. Eligibility (human's turn, AI idle, game running) is
//! passed in by the caller at every step and checked again at reveal time.

use std::time::{Duration, Instant};

use chess_core::MoveToken;

use crate::timers::{TimerId, TimerKind, Timers};

/// What the display should do after a scheduler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintChange {
    Unchanged,
    Cleared,
    Revealed(MoveToken),
}

#[derive(Debug)]
pub struct HintScheduler {
    enabled: bool,
    delay: Duration,
    timer: Option<TimerId>,
    candidate: Option<MoveToken>,
    triggered: bool,
    shown: Option<MoveToken>,
}

impl HintScheduler {
    pub fn new(enabled: bool, delay: Duration) -> Self {
        Self {
            enabled,
            delay,
            timer: None,
            candidate: None,
            triggered: false,
            shown: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn shown(&self) -> Option<MoveToken> {
        self.shown
    }

    pub fn candidate(&self) -> Option<MoveToken> {
        self.candidate
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Cancel any pending reveal and hide the current hint.
    pub fn clear(&mut self, timers: &mut Timers) -> HintChange {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
        self.triggered = false;
        match self.shown.take() {
            Some(_) => HintChange::Cleared,
            None => HintChange::Unchanged,
        }
    }

    /// Clear, then arm a fresh reveal timer when hints are on and `eligible`.
    pub fn rearm(&mut self, timers: &mut Timers, now: Instant, eligible: bool) -> HintChange {
        let change = self.clear(timers);
        if self.enabled && eligible {
            self.timer = Some(timers.arm(now + self.delay, TimerKind::HintReveal));
        }
        change
    }

    /// Forget the candidate; it belonged to a position that no longer exists.
    pub fn invalidate_candidate(&mut self) {
        self.candidate = None;
    }

    /// A background search finished for the current position.
    pub fn offer_candidate(&mut self, candidate: Option<MoveToken>, eligible: bool) -> HintChange {
        self.candidate = candidate;
        if self.triggered {
            self.reveal(eligible)
        } else {
            HintChange::Unchanged
        }
    }

    /// The reveal timer fired. Stale ids (already cancelled or replaced) are ignored.
    pub fn on_timer(&mut self, id: TimerId, eligible: bool) -> HintChange {
        if self.timer != Some(id) {
            return HintChange::Unchanged;
        }
        self.timer = None;
        self.triggered = true;
        self.reveal(eligible)
    }

    fn reveal(&mut self, eligible: bool) -> HintChange {
        if !self.enabled || !eligible {
            return HintChange::Unchanged;
        }
        match self.candidate {
            Some(mv) if self.shown != Some(mv) => {
                self.shown = Some(mv);
                HintChange::Revealed(mv)
            }
            _ => HintChange::Unchanged,
        }
    }

    pub fn set_enabled(
        &mut self,
        enabled: bool,
        timers: &mut Timers,
        now: Instant,
        eligible: bool,
    ) -> HintChange {
        self.enabled = enabled;
        if enabled {
            self.rearm(timers, now, eligible)
        } else {
            self.clear(timers)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(3);

    fn fire(hints: &mut HintScheduler, timers: &mut Timers, at: Instant, eligible: bool) -> HintChange {
        let mut change = HintChange::Unchanged;
        for (id, kind) in timers.take_due(at) {
            assert_eq!(kind, TimerKind::HintReveal);
            change = hints.on_timer(id, eligible);
        }
        change
    }

    #[test]
    fn test_reveal_when_candidate_cached_first() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(true, DELAY);
        let mv: MoveToken = "e2e4".parse().unwrap();

        hints.rearm(&mut timers, t0, true);
        assert_eq!(hints.offer_candidate(Some(mv), true), HintChange::Unchanged);
        assert_eq!(fire(&mut hints, &mut timers, t0 + DELAY, true), HintChange::Revealed(mv));
        assert_eq!(hints.shown(), Some(mv));
    }

    #[test]
    fn test_reveal_when_candidate_arrives_late() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(true, DELAY);
        let mv: MoveToken = "d2d4".parse().unwrap();

        hints.rearm(&mut timers, t0, true);
        assert_eq!(fire(&mut hints, &mut timers, t0 + DELAY, true), HintChange::Unchanged);
        assert_eq!(hints.offer_candidate(Some(mv), true), HintChange::Revealed(mv));
    }

    #[test]
    fn test_disabled_never_arms() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(false, DELAY);
        hints.rearm(&mut timers, t0, true);
        assert!(timers.is_empty());
        assert_eq!(hints.offer_candidate(Some("e2e4".parse().unwrap()), true), HintChange::Unchanged);
    }

    #[test]
    fn test_ineligible_at_reveal_time() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(true, DELAY);
        hints.rearm(&mut timers, t0, true);
        hints.offer_candidate(Some("e2e4".parse().unwrap()), true);
        // The state changed after arming; the guard is re-checked on fire.
        assert_eq!(fire(&mut hints, &mut timers, t0 + DELAY, false), HintChange::Unchanged);
        assert_eq!(hints.shown(), None);
    }

    #[test]
    fn test_rearm_clears_shown_hint() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(true, DELAY);
        hints.rearm(&mut timers, t0, true);
        hints.offer_candidate(Some("e2e4".parse().unwrap()), true);
        fire(&mut hints, &mut timers, t0 + DELAY, true);

        let later = t0 + DELAY + Duration::from_secs(1);
        assert_eq!(hints.rearm(&mut timers, later, true), HintChange::Cleared);
        assert!(hints.is_armed());
        assert_eq!(timers.next_deadline(), Some(later + DELAY));
    }

    #[test]
    fn test_stale_timer_id_ignored() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(true, DELAY);
        hints.rearm(&mut timers, t0, true);
        let stale = timers.take_due(t0 + DELAY)[0].0;
        hints.rearm(&mut timers, t0 + DELAY, true);
        hints.offer_candidate(Some("e2e4".parse().unwrap()), true);
        assert_eq!(hints.on_timer(stale, true), HintChange::Unchanged);
        assert!(hints.is_armed());
    }

    #[test]
    fn test_toggle_off_clears() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        let mut hints = HintScheduler::new(true, DELAY);
        hints.rearm(&mut timers, t0, true);
        assert_eq!(hints.set_enabled(false, &mut timers, t0, true), HintChange::Unchanged);
        assert!(timers.is_empty());
        hints.set_enabled(true, &mut timers, t0, true);
        assert_eq!(timers.len(), 1);
    }
}
