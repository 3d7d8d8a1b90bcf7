use std::collections::HashMap;
use std::time::Duration;

use crate::identifiers::TimerToken;

use super::events::Effect;
use super::types::TimerKind;

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    deadline: Duration,
    kind: TimerKind,
    /// Insertion order, breaks ties between equal deadlines.
    sequence: u64,
}

/// Deterministic stand-in for wall-clock timers. Time only moves when the
/// owner asks it to.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    pending: HashMap<TimerToken, PendingTimer>,
    sequence: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, token: TimerToken, kind: TimerKind, delay: Duration) {
        self.sequence += 1;
        self.pending.insert(
            token,
            PendingTimer {
                deadline: self.now + delay,
                kind,
                sequence: self.sequence,
            },
        );
    }

    pub fn cancel(&mut self, token: TimerToken) -> bool {
        self.pending.remove(&token).is_some()
    }

    /// Executes timer effects; returns false for every other effect.
    pub fn apply(&mut self, effect: &Effect) -> bool {
        match effect {
            Effect::ScheduleTimer { token, kind, delay } => {
                self.schedule(*token, *kind, *delay);
                true
            }
            Effect::CancelTimer(token) => {
                self.cancel(*token);
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().map(|timer| timer.deadline).min()
    }

    pub fn kind_of(&self, token: TimerToken) -> Option<TimerKind> {
        self.pending.get(&token).map(|timer| timer.kind)
    }

    /// Removes the earliest timer due at or before `deadline` and moves the
    /// clock to its deadline. The clock never goes backwards.
    pub fn pop_next_until(&mut self, deadline: Duration) -> Option<TimerToken> {
        let (token, timer) = self
            .pending
            .iter()
            .filter(|(_, timer)| timer.deadline <= deadline)
            .min_by_key(|(_, timer)| (timer.deadline, timer.sequence))
            .map(|(token, timer)| (*token, *timer))?;

        self.pending.remove(&token);
        self.now = self.now.max(timer.deadline);
        Some(token)
    }

    pub fn advance_to(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut clock = VirtualClock::new();
        clock.schedule(TimerToken::new(1), TimerKind::AutoRestart, ms(2200));
        clock.schedule(TimerToken::new(2), TimerKind::AiMove, ms(380));
        clock.schedule(TimerToken::new(3), TimerKind::AiMove, ms(380));

        assert_eq!(clock.next_deadline(), Some(ms(380)));
        assert_eq!(clock.pop_next_until(ms(5000)), Some(TimerToken::new(2)));
        assert_eq!(clock.pop_next_until(ms(5000)), Some(TimerToken::new(3)));
        assert_eq!(clock.now(), ms(380));
        assert_eq!(clock.pop_next_until(ms(1000)), None);
        assert_eq!(clock.pop_next_until(ms(5000)), Some(TimerToken::new(1)));
        assert_eq!(clock.now(), ms(2200));
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn test_apply_handles_only_timer_effects() {
        let mut clock = VirtualClock::new();
        let token = TimerToken::new(7);
        assert!(clock.apply(&Effect::ScheduleTimer {
            token,
            kind: TimerKind::AiMove,
            delay: ms(450),
        }));
        assert_eq!(clock.kind_of(token), Some(TimerKind::AiMove));

        assert!(!clock.apply(&Effect::Connect));
        assert!(clock.apply(&Effect::CancelTimer(token)));
        assert_eq!(clock.pending_count(), 0);
        assert_eq!(clock.pop_next_until(ms(10_000)), None);
    }

    #[test]
    fn test_delays_are_relative_to_current_time() {
        let mut clock = VirtualClock::new();
        clock.advance_to(ms(1000));
        clock.schedule(TimerToken::new(1), TimerKind::AiMove, ms(450));
        assert_eq!(clock.next_deadline(), Some(ms(1450)));

        clock.advance_to(ms(500));
        assert_eq!(clock.now(), ms(1000));
    }
}
