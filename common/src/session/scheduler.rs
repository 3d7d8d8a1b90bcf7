use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::identifiers::TimerToken;
use crate::log;

use super::events::Effect;

/// Runs coordinator timers on the tokio runtime. Fired tokens come back
/// through the receiver returned by [`TimerScheduler::new`]; the owner feeds
/// them to the coordinator as `SessionEvent::TimerFired`.
pub struct TimerScheduler {
    fired_tx: mpsc::UnboundedSender<TimerToken>,
    tasks: HashMap<TimerToken, JoinHandle<()>>,
}

impl TimerScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                fired_tx,
                tasks: HashMap::new(),
            },
            fired_rx,
        )
    }

    pub fn schedule(&mut self, token: TimerToken, delay: Duration) {
        let fired_tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired_tx.send(token);
        });

        if let Some(previous) = self.tasks.insert(token, handle) {
            previous.abort();
        }
    }

    pub fn cancel(&mut self, token: TimerToken) {
        if let Some(handle) = self.tasks.remove(&token) {
            handle.abort();
        }
    }

    /// Forget a token that has been delivered.
    pub fn fired(&mut self, token: TimerToken) {
        self.tasks.remove(&token);
    }

    pub fn apply(&mut self, effect: &Effect) -> bool {
        match effect {
            Effect::ScheduleTimer { token, kind, delay } => {
                log!("Scheduling {:?} {} in {:?}", kind, token, delay);
                self.schedule(*token, *delay);
                true
            }
            Effect::CancelTimer(token) => {
                self.cancel(*token);
                true
            }
            _ => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TimerKind;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (mut scheduler, mut fired) = TimerScheduler::new();
        scheduler.schedule(TimerToken::new(1), Duration::from_millis(380));

        tokio::time::sleep(Duration::from_millis(379)).await;
        assert!(fired.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.recv().await, Some(TimerToken::new(1)));
        scheduler.fired(TimerToken::new(1));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (mut scheduler, mut fired) = TimerScheduler::new();
        scheduler.apply(&Effect::ScheduleTimer {
            token: TimerToken::new(1),
            kind: TimerKind::AiMove,
            delay: Duration::from_millis(450),
        });
        scheduler.apply(&Effect::ScheduleTimer {
            token: TimerToken::new(2),
            kind: TimerKind::AutoRestart,
            delay: Duration::from_millis(2200),
        });
        assert!(scheduler.apply(&Effect::CancelTimer(TimerToken::new(1))));

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(fired.recv().await, Some(TimerToken::new(2)));
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_timers() {
        let (mut scheduler, mut fired) = TimerScheduler::new();
        scheduler.schedule(TimerToken::new(1), Duration::from_millis(100));
        drop(scheduler);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.recv().await, None);
    }
}
