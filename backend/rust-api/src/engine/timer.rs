use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A running repeating timer. Cancellation must stop further ticks.
pub trait TimerHandle: Send {
    fn cancel(&mut self);
}

/// Starts repeating timers whose ticks are tagged with `token`.
pub trait TimerScheduler: Send {
    fn schedule(&mut self, token: u64) -> Box<dyn TimerHandle>;
}

/// The single timer an engine may have running.
///
/// Every `start` cancels the previous handle first, and each started timer gets
/// a fresh token so that ticks queued by an older timer can be recognised and
/// dropped by whoever delivers them.
pub struct TimerSlot {
    scheduler: Box<dyn TimerScheduler>,
    handle: Option<Box<dyn TimerHandle>>,
    last_token: u64,
    active: Option<u64>,
}

impl TimerSlot {
    pub fn new(scheduler: Box<dyn TimerScheduler>) -> Self {
        Self {
            scheduler,
            handle: None,
            last_token: 0,
            active: None,
        }
    }

    pub fn start(&mut self) -> u64 {
        self.stop();
        self.last_token += 1;
        let token = self.last_token;
        self.handle = Some(self.scheduler.schedule(token));
        self.active = Some(token);
        token
    }

    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
        self.active = None;
    }

    pub fn active_token(&self) -> Option<u64> {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Default)]
struct TimerCounters {
    scheduled: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Scheduler that never fires on its own; callers drive `tick()` by hand.
/// Keeps counts so tests can check that no timer outlives its state.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    counters: Arc<TimerCounters>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> usize {
        self.counters.scheduled.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.counters.cancelled.load(Ordering::SeqCst)
    }

    /// Timers started and not yet cancelled.
    pub fn running(&self) -> usize {
        self.scheduled() - self.cancelled()
    }
}

struct ManualHandle {
    counters: Arc<TimerCounters>,
    cancelled: bool,
}

impl TimerHandle for ManualHandle {
    fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.counters.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&mut self, _token: u64) -> Box<dyn TimerHandle> {
        self.counters.scheduled.fetch_add(1, Ordering::SeqCst);
        Box::new(ManualHandle {
            counters: self.counters.clone(),
            cancelled: false,
        })
    }
}

/// Real-time scheduler: a tokio interval task that posts its token into a
/// channel once per period. Must be used from within a tokio runtime.
pub struct TokioScheduler {
    period: Duration,
    ticks: mpsc::UnboundedSender<u64>,
}

impl TokioScheduler {
    pub fn new(period: Duration, ticks: mpsc::UnboundedSender<u64>) -> Self {
        Self { period, ticks }
    }
}

struct TokioTimerHandle {
    task: Option<AbortHandle>,
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&mut self, token: u64) -> Box<dyn TimerHandle> {
        let period = self.period;
        let ticks = self.ticks.clone();

        let task = tokio::spawn(async move {
            // First tick one full period after start, not immediately.
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(token).is_err() {
                    break;
                }
            }
        });

        Box::new(TokioTimerHandle {
            task: Some(task.abort_handle()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restarting_cancels_previous_timer() {
        let scheduler = ManualScheduler::new();
        let mut slot = TimerSlot::new(Box::new(scheduler.clone()));

        let first = slot.start();
        let second = slot.start();

        assert_ne!(first, second);
        assert_eq!(slot.active_token(), Some(second));
        assert_eq!(scheduler.scheduled(), 2);
        assert_eq!(scheduler.running(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let scheduler = ManualScheduler::new();
        let mut slot = TimerSlot::new(Box::new(scheduler.clone()));

        slot.start();
        slot.stop();
        slot.stop();

        assert!(!slot.is_running());
        assert_eq!(scheduler.cancelled(), 1);
    }

    #[test]
    fn dropping_slot_cancels_timer() {
        let scheduler = ManualScheduler::new();
        {
            let mut slot = TimerSlot::new(Box::new(scheduler.clone()));
            slot.start();
        }
        assert_eq!(scheduler.running(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_tags_ticks_and_stops_on_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(Duration::from_secs(1), tx);

        let mut handle = scheduler.schedule(7);
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(rx.recv().await, Some(7));

        handle.cancel();
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
