//! Booth timers
//!
//! Three independent timers feed ticks into the booth event queue:
//! - `Elapsed`: counts recording seconds
//! - `Warning`: counts down before a forced reset
//! - `Grace`: one-shot wait after stop so the recorder can close its file
//!
//! Every tick carries the generation the timer was armed with. Each arming
//! gets a new generation and stopping clears it, so ticks already in the
//! queue from an earlier arming can be recognised and dropped.

use crate::booth::events::BoothEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Which timer produced a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Elapsed,
    Warning,
    Grace,
}

/// One timer expiration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub kind: TimerKind,
    pub generation: u64,
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl ArmedTimer {
    fn disarm(self) {
        self.handle.abort();
    }
}

/// Owns the booth timers; must be used inside a Tokio runtime
pub struct TimerService {
    tx: UnboundedSender<BoothEvent>,
    elapsed: Option<ArmedTimer>,
    warning: Option<ArmedTimer>,
    grace: Option<ArmedTimer>,
    next_generation: u64,
}

impl TimerService {
    pub fn new(tx: UnboundedSender<BoothEvent>) -> Self {
        Self {
            tx,
            elapsed: None,
            warning: None,
            grace: None,
            next_generation: 1,
        }
    }

    /// Start a periodic timer; a running timer of the same kind is restarted
    pub fn start(&mut self, kind: TimerKind, period: Duration) {
        let generation = self.bump();
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(BoothEvent::Tick(Tick { kind, generation })).is_err() {
                    break;
                }
            }
        });

        self.arm(kind, ArmedTimer { generation, handle });
        tracing::trace!("Timer {:?} started (generation {})", kind, generation);
    }

    /// Fire a timer exactly once after `delay`
    pub fn start_once(&mut self, kind: TimerKind, delay: Duration) {
        let generation = self.bump();
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(BoothEvent::Tick(Tick { kind, generation }));
        });

        self.arm(kind, ArmedTimer { generation, handle });
        tracing::trace!("Timer {:?} armed once (generation {})", kind, generation);
    }

    /// Stop a timer; stopping a stopped timer does nothing
    pub fn stop(&mut self, kind: TimerKind) {
        if let Some(timer) = self.slot(kind).take() {
            timer.disarm();
            tracing::trace!("Timer {:?} stopped", kind);
        }
    }

    pub fn stop_all(&mut self) {
        self.stop(TimerKind::Elapsed);
        self.stop(TimerKind::Warning);
        self.stop(TimerKind::Grace);
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.slot_ref(kind).is_some()
    }

    /// Whether a tick belongs to the current arming of its timer
    pub fn is_current(&self, tick: &Tick) -> bool {
        self.slot_ref(tick.kind)
            .map(|timer| timer.generation == tick.generation)
            .unwrap_or(false)
    }

    /// One-shot timers disarm themselves once their tick is accepted
    pub fn complete_once(&mut self, tick: &Tick) {
        if self.is_current(tick) {
            self.slot(tick.kind).take();
        }
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn arm(&mut self, kind: TimerKind, timer: ArmedTimer) {
        if let Some(previous) = self.slot(kind).replace(timer) {
            previous.disarm();
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<ArmedTimer> {
        match kind {
            TimerKind::Elapsed => &mut self.elapsed,
            TimerKind::Warning => &mut self.warning,
            TimerKind::Grace => &mut self.grace,
        }
    }

    fn slot_ref(&self, kind: TimerKind) -> Option<&ArmedTimer> {
        match kind {
            TimerKind::Elapsed => self.elapsed.as_ref(),
            TimerKind::Warning => self.warning.as_ref(),
            TimerKind::Grace => self.grace.as_ref(),
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn expect_tick(event: Option<BoothEvent>) -> Tick {
        match event {
            Some(BoothEvent::Tick(tick)) => tick,
            other => panic!("expected tick, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_timer_ticks_every_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerService::new(tx);

        let started = Instant::now();
        timers.start(TimerKind::Elapsed, Duration::from_secs(1));

        for n in 1..=3 {
            let tick = expect_tick(rx.recv().await);
            assert_eq!(tick.kind, TimerKind::Elapsed);
            assert!(timers.is_current(&tick));
            assert_eq!(Instant::now() - started, Duration::from_secs(n));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerService::new(tx);

        timers.start(TimerKind::Warning, Duration::from_secs(1));
        let tick = expect_tick(rx.recv().await);

        timers.stop(TimerKind::Warning);
        assert!(!timers.is_running(TimerKind::Warning));
        assert!(!timers.is_current(&tick));

        time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());

        // Stopping again is a no-op
        timers.stop(TimerKind::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_old_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerService::new(tx);

        timers.start(TimerKind::Elapsed, Duration::from_secs(1));
        let first = expect_tick(rx.recv().await);

        timers.start(TimerKind::Elapsed, Duration::from_secs(1));
        assert!(!timers.is_current(&first));

        let second = expect_tick(rx.recv().await);
        assert!(timers.is_current(&second));
        assert_ne!(first.generation, second.generation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerService::new(tx);

        let started = Instant::now();
        timers.start_once(TimerKind::Grace, Duration::from_millis(500));
        let tick = expect_tick(rx.recv().await);
        assert_eq!(tick.kind, TimerKind::Grace);
        assert_eq!(Instant::now() - started, Duration::from_millis(500));

        timers.complete_once(&tick);
        assert!(!timers.is_running(TimerKind::Grace));

        time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_are_independent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerService::new(tx);

        timers.start(TimerKind::Elapsed, Duration::from_secs(1));
        timers.start(TimerKind::Warning, Duration::from_secs(1));
        timers.stop(TimerKind::Elapsed);

        let tick = expect_tick(rx.recv().await);
        assert_eq!(tick.kind, TimerKind::Warning);
        assert!(timers.is_running(TimerKind::Warning));
    }
}
