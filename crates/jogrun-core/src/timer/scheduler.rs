//! Drift-corrected once-per-second tick driver.
//!
//! Each firing measures how late it ran relative to its deadline and
//! shortens the next delay by that amount: `delay = max(0, 1s - drift)`,
//! next deadline `now + delay`. Lateness is absorbed within one period
//! instead of accumulating, and a long stall never produces a burst of
//! catch-up ticks.
//!
//! A chain is tagged with a generation number. Stopping the scheduler aborts
//! the task and bumps the generation, so a tick message already sitting in
//! the consumer's queue is recognised as stale via [`TickScheduler::accepts`].

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Deadline bookkeeping for one scheduling chain.
#[derive(Debug, Clone, Copy)]
pub struct DriftClock {
    period: Duration,
    deadline: Instant,
}

impl DriftClock {
    /// Fresh chain whose first firing is one period after `now`.
    pub fn starting_at(now: Instant, period: Duration) -> Self {
        Self {
            period,
            deadline: now + period,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Record a firing at `now` and return the delay until the next one.
    ///
    /// Early firings count as zero drift, so the delay never exceeds one
    /// period.
    pub fn on_fire(&mut self, now: Instant) -> Duration {
        let drift = now.saturating_duration_since(self.deadline);
        let delay = self.period.saturating_sub(drift);
        self.deadline = now + delay;
        delay
    }
}

/// Ticks are delivered through this callback, which returns `false` once the
/// receiving side is gone.
pub type TickEmitter = Box<dyn Fn(u64) -> bool + Send + Sync>;

#[derive(Debug)]
struct Chain {
    generation: u64,
    task: JoinHandle<()>,
}

/// Owns at most one running tick chain.
#[derive(Debug)]
pub struct TickScheduler {
    period: Duration,
    generation: u64,
    chain: Option<Chain>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            chain: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.chain.is_some()
    }

    /// Start a chain unless one is already running. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self, emit: TickEmitter) {
        if self.chain.is_some() {
            return;
        }
        self.generation += 1;
        let generation = self.generation;
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut clock = DriftClock::starting_at(Instant::now(), period);
            loop {
                tokio::time::sleep_until(clock.deadline()).await;
                if !emit(generation) {
                    break;
                }
                let delay = clock.on_fire(Instant::now());
                tracing::trace!(generation, delay_ms = delay.as_millis() as u64, "tick scheduled");
            }
        });
        tracing::debug!(generation, "tick chain started");
        self.chain = Some(Chain { generation, task });
    }

    /// Cancel the running chain. Ticks it already queued become stale.
    pub fn stop(&mut self) {
        if let Some(chain) = self.chain.take() {
            chain.task.abort();
            self.generation += 1;
            tracing::debug!(generation = chain.generation, "tick chain stopped");
        }
    }

    /// Start or stop so that a chain runs exactly when `wanted`.
    pub fn sync(&mut self, wanted: bool, emit: impl FnOnce() -> TickEmitter) {
        match (wanted, self.is_active()) {
            (true, false) => self.start(emit()),
            (false, true) => self.stop(),
            _ => {}
        }
    }

    /// Whether a tick tagged `generation` comes from the live chain.
    pub fn accepts(&self, generation: u64) -> bool {
        self.chain
            .as_ref()
            .is_some_and(|c| c.generation == generation)
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn late_firing_shortens_next_delay() {
        let t0 = Instant::now();
        let mut clock = DriftClock::starting_at(t0, TICK_PERIOD);
        let fired = clock.deadline() + Duration::from_millis(400);
        assert_eq!(clock.on_fire(fired), Duration::from_millis(600));
        assert_eq!(clock.deadline(), fired + Duration::from_millis(600));
    }

    #[test]
    fn on_time_firing_keeps_full_period() {
        let mut clock = DriftClock::starting_at(Instant::now(), TICK_PERIOD);
        let fired = clock.deadline();
        assert_eq!(clock.on_fire(fired), TICK_PERIOD);
    }

    #[test]
    fn early_firing_is_capped_at_period() {
        let mut clock = DriftClock::starting_at(Instant::now(), TICK_PERIOD);
        let fired = clock.deadline() - Duration::from_millis(200);
        assert_eq!(clock.on_fire(fired), TICK_PERIOD);
    }

    #[test]
    fn stall_longer_than_period_fires_immediately_without_burst() {
        let mut clock = DriftClock::starting_at(Instant::now(), TICK_PERIOD);
        let fired = clock.deadline() + Duration::from_millis(3500);
        assert_eq!(clock.on_fire(fired), Duration::ZERO);
        // Next firing on time: back to a full period.
        assert_eq!(clock.on_fire(clock.deadline()), TICK_PERIOD);
    }

    #[test]
    fn jitter_does_not_accumulate() {
        let start = Instant::now();
        let mut clock = DriftClock::starting_at(start, TICK_PERIOD);
        let mut fired = start;
        for i in 0..600u64 {
            // Alternate 0..=90ms of lateness.
            let late = Duration::from_millis((i * 37) % 91);
            fired = clock.deadline() + late;
            clock.on_fire(fired);
        }
        let elapsed = fired - start;
        // 600 ticks land within one period of 600 seconds.
        assert!(elapsed >= Duration::from_secs(600));
        assert!(elapsed < Duration::from_secs(601));
    }

    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn counting_emitter(log: Arc<Mutex<Vec<(u64, Instant)>>>) -> TickEmitter {
        Box::new(move |generation| {
            log.lock().unwrap().push((generation, Instant::now()));
            true
        })
    }

    #[tokio::test(start_paused = true)]
    async fn chain_ticks_once_per_period() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = TickScheduler::new();
        let started = Instant::now();
        scheduler.start(counting_emitter(Arc::clone(&log)));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let ticks = log.lock().unwrap().clone();
        assert_eq!(ticks.len(), 3);
        assert_close(ticks[0].1 - started, Duration::from_secs(1));
        assert!(ticks.iter().all(|&(g, _)| scheduler.accepts(g)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_chain_and_invalidates_generation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = TickScheduler::new();
        scheduler.start(counting_emitter(Arc::clone(&log)));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let generation = log.lock().unwrap()[0].0;

        scheduler.stop();
        assert!(!scheduler.is_active());
        assert!(!scheduler.accepts(generation));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_chain_at_a_time() {
        let count = Arc::new(AtomicU64::new(0));
        let mut scheduler = TickScheduler::new();
        for _ in 0..3 {
            let count = Arc::clone(&count);
            scheduler.sync(true, move || {
                Box::new(move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                    true
                })
            });
        }
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_uses_fresh_deadline() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = TickScheduler::new();
        scheduler.start(counting_emitter(Arc::clone(&log)));
        tokio::time::sleep(Duration::from_millis(1700)).await;
        scheduler.stop();

        let resumed = Instant::now();
        scheduler.start(counting_emitter(Arc::clone(&log)));
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let ticks = log.lock().unwrap().clone();
        assert_eq!(ticks.len(), 2);
        assert_close(ticks[1].1 - resumed, Duration::from_secs(1));
        assert_ne!(ticks[0].0, ticks[1].0);
    }
}
