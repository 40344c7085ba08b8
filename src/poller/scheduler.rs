//! Timer ownership: one live timer task per poll handle.
//!
//! The scheduler owns every periodic timer in the system. Starting a handle
//! that already has a live timer cancels the old one first, so two timers can
//! never tick for the same handle. Stopping a handle only prevents future
//! ticks; cycles already dispatched by earlier ticks run to completion.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{HedgewatchError, Result};

/// Identity of one independent periodic cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollHandle {
    /// Option-analytics refresh cycle.
    OptionCycle,
    /// Trade feed refresh.
    TradeFeed,
}

impl std::fmt::Display for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OptionCycle => f.write_str("option_cycle"),
            Self::TradeFeed => f.write_str("trade_feed"),
        }
    }
}

#[derive(Default)]
pub struct PollScheduler {
    timers: Mutex<HashMap<PollHandle, JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin invoking `on_tick` every `cadence_secs`, after an optional
    /// initial delay. Replaces any live timer for the handle. The first tick
    /// fires one full cadence after start, and ticks never wait for the work
    /// they trigger; overlap is the callback's concern.
    pub fn start<F>(
        &self,
        handle: PollHandle,
        cadence_secs: u64,
        initial_delay: Duration,
        on_tick: F,
    ) -> Result<()>
    where
        F: Fn() + Send + 'static,
    {
        if cadence_secs == 0 {
            return Err(HedgewatchError::InvalidCadence(cadence_secs));
        }

        let mut timers = self.timers.lock().expect("scheduler lock poisoned");
        // Cancel before spawning so the handle never has two live timers,
        // even for an instant.
        if let Some(previous) = timers.remove(&handle) {
            previous.abort();
            info!(%handle, cadence_secs, "replacing live timer");
        } else {
            info!(%handle, cadence_secs, "starting timer");
        }

        let cadence = Duration::from_secs(cadence_secs);
        let task = tokio::spawn(async move {
            if !initial_delay.is_zero() {
                tokio::time::sleep(initial_delay).await;
            }
            let mut interval = tokio::time::interval(cadence);
            // Fixed-rate, drift-tolerant: a slow loop skips ticks instead of
            // bunching them up.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it so
            // the first callback fires a full cadence after start.
            interval.tick().await;
            loop {
                interval.tick().await;
                on_tick();
            }
        });

        timers.insert(handle, task);
        Ok(())
    }

    /// Cancel the live timer if present. Not an error when none exists.
    pub fn stop(&self, handle: PollHandle) {
        let mut timers = self.timers.lock().expect("scheduler lock poisoned");
        if let Some(task) = timers.remove(&handle) {
            task.abort();
            info!(%handle, "stopped timer");
        } else {
            debug!(%handle, "stop requested for idle handle");
        }
    }

    pub fn stop_all(&self) {
        let mut timers = self.timers.lock().expect("scheduler lock poisoned");
        for (handle, task) in timers.drain() {
            task.abort();
            info!(%handle, "stopped timer");
        }
    }

    pub fn is_active(&self, handle: PollHandle) -> bool {
        self.timers
            .lock()
            .expect("scheduler lock poisoned")
            .contains_key(&handle)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_tick(counter: &Arc<AtomicUsize>) -> impl Fn() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Advance the paused clock in one-second steps so interval deadlines
    /// fire in order instead of being skipped by one large jump.
    async fn advance_secs(secs: u64) {
        for _ in 0..secs {
            tokio::time::advance(Duration::from_secs(1)).await;
            // Let a timer task woken by this advance run before the next
            // step (or the caller's assertion) observes the tick count.
            tokio::task::yield_now().await;
        }
    }

    /// Let freshly spawned timer tasks register their timers.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_zero_cadence_rejected() {
        let scheduler = PollScheduler::new();
        let err = scheduler
            .start(PollHandle::OptionCycle, 0, Duration::ZERO, || {})
            .unwrap_err();
        assert!(matches!(err, HedgewatchError::InvalidCadence(0)));
        assert!(!scheduler.is_active(PollHandle::OptionCycle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick_fires_nothing() {
        let scheduler = PollScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler
            .start(
                PollHandle::OptionCycle,
                5,
                Duration::ZERO,
                counting_tick(&ticks),
            )
            .unwrap();
        scheduler.stop(PollHandle::OptionCycle);
        settle().await;

        advance_secs(30).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_cadence() {
        let scheduler = PollScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler
            .start(
                PollHandle::OptionCycle,
                5,
                Duration::ZERO,
                counting_tick(&ticks),
            )
            .unwrap();
        settle().await;

        advance_secs(4).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0, "first tick waits a cadence");

        advance_secs(12).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        scheduler.stop(PollHandle::OptionCycle);
        advance_secs(20).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3, "no ticks after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_live_timer() {
        let scheduler = PollScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler
            .start(
                PollHandle::OptionCycle,
                5,
                Duration::ZERO,
                counting_tick(&first),
            )
            .unwrap();
        scheduler
            .start(
                PollHandle::OptionCycle,
                2,
                Duration::ZERO,
                counting_tick(&second),
            )
            .unwrap();
        settle().await;

        advance_secs(10).await;
        assert_eq!(first.load(Ordering::SeqCst), 0, "old timer cancelled");
        assert_eq!(second.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handles_are_independent() {
        let scheduler = PollScheduler::new();
        let options = Arc::new(AtomicUsize::new(0));
        let trades = Arc::new(AtomicUsize::new(0));

        scheduler
            .start(
                PollHandle::OptionCycle,
                5,
                Duration::ZERO,
                counting_tick(&options),
            )
            .unwrap();
        scheduler
            .start(
                PollHandle::TradeFeed,
                5,
                Duration::ZERO,
                counting_tick(&trades),
            )
            .unwrap();
        scheduler.stop(PollHandle::TradeFeed);
        settle().await;

        advance_secs(10).await;
        assert_eq!(options.load(Ordering::SeqCst), 2);
        assert_eq!(trades.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_idle_handle_is_noop() {
        let scheduler = PollScheduler::new();
        scheduler.stop(PollHandle::TradeFeed);
        assert!(!scheduler.is_active(PollHandle::TradeFeed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_delay_defers_first_tick() {
        let scheduler = PollScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler
            .start(
                PollHandle::TradeFeed,
                5,
                Duration::from_secs(3),
                counting_tick(&ticks),
            )
            .unwrap();
        settle().await;

        advance_secs(7).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        advance_secs(1).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
