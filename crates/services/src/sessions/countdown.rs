//! Cooperative cancellation, the auto-advance pause and the session countdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::debug;

/// Why a session loop was told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    TimeExpired,
    Abandoned,
}

/// Shared stop flag. The first reason raised wins.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<Option<CancelReason>>>,
    rx: watch::Receiver<Option<CancelReason>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Raise the signal. Returns false if it was already raised.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        *self.rx.borrow()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once the signal is raised.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            if rx.changed().await.is_err() {
                // sender lives as long as `self`
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Elapsed,
    Cancelled(CancelReason),
}

/// Sleep for `duration` unless `signal` is raised first.
pub async fn pause(duration: Duration, signal: &CancelSignal) -> PauseOutcome {
    if let Some(reason) = signal.reason() {
        return PauseOutcome::Cancelled(reason);
    }
    tokio::select! {
        biased;
        reason = signal.cancelled() => PauseOutcome::Cancelled(reason),
        () = sleep(duration) => PauseOutcome::Elapsed,
    }
}

/// Running session countdown.
#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Tick once per second and raise `TimeExpired` on `signal` when
    /// `seconds` have passed. Stops early if the signal is raised elsewhere.
    #[must_use]
    pub fn spawn(seconds: u64, signal: CancelSignal) -> Self {
        let (tx, remaining) = watch::channel(seconds);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            let mut left = seconds;
            while left > 0 {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => return,
                    _ = ticker.tick() => {
                        left -= 1;
                        let _ = tx.send(left);
                    }
                }
            }
            if signal.cancel(CancelReason::TimeExpired) {
                debug!(seconds, "session countdown expired");
            }
        });
        Self { remaining, handle }
    }

    /// Seconds left on the countdown.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pause_elapses_without_signal() {
        let signal = CancelSignal::new();
        assert_eq!(
            pause(Duration::from_millis(1500), &signal).await,
            PauseOutcome::Elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_is_cut_short_by_signal() {
        let signal = CancelSignal::new();
        let remote = signal.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            remote.cancel(CancelReason::Abandoned);
        });
        let started = tokio::time::Instant::now();
        let outcome = pause(Duration::from_secs(60), &signal).await;
        assert_eq!(outcome, PauseOutcome::Cancelled(CancelReason::Abandoned));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn first_reason_wins() {
        let signal = CancelSignal::new();
        assert!(signal.cancel(CancelReason::TimeExpired));
        assert!(!signal.cancel(CancelReason::Abandoned));
        assert_eq!(signal.reason(), Some(CancelReason::TimeExpired));
        assert_eq!(
            pause(Duration::from_secs(5), &signal).await,
            PauseOutcome::Cancelled(CancelReason::TimeExpired)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_raises_time_expired() {
        let signal = CancelSignal::new();
        let countdown = Countdown::spawn(3, signal.clone());
        assert_eq!(signal.cancelled().await, CancelReason::TimeExpired);
        assert_eq!(countdown.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_when_cancelled_elsewhere() {
        let signal = CancelSignal::new();
        let countdown = Countdown::spawn(30, signal.clone());
        sleep(Duration::from_millis(2_500)).await;
        signal.cancel(CancelReason::Abandoned);
        sleep(Duration::from_secs(60)).await;
        assert_eq!(signal.reason(), Some(CancelReason::Abandoned));
        assert!(countdown.remaining() > 0);
        assert!(countdown.is_finished());
    }
}
