//! Periodic cycles bound to a cancellable handle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use rigwatch_types::{now_ms, AggregateResult, Source};

use crate::poller::Shared;

/// Default period between list-mode cycles.
pub const DEFAULT_LIST_PERIOD: Duration = Duration::from_secs(2);

/// Default period between detail-mode fetches.
pub const DEFAULT_DETAIL_PERIOD: Duration = Duration::from_secs(5);

/// Default interval of the detail-mode countdown.
pub const DEFAULT_COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// What a subscription polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "source_id", rename_all = "lowercase")]
pub enum Mode {
    /// Every registered source, results committed as the list aggregate.
    List,
    /// A single source by id.
    Detail(i64),
}

/// How a subscription polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionConfig {
    pub mode: Mode,
    pub period: Duration,
}

impl SubscriptionConfig {
    /// Poll all sources every 2 seconds.
    pub fn list() -> Self {
        Self {
            mode: Mode::List,
            period: DEFAULT_LIST_PERIOD,
        }
    }

    /// Poll one source every 5 seconds.
    pub fn detail(source_id: i64) -> Self {
        Self {
            mode: Mode::Detail(source_id),
            period: DEFAULT_DETAIL_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

/// Display-only time until the next detail fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Countdown {
    /// Unix milliseconds of the next scheduled fetch.
    pub next_update_at_ms: u64,
    pub remaining_ms: u64,
}

impl Countdown {
    fn until(deadline: Instant) -> Self {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let remaining_ms = remaining.as_millis() as u64;
        Self {
            next_update_at_ms: now_ms() + remaining_ms,
            remaining_ms,
        }
    }
}

/// Serializes commits against cancellation.
///
/// A cycle captures the epoch when its subscription starts. Cancelling bumps
/// the epoch under the same lock commits hold, so once `cancel` returns no
/// stale cycle can write.
#[derive(Debug, Default)]
pub(crate) struct EpochGate {
    epoch: Mutex<u64>,
}

impl EpochGate {
    pub(crate) fn current(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Run `commit` only if the epoch is still `expected`.
    pub(crate) fn commit_if<F: FnOnce()>(&self, expected: u64, commit: F) -> bool {
        let epoch = self.epoch.lock();
        if *epoch != expected {
            return false;
        }
        commit();
        true
    }

    pub(crate) fn advance(&self) {
        *self.epoch.lock() += 1;
    }
}

/// A running periodic poll.
///
/// Cycles continue while this handle is alive. Call [`cancel`](Self::cancel)
/// or drop it to stop; an in-flight cycle may finish but its result is
/// discarded.
#[derive(Debug)]
pub struct Subscription {
    config: SubscriptionConfig,
    gate: Arc<EpochGate>,
    stop_tx: watch::Sender<bool>,
    results: watch::Receiver<Arc<AggregateResult>>,
    countdown: Option<watch::Receiver<Countdown>>,
}

impl Subscription {
    pub(crate) fn start(shared: Arc<Shared>, config: SubscriptionConfig) -> Self {
        let gate = Arc::new(EpochGate::default());
        let epoch = gate.current();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (results_tx, results) = watch::channel(Arc::new(AggregateResult::empty()));

        let countdown = match config.mode {
            Mode::List => {
                tokio::spawn(run_list(
                    shared,
                    config.period,
                    gate.clone(),
                    epoch,
                    stop_rx,
                    results_tx,
                ));
                None
            }
            Mode::Detail(source_id) => {
                let (countdown_tx, countdown_rx) = watch::channel(Countdown::default());
                tokio::spawn(run_detail(
                    shared,
                    source_id,
                    config.period,
                    gate.clone(),
                    epoch,
                    stop_rx,
                    results_tx,
                    countdown_tx,
                ));
                Some(countdown_rx)
            }
        };

        info!(mode = ?config.mode, period_ms = config.period.as_millis() as u64, "subscription started");

        Self {
            config,
            gate,
            stop_tx,
            results,
            countdown,
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// Receiver of every committed cycle result.
    ///
    /// Holds an empty aggregate until the first cycle completes.
    pub fn results(&self) -> watch::Receiver<Arc<AggregateResult>> {
        self.results.clone()
    }

    /// Receiver of countdown ticks. Only present in detail mode.
    pub fn countdown(&self) -> Option<watch::Receiver<Countdown>> {
        self.countdown.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Stop all timers for this subscription.
    ///
    /// Idempotent. After this returns, nothing from this subscription is
    /// written to the store or published.
    pub fn cancel(&self) {
        if self.stop_tx.send_replace(true) {
            return;
        }
        self.gate.advance();
        info!(mode = ?self.config.mode, "subscription cancelled");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_list(
    shared: Arc<Shared>,
    period: Duration,
    gate: Arc<EpochGate>,
    epoch: u64,
    mut stop_rx: watch::Receiver<bool>,
    results_tx: watch::Sender<Arc<AggregateResult>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {
                let sources = shared.sources();
                let aggregate = shared.aggregator.run_cycle(&sources).await;
                let next_ms = aggregate.cycle_started_ms + period.as_millis() as u64;

                let committed = gate.commit_if(epoch, || {
                    let aggregate = shared.store.commit_aggregate(aggregate);
                    shared.store.set_next_list_cycle_ms(next_ms);
                    results_tx.send_replace(aggregate);
                });
                if !committed {
                    break;
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_detail(
    shared: Arc<Shared>,
    source_id: i64,
    period: Duration,
    gate: Arc<EpochGate>,
    epoch: u64,
    mut stop_rx: watch::Receiver<bool>,
    results_tx: watch::Sender<Arc<AggregateResult>>,
    countdown_tx: watch::Sender<Countdown>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let tick = shared.countdown_tick;
    let mut countdown = tokio::time::interval_at(Instant::now() + tick, tick);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {
                let Some(source) = find_source(&shared, source_id) else {
                    warn!(source_id, "detail poll for unknown source, skipping");
                    continue;
                };

                let aggregate = shared.aggregator.run_cycle(std::slice::from_ref(&source)).await;
                let committed = gate.commit_if(epoch, || {
                    for snapshot in aggregate.iter() {
                        shared.store.commit_snapshot(snapshot.clone());
                    }
                    results_tx.send_replace(Arc::new(aggregate));
                });
                if !committed {
                    break;
                }

                // The next fetch, and the countdown, run from completion.
                ticker.reset();
                let next = Instant::now() + period;
                deadline = Some(next);
                countdown_tx.send_replace(Countdown::until(next));
            }
            _ = countdown.tick() => {
                if let Some(next) = deadline {
                    countdown_tx.send_replace(Countdown::until(next));
                }
            }
        }
    }
}

fn find_source(shared: &Shared, source_id: i64) -> Option<Source> {
    shared.sources().into_iter().find(|s| s.id == source_id)
}
