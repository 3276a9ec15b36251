//! Polling Task, Snapshot State, and Circuit Breaker

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use flight_data::Flight;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::client::StateVectorFeed;
use crate::config::SourceConfig;
use crate::error::FeedFailure;

/// Broadcast capacity for poll updates. A slow subscriber lags and skips
/// cycles rather than blocking the poll loop.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// One cycle's outcome delivered to subscribers.
#[derive(Debug, Clone)]
pub struct PollUpdate {
    /// Normalized flights. When `failure` is set this is the last good
    /// batch, not fresh data.
    pub flights: Arc<Vec<Flight>>,
    /// Present exactly once, when the circuit breaker trips.
    pub failure: Option<FeedFailure>,
}

/// The two most recent successful batches.
#[derive(Debug, Default)]
struct Snapshots {
    current: Arc<Vec<Flight>>,
    previous: Arc<Vec<Flight>>,
    last_fetch: Option<DateTime<Utc>>,
}

/// State shared between the handle and the polling task. The task is the
/// single writer; handles only read.
struct Shared {
    snapshots: RwLock<Snapshots>,
    updates: broadcast::Sender<PollUpdate>,
    active: AtomicBool,
    /// Bumped on every start/stop. A polling task checks its own epoch
    /// before applying a fetch result, so a fetch that outlives its task's
    /// cancellation can never touch state.
    epoch: AtomicU64,
    /// Handle of the current polling task, aborted on stop.
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Periodic state-vector source.
///
/// Owns the current and previous flight snapshots and the consecutive-error
/// counter. All snapshot mutation happens inside the single polling task;
/// reads and subscription are safe from any thread.
pub struct StateVectorSource<F> {
    feed: Arc<F>,
    config: SourceConfig,
    shared: Arc<Shared>,
}

impl<F> StateVectorSource<F>
where
    F: StateVectorFeed + 'static,
{
    /// Create a source. Polling does not begin until [`start`](Self::start).
    pub fn new(feed: F, config: SourceConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            feed: Arc::new(feed),
            config,
            shared: Arc::new(Shared {
                snapshots: RwLock::new(Snapshots::default()),
                updates,
                active: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                task: Mutex::new(None),
            }),
        }
    }

    /// Begin polling: an immediate fetch, then one per configured interval.
    ///
    /// Idempotent; calling while active is a no-op. Also the manual reset
    /// after the circuit breaker trips: a restarted source begins with a
    /// clean error count.
    pub fn start(&self) {
        if self.shared.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            interval_ms = self.config.poll_interval_ms,
            "state-vector polling started"
        );

        let feed = Arc::clone(&self.feed);
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let handle = tokio::spawn(poll_loop(feed, shared, config, epoch));
        *self
            .shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Stop polling. Idempotent.
    ///
    /// Cancels all future ticks and aborts the polling task, which drops
    /// any request still in flight. Should the fetch nonetheless complete,
    /// the epoch check discards its result before it can touch the
    /// snapshots or notify subscribers.
    pub fn stop(&self) {
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self
            .shared
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        info!("state-vector polling stopped");
    }

    /// Whether scheduling is currently engaged.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Subscribe to per-cycle updates. Dropping the receiver unsubscribes;
    /// other subscribers and the poll loop are unaffected either way.
    pub fn subscribe(&self) -> broadcast::Receiver<PollUpdate> {
        self.shared.updates.subscribe()
    }

    /// The most recent successful batch.
    pub fn last_snapshot(&self) -> Arc<Vec<Flight>> {
        Arc::clone(&self.read_snapshots().current)
    }

    /// The successful batch before the most recent one.
    pub fn previous_snapshot(&self) -> Arc<Vec<Flight>> {
        Arc::clone(&self.read_snapshots().previous)
    }

    /// Time elapsed since the last successful fetch, if any.
    pub fn time_since_update(&self) -> Option<Duration> {
        let last = self.read_snapshots().last_fetch?;
        (Utc::now() - last).to_std().ok()
    }

    fn read_snapshots(&self) -> std::sync::RwLockReadGuard<'_, Snapshots> {
        self.shared
            .snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn poll_loop<F: StateVectorFeed>(
    feed: Arc<F>,
    shared: Arc<Shared>,
    config: SourceConfig,
    epoch: u64,
) {
    let mut ticker = tokio::time::interval(config.poll_interval());
    // An overrunning fetch delays the next tick instead of bursting.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_errors: u32 = 0;

    loop {
        ticker.tick().await;
        if shared.epoch.load(Ordering::SeqCst) != epoch {
            debug!("poll loop superseded, exiting");
            return;
        }

        let result = feed.fetch_states(&config.bounds).await;

        // stop() or a restart may have landed while the fetch was in
        // flight; the late result must not be applied.
        if shared.epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding fetch result from a cancelled cycle");
            return;
        }

        match result {
            Ok(flights) => {
                consecutive_errors = 0;
                let flights = Arc::new(flights);
                {
                    let mut snapshots = shared
                        .snapshots
                        .write()
                        .unwrap_or_else(PoisonError::into_inner);
                    snapshots.previous = Arc::clone(&snapshots.current);
                    snapshots.current = Arc::clone(&flights);
                    snapshots.last_fetch = Some(Utc::now());
                }
                debug!(count = flights.len(), "poll cycle complete");
                let _ = shared.updates.send(PollUpdate {
                    flights,
                    failure: None,
                });
            }
            Err(err) => {
                consecutive_errors += 1;
                warn!(
                    attempt = consecutive_errors,
                    limit = config.max_consecutive_errors,
                    error = %err,
                    "state-vector fetch failed"
                );

                if consecutive_errors >= config.max_consecutive_errors {
                    error!("consecutive error limit reached, halting polling until restarted");
                    shared.active.store(false, Ordering::SeqCst);
                    let last_good = {
                        let snapshots = shared
                            .snapshots
                            .read()
                            .unwrap_or_else(PoisonError::into_inner);
                        Arc::clone(&snapshots.current)
                    };
                    let _ = shared.updates.send(PollUpdate {
                        flights: last_good,
                        failure: Some(FeedFailure {
                            message: err.to_string(),
                        }),
                    });
                    return;
                }
            }
        }
    }
}
