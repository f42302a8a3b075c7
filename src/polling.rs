//! Periodic dashboard refresh.
//!
//! Every cycle fetches the queue and the resource snapshot together and is
//! tagged with a sequence number at issue time. A cycle is applied only if its
//! number is higher than the last applied one, so a slow older response can
//! never overwrite a newer dashboard. A snapshot is published only when both
//! fetches succeed; otherwise the previous snapshot stays and the controller
//! reports a degraded state.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::Collaborator;
use crate::error::{TriageError, TriageResult};
use crate::models::{QueueEntry, ResourceStatus};
use crate::queue::{self, QueueStats};
use crate::resources;

/// One consistently applied queue + resource cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub seq: u64,
    pub fetched_at: DateTime<Utc>,
    pub queue: Vec<QueueEntry>,
    pub resources: Vec<ResourceStatus>,
    pub stats: QueueStats,
    pub resources_available_pct: f64,
}

impl DashboardSnapshot {
    pub fn new(
        seq: u64,
        queue: Vec<QueueEntry>,
        resources: Vec<ResourceStatus>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let stats = queue::summarize(&queue);
        let resources_available_pct = resources::available_percent(&resources);
        Self {
            seq,
            fetched_at,
            queue,
            resources,
            stats,
            resources_available_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Published,
    Degraded,
    Discarded,
}

type SnapshotHandler = Arc<dyn Fn(&DashboardSnapshot) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&TriageError) + Send + Sync>;

struct PollState {
    phase: Phase,
    issued: u64,
    applied: u64,
    stopped: bool,
    snapshot: Option<Arc<DashboardSnapshot>>,
    degraded: Option<String>,
    on_snapshot: Option<SnapshotHandler>,
    on_error: Option<ErrorHandler>,
}

struct Inner {
    collaborator: Arc<dyn Collaborator>,
    interval: Duration,
    state: Mutex<PollState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Highest seq whose handler has run; handlers fire outside `state`.
    dispatched: Mutex<u64>,
}

#[derive(Clone)]
pub struct PollingController {
    inner: Arc<Inner>,
}

impl PollingController {
    pub fn new(collaborator: Arc<dyn Collaborator>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                collaborator,
                interval,
                state: Mutex::new(PollState {
                    phase: Phase::Idle,
                    issued: 0,
                    applied: 0,
                    stopped: false,
                    snapshot: None,
                    degraded: None,
                    on_snapshot: None,
                    on_error: None,
                }),
                timer: Mutex::new(None),
                dispatched: Mutex::new(0),
            }),
        }
    }

    /// Load immediately, then every interval. Handlers fire in issue order and
    /// may read the controller. Starting an already running controller is a
    /// no-op. Must be called inside a tokio runtime.
    pub fn start<S, E>(&self, on_snapshot: S, on_error: E)
    where
        S: Fn(&DashboardSnapshot) + Send + Sync + 'static,
        E: Fn(&TriageError) + Send + Sync + 'static,
    {
        let mut timer = lock(&self.inner.timer);
        if timer.is_some() {
            return;
        }

        {
            let mut state = lock(&self.inner.state);
            state.stopped = false;
            state.on_snapshot = Some(Arc::new(on_snapshot));
            state.on_error = Some(Arc::new(on_error));
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let interval = self.inner.interval;
        info!(interval_secs = interval.as_secs(), "starting dashboard polling");

        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                PollingController { inner }.refresh().await;
            }
        }));
    }

    /// Cancel the timer and make every in-flight cycle non-applying.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.inner.timer).take() {
            handle.abort();
            info!("stopped dashboard polling");
        }

        let mut state = lock(&self.inner.state);
        state.stopped = true;
        // Nothing issued before the stop may apply, even after a restart.
        state.applied = state.issued;
        state.phase = Phase::Idle;
        state.on_snapshot = None;
        state.on_error = None;
    }

    /// Run one cycle now, alongside any timer-driven cycle.
    pub async fn refresh(&self) -> Applied {
        let Some(seq) = self.issue() else {
            return Applied::Discarded;
        };

        let collaborator = self.inner.collaborator.as_ref();
        let (queue, resources) = tokio::join!(
            queue::fetch_queue(collaborator),
            resources::fetch_resources(collaborator)
        );
        self.apply(seq, queue, resources)
    }

    pub fn snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        lock(&self.inner.state).snapshot.clone()
    }

    pub fn phase(&self) -> Phase {
        lock(&self.inner.state).phase
    }

    /// Message for the degraded-state indicator, if the last cycle failed.
    pub fn degraded(&self) -> Option<String> {
        lock(&self.inner.state).degraded.clone()
    }

    fn issue(&self) -> Option<u64> {
        let mut state = lock(&self.inner.state);
        if state.stopped {
            return None;
        }
        state.issued += 1;
        state.phase = Phase::Loading;
        debug!(seq = state.issued, "issued refresh cycle");
        Some(state.issued)
    }

    fn apply(
        &self,
        seq: u64,
        queue: TriageResult<Vec<QueueEntry>>,
        resources: TriageResult<Vec<ResourceStatus>>,
    ) -> Applied {
        let mut state = lock(&self.inner.state);
        if state.stopped || seq <= state.applied {
            debug!(seq, applied = state.applied, stopped = state.stopped, "discarding refresh cycle");
            return Applied::Discarded;
        }
        state.applied = seq;

        let err = match (queue, resources) {
            (Ok(queue), Ok(resources)) => {
                let snapshot = Arc::new(DashboardSnapshot::new(seq, queue, resources, Utc::now()));
                state.phase = Phase::Ready;
                state.degraded = None;
                state.snapshot = Some(Arc::clone(&snapshot));
                let handler = state.on_snapshot.clone();
                drop(state);
                self.dispatch(seq, || {
                    if let Some(handler) = handler {
                        handler(snapshot.as_ref());
                    }
                });
                return Applied::Published;
            }
            (Err(err), Err(_)) => err,
            (Err(_), Ok(_)) => TriageError::PartialRefresh {
                queue_failed: true,
                resources_failed: false,
            },
            (Ok(_), Err(_)) => TriageError::PartialRefresh {
                queue_failed: false,
                resources_failed: true,
            },
        };

        warn!(seq, error = %err, "refresh cycle failed; keeping last snapshot");
        state.phase = Phase::Error;
        state.degraded = Some(err.user_message());
        let handler = state.on_error.clone();
        drop(state);
        self.dispatch(seq, || {
            if let Some(handler) = handler {
                handler(&err);
            }
        });
        Applied::Degraded
    }

    /// Run a handler for `seq` unless a newer cycle was already dispatched.
    fn dispatch(&self, seq: u64, run: impl FnOnce()) {
        let mut dispatched = lock(&self.inner.dispatched);
        if seq <= *dispatched {
            return;
        }
        *dispatched = seq;
        run();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().ok().and_then(Option::take) {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
