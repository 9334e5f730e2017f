//! Foreground game tracking
//!
//! Watches which application is in front and tells the controller when the
//! world changed. Two mutually exclusive primary strategies, picked once at
//! spawn: a host lifecycle event stream (with a staggered confirmation
//! schedule, since event payloads can outrun the host's own foreground
//! routing), or a plain poll when no event source exists.
//!
//! Independently, while the panel is visible, a slower poll compares the
//! last-seen app id: a change requests a full resync, a quiet tick requests
//! a lightweight flags refresh so the crash banner stays current.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, info};

use crate::config::SyncOptions;
use crate::model::GameContext;

/// Host-side view of the foreground application
///
/// Implementations must be cheap to call; both polls and the confirmation
/// schedule read it repeatedly.
pub trait HostEnvironment: Send + Sync + 'static {
    fn foreground_app(&self) -> GameContext;
}

/// Host lifecycle notification; the app name routed by the host may lag this
/// event, which is why confirmations re-read `foreground_app`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifetimeEvent {
    pub created: bool,
    pub app_id: String,
}

/// Observable tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Watching,
    Stopped,
}

/// What the tracker asks of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerRequest {
    /// Report this context to the backend (no local state change)
    ReportContext(GameContext),
    /// The foreground app changed; re-establish everything
    FullResync,
    /// Quiet tick; re-read crash and master flags only
    FlagsRefresh,
}

type ConfirmSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

pub struct GameContextTracker {
    tasks: Vec<JoinHandle<()>>,
    confirm: ConfirmSlot,
    phase: watch::Sender<TrackerPhase>,
}

impl GameContextTracker {
    /// Start watching; strategy is event-driven when `events` is supplied,
    /// polling otherwise
    pub fn spawn(
        host: Arc<dyn HostEnvironment>,
        options: &SyncOptions,
        events: Option<mpsc::Receiver<LifetimeEvent>>,
        requests: mpsc::Sender<TrackerRequest>,
        visible: watch::Receiver<bool>,
    ) -> Self {
        let (phase, _) = watch::channel(TrackerPhase::Idle);
        let confirm: ConfirmSlot = Arc::new(Mutex::new(None));
        let mut tasks = Vec::new();

        match events {
            Some(events) => {
                info!("context tracking via lifecycle events");
                tasks.push(tokio::spawn(run_event_listener(
                    Arc::clone(&host),
                    options.confirm_delays(),
                    events,
                    requests.clone(),
                    Arc::clone(&confirm),
                )));
            }
            None => {
                info!(period_ms = options.context_poll_ms, "context tracking via polling");
                tasks.push(tokio::spawn(run_context_poll(
                    Arc::clone(&host),
                    options.context_poll(),
                    requests.clone(),
                )));
            }
        }

        tasks.push(tokio::spawn(run_visible_poll(
            host,
            options.visible_poll(),
            visible,
            requests,
        )));

        phase.send_replace(TrackerPhase::Watching);
        Self {
            tasks,
            confirm,
            phase,
        }
    }

    /// Observe the tracker phase
    pub fn phase(&self) -> watch::Receiver<TrackerPhase> {
        self.phase.subscribe()
    }

    /// Abort every task; nothing fires after this returns
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(schedule) = lock(&self.confirm).take() {
            schedule.abort();
        }
        self.phase.send_replace(TrackerPhase::Stopped);
        debug!("context tracker stopped");
    }
}

impl Drop for GameContextTracker {
    fn drop(&mut self) {
        // Last-resort teardown for engines dropped without stop()
        if !self.tasks.is_empty() {
            self.stop();
        }
    }
}

async fn run_event_listener(
    host: Arc<dyn HostEnvironment>,
    delays: Vec<Duration>,
    mut events: mpsc::Receiver<LifetimeEvent>,
    requests: mpsc::Sender<TrackerRequest>,
    confirm: ConfirmSlot,
) {
    while let Some(event) = events.recv().await {
        debug!(created = event.created, app_id = %event.app_id, "lifecycle event");
        if event.created {
            // Best-effort immediate report; the name comes from the host's
            // (possibly lagging) foreground read, the id from the event
            let name = host.foreground_app().app_name;
            let context = GameContext::new(event.app_id.clone(), name);
            if requests
                .send(TrackerRequest::ReportContext(context))
                .await
                .is_err()
            {
                return;
            }
        }

        // One replaceable schedule per event; a new event supersedes an
        // outstanding one
        let schedule = tokio::spawn(run_confirmation_schedule(
            Arc::clone(&host),
            delays.clone(),
            requests.clone(),
        ));
        if let Some(old) = lock(&confirm).replace(schedule) {
            old.abort();
        }
    }
}

/// Re-read and re-report the foreground app at each offset from the event
async fn run_confirmation_schedule(
    host: Arc<dyn HostEnvironment>,
    delays: Vec<Duration>,
    requests: mpsc::Sender<TrackerRequest>,
) {
    let mut elapsed = Duration::ZERO;
    for offset in delays {
        sleep(offset.saturating_sub(elapsed)).await;
        elapsed = offset;
        let context = host.foreground_app();
        if requests
            .send(TrackerRequest::ReportContext(context))
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Fallback strategy: report the authoritative foreground app every tick
async fn run_context_poll(
    host: Arc<dyn HostEnvironment>,
    period: Duration,
    requests: mpsc::Sender<TrackerRequest>,
) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        let context = host.foreground_app();
        if requests
            .send(TrackerRequest::ReportContext(context))
            .await
            .is_err()
        {
            return;
        }
    }
}

/// While visible, watch for app-id changes (full resync) and otherwise keep
/// the flags fresh
async fn run_visible_poll(
    host: Arc<dyn HostEnvironment>,
    period: Duration,
    mut visible: watch::Receiver<bool>,
    requests: mpsc::Sender<TrackerRequest>,
) {
    let mut ticker = interval(period);
    let mut last_app: Option<String> = None;
    loop {
        ticker.tick().await;
        if !*visible.borrow_and_update() {
            continue;
        }
        let current = host.foreground_app().app_id;
        let changed = last_app.as_deref() != Some(current.as_str());
        last_app = Some(current);
        let request = if changed {
            TrackerRequest::FullResync
        } else {
            TrackerRequest::FlagsRefresh
        };
        if requests.send(request).await.is_err() {
            return;
        }
    }
}

fn lock(slot: &ConfirmSlot) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
