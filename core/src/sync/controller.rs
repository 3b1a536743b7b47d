use crate::sync::cache::CacheRead;
use crate::sync::cache::ExecutionCache;
use outreach_backend_client::FetchError;
use outreach_backend_client::FetchErrorKind;
use outreach_protocol::ExecutionState;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Consecutive retryable failures tolerated before polling stops.
    pub max_consecutive_failures: u32,
    /// Initial value of the caller's polling switch.
    pub enabled: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Loading,
    Ready,
    Error,
}

/// Error signal published next to the (degraded) state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncError {
    pub kind: FetchErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    /// Polling has stopped; only `refresh_now` clears this.
    pub terminal: bool,
}

impl SyncError {
    fn from_fetch(err: &FetchError, terminal: bool) -> Self {
        Self {
            kind: err.kind(),
            status: err.http_status(),
            message: err.to_string(),
            terminal,
        }
    }
}

/// What consumers render. `state` is never absent: loading and error
/// phases carry an empty fallback state for the current campaign.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub campaign_id: String,
    pub phase: LoadPhase,
    pub state: Arc<ExecutionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
    pub polling: bool,
    pub consecutive_failures: u32,
}

impl ControllerSnapshot {
    fn loading(campaign_id: &str, polling: bool) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            phase: LoadPhase::Loading,
            state: Arc::new(ExecutionState::fallback(campaign_id)),
            error: None,
            polling,
            consecutive_failures: 0,
        }
    }
}

struct Session {
    campaign_id: String,
    /// Bumped on every campaign switch; results tagged with an older value are dropped.
    generation: u64,
    polling_enabled: bool,
    consecutive_failures: u32,
    terminal: bool,
    run_active: bool,
    retry_pending: bool,
    needs_initial_load: bool,
    last_failed_fetch: Option<u64>,
    /// Cancelled when the campaign changes, releasing any wait on the old one.
    switched: CancellationToken,
}

impl Session {
    fn should_poll(&self, stopped: bool) -> bool {
        !stopped
            && self.polling_enabled
            && !self.terminal
            && (self.run_active || self.retry_pending)
    }
}

/// Campaign and generation a load was issued for.
struct LoadTarget {
    campaign_id: String,
    generation: u64,
    switched: CancellationToken,
}

struct ControllerShared {
    cache: ExecutionCache,
    config: PollingConfig,
    session: Mutex<Session>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
    wakeup: Notify,
    cancel: CancellationToken,
}

/// Subscription to one campaign's execution state.
///
/// `start` spawns the task that performs the initial fetch and keeps polling
/// while the run is active. Dropping the controller stops it.
pub struct ExecutionController {
    shared: Arc<ControllerShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExecutionController {
    pub fn new(cache: ExecutionCache, campaign_id: impl Into<String>, config: PollingConfig) -> Self {
        let campaign_id = campaign_id.into();
        let (snapshot_tx, _) = watch::channel(ControllerSnapshot::loading(&campaign_id, false));
        let cancel = CancellationToken::new();
        let session = Session {
            campaign_id,
            generation: 0,
            polling_enabled: config.enabled,
            consecutive_failures: 0,
            terminal: false,
            run_active: false,
            retry_pending: false,
            needs_initial_load: true,
            last_failed_fetch: None,
            switched: cancel.child_token(),
        };
        Self {
            shared: Arc::new(ControllerShared {
                cache,
                config,
                session: Mutex::new(session),
                snapshot_tx,
                wakeup: Notify::new(),
                cancel,
            }),
            task: Mutex::new(None),
        }
    }

    /// Spawns the subscription task. Must be called within a tokio runtime;
    /// calling it again, or after `stop`, does nothing.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if task.is_some() || self.shared.cancel.is_cancelled() {
            return;
        }
        info!("starting execution state subscription for {}", self.campaign_id());
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(run_subscription(shared)));
    }

    /// Retires the subscription. Results that resolve afterwards are discarded.
    pub fn stop(&self) {
        if self.shared.cancel.is_cancelled() {
            return;
        }
        self.shared.cancel.cancel();
        self.shared
            .snapshot_tx
            .send_modify(|snapshot| snapshot.polling = false);
        lock(&self.task).take();
        info!("stopped execution state subscription for {}", self.campaign_id());
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Bypasses the cache (joining any fetch already in flight) and clears a
    /// latched terminal error so polling can resume.
    pub async fn refresh_now(&self) -> Arc<ExecutionState> {
        {
            let mut session = lock(&self.shared.session);
            session.consecutive_failures = 0;
            session.terminal = false;
            session.last_failed_fetch = None;
        }
        let state = self.shared.load(true).await;
        self.shared.wakeup.notify_one();
        state
    }

    /// Switches to another campaign. Old state is cleared before this returns.
    pub fn set_campaign(&self, campaign_id: impl Into<String>) {
        let campaign_id = campaign_id.into();
        let previous = {
            let mut session = lock(&self.shared.session);
            if session.campaign_id == campaign_id {
                return;
            }
            let previous = std::mem::replace(&mut session.campaign_id, campaign_id.clone());
            session.generation += 1;
            session.consecutive_failures = 0;
            session.terminal = false;
            session.run_active = false;
            session.retry_pending = false;
            session.needs_initial_load = true;
            session.last_failed_fetch = None;
            let retired = std::mem::replace(&mut session.switched, self.shared.cancel.child_token());
            retired.cancel();
            self.shared
                .snapshot_tx
                .send_replace(ControllerSnapshot::loading(&campaign_id, false));
            previous
        };
        self.shared.cache.evict(&previous);
        info!("execution state subscription moved from {previous} to {campaign_id}");
        self.shared.wakeup.notify_one();
    }

    pub fn set_polling_enabled(&self, enabled: bool) {
        {
            let mut session = lock(&self.shared.session);
            session.polling_enabled = enabled;
            let polling = session.should_poll(self.shared.cancel.is_cancelled());
            self.shared
                .snapshot_tx
                .send_modify(|snapshot| snapshot.polling = polling);
        }
        self.shared.wakeup.notify_one();
    }

    pub fn campaign_id(&self) -> String {
        lock(&self.shared.session).campaign_id.clone()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }
}

impl Drop for ExecutionController {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

async fn run_subscription(shared: Arc<ControllerShared>) {
    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        if shared.take_initial_load() {
            if !shared.load_until_switched().await {
                break;
            }
            continue;
        }

        let polling = shared.should_poll();
        debug!("execution state polling active: {polling}");
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = shared.wakeup.notified() => {}
            _ = sleep(shared.config.interval), if polling => {
                if !shared.load_until_switched().await {
                    break;
                }
            }
        }
    }
    debug!("execution state subscription task exited");
}

impl ControllerShared {
    fn take_initial_load(&self) -> bool {
        std::mem::take(&mut lock(&self.session).needs_initial_load)
    }

    fn should_poll(&self) -> bool {
        lock(&self.session).should_poll(self.cancel.is_cancelled())
    }

    fn target(&self) -> LoadTarget {
        let session = lock(&self.session);
        LoadTarget {
            campaign_id: session.campaign_id.clone(),
            generation: session.generation,
            switched: session.switched.clone(),
        }
    }

    async fn load(&self, bypass_cache: bool) -> Arc<ExecutionState> {
        let target = self.target();
        self.load_target(&target, bypass_cache).await
    }

    async fn load_target(&self, target: &LoadTarget, bypass_cache: bool) -> Arc<ExecutionState> {
        let read = self.cache.read(&target.campaign_id, bypass_cache).await;
        self.apply(&target.campaign_id, target.generation, read)
    }

    /// Cache-aware load for the subscription loop. Gives up waiting as soon
    /// as the campaign changes; the request itself keeps running in the cache.
    /// Returns false once the subscription is cancelled.
    async fn load_until_switched(&self) -> bool {
        let target = self.target();
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = target.switched.cancelled() => {
                debug!("campaign changed while loading {}", target.campaign_id);
                !self.cancel.is_cancelled()
            }
            _ = self.load_target(&target, false) => true,
        }
    }

    fn apply(&self, campaign_id: &str, generation: u64, read: CacheRead) -> Arc<ExecutionState> {
        let mut session = lock(&self.session);
        let stale = session.generation != generation || self.cancel.is_cancelled();

        match read.result {
            Ok(state) => {
                if stale {
                    debug!("discarding execution state for {campaign_id} from a retired subscription");
                    return state;
                }
                session.consecutive_failures = 0;
                session.terminal = false;
                session.retry_pending = false;
                session.last_failed_fetch = None;
                session.run_active = state.is_active();
                let polling = session.should_poll(false);
                self.snapshot_tx.send_replace(ControllerSnapshot {
                    campaign_id: campaign_id.to_string(),
                    phase: LoadPhase::Ready,
                    state: Arc::clone(&state),
                    error: None,
                    polling,
                    consecutive_failures: 0,
                });
                state
            }
            Err(err) => {
                let fallback = Arc::new(ExecutionState::fallback(campaign_id));
                if stale {
                    debug!("discarding fetch error for {campaign_id} from a retired subscription");
                    return fallback;
                }
                // Callers that joined the same request only count it once.
                let already_counted =
                    read.fetch_seq.is_some() && read.fetch_seq == session.last_failed_fetch;
                if !already_counted {
                    session.last_failed_fetch = read.fetch_seq;
                    if err.is_retryable() {
                        session.consecutive_failures += 1;
                        if session.consecutive_failures >= self.config.max_consecutive_failures {
                            warn!(
                                "giving up on {campaign_id} after {} consecutive failures: {err}",
                                session.consecutive_failures
                            );
                            session.terminal = true;
                        }
                    } else {
                        warn!("stopping execution state polling for {campaign_id}: {err}");
                        session.terminal = true;
                    }
                }
                session.run_active = false;
                session.retry_pending = err.is_retryable() && !session.terminal;
                let polling = session.should_poll(false);
                self.snapshot_tx.send_replace(ControllerSnapshot {
                    campaign_id: campaign_id.to_string(),
                    phase: LoadPhase::Error,
                    state: Arc::clone(&fallback),
                    error: Some(SyncError::from_fetch(&err, session.terminal)),
                    polling,
                    consecutive_failures: session.consecutive_failures,
                });
                fallback
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
