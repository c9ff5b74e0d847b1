//! Sync orchestrator: owns configuration and ticket state, runs single-flight
//! syncs and drives the recurring background refresh.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::{self, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use youtrack_api::{ApiConfig, Ticket, YouTrackClient};

use crate::config::{AppPaths, Config, ConfigManager};
use crate::error::{AppError, Result};
use crate::logging::redact_log_details;
use crate::secrets::CredentialStore;
use crate::ticket_store::{TicketCache, TicketStore};

pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Lifecycle of the orchestrator.
///
/// `Uninitialized` until [`SyncOrchestrator::startup`]; `Disabled` while
/// server, projects or token are missing; `Idle`/`Syncing` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Uninitialized,
    Idle,
    Syncing,
    Disabled,
}

/// Timing of the background refresh. The interval is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncSchedule {
    initial_delay: Duration,
    interval: Duration,
}

impl Default for SyncSchedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_SECS),
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
        }
    }
}

impl SyncSchedule {
    pub fn new(initial_delay: Duration, interval: Duration) -> Self {
        Self {
            initial_delay,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced { tickets: usize, synced_at: i64 },
    /// Another sync held the lock; this trigger was dropped.
    AlreadyRunning,
}

/// Owning context for configuration, credentials and the ticket cache.
/// Cloning shares the same state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    config_manager: ConfigManager,
    config: Mutex<Config>,
    credentials: CredentialStore,
    tickets: TicketStore,
    cache: TicketCache,
    state: Mutex<SyncState>,
    sync_lock: AsyncMutex<()>,
    schedule: SyncSchedule,
    shutdown: watch::Sender<bool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Returns `Syncing` to `Idle` however the sync future ends, including when
/// it is dropped mid-flight. A concurrent switch to `Disabled` is kept.
struct SyncingGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if *state == SyncState::Syncing {
            *state = SyncState::Idle;
        }
    }
}

impl SyncOrchestrator {
    pub fn new(paths: &AppPaths, credentials: CredentialStore, schedule: SyncSchedule) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(SyncInner {
                config_manager: ConfigManager::new(&paths.config_file),
                config: Mutex::new(Config::default()),
                credentials,
                tickets: TicketStore::default(),
                cache: TicketCache::new(&paths.tickets_file),
                state: Mutex::new(SyncState::Uninitialized),
                sync_lock: AsyncMutex::new(()),
                schedule,
                shutdown,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Loads configuration and cached tickets, then either schedules the
    /// background refresh or stays disabled without touching the network.
    pub async fn startup(&self) -> SyncState {
        *self.inner.config.lock() = self.inner.config_manager.load();
        self.inner.tickets.set(self.inner.cache.load_from_disk());

        let next = if self.is_configured().await {
            SyncState::Idle
        } else {
            SyncState::Disabled
        };
        *self.inner.state.lock() = next;

        if next == SyncState::Idle {
            info!("Configuration complete; scheduling background sync");
            self.start_schedule();
        } else {
            info!("Sync disabled until server, projects and token are configured");
        }
        next
    }

    pub fn state(&self) -> SyncState {
        *self.inner.state.lock()
    }

    pub fn config(&self) -> Config {
        self.inner.config.lock().clone()
    }

    pub fn last_sync_time(&self) -> i64 {
        self.inner.config.lock().last_sync_time
    }

    /// Current ticket snapshot; never blocks on an in-flight sync.
    pub fn tickets(&self) -> Arc<Vec<Ticket>> {
        self.inner.tickets.snapshot()
    }

    pub fn ticket_store(&self) -> &TicketStore {
        &self.inner.tickets
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub async fn token(&self) -> Option<String> {
        let credentials = self.inner.credentials.clone();
        match task::spawn_blocking(move || credentials.get()).await {
            Ok(token) => token,
            Err(err) => {
                warn!("Token lookup task failed: {}", err);
                None
            }
        }
    }

    pub async fn is_configured(&self) -> bool {
        let config = self.config();
        if !config.has_scope() {
            return false;
        }
        let token = self.token().await;
        config.is_configured(token.as_deref())
    }

    /// Replaces the whole configuration record and persists it.
    pub async fn set_config(&self, config: Config) -> Result<()> {
        let config = config.normalized();
        {
            let mut current = self.inner.config.lock();
            self.inner.config_manager.save(&config)?;
            *current = config;
        }
        self.reevaluate().await;
        Ok(())
    }

    pub async fn set_credential(&self, token: String) -> Result<()> {
        let credentials = self.inner.credentials.clone();
        task::spawn_blocking(move || credentials.set(&token))
            .await
            .map_err(|err| AppError::Task(err.to_string()))??;
        self.reevaluate().await;
        Ok(())
    }

    pub async fn clear_credential(&self) -> Result<()> {
        let credentials = self.inner.credentials.clone();
        task::spawn_blocking(move || credentials.clear())
            .await
            .map_err(|err| AppError::Task(err.to_string()))??;
        self.reevaluate().await;
        Ok(())
    }

    /// Re-checks completeness after a configuration or credential change and
    /// starts or stops the schedule accordingly.
    async fn reevaluate(&self) -> SyncState {
        let configured = self.is_configured().await;
        let (next, changed) = {
            let mut state = self.inner.state.lock();
            let next = match (*state, configured) {
                (SyncState::Disabled, true) => SyncState::Idle,
                (SyncState::Idle | SyncState::Syncing, false) => SyncState::Disabled,
                (current, _) => current,
            };
            let changed = next != *state;
            *state = next;
            (next, changed)
        };

        if changed {
            match next {
                SyncState::Idle => {
                    info!("Configuration complete; background sync enabled");
                    self.start_schedule();
                }
                SyncState::Disabled => {
                    info!("Configuration incomplete; background sync disabled");
                    self.stop_schedule();
                }
                _ => {}
            }
        }
        next
    }

    /// Runs one sync unless another is in flight, in which case the trigger
    /// is dropped and [`SyncOutcome::AlreadyRunning`] is returned.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let Ok(_sync_guard) = self.inner.sync_lock.try_lock() else {
            debug!("Sync already in flight; dropping trigger");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        {
            let mut state = self.inner.state.lock();
            match *state {
                SyncState::Uninitialized => {
                    return Err(AppError::NotConfigured("engine not started".to_string()))
                }
                SyncState::Disabled => {
                    return Err(AppError::NotConfigured(
                        "server, projects or token missing".to_string(),
                    ))
                }
                SyncState::Idle | SyncState::Syncing => *state = SyncState::Syncing,
            }
        }
        let _state_guard = SyncingGuard {
            state: &self.inner.state,
        };

        let result = self.run_sync().await;
        match &result {
            Ok(SyncOutcome::Synced { tickets, .. }) => {
                info!("Ticket sync complete: {} tickets", tickets)
            }
            Ok(SyncOutcome::AlreadyRunning) => {}
            Err(err) => {
                warn!("Ticket sync failed: {}", err.user_message());
                debug!("Ticket sync failure details: {}", redact_log_details(&err.to_string()));
            }
        }
        result
    }

    /// Fetch, then persist and swap. Nothing is written unless the fetch
    /// succeeded, and the in-memory cache only changes after the cache file
    /// was written.
    async fn run_sync(&self) -> Result<SyncOutcome> {
        let config = self.config();
        if !config.has_scope() {
            return Err(AppError::NotConfigured(
                "server url or projects missing".to_string(),
            ));
        }
        let token = self
            .token()
            .await
            .ok_or_else(|| AppError::NotConfigured("no token stored".to_string()))?;

        let client = YouTrackClient::new(ApiConfig::new(&config.base_url, token))?;
        let mut shutdown = self.inner.shutdown.subscribe();
        let tickets = tokio::select! {
            fetched = client.fetch_tickets(&config.projects) => fetched?,
            _ = shutdown.wait_for(|stopped| *stopped) => return Err(AppError::Cancelled),
        };

        self.inner.cache.save_to_disk(&tickets)?;
        let count = tickets.len();
        self.inner.tickets.set(tickets);

        let synced_at = Utc::now().timestamp();
        {
            let mut current = self.inner.config.lock();
            let mut updated = current.clone();
            updated.last_sync_time = synced_at;
            self.inner.config_manager.save(&updated)?;
            *current = updated;
        }

        Ok(SyncOutcome::Synced {
            tickets: count,
            synced_at,
        })
    }

    fn start_schedule(&self) {
        if *self.inner.shutdown.borrow() {
            return;
        }
        let mut timer = self.inner.timer.lock();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let schedule = self.inner.schedule;
        debug!(
            "Background sync every {:?} after {:?}",
            schedule.interval, schedule.initial_delay
        );
        *timer = Some(tokio::spawn(run_schedule(
            Arc::downgrade(&self.inner),
            schedule,
            self.inner.shutdown.subscribe(),
        )));
    }

    fn stop_schedule(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
        }
    }

    /// Stops the schedule and cancels any in-flight fetch. Waits for the
    /// background task to finish.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = self.inner.timer.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("Background sync task ended abnormally: {}", err);
                }
            }
        }
        info!("Sync engine stopped");
    }
}

/// Ticks at a fixed cadence independent of manual syncs. Holds only a weak
/// reference so a dropped orchestrator ends the loop.
async fn run_schedule(
    inner: Weak<SyncInner>,
    schedule: SyncSchedule,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + schedule.initial_delay, schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.wait_for(|stopped| *stopped) => {
                debug!("Background sync schedule stopped");
                return;
            }
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let orchestrator = SyncOrchestrator { inner };
        match orchestrator.sync_now().await {
            Ok(SyncOutcome::Synced { .. }) => {}
            Ok(SyncOutcome::AlreadyRunning) => {
                debug!("Scheduled sync skipped; another sync is in flight")
            }
            Err(AppError::Cancelled) => return,
            Err(_) => debug!("Background sync failed; retrying at next tick"),
        }
    }
}
