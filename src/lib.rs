//! Local mirror of YouTrack tickets with a background sync engine.
//!
//! [`App`] is the surface the presentation layer calls into: configuration
//! and credential management, the cached ticket list, on-demand sync and
//! validation of candidate credentials. The engine never calls back into the
//! UI; callers poll [`App::get_tickets`] and [`App::config_status`].

use std::sync::Arc;

use log::{debug, info, warn};
use youtrack_api::ApiError;

mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;
mod storage;
pub mod sync;
pub mod ticket_store;

pub use bridge::ConfigStatus;
pub use config::{AppPaths, Config, ConfigManager};
pub use error::{AppError, Result};
pub use secrets::CredentialStore;
pub use sync::{SyncOrchestrator, SyncOutcome, SyncSchedule, SyncState};
pub use youtrack_api::{Project, Ticket, UserProfile};

use logging::redact_log_details;

fn log_remote_failure(action: &str, err: &ApiError) {
    warn!("{} failed: {}", action, err.user_message());
    debug!("{} failure details: {}", action, redact_log_details(&err.to_string()));
}

/// Application context owning the sync engine and its storage locations.
#[derive(Clone)]
pub struct App {
    paths: AppPaths,
    sync: SyncOrchestrator,
}

impl App {
    pub fn new(paths: AppPaths) -> Self {
        Self::with_components(paths, CredentialStore::default(), SyncSchedule::default())
    }

    pub fn with_components(
        paths: AppPaths,
        credentials: CredentialStore,
        schedule: SyncSchedule,
    ) -> Self {
        let sync = SyncOrchestrator::new(&paths, credentials, schedule);
        Self { paths, sync }
    }

    /// Binds the engine to the per-user application data directory.
    pub fn from_default_paths() -> Result<Self> {
        Ok(Self::new(AppPaths::resolve()?))
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.sync
    }

    /// Loads persisted state and starts the background schedule when setup
    /// is complete. Never touches the network directly.
    pub async fn startup(&self) -> SyncState {
        self.sync.startup().await
    }

    pub fn get_config(&self) -> Config {
        self.sync.config()
    }

    /// Replaces the whole configuration record.
    pub async fn set_config(&self, config: Config) -> Result<()> {
        self.sync.set_config(config).await
    }

    pub async fn config_status(&self) -> ConfigStatus {
        let config = self.sync.config();
        let has_token = self.sync.token().await.is_some();
        ConfigStatus {
            configured: config.has_scope() && has_token,
            state: self.sync.state(),
            base_url: config.base_url,
            project_count: config.projects.len(),
            has_token,
            last_sync_time: config.last_sync_time,
            ticket_count: self.sync.ticket_store().len(),
        }
    }

    pub async fn get_credential(&self) -> Option<String> {
        self.sync.token().await
    }

    pub async fn has_credential(&self) -> bool {
        self.sync.token().await.is_some()
    }

    pub async fn set_credential(&self, token: &str) -> Result<()> {
        self.sync.set_credential(token.to_string()).await
    }

    pub async fn clear_credential(&self) -> Result<()> {
        self.sync.clear_credential().await
    }

    /// Current cached tickets. Returns immediately even while a sync runs.
    pub fn get_tickets(&self) -> Arc<Vec<Ticket>> {
        self.sync.tickets()
    }

    pub fn find_ticket(&self, id: &str) -> Option<Ticket> {
        self.sync.ticket_store().find(id)
    }

    /// Forces a sync and resolves when it completes. A trigger issued while
    /// another sync is in flight resolves to [`SyncOutcome::AlreadyRunning`].
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        self.sync.sync_now().await
    }

    /// Checks a candidate URL and token without touching stored state.
    pub async fn validate_credentials(&self, base_url: &str, token: &str) -> Result<()> {
        youtrack_api::validate_connection(base_url, token)
            .await
            .inspect_err(|err| log_remote_failure("Credential validation", err))?;
        info!("Credentials validated");
        Ok(())
    }

    pub async fn current_user(&self, base_url: &str, token: &str) -> Result<UserProfile> {
        youtrack_api::fetch_current_user(base_url, token)
            .await
            .inspect_err(|err| log_remote_failure("Current user lookup", err))
            .map_err(AppError::from)
    }

    /// Lists projects visible to a candidate URL and token, for project
    /// selection during setup.
    pub async fn list_projects(&self, base_url: &str, token: &str) -> Result<Vec<Project>> {
        let projects = youtrack_api::fetch_projects(base_url, token)
            .await
            .inspect_err(|err| log_remote_failure("Project listing", err))?;
        debug!("Listed {} projects", projects.len());
        Ok(projects)
    }

    /// Stops the schedule and cancels any in-flight sync.
    pub async fn shutdown(&self) {
        self.sync.shutdown().await;
    }
}

/// Headless entry point: resolves storage, installs logging, runs the
/// engine until Ctrl-C.
pub async fn run() -> Result<()> {
    let paths = AppPaths::resolve()?;
    let config = ConfigManager::new(&paths.config_file).load();
    logging::init(&config, &paths);

    info!("Starting youtrack-helper sync engine");
    debug!("Data directory: {}", paths.data_dir.display());

    let app = App::new(paths);
    let state = app.startup().await;
    debug!("Sync engine state after startup: {:?}", state);

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
    }
    app.shutdown().await;
    Ok(())
}
