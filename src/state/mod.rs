use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::CoreState;
use crate::core::cache::CacheStore;
use crate::core::monitor::spawn_alert_forwarder;
use crate::core::task::PeriodicTask;
use crate::core::tts::BoxedProvider;

/// How often streaming sessions are checked for idleness.
const IDLE_SWEEP_PERIOD: Duration = Duration::from_secs(5);

/// How often monitor windows are aged and alerts re-checked without traffic.
const ALERT_REFRESH_PERIOD: Duration = Duration::from_secs(10);

/// Application state that can be shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state that holds the synthesis pipeline
    pub core_state: Arc<CoreState>,
}

/// Handles to the long-running background work.
pub struct BackgroundTasks {
    pregeneration: PeriodicTask,
    idle_sweep: PeriodicTask,
    alert_refresh: PeriodicTask,
    alert_forwarder: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Stops the periodic tasks and the alert forwarder.
    pub async fn shutdown(self) {
        self.pregeneration.shutdown().await;
        self.idle_sweep.shutdown().await;
        self.alert_refresh.shutdown().await;
        self.alert_forwarder.abort();
        info!("Background tasks stopped");
    }
}

impl AppState {
    pub async fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let core_state = CoreState::new(&config).await?;
        Ok(Arc::new(Self { config, core_state }))
    }

    /// Builds the state around an existing provider instead of the configured one.
    pub async fn with_provider(
        config: ServerConfig,
        provider: BoxedProvider,
    ) -> anyhow::Result<Arc<Self>> {
        let core_state = CoreState::with_provider(&config, provider).await?;
        Ok(Arc::new(Self { config, core_state }))
    }

    /// Get a handle to the application's cache store
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.core_state.cache
    }

    /// Starts recurring pregeneration, the idle-session sweep, alert refresh
    /// and alert forwarding.
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let core = &self.core_state;

        let pregeneration = core.scheduler.start();

        let sessions = Arc::clone(&core.sessions);
        let idle_sweep = PeriodicTask::spawn("idle_session_sweep", IDLE_SWEEP_PERIOD, false, move || {
            let sessions = Arc::clone(&sessions);
            async move {
                let closed = sessions.sweep_idle();
                if closed > 0 {
                    info!("Closed {} idle streaming sessions", closed);
                }
            }
        });

        let monitor = Arc::clone(&core.monitor);
        let alert_refresh = PeriodicTask::spawn("alert_refresh", ALERT_REFRESH_PERIOD, false, move || {
            let monitor = Arc::clone(&monitor);
            async move {
                monitor.refresh();
            }
        });

        let alert_forwarder = spawn_alert_forwarder(
            core.monitor.subscribe(),
            self.config.alert_webhook_url.clone(),
        );

        BackgroundTasks {
            pregeneration,
            idle_sweep,
            alert_refresh,
            alert_forwarder,
        }
    }
}
