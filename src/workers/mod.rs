use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

use crate::services::{DataProvider, SessionStore};

const SESSION_SWEEP_SCHEDULE: &str = "0 * * * * *";
const CACHE_PURGE_SCHEDULE: &str = "0 */5 * * * *";

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
    provider: Arc<DataProvider>,
    sessions: Arc<SessionStore>,
    idle_timeout: Duration,
}

impl WorkerManager {
    pub async fn new(
        provider: Arc<DataProvider>,
        sessions: Arc<SessionStore>,
        idle_timeout: Duration,
    ) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            running: AtomicBool::new(false),
            provider,
            sessions,
            idle_timeout,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let scheduler = self.scheduler.lock().await;

        let provider = Arc::clone(&self.provider);
        let sessions = Arc::clone(&self.sessions);
        let idle = chrono::Duration::from_std(self.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::minutes(30));
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(SESSION_SWEEP_SCHEDULE, move |_uuid, _lock| {
            let provider = Arc::clone(&provider);
            let sessions = Arc::clone(&sessions);
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {},
                    removed = sweep_idle_sessions(provider, sessions, idle) => {
                        if removed > 0 {
                            info!(removed, "idle study sessions dropped");
                        }
                    }
                }
            })
        })?;
        scheduler.add(job).await?;
        info!("Session sweep worker scheduled (every minute)");

        let provider = Arc::clone(&self.provider);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(CACHE_PURGE_SCHEDULE, move |_uuid, _lock| {
            let provider = Arc::clone(&provider);
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {},
                    purged = purge_cache(provider) => {
                        debug!(purged, "expired cache entries purged");
                    }
                }
            })
        })?;
        scheduler.add(job).await?;
        info!("Cache purge worker scheduled (every 5 minutes)");

        scheduler.start().await?;
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }
        info!("Workers stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Unfinished idle sessions are dropped. Finished ones whose record never
/// made it to the database are stored on the way out.
async fn sweep_idle_sessions(
    provider: Arc<DataProvider>,
    sessions: Arc<SessionStore>,
    idle: chrono::Duration,
) -> usize {
    let now = Utc::now();
    let swept = sessions.sweep_idle(now, idle);
    for session in swept.iter().filter(|s| s.is_finished()) {
        let record = session.summary(session.last_activity_at());
        if let Err(err) = provider.record_session(&record).await {
            warn!(error = %err, session_id = %record.id, "failed to record swept study session");
        }
    }
    swept.len()
}

async fn purge_cache(provider: Arc<DataProvider>) -> usize {
    provider.cache().purge_expired()
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
